use crate::cli::output::Output;
use crate::errors::Result;

/// Show version information
pub async fn run() -> Result<()> {
    Output::section("stackdiff");
    Output::sub_item(format!("Version: {}", env!("CARGO_PKG_VERSION")));
    Output::sub_item(format!("Description: {}", env!("CARGO_PKG_DESCRIPTION")));

    Output::section("Build Information");
    Output::sub_item(format!("Target: {}", std::env::consts::ARCH));
    Output::sub_item(format!("OS: {}", std::env::consts::OS));

    #[cfg(debug_assertions)]
    Output::sub_item("Build type: Debug");
    #[cfg(not(debug_assertions))]
    Output::sub_item("Build type: Release");

    Output::section("External Tools");
    Output::sub_item("git: required on PATH");
    Output::sub_item("gh: required on PATH (run gh auth login once)");

    Ok(())
}
