use crate::cli::commands::CommandEnv;
use crate::cli::output::Output;
use crate::errors::Result;
use crate::host::{CheckSummary, CodeHostingService};
use console::style;

/// List the current user's open pull requests with check status.
pub async fn run() -> Result<()> {
    let env = CommandEnv::discover()?;
    let listings = env.host.list_open_prs().await?;

    if listings.is_empty() {
        Output::info("no open pull requests");
        return Ok(());
    }

    for listing in &listings {
        let checks = match listing.checks {
            CheckSummary::Passing => style("passing").green(),
            CheckSummary::Failing => style("failing").red(),
            CheckSummary::Pending => style("pending").yellow(),
        };
        let draft = if listing.info.is_draft { " [draft]" } else { "" };
        println!(
            "#{:<5} {} {}{}",
            listing.info.number,
            checks,
            listing.info.title,
            style(draft).dim()
        );
        if let Some(created) = listing.info.created_at {
            Output::sub_item(format!(
                "{} · opened {}",
                listing.info.url,
                created.format("%Y-%m-%d")
            ));
        } else {
            Output::sub_item(listing.info.url.clone());
        }
    }
    Ok(())
}
