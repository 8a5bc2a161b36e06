pub mod context;
pub mod settings;
pub mod templates;

pub use context::RepoContext;
pub use settings::Settings;
pub use templates::Template;

use crate::errors::{StackError, Result};
use std::path::PathBuf;

/// Per-user configuration directory (settings and template overrides).
pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir()
        .ok_or_else(|| StackError::user("could not determine the user config directory"))?;
    Ok(base.join("stackdiff"))
}
