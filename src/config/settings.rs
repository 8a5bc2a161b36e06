use crate::config;
use crate::errors::{StackError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// User-level settings, stored as JSON in the per-user config directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Remote all stacked branches are pushed to
    pub remote: String,
    /// Trunk branch override; detected from the remote HEAD when unset
    pub trunk: Option<String>,
    /// Seconds between code-host polls while waiting on checks or merges
    pub poll_interval_secs: u64,
    /// Reviewers added when `add-reviewers` is run without an explicit list
    pub default_reviewers: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            trunk: None,
            poll_interval_secs: 30,
            default_reviewers: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from the per-user config directory, falling back to
    /// defaults when no file exists.
    pub fn load() -> Result<Self> {
        let path = config::config_dir()?.join("config.json");
        Self::load_from_file(&path)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| StackError::user(format!("failed to read config file: {e}")))?;
        let settings: Settings = serde_json::from_str(&content)
            .map_err(|e| StackError::user(format!("failed to parse config file: {e}")))?;
        Ok(settings)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
