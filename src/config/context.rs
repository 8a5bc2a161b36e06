use crate::config::Settings;
use crate::errors::{StackError, Result};
use crate::git::GitBackend;
use std::cell::RefCell;
use tracing::debug;

/// Per-invocation read-through cache for repository identity: trunk branch,
/// remote name, and the username branches are derived from.
///
/// Each value is resolved at most once per command and only when first
/// asked for. The context is passed by reference into the components that
/// need it; nothing here is globally mutable.
pub struct RepoContext {
    settings: Settings,
    trunk: RefCell<Option<String>>,
    username: RefCell<Option<String>>,
}

impl RepoContext {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            trunk: RefCell::new(None),
            username: RefCell::new(None),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn remote(&self) -> &str {
        &self.settings.remote
    }

    /// The trunk branch name: configured override, else the remote's HEAD,
    /// else `init.defaultBranch`, else "main".
    pub fn trunk(&self, git: &GitBackend) -> Result<String> {
        if let Some(cached) = self.trunk.borrow().as_ref() {
            return Ok(cached.clone());
        }
        let resolved = self.detect_trunk(git)?;
        debug!("trunk branch: {resolved}");
        *self.trunk.borrow_mut() = Some(resolved.clone());
        Ok(resolved)
    }

    /// `<remote>/<trunk>`, the upstream sync point every stacked commit is
    /// measured against.
    pub fn remote_trunk(&self, git: &GitBackend) -> Result<String> {
        Ok(format!("{}/{}", self.remote(), self.trunk(git)?))
    }

    /// Username branches are derived from: the local part of
    /// `user.email`, falling back to `user.name`.
    pub fn username(&self, git: &GitBackend) -> Result<String> {
        if let Some(cached) = self.username.borrow().as_ref() {
            return Ok(cached.clone());
        }
        let resolved = self.detect_username(git)?;
        debug!("username: {resolved}");
        *self.username.borrow_mut() = Some(resolved.clone());
        Ok(resolved)
    }

    fn detect_trunk(&self, git: &GitBackend) -> Result<String> {
        if let Some(trunk) = &self.settings.trunk {
            return Ok(trunk.clone());
        }
        let head_ref = format!("refs/remotes/{}/HEAD", self.remote());
        if let Ok(full) = git.run(&["symbolic-ref", &head_ref]) {
            let prefix = format!("refs/remotes/{}/", self.remote());
            if let Some(name) = full.strip_prefix(&prefix) {
                return Ok(name.to_string());
            }
        }
        if let Some(name) = git.config_get("init.defaultBranch")? {
            if !name.is_empty() {
                return Ok(name);
            }
        }
        Ok("main".to_string())
    }

    fn detect_username(&self, git: &GitBackend) -> Result<String> {
        if let Some(email) = git.config_get("user.email")? {
            if let Some(local) = email.split('@').next() {
                if !local.is_empty() {
                    return Ok(local.to_string());
                }
            }
        }
        if let Some(name) = git.config_get("user.name")? {
            if !name.is_empty() {
                return Ok(name);
            }
        }
        Err(StackError::user(
            "could not determine a username: set git config user.email",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::TempDir;

    fn create_test_repo() -> (TempDir, GitBackend) {
        let temp_dir = TempDir::new().unwrap();
        let repo_path = temp_dir.path().to_path_buf();

        Command::new("git")
            .args(["init"])
            .current_dir(&repo_path)
            .output()
            .unwrap();
        Command::new("git")
            .args(["config", "user.name", "Jane Doe"])
            .current_dir(&repo_path)
            .output()
            .unwrap();
        Command::new("git")
            .args(["config", "user.email", "jane.doe@example.com"])
            .current_dir(&repo_path)
            .output()
            .unwrap();

        let git = GitBackend::at(&repo_path);
        (temp_dir, git)
    }

    #[test]
    fn test_username_from_email_local_part() {
        let (_temp_dir, git) = create_test_repo();
        let ctx = RepoContext::new(Settings::default());
        assert_eq!(ctx.username(&git).unwrap(), "jane.doe");
    }

    #[test]
    fn test_trunk_override_from_settings() {
        let (_temp_dir, git) = create_test_repo();
        let mut settings = Settings::default();
        settings.trunk = Some("develop".to_string());
        let ctx = RepoContext::new(settings);
        assert_eq!(ctx.trunk(&git).unwrap(), "develop");
        assert_eq!(ctx.remote_trunk(&git).unwrap(), "origin/develop");
    }

    #[test]
    fn test_username_is_memoized() {
        let (_temp_dir, git) = create_test_repo();
        let ctx = RepoContext::new(Settings::default());
        let first = ctx.username(&git).unwrap();

        // Change the config under the cache; the memoized value must win.
        Command::new("git")
            .args(["config", "user.email", "other@example.com"])
            .current_dir(git.root())
            .output()
            .unwrap();
        assert_eq!(ctx.username(&git).unwrap(), first);
    }
}
