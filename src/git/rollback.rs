use crate::errors::Result;
use crate::git::GitBackend;
use tracing::{debug, warn};

/// Snapshot/restore of branch state for transactional safety.
///
/// An orchestrator operation pushes `(branch, commit)` snapshots before it
/// starts mutating and records every branch it creates along the way. On an
/// operational failure the operation calls `restore`, which turns the whole
/// external-command sequence into a no-op from the trunk's point of view.
/// On success the operation calls `clear` instead. The state is owned by
/// exactly one in-flight operation and never outlives it.
#[derive(Debug, Default)]
pub struct RollbackManager {
    saved: Vec<(String, String)>,
    created_branches: Vec<String>,
    stash_taken: bool,
}

impl RollbackManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push the current (branch, commit) pair onto the snapshot stack.
    pub fn save_state(&mut self, git: &GitBackend) -> Result<()> {
        let branch = git.current_branch()?;
        let commit = git.head_commit()?;
        debug!("rollback snapshot: {branch} @ {commit}");
        self.saved.push((branch, commit));
        Ok(())
    }

    /// Record a branch created during the in-flight operation; it is
    /// deleted on rollback.
    pub fn created_branch(&mut self, name: &str) {
        self.created_branches.push(name.to_string());
    }

    /// Record that a stash was taken and must be popped on rollback.
    pub fn stash_taken(&mut self) {
        self.stash_taken = true;
    }

    /// Discard all state once the operation reaches a safe point.
    pub fn clear(&mut self) {
        self.saved.clear();
        self.created_branches.clear();
        self.stash_taken = false;
    }

    /// Undo everything: best-effort abort of any in-progress
    /// cherry-pick/rebase/merge, unwind saved snapshots in reverse order via
    /// hard reset, delete created branches, restore the stash.
    ///
    /// Every step is best-effort; a rollback that trips over partial state
    /// must still unwind as much as it can.
    pub fn restore(&mut self, git: &GitBackend, cause: &str) {
        warn!("rolling back: {cause}");

        if let Ok(exit) = git.cherry_pick_abort() {
            if exit.success {
                debug!("aborted in-progress cherry-pick");
            }
        }
        if let Ok(exit) = git.rebase_abort() {
            if exit.success {
                debug!("aborted in-progress rebase");
            }
        }
        if let Ok(exit) = git.merge_abort() {
            if exit.success {
                debug!("aborted in-progress merge");
            }
        }

        while let Some((branch, commit)) = self.saved.pop() {
            if let Err(e) = git.switch(&branch) {
                warn!("rollback could not switch to {branch}: {e}");
                continue;
            }
            if let Err(e) = git.reset_hard(&commit) {
                warn!("rollback could not reset {branch} to {commit}: {e}");
            }
        }

        for branch in self.created_branches.drain(..) {
            if let Err(e) = git.delete_branch(&branch) {
                warn!("rollback could not delete branch {branch}: {e}");
            }
        }

        if self.stash_taken {
            self.stash_taken = false;
            if let Err(e) = git.stash_pop() {
                warn!("rollback could not restore stash: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::process::Command;
    use tempfile::TempDir;

    fn create_test_repo() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let repo_path = temp_dir.path().to_path_buf();

        Command::new("git")
            .args(["init"])
            .current_dir(&repo_path)
            .output()
            .unwrap();
        Command::new("git")
            .args(["config", "user.name", "Test"])
            .current_dir(&repo_path)
            .output()
            .unwrap();
        Command::new("git")
            .args(["config", "user.email", "test@test.com"])
            .current_dir(&repo_path)
            .output()
            .unwrap();

        std::fs::write(repo_path.join("README.md"), "# Test").unwrap();
        Command::new("git")
            .args(["add", "."])
            .current_dir(&repo_path)
            .output()
            .unwrap();
        Command::new("git")
            .args(["commit", "-m", "Initial commit"])
            .current_dir(&repo_path)
            .output()
            .unwrap();

        (temp_dir, repo_path)
    }

    fn create_commit(repo_path: &PathBuf, message: &str, filename: &str) {
        std::fs::write(repo_path.join(filename), format!("Content for {filename}\n")).unwrap();
        Command::new("git")
            .args(["add", filename])
            .current_dir(repo_path)
            .output()
            .unwrap();
        Command::new("git")
            .args(["commit", "-m", message])
            .current_dir(repo_path)
            .output()
            .unwrap();
    }

    #[test]
    fn test_restore_unwinds_commits_and_created_branches() {
        let (_temp_dir, repo_path) = create_test_repo();
        let git = GitBackend::at(&repo_path);
        let trunk = git.current_branch().unwrap();
        let before = git.head_commit().unwrap();

        let mut rollback = RollbackManager::new();
        rollback.save_state(&git).unwrap();

        git.create_branch("scratch", "HEAD").unwrap();
        rollback.created_branch("scratch");
        git.switch("scratch").unwrap();
        create_commit(&repo_path, "Scratch work", "scratch.txt");

        rollback.restore(&git, "test failure");

        assert_eq!(git.current_branch().unwrap(), trunk);
        assert_eq!(git.head_commit().unwrap(), before);
        assert!(!git.local_branch_exists("scratch").unwrap());
    }

    #[test]
    fn test_restore_pops_stash() {
        let (_temp_dir, repo_path) = create_test_repo();
        let git = GitBackend::at(&repo_path);

        std::fs::write(repo_path.join("wip.txt"), "uncommitted work").unwrap();
        let mut rollback = RollbackManager::new();
        assert!(git.stash_push("in-flight").unwrap());
        rollback.stash_taken();
        rollback.save_state(&git).unwrap();

        rollback.restore(&git, "test failure");

        assert!(repo_path.join("wip.txt").exists());
    }

    #[test]
    fn test_clear_makes_restore_a_noop() {
        let (_temp_dir, repo_path) = create_test_repo();
        let git = GitBackend::at(&repo_path);

        let mut rollback = RollbackManager::new();
        rollback.save_state(&git).unwrap();
        create_commit(&repo_path, "Kept work", "kept.txt");
        let after = git.head_commit().unwrap();

        rollback.clear();
        rollback.restore(&git, "should do nothing");

        assert_eq!(git.head_commit().unwrap(), after);
    }
}
