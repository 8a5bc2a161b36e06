use crate::config::RepoContext;
use crate::errors::{StackError, Result};
use crate::git::{log, GitBackend, GitLog};
use crate::host::CodeHostingService;
use crate::stack::BranchNamer;
use tracing::debug;

/// How a user-supplied commit indicator should be interpreted. `Guess` is
/// resolved into one of the concrete variants exactly once, at the CLI
/// boundary; nothing downstream re-interprets an indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorType {
    Commit,
    Pr,
    List,
    Guess,
}

/// The resolved target of one commit indicator. A value object produced
/// fresh per resolution call and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchInfo {
    pub commit_hash: String,
    pub branch_name: String,
}

/// Maps a user-supplied commit indicator to a concrete (commit, branch)
/// pair. Only PR-type resolution touches the network (one fetch); the rest
/// are read-only queries.
pub struct IndicatorResolver<'a> {
    git: &'a GitBackend,
    host: &'a dyn CodeHostingService,
    ctx: &'a RepoContext,
    namer: &'a BranchNamer,
}

impl<'a> IndicatorResolver<'a> {
    pub fn new(
        git: &'a GitBackend,
        host: &'a dyn CodeHostingService,
        ctx: &'a RepoContext,
        namer: &'a BranchNamer,
    ) -> Self {
        Self {
            git,
            host,
            ctx,
            namer,
        }
    }

    /// The commits stacked on top of the remote trunk, newest first.
    pub fn new_commits(&self) -> Result<Vec<GitLog>> {
        let upstream = self.ctx.remote_trunk(self.git)?;
        log::new_commits(self.git, self.namer, &upstream)
    }

    /// Resolve an indicator into a `BranchInfo`.
    pub async fn resolve(&self, indicator: &str, indicator_type: IndicatorType) -> Result<BranchInfo> {
        let indicator = indicator.trim();

        // An empty indicator always means the trunk itself.
        if indicator.is_empty() {
            let trunk = self.ctx.trunk(self.git)?;
            let commit = self.git.rev_parse(&trunk)?;
            return Ok(BranchInfo {
                commit_hash: commit,
                branch_name: trunk,
            });
        }

        let concrete = match indicator_type {
            IndicatorType::Guess => Self::guess(indicator),
            other => other,
        };
        debug!("resolving indicator {indicator:?} as {concrete:?}");

        match concrete {
            IndicatorType::List => self.resolve_list(indicator),
            IndicatorType::Pr => self.resolve_pr(indicator).await,
            IndicatorType::Commit => self.resolve_commit(indicator),
            IndicatorType::Guess => unreachable!("guess resolves to a concrete type"),
        }
    }

    /// Numeric with fewer than 3 digits reads as a list position, numeric
    /// with 3 to 6 digits as a PR number, anything else as a commit.
    fn guess(indicator: &str) -> IndicatorType {
        let numeric = !indicator.is_empty() && indicator.chars().all(|c| c.is_ascii_digit());
        if numeric && indicator.len() < 3 {
            IndicatorType::List
        } else if numeric && indicator.len() < 7 {
            IndicatorType::Pr
        } else {
            IndicatorType::Commit
        }
    }

    fn resolve_list(&self, indicator: &str) -> Result<BranchInfo> {
        let index: usize = indicator
            .parse()
            .map_err(|_| StackError::user(format!("list indicator is not a number: {indicator}")))?;
        let commits = self.new_commits()?;
        if index < 1 || index > commits.len() {
            return Err(StackError::user(format!(
                "list index {index} is out of range: there are {} new commits",
                commits.len()
            )));
        }
        let entry = &commits[index - 1];
        Ok(BranchInfo {
            commit_hash: entry.full_commit.clone(),
            branch_name: entry.branch.clone(),
        })
    }

    async fn resolve_pr(&self, indicator: &str) -> Result<BranchInfo> {
        let pr = self.host.view_pr(indicator).await?;
        let commits = self.host.pr_commits(indicator).await?;
        let oldest = commits.first().ok_or_else(|| {
            StackError::user(format!("pull request {indicator} has no commits"))
        })?;

        // Make sure the PR's branch is known locally before matching.
        let exit = self.git.fetch(self.ctx.remote(), &pr.head_ref_name)?;
        if !exit.success {
            return Err(StackError::tool(format!(
                "could not fetch {}: {}",
                pr.head_ref_name,
                exit.output.trim()
            )));
        }

        let local = self
            .new_commits()?
            .into_iter()
            .find(|c| c.subject == oldest.message_headline)
            .ok_or_else(|| {
                StackError::user(format!(
                    "no local commit matches PR {indicator} ({:?}); it may have been rebased away",
                    oldest.message_headline
                ))
            })?;

        Ok(BranchInfo {
            commit_hash: local.full_commit,
            branch_name: pr.head_ref_name,
        })
    }

    fn resolve_commit(&self, indicator: &str) -> Result<BranchInfo> {
        if !self.git.commit_exists(indicator)? {
            return Err(StackError::user(format!(
                "no such commit: {indicator}"
            )));
        }
        let commit = self.git.rev_parse(indicator)?;
        let upstream = self.ctx.remote_trunk(self.git)?;
        let commits = self.new_commits()?;
        let entry = commits
            .iter()
            .find(|c| c.full_commit == commit)
            .ok_or_else(|| {
                StackError::user(format!(
                    "commit {indicator} is not stacked on top of {upstream}"
                ))
            })?;
        Ok(BranchInfo {
            commit_hash: entry.full_commit.clone(),
            branch_name: entry.branch.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::errors::StackError;
    use crate::host::types::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::process::Command;
    use tempfile::TempDir;

    /// Host stub: only the PR-view calls used by resolution are answered.
    struct StubHost {
        head_ref: String,
        oldest_subject: String,
    }

    #[async_trait]
    impl CodeHostingService for StubHost {
        async fn create_pr(&self, _request: &CreatePullRequest) -> Result<PullRequestInfo> {
            unimplemented!("not used by resolver tests")
        }
        async fn view_pr(&self, _selector: &str) -> Result<PullRequestInfo> {
            Ok(PullRequestInfo {
                number: 123,
                title: "stub".to_string(),
                url: "https://example.com/pr/123".to_string(),
                head_ref_name: self.head_ref.clone(),
                state: "OPEN".to_string(),
                is_draft: false,
                created_at: None,
                merged_at: None,
            })
        }
        async fn pr_commits(&self, _selector: &str) -> Result<Vec<PrCommit>> {
            Ok(vec![PrCommit {
                oid: "0".repeat(40),
                message_headline: self.oldest_subject.clone(),
            }])
        }
        async fn edit_pr(&self, _: &str, _: Option<&str>, _: Option<&str>) -> Result<()> {
            Ok(())
        }
        async fn mark_ready(&self, _: &str) -> Result<()> {
            Ok(())
        }
        async fn add_reviewers(&self, _: &str, _: &[String]) -> Result<()> {
            Ok(())
        }
        async fn merged_prs(&self) -> Result<Vec<MergedPullRequest>> {
            Ok(Vec::new())
        }
        async fn list_open_prs(&self) -> Result<Vec<PullRequestListing>> {
            Ok(Vec::new())
        }
        async fn check_summary(&self, _: &str) -> Result<CheckSummary> {
            Ok(CheckSummary::Passing)
        }
    }

    fn create_test_repo_with_remote() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let remote_path = temp_dir.path().join("remote.git");
        let repo_path = temp_dir.path().join("repo");

        Command::new("git")
            .args(["init", "--bare", remote_path.to_str().unwrap()])
            .output()
            .unwrap();
        Command::new("git")
            .args(["clone", remote_path.to_str().unwrap(), repo_path.to_str().unwrap()])
            .output()
            .unwrap();
        Command::new("git")
            .args(["config", "user.name", "Test"])
            .current_dir(&repo_path)
            .output()
            .unwrap();
        Command::new("git")
            .args(["config", "user.email", "tester@example.com"])
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
        Command::new("git")
            .args(["push", "origin", "HEAD"])
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

    fn context_for(repo_path: &std::path::Path) -> RepoContext {
        let git = GitBackend::at(repo_path);
        let mut settings = Settings::default();
        settings.trunk = Some(git.current_branch().unwrap());
        RepoContext::new(settings)
    }

    #[test]
    fn test_guess_thresholds() {
        assert_eq!(IndicatorResolver::guess("1"), IndicatorType::List);
        assert_eq!(IndicatorResolver::guess("99"), IndicatorType::List);
        assert_eq!(IndicatorResolver::guess("100"), IndicatorType::Pr);
        assert_eq!(IndicatorResolver::guess("999999"), IndicatorType::Pr);
        assert_eq!(IndicatorResolver::guess("1000000"), IndicatorType::Commit);
        assert_eq!(IndicatorResolver::guess("abc1234"), IndicatorType::Commit);
    }

    #[tokio::test]
    async fn test_commit_and_list_resolution_agree() {
        let (_temp_dir, repo_path) = create_test_repo_with_remote();
        let git = GitBackend::at(&repo_path);
        let ctx = context_for(&repo_path);
        let namer = BranchNamer::with_default_template("tester".to_string());
        let host = StubHost {
            head_ref: String::new(),
            oldest_subject: String::new(),
        };
        let resolver = IndicatorResolver::new(&git, &host, &ctx, &namer);

        create_commit(&repo_path, "Add the widget", "widget.txt");
        let head = git.head_commit().unwrap();

        let by_hash = resolver.resolve(&head, IndicatorType::Commit).await.unwrap();
        let by_index = resolver.resolve("1", IndicatorType::List).await.unwrap();

        assert_eq!(by_hash, by_index);
        assert_eq!(by_hash.commit_hash, head);
        assert_eq!(by_hash.branch_name, "tester/add-the-widget");
    }

    #[tokio::test]
    async fn test_list_bounds_never_clamp() {
        let (_temp_dir, repo_path) = create_test_repo_with_remote();
        let git = GitBackend::at(&repo_path);
        let ctx = context_for(&repo_path);
        let namer = BranchNamer::with_default_template("tester".to_string());
        let host = StubHost {
            head_ref: String::new(),
            oldest_subject: String::new(),
        };
        let resolver = IndicatorResolver::new(&git, &host, &ctx, &namer);

        create_commit(&repo_path, "Only commit", "only.txt");

        for bad in ["0", "2", "17"] {
            let err = resolver.resolve(bad, IndicatorType::List).await.unwrap_err();
            assert!(matches!(err, StackError::User(_)), "expected user error for {bad}");
        }
    }

    #[tokio::test]
    async fn test_empty_indicator_is_trunk() {
        let (_temp_dir, repo_path) = create_test_repo_with_remote();
        let git = GitBackend::at(&repo_path);
        let trunk = git.current_branch().unwrap();
        let ctx = context_for(&repo_path);
        let namer = BranchNamer::with_default_template("tester".to_string());
        let host = StubHost {
            head_ref: String::new(),
            oldest_subject: String::new(),
        };
        let resolver = IndicatorResolver::new(&git, &host, &ctx, &namer);

        let info = resolver.resolve("", IndicatorType::Guess).await.unwrap();
        assert_eq!(info.branch_name, trunk);
        assert_eq!(info.commit_hash, git.rev_parse(&trunk).unwrap());
    }

    #[tokio::test]
    async fn test_pr_resolution_matches_by_subject() {
        let (_temp_dir, repo_path) = create_test_repo_with_remote();
        let git = GitBackend::at(&repo_path);
        let ctx = context_for(&repo_path);
        let namer = BranchNamer::with_default_template("tester".to_string());

        create_commit(&repo_path, "Teach the parser new tricks", "parser.txt");
        let head = git.head_commit().unwrap();

        // Publish the branch the PR claims as its head so the fetch succeeds.
        Command::new("git")
            .args(["push", "origin", "HEAD:refs/heads/tester/teach-the-parser-new-tricks"])
            .current_dir(&repo_path)
            .output()
            .unwrap();

        let host = StubHost {
            head_ref: "tester/teach-the-parser-new-tricks".to_string(),
            oldest_subject: "Teach the parser new tricks".to_string(),
        };
        let resolver = IndicatorResolver::new(&git, &host, &ctx, &namer);

        let info = resolver.resolve("123", IndicatorType::Pr).await.unwrap();
        assert_eq!(info.commit_hash, head);
        assert_eq!(info.branch_name, "tester/teach-the-parser-new-tricks");
    }

    #[tokio::test]
    async fn test_pr_resolution_fails_when_commit_rebased_away() {
        let (_temp_dir, repo_path) = create_test_repo_with_remote();
        let git = GitBackend::at(&repo_path);
        let ctx = context_for(&repo_path);
        let namer = BranchNamer::with_default_template("tester".to_string());

        create_commit(&repo_path, "Still here", "here.txt");
        Command::new("git")
            .args(["push", "origin", "HEAD:refs/heads/tester/gone"])
            .current_dir(&repo_path)
            .output()
            .unwrap();

        let host = StubHost {
            head_ref: "tester/gone".to_string(),
            oldest_subject: "A subject that no local commit carries".to_string(),
        };
        let resolver = IndicatorResolver::new(&git, &host, &ctx, &namer);

        let err = resolver.resolve("123", IndicatorType::Pr).await.unwrap_err();
        assert!(matches!(err, StackError::User(_)));
    }
}
