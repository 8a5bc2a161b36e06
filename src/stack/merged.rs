use crate::errors::{StackError, Result};
use crate::git::{GitBackend, GitLog};
use crate::host::MergedPullRequest;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A local commit whose pull request already merged, eligible for removal
/// during a trunk rebase.
#[derive(Debug, Clone)]
pub struct DropCandidate {
    pub log: GitLog,
    pub merge_commit: String,
}

/// Decide which stacked commits' branches are safe to drop during a trunk
/// rebase.
///
/// A merged branch only qualifies while its merge commit is *not yet* an
/// ancestor of HEAD: once an ordinary rebase has incorporated the merge,
/// dropping again would be redundant. Every local commit whose derived
/// branch matches a qualifying merged branch becomes a drop candidate.
///
/// Two candidates resolving to the same branch name would make the drop
/// list ambiguous, so that is rejected as an invariant violation before
/// anything is mutated.
pub fn merged_candidates(
    git: &GitBackend,
    new_commits: &[GitLog],
    merged: &[MergedPullRequest],
) -> Result<Vec<DropCandidate>> {
    let mut safe_to_drop: HashMap<&str, &str> = HashMap::new();
    for pr in merged {
        if git.is_ancestor(&pr.merge_commit, "HEAD")? {
            debug!(
                "{} already incorporated (merge commit {} is an ancestor of HEAD)",
                pr.head_ref_name, pr.merge_commit
            );
            continue;
        }
        safe_to_drop.insert(&pr.head_ref_name, &pr.merge_commit);
    }

    let candidates: Vec<DropCandidate> = new_commits
        .iter()
        .filter_map(|log| {
            safe_to_drop.get(log.branch.as_str()).map(|merge_commit| DropCandidate {
                log: log.clone(),
                merge_commit: (*merge_commit).to_string(),
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for candidate in &candidates {
        if !seen.insert(candidate.log.branch.as_str()) {
            return Err(StackError::invariant(format!(
                "two local commits both resolve to branch {:?}; refusing to drop either",
                candidate.log.branch
            )));
        }
    }

    Ok(candidates)
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

    fn log_entry(subject: &str, branch: &str, commit: &str) -> GitLog {
        GitLog {
            short_commit: commit[..7.min(commit.len())].to_string(),
            full_commit: commit.to_string(),
            subject: subject.to_string(),
            branch: branch.to_string(),
        }
    }

    #[test]
    fn test_candidate_only_when_merge_commit_not_yet_incorporated() {
        let (_temp_dir, repo_path) = create_test_repo();
        let git = GitBackend::at(&repo_path);

        // An ancestor of HEAD stands in for an already-incorporated merge;
        // a commit on a side branch stands in for one not yet pulled in.
        let trunk = git.current_branch().unwrap();
        let incorporated = git.head_commit().unwrap();
        git.create_branch("side", "HEAD").unwrap();
        git.switch("side").unwrap();
        std::fs::write(repo_path.join("side.txt"), "side").unwrap();
        git.add_all().unwrap();
        git.commit("Side work").unwrap();
        let unincorporated = git.head_commit().unwrap();
        git.switch(&trunk).unwrap();

        let new_commits = vec![
            log_entry("First", "user/first", "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
            log_entry("Second", "user/second", "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"),
        ];
        let merged = vec![
            MergedPullRequest {
                head_ref_name: "user/first".to_string(),
                merge_commit: unincorporated.clone(),
            },
            MergedPullRequest {
                head_ref_name: "user/second".to_string(),
                merge_commit: incorporated,
            },
        ];

        let candidates = merged_candidates(&git, &new_commits, &merged).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].log.branch, "user/first");
        assert_eq!(candidates[0].merge_commit, unincorporated);
    }

    #[test]
    fn test_duplicate_branch_names_are_fatal() {
        let (_temp_dir, repo_path) = create_test_repo();
        let git = GitBackend::at(&repo_path);

        let trunk = git.current_branch().unwrap();
        git.create_branch("side", "HEAD").unwrap();
        git.switch("side").unwrap();
        std::fs::write(repo_path.join("side.txt"), "side").unwrap();
        git.add_all().unwrap();
        git.commit("Side work").unwrap();
        let unincorporated = git.head_commit().unwrap();
        git.switch(&trunk).unwrap();

        let new_commits = vec![
            log_entry("Same subject", "user/same", "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
            log_entry("Same subject", "user/same", "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"),
        ];
        let merged = vec![MergedPullRequest {
            head_ref_name: "user/same".to_string(),
            merge_commit: unincorporated,
        }];

        let err = merged_candidates(&git, &new_commits, &merged).unwrap_err();
        assert!(matches!(err, StackError::Invariant(_)));
    }

    #[test]
    fn test_no_merged_prs_means_no_candidates() {
        let (_temp_dir, repo_path) = create_test_repo();
        let git = GitBackend::at(&repo_path);

        let new_commits = vec![log_entry(
            "First",
            "user/first",
            "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
        )];
        let candidates = merged_candidates(&git, &new_commits, &[]).unwrap();
        assert!(candidates.is_empty());
    }
}
