use crate::errors::{StackError, Result};
use crate::git::GitBackend;
use crate::stack::BranchNamer;

/// One commit stacked on top of the remote trunk, paired with the branch
/// name it deterministically maps to. Recomputed on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitLog {
    pub short_commit: String,
    pub full_commit: String,
    pub subject: String,
    pub branch: String,
}

const FIELD_SEP: char = '\u{1f}';

/// The commits in `upstream..HEAD`, newest first (index 1 = HEAD).
///
/// Branch names are re-derived from each commit's sanitized subject rather
/// than looked up anywhere; determinism of the namer is what keeps the
/// commit↔branch mapping stable across invocations.
pub fn new_commits(git: &GitBackend, namer: &BranchNamer, upstream: &str) -> Result<Vec<GitLog>> {
    let range = format!("{upstream}..HEAD");
    let out = git.run(&["log", "--format=%h%x1f%H%x1f%s", &range])?;

    let mut commits = Vec::new();
    for line in out.lines() {
        if line.is_empty() {
            continue;
        }
        let mut parts = line.splitn(3, FIELD_SEP);
        let (short, full, subject) = match (parts.next(), parts.next(), parts.next()) {
            (Some(s), Some(f), Some(subj)) => (s, f, subj),
            _ => {
                return Err(StackError::tool(format!(
                    "unexpected git log line: {line:?}"
                )))
            }
        };
        commits.push(GitLog {
            short_commit: short.to_string(),
            full_commit: full.to_string(),
            subject: subject.to_string(),
            branch: namer.branch_name(&BranchNamer::sanitize_subject(subject)),
        });
    }
    Ok(commits)
}
