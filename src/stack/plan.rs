//! Rebase-plan rewriting for the sequence-editor re-entry protocol.
//!
//! `git rebase -i` invokes this program as its sequence editor with the
//! plan file path as the last argument. Both rewriters work on "pick"
//! lines only, preserve the plan's line count, and are idempotent: running
//! them again over an already-rewritten plan changes nothing.

use crate::errors::{StackError, Result};
use std::fs;
use std::path::Path;

/// A hash in a rebase plan may be abbreviated differently from the one we
/// were handed; either may be a prefix of the other.
fn hash_matches(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && (a.starts_with(b) || b.starts_with(a))
}

fn line_commit(line: &str) -> Option<(&str, &str)> {
    let mut parts = line.splitn(3, ' ');
    let action = parts.next()?;
    let commit = parts.next()?;
    Some((action, commit))
}

/// Rewrite "pick" to "drop" for every listed commit. Lenient about commits
/// missing from the plan: git itself removes already-applied picks when
/// their patch is identical, so absence is expected, not an error.
pub fn drop_already_merged(plan: &str, drops: &[String]) -> String {
    let mut out = Vec::new();
    for line in plan.lines() {
        let rewritten = match line_commit(line) {
            Some(("pick", commit)) if drops.iter().any(|d| hash_matches(commit, d)) => {
                line.replacen("pick", "drop", 1)
            }
            _ => line.to_string(),
        };
        out.push(rewritten);
    }
    join_lines(out, plan)
}

/// Move the given fixup commits to sit immediately after the target's pick
/// line, rewritten as "fixup" actions, preserving their given order.
///
/// The target and every fixup must be present in the plan (as "pick", or as
/// an already-moved "fixup" from a previous invocation); a missing commit
/// means the plan does not describe the history this operation was built
/// against, and the rewrite must fail loudly so git aborts the rebase.
pub fn mark_as_fixup(plan: &str, target: &str, fixups: &[String]) -> Result<String> {
    let lines: Vec<&str> = plan.lines().collect();

    let target_at = lines
        .iter()
        .position(|line| matches!(line_commit(line), Some(("pick", c)) if hash_matches(c, target)))
        .ok_or_else(|| {
            StackError::invariant(format!("target commit {target} is not in the rebase plan"))
        })?;

    let mut fixup_lines = Vec::new();
    let mut consumed = vec![false; lines.len()];
    for fixup in fixups {
        let found = lines.iter().enumerate().position(|(i, line)| {
            !consumed[i]
                && i != target_at
                && matches!(
                    line_commit(line),
                    Some(("pick" | "fixup", c)) if hash_matches(c, fixup)
                )
        });
        let index = found.ok_or_else(|| {
            StackError::invariant(format!("fixup commit {fixup} is not in the rebase plan"))
        })?;
        consumed[index] = true;
        fixup_lines.push(lines[index].replacen("pick", "fixup", 1));
    }

    let mut out = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if consumed[i] {
            continue;
        }
        out.push(line.to_string());
        if i == target_at {
            out.extend(fixup_lines.iter().cloned());
        }
    }
    Ok(join_lines(out, plan))
}

fn join_lines(lines: Vec<String>, original: &str) -> String {
    let mut out = lines.join("\n");
    if original.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// File-level wrapper used by the hidden subcommands: read the plan,
/// rewrite it, write it back in place.
pub fn rewrite_plan_file<F>(path: &Path, rewrite: F) -> Result<()>
where
    F: FnOnce(&str) -> Result<String>,
{
    let plan = fs::read_to_string(path)
        .map_err(|e| StackError::tool(format!("could not read rebase plan {}: {e}", path.display())))?;
    let rewritten = rewrite(&plan)?;
    fs::write(path, rewritten)
        .map_err(|e| StackError::tool(format!("could not write rebase plan {}: {e}", path.display())))?;
    Ok(())
}
