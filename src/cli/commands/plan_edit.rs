//! Hidden sequence-editor entry points.
//!
//! `git rebase -i` invokes this binary with the rebase plan file path as
//! the final argument; everything before it is the commit ids the
//! orchestrator baked into the editor command line.

use crate::errors::{StackError, Result};
use crate::stack::plan;
use std::path::Path;

/// Rewrite "pick" to "drop" for already-merged commits.
pub fn run_drop(mut args: Vec<String>) -> Result<()> {
    let plan_file = args
        .pop()
        .ok_or_else(|| StackError::user("missing rebase plan file argument"))?;
    if args.is_empty() {
        return Err(StackError::user("no commits to drop"));
    }
    plan::rewrite_plan_file(Path::new(&plan_file), |content| {
        Ok(plan::drop_already_merged(content, &args))
    })
}

/// Move fixup commits behind their target as "fixup" actions.
pub fn run_fixup(target: String, mut args: Vec<String>) -> Result<()> {
    let plan_file = args
        .pop()
        .ok_or_else(|| StackError::user("missing rebase plan file argument"))?;
    if args.is_empty() {
        return Err(StackError::user("no fixup commits given"));
    }
    plan::rewrite_plan_file(Path::new(&plan_file), |content| {
        plan::mark_as_fixup(content, &target, &args)
    })
}
