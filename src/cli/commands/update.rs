use crate::cli::commands::CommandEnv;
use crate::errors::{StackError, Result};
use crate::git::GitLog;
use crate::stack::{IndicatorResolver, IndicatorType, StackedDiffOrchestrator};

/// Fold fixup commits into a tracked commit's branch and trunk position
pub async fn run(
    indicator: String,
    indicator_type: IndicatorType,
    fixups: Vec<String>,
) -> Result<()> {
    let env = CommandEnv::discover()?;
    let namer = env.namer()?;
    let resolver = IndicatorResolver::new(&env.git, &env.host, &env.ctx, &namer);

    let target = resolver.resolve(&indicator, indicator_type).await?;
    let new_commits = resolver.new_commits()?;

    let fixup_logs = if fixups.is_empty() {
        // No explicit fixups: the commit just made at HEAD is the fixup.
        let head = new_commits
            .first()
            .cloned()
            .ok_or_else(|| StackError::user("no commits stacked on the trunk to use as a fixup"))?;
        vec![head]
    } else {
        let mut logs = Vec::with_capacity(fixups.len());
        for fixup in &fixups {
            let hash = env
                .git
                .rev_parse(fixup)
                .map_err(|_| StackError::user(format!("no such commit: {fixup}")))?;
            let log = new_commits
                .iter()
                .find(|c| c.full_commit == hash)
                .cloned()
                .ok_or_else(|| {
                    StackError::user(format!("fixup {fixup} is not stacked on the trunk"))
                })?;
            logs.push(log);
        }
        logs
    };

    if fixup_logs
        .iter()
        .any(|f: &GitLog| f.full_commit == target.commit_hash)
    {
        return Err(StackError::user(
            "a commit cannot be a fixup of itself; pick an earlier target",
        ));
    }

    let orchestrator = StackedDiffOrchestrator::new(&env.git, &env.host, &env.ctx, &namer);
    orchestrator.update(&target, &fixup_logs).await
}
