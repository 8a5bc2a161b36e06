use crate::cli::commands::CommandEnv;
use crate::errors::Result;
use crate::stack::{IndicatorResolver, IndicatorType, StackedDiffOrchestrator};

/// Replace a trunk commit with the contents of its branch
pub async fn run_commit(indicator: String, indicator_type: IndicatorType) -> Result<()> {
    let env = CommandEnv::discover()?;
    let namer = env.namer()?;
    let resolver = IndicatorResolver::new(&env.git, &env.host, &env.ctx, &namer);
    let target = resolver.resolve(&indicator, indicator_type).await?;

    let orchestrator = StackedDiffOrchestrator::new(&env.git, &env.host, &env.ctx, &namer);
    orchestrator.replace_commit(&target)
}

/// Resolve the current rebase conflict from the stopped commit's branch
pub async fn run_conflicts() -> Result<()> {
    let env = CommandEnv::discover()?;
    let namer = env.namer()?;
    let orchestrator = StackedDiffOrchestrator::new(&env.git, &env.host, &env.ctx, &namer);
    orchestrator.replace_conflicts()
}
