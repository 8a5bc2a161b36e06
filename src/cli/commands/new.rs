use crate::cli::commands::CommandEnv;
use crate::errors::{StackError, Result};
use crate::stack::{IndicatorResolver, IndicatorType, StackedDiffOrchestrator};

/// Create a branch and pull request for one stacked commit
pub async fn run(
    indicator: String,
    indicator_type: IndicatorType,
    base: Option<String>,
    draft: bool,
) -> Result<()> {
    if indicator.trim().is_empty() {
        return Err(StackError::user("new needs a commit indicator"));
    }

    let env = CommandEnv::discover()?;
    let namer = env.namer()?;
    let resolver = IndicatorResolver::new(&env.git, &env.host, &env.ctx, &namer);
    let info = resolver.resolve(&indicator, indicator_type).await?;

    let orchestrator = StackedDiffOrchestrator::new(&env.git, &env.host, &env.ctx, &namer);
    orchestrator.new_branch(&info, base.as_deref(), draft).await
}
