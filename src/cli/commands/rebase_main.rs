use crate::cli::commands::CommandEnv;
use crate::errors::Result;
use crate::stack::StackedDiffOrchestrator;

/// Rebase the trunk, dropping commits whose pull requests already merged
pub async fn run() -> Result<()> {
    let env = CommandEnv::discover()?;
    let namer = env.namer()?;
    let orchestrator = StackedDiffOrchestrator::new(&env.git, &env.host, &env.ctx, &namer);
    orchestrator.rebase_main().await
}
