use crate::cli::commands::CommandEnv;
use crate::cli::output::Output;
use crate::errors::{StackError, Result};
use crate::stack::{IndicatorResolver, IndicatorType};

/// Switch to the branch associated with a commit indicator. An empty
/// indicator goes back to the trunk.
pub async fn run(indicator: String, indicator_type: IndicatorType) -> Result<()> {
    let env = CommandEnv::discover()?;
    let namer = env.namer()?;
    let resolver = IndicatorResolver::new(&env.git, &env.host, &env.ctx, &namer);
    let info = resolver.resolve(&indicator, indicator_type).await?;

    if !env.git.local_branch_exists(&info.branch_name)? {
        // The branch may only exist on the remote (e.g. created from
        // another machine); fetching makes switch's tracking logic find it.
        let exit = env.git.fetch(env.ctx.remote(), &info.branch_name)?;
        if !exit.success && !env.git.remote_branch_exists(env.ctx.remote(), &info.branch_name)? {
            return Err(StackError::user(format!(
                "branch {:?} does not exist locally or on {}",
                info.branch_name,
                env.ctx.remote()
            )));
        }
    }

    env.git.switch(&info.branch_name)?;
    Output::success(format!("switched to {}", info.branch_name));
    Ok(())
}
