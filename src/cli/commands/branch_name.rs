use crate::cli::commands::CommandEnv;
use crate::errors::Result;
use crate::stack::{IndicatorResolver, IndicatorType};

/// Print the branch name a commit indicator resolves to. Plain stdout so
/// the output can feed shell substitutions.
pub async fn run(indicator: String, indicator_type: IndicatorType) -> Result<()> {
    let env = CommandEnv::discover()?;
    let namer = env.namer()?;
    let resolver = IndicatorResolver::new(&env.git, &env.host, &env.ctx, &namer);
    let info = resolver.resolve(&indicator, indicator_type).await?;
    println!("{}", info.branch_name);
    Ok(())
}
