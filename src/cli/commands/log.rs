use crate::cli::commands::CommandEnv;
use crate::cli::output::Output;
use crate::errors::Result;
use crate::stack::IndicatorResolver;
use console::style;

/// List the commits stacked on top of the remote trunk, newest first.
/// Commits with a published branch are marked; the 1-based position is the
/// list indicator other commands accept.
pub async fn run() -> Result<()> {
    let env = CommandEnv::discover()?;
    let namer = env.namer()?;
    let resolver = IndicatorResolver::new(&env.git, &env.host, &env.ctx, &namer);

    let commits = resolver.new_commits()?;
    if commits.is_empty() {
        Output::info(format!(
            "no commits stacked on top of {}",
            env.ctx.remote_trunk(&env.git)?
        ));
        return Ok(());
    }

    for (position, commit) in commits.iter().enumerate() {
        let published = env.git.local_branch_exists(&commit.branch)?
            || env.git.remote_branch_exists(env.ctx.remote(), &commit.branch)?;
        let marker = if published {
            style("✓").green().to_string()
        } else {
            " ".to_string()
        };
        println!(
            "{:>2}. {} {} {}",
            position + 1,
            marker,
            style(&commit.short_commit).yellow(),
            commit.subject
        );
    }
    Ok(())
}
