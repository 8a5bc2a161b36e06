pub mod branch_name;
pub mod checkout;
pub mod code_owners;
pub mod log;
pub mod new;
pub mod plan_edit;
pub mod prs;
pub mod rebase_main;
pub mod replace;
pub mod reviewers;
pub mod update;
pub mod version;

use crate::config::{RepoContext, Settings};
use crate::errors::Result;
use crate::git::GitBackend;
use crate::host::GhCli;
use crate::stack::BranchNamer;

/// Everything a command needs to talk to the repository and the code host.
/// Built fresh per invocation; the context memoizes repository identity.
pub(crate) struct CommandEnv {
    pub git: GitBackend,
    pub ctx: RepoContext,
    pub host: GhCli,
}

impl CommandEnv {
    pub fn discover() -> Result<Self> {
        let git = GitBackend::discover()?;
        let ctx = RepoContext::new(Settings::load()?);
        let host = GhCli::new(git.root());
        Ok(Self { git, ctx, host })
    }

    pub fn namer(&self) -> Result<BranchNamer> {
        Ok(BranchNamer::from_config(self.ctx.username(&self.git)?))
    }
}
