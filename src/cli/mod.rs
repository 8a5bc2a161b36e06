pub mod commands;
pub mod output;

use crate::errors::Result;
use crate::stack::IndicatorType;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "sd")]
#[command(about = "Stacked diffs for git + GitHub")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// How to interpret a commit indicator. The default guesses from shape:
/// short numbers are list positions, medium numbers are PR numbers,
/// anything else is a commit.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum IndicatorKind {
    Guess,
    Commit,
    Pr,
    List,
}

impl From<IndicatorKind> for IndicatorType {
    fn from(kind: IndicatorKind) -> Self {
        match kind {
            IndicatorKind::Guess => IndicatorType::Guess,
            IndicatorKind::Commit => IndicatorType::Commit,
            IndicatorKind::Pr => IndicatorType::Pr,
            IndicatorKind::List => IndicatorType::List,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a branch and pull request for a stacked commit
    New {
        /// Commit indicator (defaults to HEAD)
        #[arg(default_value = "HEAD")]
        indicator: String,

        /// Force how the indicator is interpreted
        #[arg(long = "indicator", value_enum, default_value_t = IndicatorKind::Guess)]
        indicator_type: IndicatorKind,

        /// Base the branch on this ref instead of the remote trunk
        #[arg(long)]
        base: Option<String>,

        /// Create the pull request as a draft
        #[arg(long)]
        draft: bool,
    },

    /// Fold fixup commits into a tracked commit's branch and trunk position
    Update {
        /// Indicator of the commit being fixed up
        indicator: String,

        /// Fixup commits to fold in (defaults to HEAD)
        fixups: Vec<String>,

        /// Force how the indicator is interpreted
        #[arg(long = "indicator", value_enum, default_value_t = IndicatorKind::Guess)]
        indicator_type: IndicatorKind,
    },

    /// Replace a trunk commit with the contents of its branch
    ReplaceCommit {
        /// Commit indicator
        indicator: String,

        /// Force how the indicator is interpreted
        #[arg(long = "indicator", value_enum, default_value_t = IndicatorKind::Guess)]
        indicator_type: IndicatorKind,
    },

    /// Resolve the current rebase conflict from the commit's branch
    ReplaceConflicts,

    /// Rebase the trunk, dropping commits whose PRs already merged
    RebaseMain,

    /// Switch to the branch for a commit indicator
    Checkout {
        /// Commit indicator (empty means the trunk)
        #[arg(default_value = "")]
        indicator: String,

        /// Force how the indicator is interpreted
        #[arg(long = "indicator", value_enum, default_value_t = IndicatorKind::Guess)]
        indicator_type: IndicatorKind,
    },

    /// List the commits stacked on top of the remote trunk
    Log,

    /// Print the branch name for a commit indicator
    BranchName {
        /// Commit indicator
        indicator: String,

        /// Force how the indicator is interpreted
        #[arg(long = "indicator", value_enum, default_value_t = IndicatorKind::Guess)]
        indicator_type: IndicatorKind,
    },

    /// Wait for checks, then mark PRs ready and request reviews
    AddReviewers {
        /// Commit indicators to watch
        #[arg(required = true)]
        indicators: Vec<String>,

        /// Reviewers to add (defaults to configured default reviewers)
        #[arg(long, short, value_delimiter = ',')]
        reviewers: Vec<String>,

        /// Seconds between checks polls
        #[arg(long)]
        poll_interval: Option<u64>,

        /// Force how the indicators are interpreted
        #[arg(long = "indicator", value_enum, default_value_t = IndicatorKind::Guess)]
        indicator_type: IndicatorKind,
    },

    /// Block until a commit's pull request is merged
    WaitForMerge {
        /// Commit indicator
        indicator: String,

        /// Seconds between merge polls
        #[arg(long)]
        poll_interval: Option<u64>,

        /// Force how the indicator is interpreted
        #[arg(long = "indicator", value_enum, default_value_t = IndicatorKind::Guess)]
        indicator_type: IndicatorKind,
    },

    /// Show code owners for each stacked commit's changed files
    CodeOwners,

    /// List your open pull requests with check status
    Prs,

    /// Show version information
    Version,

    /// Sequence-editor entry point: drop merged picks from a rebase plan
    #[command(hide = true)]
    DropAlreadyMerged {
        /// Commit ids followed by the rebase plan file path
        #[arg(required = true)]
        args: Vec<String>,
    },

    /// Sequence-editor entry point: squash fixups behind their target
    #[command(hide = true)]
    MarkAsFixup {
        /// Target commit id
        target: String,

        /// Fixup commit ids followed by the rebase plan file path
        #[arg(required = true)]
        args: Vec<String>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        self.setup_logging();

        match self.command {
            Commands::New {
                indicator,
                indicator_type,
                base,
                draft,
            } => commands::new::run(indicator, indicator_type.into(), base, draft).await,
            Commands::Update {
                indicator,
                fixups,
                indicator_type,
            } => commands::update::run(indicator, indicator_type.into(), fixups).await,
            Commands::ReplaceCommit {
                indicator,
                indicator_type,
            } => commands::replace::run_commit(indicator, indicator_type.into()).await,
            Commands::ReplaceConflicts => commands::replace::run_conflicts().await,
            Commands::RebaseMain => commands::rebase_main::run().await,
            Commands::Checkout {
                indicator,
                indicator_type,
            } => commands::checkout::run(indicator, indicator_type.into()).await,
            Commands::Log => commands::log::run().await,
            Commands::BranchName {
                indicator,
                indicator_type,
            } => commands::branch_name::run(indicator, indicator_type.into()).await,
            Commands::AddReviewers {
                indicators,
                reviewers,
                poll_interval,
                indicator_type,
            } => {
                commands::reviewers::run_add(indicators, indicator_type.into(), reviewers, poll_interval)
                    .await
            }
            Commands::WaitForMerge {
                indicator,
                poll_interval,
                indicator_type,
            } => {
                commands::reviewers::run_wait(indicator, indicator_type.into(), poll_interval).await
            }
            Commands::CodeOwners => commands::code_owners::run().await,
            Commands::Prs => commands::prs::run().await,
            Commands::Version => commands::version::run().await,
            Commands::DropAlreadyMerged { args } => commands::plan_edit::run_drop(args),
            Commands::MarkAsFixup { target, args } => commands::plan_edit::run_fixup(target, args),
        }
    }

    fn setup_logging(&self) {
        let level = if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        };

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr);

        if self.no_color {
            let _ = subscriber.with_ansi(false).try_init();
        } else {
            let _ = subscriber.try_init();
        }
    }
}
