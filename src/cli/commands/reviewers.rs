use crate::cli::commands::CommandEnv;
use crate::cli::output::Output;
use crate::errors::{StackError, Result};
use crate::host::{CheckSummary, CodeHostingService, GhCli};
use crate::stack::{IndicatorResolver, IndicatorType};
use crate::utils::spinner::Spinner;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Wait for each target's checks to pass, then mark its PR ready and
/// request reviews.
///
/// One polling task per target commit. A failing target kills only its own
/// task; the command joins every task before reporting.
pub async fn run_add(
    indicators: Vec<String>,
    indicator_type: IndicatorType,
    reviewers: Vec<String>,
    poll_interval: Option<u64>,
) -> Result<()> {
    let env = CommandEnv::discover()?;
    let namer = env.namer()?;

    let reviewers = if reviewers.is_empty() {
        env.ctx.settings().default_reviewers.clone()
    } else {
        reviewers
    };
    if reviewers.is_empty() {
        return Err(StackError::user(
            "no reviewers given and none configured as default_reviewers",
        ));
    }
    let interval = Duration::from_secs(
        poll_interval.unwrap_or(env.ctx.settings().poll_interval_secs),
    );

    let resolver = IndicatorResolver::new(&env.git, &env.host, &env.ctx, &namer);
    let mut branches = Vec::with_capacity(indicators.len());
    for indicator in &indicators {
        let info = resolver.resolve(indicator, indicator_type).await?;
        branches.push(info.branch_name);
    }

    let host = Arc::new(GhCli::new(env.git.root()));
    let mut handles = Vec::with_capacity(branches.len());
    for branch in branches {
        let host = Arc::clone(&host);
        let reviewers = reviewers.clone();
        handles.push(tokio::spawn(async move {
            let outcome = watch_and_add(host, &branch, &reviewers, interval).await;
            (branch, outcome)
        }));
    }

    let spinner = Spinner::new("waiting for checks...".to_string());
    let mut failures = 0usize;
    for handle in handles {
        let (branch, outcome) = handle
            .await
            .map_err(|e| StackError::tool(format!("polling task panicked: {e}")))?;
        match outcome {
            Ok(()) => spinner.println(format!("✓ reviewers requested on {branch}")),
            Err(err) => {
                failures += 1;
                spinner.println(format!("✗ {branch}: {err}"));
            }
        }
    }
    spinner.finish();

    if failures > 0 {
        return Err(StackError::operation(format!(
            "{failures} target(s) did not get reviewers"
        )));
    }
    Output::success("all targets ready for review");
    Ok(())
}

async fn watch_and_add(
    host: Arc<GhCli>,
    branch: &str,
    reviewers: &[String],
    interval: Duration,
) -> Result<()> {
    loop {
        match host.check_summary(branch).await? {
            CheckSummary::Passing => break,
            CheckSummary::Failing => {
                return Err(StackError::operation(format!(
                    "checks are failing for {branch}"
                )));
            }
            CheckSummary::Pending => tokio::time::sleep(interval).await,
        }
    }

    let pr = host.view_pr(branch).await?;
    if pr.is_draft {
        host.mark_ready(branch).await?;
        info!("marked PR #{} ready for review", pr.number);
    }
    host.add_reviewers(branch, reviewers).await?;
    Ok(())
}

/// Block until a commit's pull request is merged.
pub async fn run_wait(
    indicator: String,
    indicator_type: IndicatorType,
    poll_interval: Option<u64>,
) -> Result<()> {
    let env = CommandEnv::discover()?;
    let namer = env.namer()?;
    let resolver = IndicatorResolver::new(&env.git, &env.host, &env.ctx, &namer);
    let info = resolver.resolve(&indicator, indicator_type).await?;
    let interval = Duration::from_secs(
        poll_interval.unwrap_or(env.ctx.settings().poll_interval_secs),
    );

    let spinner = Spinner::new(format!("waiting for {} to merge...", info.branch_name));
    loop {
        let pr = env.host.view_pr(&info.branch_name).await?;
        spinner.set_message(format!(
            "waiting for PR #{} to merge ({})...",
            pr.number,
            pr.state.to_lowercase()
        ));
        if pr.is_merged() {
            spinner.finish();
            Output::success(format!("PR #{} merged", pr.number));
            return Ok(());
        }
        if pr.state.eq_ignore_ascii_case("closed") {
            spinner.finish();
            return Err(StackError::operation(format!(
                "PR #{} was closed without merging",
                pr.number
            )));
        }
        tokio::time::sleep(interval).await;
    }
}
