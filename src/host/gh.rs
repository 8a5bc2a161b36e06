use crate::errors::{StackError, Result};
use crate::host::types::{
    CheckSummary, CreatePullRequest, MergedPullRequest, PrCommit, PullRequestInfo,
    PullRequestListing,
};
use crate::host::CodeHostingService;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Production code-hosting service: drives the `gh` CLI, querying JSON
/// fields and parsing them with serde.
pub struct GhCli {
    root: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CommitsPayload {
    commits: Vec<PrCommit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MergedRow {
    head_ref_name: String,
    merge_commit: Option<MergeCommit>,
}

#[derive(Debug, Deserialize)]
struct MergeCommit {
    oid: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenPrRow {
    #[serde(flatten)]
    info: PullRequestInfo,
    #[serde(default)]
    status_check_rollup: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RollupPayload {
    #[serde(default)]
    status_check_rollup: Vec<serde_json::Value>,
}

impl GhCli {
    pub fn new(repo_root: &Path) -> Self {
        Self {
            root: repo_root.to_path_buf(),
        }
    }

    fn invoke(&self, args: &[&str]) -> std::result::Result<(bool, String), StackError> {
        debug!("gh {}", args.join(" "));
        let output = Command::new("gh")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    StackError::tool("gh CLI not found: install the GitHub CLI and run gh auth login")
                } else {
                    StackError::tool(format!("could not run gh {}: {e}", args.join(" ")))
                }
            })?;
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str(stderr.trim_end());
        }
        Ok((output.status.success(), combined))
    }

    /// Read-only query; failure is an external-tool error.
    fn query(&self, args: &[&str]) -> Result<String> {
        let (success, output) = self.invoke(args)?;
        if !success {
            return Err(StackError::tool(format!(
                "gh {} failed: {}",
                args.join(" "),
                output.trim()
            )));
        }
        Ok(output)
    }

    /// Mutating call; failure is an operational failure the orchestrator
    /// may roll back from.
    fn mutate(&self, args: &[&str]) -> Result<String> {
        let (success, output) = self.invoke(args)?;
        if !success {
            return Err(StackError::operation(format!(
                "gh {} failed: {}",
                args.join(" "),
                output.trim()
            )));
        }
        Ok(output)
    }

    fn parse<T: for<'de> Deserialize<'de>>(&self, json: &str) -> Result<T> {
        Ok(serde_json::from_str(json)?)
    }
}

const PR_FIELDS: &str = "number,title,url,headRefName,state,isDraft,createdAt,mergedAt";

/// Reduce one rollup entry to a verdict string. Check runs carry a
/// `conclusion` once finished; commit statuses carry a `state`.
fn rollup_verdict(item: &serde_json::Value) -> String {
    for key in ["conclusion", "state", "status"] {
        if let Some(value) = item.get(key).and_then(|v| v.as_str()) {
            if !value.is_empty() {
                return value.to_ascii_uppercase();
            }
        }
    }
    String::new()
}

/// Collapse a check rollup into the single summary the polling loops act
/// on: any failure wins, then any still-running check, then passing.
pub(crate) fn summarize_rollup(items: &[serde_json::Value]) -> CheckSummary {
    let mut pending = false;
    for item in items {
        match rollup_verdict(item).as_str() {
            "FAILURE" | "ERROR" | "TIMED_OUT" | "CANCELLED" | "ACTION_REQUIRED"
            | "STARTUP_FAILURE" => return CheckSummary::Failing,
            "SUCCESS" | "NEUTRAL" | "SKIPPED" => {}
            _ => pending = true,
        }
    }
    if pending {
        CheckSummary::Pending
    } else {
        CheckSummary::Passing
    }
}

#[async_trait]
impl CodeHostingService for GhCli {
    async fn create_pr(&self, request: &CreatePullRequest) -> Result<PullRequestInfo> {
        let mut args: Vec<&str> = vec![
            "pr",
            "create",
            "--head",
            &request.head,
            "--base",
            &request.base,
            "--title",
            &request.title,
            "--body",
            &request.body,
        ];
        if request.draft {
            args.push("--draft");
        }
        self.mutate(&args)?;
        self.view_pr(&request.head).await
    }

    async fn view_pr(&self, selector: &str) -> Result<PullRequestInfo> {
        let json = self.query(&["pr", "view", selector, "--json", PR_FIELDS])?;
        self.parse(&json)
    }

    async fn pr_commits(&self, selector: &str) -> Result<Vec<PrCommit>> {
        let json = self.query(&["pr", "view", selector, "--json", "commits"])?;
        let payload: CommitsPayload = self.parse(&json)?;
        Ok(payload.commits)
    }

    async fn edit_pr(
        &self,
        selector: &str,
        title: Option<&str>,
        body: Option<&str>,
    ) -> Result<()> {
        let mut args = vec!["pr", "edit", selector];
        if let Some(title) = title {
            args.extend(["--title", title]);
        }
        if let Some(body) = body {
            args.extend(["--body", body]);
        }
        if args.len() == 3 {
            return Ok(());
        }
        self.mutate(&args)?;
        Ok(())
    }

    async fn mark_ready(&self, selector: &str) -> Result<()> {
        self.mutate(&["pr", "ready", selector])?;
        Ok(())
    }

    async fn add_reviewers(&self, selector: &str, reviewers: &[String]) -> Result<()> {
        if reviewers.is_empty() {
            return Ok(());
        }
        let mut args = vec!["pr".to_string(), "edit".to_string(), selector.to_string()];
        for reviewer in reviewers {
            args.push("--add-reviewer".to_string());
            args.push(reviewer.clone());
        }
        let borrowed: Vec<&str> = args.iter().map(String::as_str).collect();
        self.mutate(&borrowed)?;
        Ok(())
    }

    async fn merged_prs(&self) -> Result<Vec<MergedPullRequest>> {
        let json = self.query(&[
            "pr",
            "list",
            "--author",
            "@me",
            "--state",
            "merged",
            "--limit",
            "100",
            "--json",
            "headRefName,mergeCommit",
        ])?;
        let rows: Vec<MergedRow> = self.parse(&json)?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                row.merge_commit.map(|mc| MergedPullRequest {
                    head_ref_name: row.head_ref_name,
                    merge_commit: mc.oid,
                })
            })
            .collect())
    }

    async fn list_open_prs(&self) -> Result<Vec<PullRequestListing>> {
        let fields = format!("{PR_FIELDS},statusCheckRollup");
        let json = self.query(&[
            "pr", "list", "--author", "@me", "--state", "open", "--json", &fields,
        ])?;
        let rows: Vec<OpenPrRow> = self.parse(&json)?;
        Ok(rows
            .into_iter()
            .map(|row| PullRequestListing {
                checks: summarize_rollup(&row.status_check_rollup),
                info: row.info,
            })
            .collect())
    }

    async fn check_summary(&self, selector: &str) -> Result<CheckSummary> {
        let json = self.query(&["pr", "view", selector, "--json", "statusCheckRollup"])?;
        let payload: RollupPayload = self.parse(&json)?;
        Ok(summarize_rollup(&payload.status_check_rollup))
    }
}
