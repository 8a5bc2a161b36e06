//! Code-hosting service module
//!
//! The orchestrator never talks to the code host directly; it goes through
//! the `CodeHostingService` trait. The production implementation drives the
//! `gh` CLI with JSON field queries.

pub mod gh;
pub mod types;

pub use gh::GhCli;
pub use types::{
    CheckSummary, CreatePullRequest, MergedPullRequest, PrCommit, PullRequestInfo,
    PullRequestListing,
};

use crate::errors::{StackError, Result};
use async_trait::async_trait;

/// Pull-request operations the stacked-diff engine needs from a code host.
#[async_trait]
pub trait CodeHostingService: Send + Sync {
    /// Create a pull request and return its final state.
    async fn create_pr(&self, request: &CreatePullRequest) -> Result<PullRequestInfo>;

    /// Look up a pull request by number, URL, or head branch.
    async fn view_pr(&self, selector: &str) -> Result<PullRequestInfo>;

    /// The commits on a pull request, oldest first.
    async fn pr_commits(&self, selector: &str) -> Result<Vec<PrCommit>>;

    /// Update a pull request's title and/or body.
    async fn edit_pr(&self, selector: &str, title: Option<&str>, body: Option<&str>)
        -> Result<()>;

    /// Flip a draft pull request to ready-for-review.
    async fn mark_ready(&self, selector: &str) -> Result<()>;

    /// Request reviews from the given users.
    async fn add_reviewers(&self, selector: &str, reviewers: &[String]) -> Result<()>;

    /// Merged pull requests authored by the current user, paired with their
    /// merge commits.
    async fn merged_prs(&self) -> Result<Vec<MergedPullRequest>>;

    /// Open pull requests authored by the current user, with check rollups.
    async fn list_open_prs(&self) -> Result<Vec<PullRequestListing>>;

    /// Summarize the check rollup for a pull request.
    async fn check_summary(&self, selector: &str) -> Result<CheckSummary>;
}

/// Whether a PR-creation failure is the host rejecting the draft flag
/// (some plans don't allow draft pull requests); creation is retried once
/// without the flag in that case.
pub fn is_draft_rejection(err: &StackError) -> bool {
    match err {
        StackError::Operation(msg) | StackError::Tool(msg) => {
            let msg = msg.to_ascii_lowercase();
            msg.contains("draft pull request") && msg.contains("not supported")
        }
        _ => false,
    }
}
