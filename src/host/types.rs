use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A pull request as reported by the code host.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestInfo {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub head_ref_name: String,
    pub state: String,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
}

impl PullRequestInfo {
    pub fn is_merged(&self) -> bool {
        self.state.eq_ignore_ascii_case("merged") || self.merged_at.is_some()
    }
}

/// One commit inside a pull request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrCommit {
    pub oid: String,
    pub message_headline: String,
}

/// A merged pull request paired with the commit the merge produced on the
/// trunk. This is what merged-commit detection consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedPullRequest {
    pub head_ref_name: String,
    pub merge_commit: String,
}

/// Request payload for creating a pull request.
#[derive(Debug, Clone)]
pub struct CreatePullRequest {
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
    pub draft: bool,
}

/// Summary over a pull request's check rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckSummary {
    /// Every check concluded successfully (or there are no checks)
    Passing,
    /// At least one check concluded with a failure
    Failing,
    /// Checks are still running or queued
    Pending,
}

impl std::fmt::Display for CheckSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckSummary::Passing => write!(f, "passing"),
            CheckSummary::Failing => write!(f, "failing"),
            CheckSummary::Pending => write!(f, "pending"),
        }
    }
}

/// An open pull request row for the `prs` listing.
#[derive(Debug, Clone)]
pub struct PullRequestListing {
    pub info: PullRequestInfo,
    pub checks: CheckSummary,
}
