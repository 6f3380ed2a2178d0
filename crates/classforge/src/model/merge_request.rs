use chrono::{DateTime, Utc};
use serde::Serialize;

use super::id::ResourceId;

/// Lifecycle state of a merge request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeRequestState {
    Open,
    Merged,
    Closed,
}

/// A GitLab merge request or GitHub pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeRequest {
    pub id: ResourceId,
    /// Repository the request targets.
    pub repository: ResourceId,
    /// Per-repository number (GitLab `iid`, GitHub PR number).
    pub number: u64,
    pub source_branch: String,
    pub target_branch: String,
    pub title: String,
    pub description: Option<String>,
    pub state: MergeRequestState,
    /// Login of the author.
    pub author: String,
    pub web_url: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
