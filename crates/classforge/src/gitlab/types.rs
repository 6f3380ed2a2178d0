//! GitLab API data types.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// GitLab project - fields we need from the API response.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabProject {
    pub id: u64,
    pub name: String,
    /// Full path including namespace (e.g., "group/subgroup/project").
    pub path_with_namespace: String,
    /// `None` for empty repositories.
    pub default_branch: Option<String>,
    /// Visibility level: "public", "private", or "internal".
    #[serde(default)]
    pub visibility: String,
    pub created_at: Option<DateTime<Utc>>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub namespace: GitLabNamespace,
    pub web_url: String,
    /// HTTPS clone URL.
    pub http_url_to_repo: Option<String>,
}

/// GitLab namespace (group or user).
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabNamespace {
    pub id: u64,
    /// Full path (e.g., "group/subgroup").
    pub full_path: String,
    /// Kind: "group" or "user".
    pub kind: String,
}

/// GitLab group information.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabGroup {
    pub id: u64,
    pub name: String,
    /// Full path (e.g., "parent/child").
    pub full_path: String,
    pub description: Option<String>,
    #[serde(default)]
    pub visibility: String,
    pub parent_id: Option<u64>,
}

/// GitLab user information.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabUser {
    pub id: u64,
    pub username: String,
    pub name: Option<String>,
    /// Only returned to administrators and to the user themselves.
    pub email: Option<String>,
    #[serde(default)]
    pub public_email: Option<String>,
    /// "active", "blocked", "deactivated", ...
    pub state: Option<String>,
}

/// Author reference embedded in merge requests.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabUserRef {
    pub username: String,
}

/// GitLab merge request.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabMergeRequest {
    pub iid: u64,
    pub project_id: u64,
    pub title: String,
    pub description: Option<String>,
    /// "opened", "closed", "locked" or "merged".
    pub state: String,
    pub source_branch: String,
    pub target_branch: String,
    pub author: GitLabUserRef,
    pub web_url: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Response to a repository file creation.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabFileCreated {
    pub file_path: String,
    pub branch: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitLabBranch {
    pub commit: GitLabCommit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitLabCommit {
    pub id: String,
}

/// Minimal namespace lookup result.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabNamespaceRef {
    pub id: u64,
}
