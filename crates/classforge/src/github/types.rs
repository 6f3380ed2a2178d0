//! GitHub API data types.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// GitHub repository - fields we need from the API response.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRepo {
    pub id: u64,
    pub name: String,
    /// `owner/name`.
    pub full_name: String,
    #[serde(default)]
    pub private: bool,
    /// "public", "private" or "internal"; absent on older GHES releases.
    pub visibility: Option<String>,
    pub html_url: String,
    pub clone_url: Option<String>,
    /// `None` for empty repositories.
    pub default_branch: Option<String>,
    pub owner: GitHubAccount,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Owner of a repository.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubAccount {
    pub login: String,
    /// "User" or "Organization".
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// GitHub user information.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    pub id: u64,
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
    /// Set on suspended GHES accounts.
    pub suspended_at: Option<DateTime<Utc>>,
}

/// GitHub organization. `/user/orgs` omits `name`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubOrg {
    pub id: u64,
    pub login: String,
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubBranchRef {
    #[serde(rename = "ref")]
    pub name: String,
}

/// GitHub pull request.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubPull {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    /// "open" or "closed"; merged pulls are closed with `merged_at` set.
    pub state: String,
    pub merged_at: Option<DateTime<Utc>>,
    pub head: GitHubBranchRef,
    pub base: GitHubBranchRef,
    pub user: GitHubAccount,
    pub html_url: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Response of `PUT /repos/{owner}/{repo}/contents/{path}`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubContentWrite {
    pub content: GitHubContentEntry,
    pub commit: GitHubCommitSummary,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubContentEntry {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubCommitSummary {
    pub sha: String,
}
