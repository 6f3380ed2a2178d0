use chrono::{DateTime, Utc};
use serde::Serialize;

use super::id::ResourceId;
use super::visibility::Visibility;

/// Kind of account that owns a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    User,
    Group,
}

/// Reference to the account or group owning a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerRef {
    /// Owner login or full namespace path.
    pub login: String,
    pub kind: OwnerKind,
}

/// A repository on any backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Repository {
    pub id: ResourceId,
    pub name: String,
    /// Fully-qualified name (`namespace/name`).
    pub full_name: String,
    /// HTTPS clone URL.
    pub clone_url: String,
    pub web_url: String,
    pub default_branch: String,
    pub visibility: Visibility,
    pub owner: OwnerRef,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
