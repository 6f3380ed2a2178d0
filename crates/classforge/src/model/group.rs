use serde::{Deserialize, Serialize};

use super::id::ResourceId;
use super::visibility::Visibility;

/// A group (GitLab) or organization (GitHub).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub id: ResourceId,
    pub name: String,
    /// Full path used to address the group (e.g. `college/cs101`).
    pub full_path: String,
    pub description: Option<String>,
    /// Parent group.
    ///
    /// Only populated by backends whose capabilities declare
    /// `nested_groups`; flat providers always report `None`.
    pub parent: Option<ResourceId>,
    pub visibility: Visibility,
}

/// Membership level granted when adding a user to a group.
///
/// Levels follow GitLab's ordering; providers with coarser roles map each
/// level to their closest role.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Guest,
    Reporter,
    #[default]
    Developer,
    Maintainer,
    Owner,
}

impl AccessLevel {
    /// GitLab numeric access level.
    #[must_use]
    pub fn gitlab_level(self) -> u32 {
        match self {
            AccessLevel::Guest => 10,
            AccessLevel::Reporter => 20,
            AccessLevel::Developer => 30,
            AccessLevel::Maintainer => 40,
            AccessLevel::Owner => 50,
        }
    }

    /// Parse a GitLab numeric access level.
    #[must_use]
    pub fn from_gitlab_level(level: u32) -> Option<Self> {
        match level {
            10 => Some(AccessLevel::Guest),
            20 => Some(AccessLevel::Reporter),
            30 => Some(AccessLevel::Developer),
            40 => Some(AccessLevel::Maintainer),
            50 => Some(AccessLevel::Owner),
            _ => None,
        }
    }
}
