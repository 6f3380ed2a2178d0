use serde::Serialize;

use super::id::ResourceId;

/// A user account on any backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: ResourceId,
    /// Login handle.
    pub username: String,
    /// Display name (if available).
    pub name: Option<String>,
    /// Email address.
    ///
    /// `None` means the provider did not disclose it (privacy settings or
    /// missing permissions). It never means the user does not exist.
    pub email: Option<String>,
    /// Whether the account is active (not blocked, suspended or deactivated).
    pub active: bool,
}
