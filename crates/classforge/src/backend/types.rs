use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::capability::{Capabilities, Capability};
use crate::model::{
    AccessLevel, CommitRef, Group, MergeRequest, Repository, ResourceId, User, Visibility,
};
use crate::settings::BackendDefaults;

use super::errors::{BackendError, Result};

/// Default number of items requested per page.
pub const DEFAULT_PER_PAGE: u32 = 50;

/// Largest page size any supported provider accepts.
pub const MAX_PER_PAGE: u32 = 100;

/// Token credentials used to authenticate against a provider.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Outcome of a successful authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthResult {
    pub backend_type: String,
    /// The account the credentials belong to.
    pub user: User,
    pub authenticated_at: DateTime<Utc>,
}

/// Pagination parameters for list operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Opaque cursor returned by the previous page; `None` for the first page.
    pub cursor: Option<String>,
    pub per_page: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            cursor: None,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PageRequest {
    /// First page with `per_page` items.
    #[must_use]
    pub fn first(per_page: u32) -> Self {
        Self {
            cursor: None,
            per_page,
        }
    }

    #[must_use]
    pub fn at(cursor: Option<String>, per_page: u32) -> Self {
        Self { cursor, per_page }
    }

    /// Page size clamped to what providers accept.
    #[must_use]
    pub fn effective_per_page(&self) -> u32 {
        self.per_page.clamp(1, MAX_PER_PAGE)
    }
}

/// One page of a list operation.
///
/// A page never hides truncation: when more items exist, `next_cursor` is
/// set and [`Page::has_more`] is true.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
    /// Total number of items, when the provider reports it.
    pub total: Option<usize>,
}

impl<T> Page<T> {
    #[must_use]
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_cursor: None,
            total: None,
        }
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }
}

/// Optional settings for repository creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryOptions {
    pub description: Option<String>,
    /// Group or organization to create the repository in. Falls back to the
    /// backend's configured namespace, then to the authenticated user.
    pub namespace: Option<String>,
    /// Create an initial commit with a README.
    pub initialize_readme: bool,
}

/// Filter for [`Backend::list_repositories`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryFilter {
    /// Only repositories in this group or organization.
    pub namespace: Option<String>,
    /// Provider-side name search.
    pub search: Option<String>,
    pub page: PageRequest,
}

/// Parameters for [`Backend::create_user`].
#[derive(Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub name: String,
    /// Initial password. When `None` the provider sends a reset link.
    pub password: Option<String>,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Parameters for [`Backend::create_group`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewGroup {
    pub name: String,
    /// URL path; derived from `name` when omitted.
    pub path: Option<String>,
    pub description: Option<String>,
    pub visibility: Visibility,
    /// Parent group path or identifier. Requires `nested_groups`.
    pub parent: Option<String>,
}

impl NewGroup {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// The explicit path, or a slug derived from the name.
    #[must_use]
    pub fn effective_path(&self) -> String {
        match &self.path {
            Some(path) => path.clone(),
            None => slugify(&self.name),
        }
    }
}

/// Lowercase, dash-separated slug of `name`.
pub(crate) fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

/// Reject empty or whitespace-only required input.
pub fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(BackendError::validation(format!("{} must not be empty", field)))
    } else {
        Ok(())
    }
}

/// Trait implemented by every git hosting backend.
///
/// This is the only surface collaborators use; provider types are never
/// called directly.
///
/// # Contract
///
/// - Operations gated by a [`Capability`] check the descriptor first and
///   fail with `UnsupportedCapability` without touching the network.
/// - Identifiers passed in must have been issued by this same instance
///   (see [`Backend::native`]); foreign identifiers are a validation error.
/// - [`Backend::authenticate`] is idempotent for identical credentials.
/// - List operations return a [`Page`] that signals when more items exist.
/// - Transient failures are retried inside the backend according to its
///   retry policy; every other error is returned immediately.
///
/// Implementations must be safe to share between tasks for concurrent
/// reads. Concurrent mutations of the same resource are not ordered.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Registered type name (e.g. "gitlab").
    fn backend_type(&self) -> &str;

    /// Unique identifier of this backend instance.
    fn instance_id(&self) -> Uuid;

    fn capabilities(&self) -> &Capabilities;

    /// Defaults from the configuration document.
    fn defaults(&self) -> &BackendDefaults;

    /// Wrap a raw provider identifier as native to this instance.
    fn adopt_id(&self, raw: &str) -> ResourceId {
        ResourceId::new(self.backend_type(), self.instance_id(), raw)
    }

    /// Return the native value of `id`, rejecting identifiers issued by a
    /// different backend instance.
    fn native<'a>(&self, id: &'a ResourceId) -> Result<&'a str> {
        if id.instance_id != self.instance_id() || id.backend_type != self.backend_type() {
            return Err(BackendError::validation(format!(
                "identifier {} belongs to a different backend instance ({} {})",
                id.value, id.backend_type, id.instance_id
            )));
        }
        require_non_empty("identifier", &id.value)?;
        Ok(&id.value)
    }

    /// Fail unless `capability` is supported.
    fn require(&self, capability: Capability) -> Result<()> {
        self.capabilities().require(capability, self.backend_type())
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthResult>;

    async fn create_repository(
        &self,
        name: &str,
        visibility: Visibility,
        options: &RepositoryOptions,
    ) -> Result<Repository>;

    async fn get_repository(&self, id: &ResourceId) -> Result<Repository>;

    async fn list_repositories(&self, filter: &RepositoryFilter) -> Result<Page<Repository>>;

    async fn fork_repository(
        &self,
        id: &ResourceId,
        target_namespace: Option<&str>,
    ) -> Result<Repository>;

    async fn delete_repository(&self, id: &ResourceId) -> Result<()>;

    async fn create_user(&self, user: &NewUser) -> Result<User>;

    async fn get_user(&self, id: &ResourceId) -> Result<User>;

    async fn list_users(&self, page: &PageRequest) -> Result<Page<User>>;

    async fn create_group(&self, group: &NewGroup) -> Result<Group>;

    async fn get_group(&self, id: &ResourceId) -> Result<Group>;

    async fn list_groups(&self, page: &PageRequest) -> Result<Page<Group>>;

    async fn add_user_to_group(
        &self,
        group: &ResourceId,
        user: &ResourceId,
        access: AccessLevel,
    ) -> Result<()>;

    /// Commit a new file to the repository's default branch.
    async fn create_file(
        &self,
        repo: &ResourceId,
        path: &str,
        content: &str,
        commit_message: &str,
    ) -> Result<CommitRef>;

    async fn create_merge_request(
        &self,
        repo: &ResourceId,
        source_branch: &str,
        target_branch: &str,
        title: &str,
    ) -> Result<MergeRequest>;
}
