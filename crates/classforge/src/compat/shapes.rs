//! Response payloads in the shape legacy call sites expect.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::backend::{BackendError, ErrorKind};
use crate::model::{
    CommitRef, Group, MergeRequest, MergeRequestState, OwnerKind, Repository, User, Visibility,
};

/// Namespace block of a [`LegacyProject`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegacyNamespace {
    pub full_path: String,
    /// "user" or "group".
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegacyProject {
    pub id: String,
    pub name: String,
    pub path_with_namespace: String,
    pub http_url_to_repo: String,
    pub web_url: String,
    pub default_branch: String,
    pub visibility: Visibility,
    pub namespace: LegacyNamespace,
    pub created_at: Option<DateTime<Utc>>,
    pub last_activity_at: Option<DateTime<Utc>>,
}

impl From<Repository> for LegacyProject {
    fn from(repo: Repository) -> Self {
        let kind = match repo.owner.kind {
            OwnerKind::User => "user",
            OwnerKind::Group => "group",
        };

        Self {
            id: repo.id.value,
            name: repo.name,
            path_with_namespace: repo.full_name,
            http_url_to_repo: repo.clone_url,
            web_url: repo.web_url,
            default_branch: repo.default_branch,
            visibility: repo.visibility,
            namespace: LegacyNamespace {
                full_path: repo.owner.login,
                kind: kind.to_string(),
            },
            created_at: repo.created_at,
            last_activity_at: repo.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegacyUser {
    pub id: String,
    pub username: String,
    /// Empty when the provider reports no display name.
    pub name: String,
    pub email: Option<String>,
    /// "active" or "blocked".
    pub state: String,
}

impl From<User> for LegacyUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id.value,
            name: user.name.unwrap_or_default(),
            username: user.username,
            email: user.email,
            state: if user.active { "active" } else { "blocked" }.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegacyGroup {
    pub id: String,
    pub name: String,
    /// Last segment of `full_path`.
    pub path: String,
    pub full_path: String,
    /// Empty when the group has no description.
    pub description: String,
    pub visibility: Visibility,
    pub parent_id: Option<String>,
}

impl From<Group> for LegacyGroup {
    fn from(group: Group) -> Self {
        let path = group
            .full_path
            .rsplit('/')
            .next()
            .unwrap_or(&group.full_path)
            .to_string();

        Self {
            id: group.id.value,
            name: group.name,
            path,
            full_path: group.full_path,
            description: group.description.unwrap_or_default(),
            visibility: group.visibility,
            parent_id: group.parent.map(|p| p.value),
        }
    }
}

/// Result of `create_file`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegacyFile {
    pub file_path: String,
    pub branch: String,
    pub commit_id: Option<String>,
}

impl From<CommitRef> for LegacyFile {
    fn from(commit: CommitRef) -> Self {
        Self {
            file_path: commit.file.path,
            branch: commit.file.branch,
            commit_id: commit.sha,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegacyAuthor {
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegacyMergeRequest {
    pub id: String,
    pub iid: u64,
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    /// "opened", "merged" or "closed".
    pub state: String,
    pub source_branch: String,
    pub target_branch: String,
    pub author: LegacyAuthor,
    pub web_url: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<MergeRequest> for LegacyMergeRequest {
    fn from(mr: MergeRequest) -> Self {
        let state = match mr.state {
            MergeRequestState::Open => "opened",
            MergeRequestState::Merged => "merged",
            MergeRequestState::Closed => "closed",
        };

        Self {
            id: mr.id.value,
            iid: mr.number,
            project_id: mr.repository.value,
            title: mr.title,
            description: mr.description,
            state: state.to_string(),
            source_branch: mr.source_branch,
            target_branch: mr.target_branch,
            author: LegacyAuthor {
                username: mr.author,
            },
            web_url: mr.web_url,
            created_at: mr.created_at,
            updated_at: mr.updated_at,
        }
    }
}

/// Error payload returned by the legacy surface.
///
/// Keeps the machine-readable kind next to the HTTP-style status code old
/// call sites branch on.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct LegacyError {
    pub kind: ErrorKind,
    pub status: u16,
    pub message: String,
    pub guidance: Option<String>,
}

fn legacy_status(err: &BackendError) -> u16 {
    match err {
        BackendError::Authentication { forbidden: true, .. } => 403,
        BackendError::Authentication { .. } => 401,
        BackendError::UnsupportedCapability { .. } => 501,
        BackendError::NotFound { .. } => 404,
        BackendError::Validation { .. } => 400,
        BackendError::Conflict { .. } => 409,
        BackendError::TransientProvider { status, .. } => status.unwrap_or(503),
        BackendError::Configuration(_) | BackendError::UnknownBackend { .. } => 500,
    }
}

impl From<BackendError> for LegacyError {
    fn from(err: BackendError) -> Self {
        Self {
            kind: err.kind(),
            status: legacy_status(&err),
            guidance: err.guidance().map(str::to_string),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::capability::Capability;
    use crate::model::{FileRef, IdScope, OwnerRef};

    fn scope_id(value: &str) -> crate::model::ResourceId {
        IdScope::new("gitlab", Uuid::nil()).id(value)
    }

    #[test]
    fn test_project_shape() {
        let project = LegacyProject::from(Repository {
            id: scope_id("42"),
            name: "homework-1".to_string(),
            full_name: "cs101/homework-1".to_string(),
            clone_url: "https://gitlab.example.edu/cs101/homework-1.git".to_string(),
            web_url: "https://gitlab.example.edu/cs101/homework-1".to_string(),
            default_branch: "main".to_string(),
            visibility: Visibility::Internal,
            owner: OwnerRef {
                login: "cs101".to_string(),
                kind: OwnerKind::Group,
            },
            created_at: None,
            updated_at: None,
        });

        assert_eq!(project.id, "42");
        assert_eq!(project.namespace.kind, "group");

        let json = serde_json::to_value(&project).unwrap();
        assert_eq!(json["visibility"], "internal");
        assert_eq!(json["path_with_namespace"], "cs101/homework-1");
        assert_eq!(
            json["http_url_to_repo"],
            "https://gitlab.example.edu/cs101/homework-1.git"
        );
    }

    #[test]
    fn test_user_and_group_shapes() {
        let user = LegacyUser::from(User {
            id: scope_id("5"),
            username: "alice".to_string(),
            name: None,
            email: None,
            active: false,
        });
        assert_eq!(user.name, "");
        assert_eq!(user.state, "blocked");

        let group = LegacyGroup::from(Group {
            id: scope_id("9"),
            name: "CS101".to_string(),
            full_path: "college/cs101".to_string(),
            description: None,
            parent: Some(scope_id("1")),
            visibility: Visibility::Private,
        });
        assert_eq!(group.path, "cs101");
        assert_eq!(group.parent_id.as_deref(), Some("1"));
    }

    #[test]
    fn test_file_and_merge_request_shapes() {
        let repo = scope_id("42");
        let file = LegacyFile::from(CommitRef {
            sha: Some("abc123".to_string()),
            file: FileRef {
                repository: repo.clone(),
                path: "README.md".to_string(),
                branch: "main".to_string(),
            },
        });
        assert_eq!(file.commit_id.as_deref(), Some("abc123"));

        let mr = LegacyMergeRequest::from(MergeRequest {
            id: scope_id("42!3"),
            repository: repo,
            number: 3,
            source_branch: "solution".to_string(),
            target_branch: "main".to_string(),
            title: "Submit".to_string(),
            description: None,
            state: MergeRequestState::Open,
            author: "alice".to_string(),
            web_url: "https://gitlab.example.edu/cs101/homework-1/-/merge_requests/3".to_string(),
            created_at: None,
            updated_at: None,
        });
        assert_eq!(mr.state, "opened");
        assert_eq!(mr.iid, 3);
        assert_eq!(mr.project_id, "42");
    }

    #[test]
    fn test_error_keeps_kind_and_message() {
        let err = LegacyError::from(BackendError::unsupported("github", Capability::CreateUsers));
        assert_eq!(err.kind, ErrorKind::UnsupportedCapability);
        assert_eq!(err.status, 501);
        assert!(err.message.contains("create_users"));
        assert!(err.guidance.is_some());

        let err = LegacyError::from(BackendError::transient("bad gateway", Some(502)));
        assert_eq!(err.status, 502);

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "transient_provider");
    }

    #[test]
    fn test_permission_denied_keeps_403() {
        let err = LegacyError::from(BackendError::forbidden("Must have admin rights"));
        assert_eq!(err.kind, ErrorKind::Authentication);
        assert_eq!(err.status, 403);
        assert_eq!(LegacyError::from(BackendError::authentication("expired")).status, 401);
    }
}
