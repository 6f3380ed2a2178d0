//! Translation from GitLab API types to the shared data model.
//!
//! One function per entity; nothing outside this module reads GitLab
//! response fields.

use crate::capability::{Capabilities, Capability};
use crate::model::{
    CommitRef, FileRef, Group, IdScope, MergeRequest, MergeRequestState, OwnerKind, OwnerRef,
    Repository, ResourceId, User, Visibility,
};

use super::types::{GitLabGroup, GitLabMergeRequest, GitLabProject, GitLabUser};

/// Branch reported for projects without a default branch.
const FALLBACK_BRANCH: &str = "main";

/// Parse a GitLab visibility string. Unknown values are treated as private.
pub fn gitlab_visibility(value: &str) -> Visibility {
    match value {
        "public" => Visibility::Public,
        "internal" => Visibility::Internal,
        _ => Visibility::Private,
    }
}

pub fn to_repository(scope: &IdScope<'_>, project: &GitLabProject) -> Repository {
    let owner_kind = if project.namespace.kind == "user" {
        OwnerKind::User
    } else {
        OwnerKind::Group
    };

    Repository {
        id: scope.id(project.id.to_string()),
        name: project.name.clone(),
        full_name: project.path_with_namespace.clone(),
        clone_url: project
            .http_url_to_repo
            .clone()
            .unwrap_or_else(|| format!("{}.git", project.web_url)),
        web_url: project.web_url.clone(),
        default_branch: project
            .default_branch
            .clone()
            .unwrap_or_else(|| FALLBACK_BRANCH.to_string()),
        visibility: gitlab_visibility(&project.visibility),
        owner: OwnerRef {
            login: project.namespace.full_path.clone(),
            kind: owner_kind,
        },
        created_at: project.created_at,
        updated_at: project.last_activity_at,
    }
}

pub fn to_user(scope: &IdScope<'_>, user: &GitLabUser) -> User {
    let email = user
        .email
        .clone()
        .or_else(|| user.public_email.clone())
        .filter(|e| !e.trim().is_empty());

    User {
        id: scope.id(user.id.to_string()),
        username: user.username.clone(),
        name: user.name.clone().filter(|n| !n.is_empty()),
        email,
        active: user.state.as_deref().is_none_or(|s| s == "active"),
    }
}

/// Convert a group; the parent is only reported when nested groups are
/// enabled on this backend.
pub fn to_group(scope: &IdScope<'_>, capabilities: &Capabilities, group: &GitLabGroup) -> Group {
    let parent = group
        .parent_id
        .filter(|_| capabilities.supports(Capability::NestedGroups))
        .map(|id| scope.id(id.to_string()));

    Group {
        id: scope.id(group.id.to_string()),
        name: group.name.clone(),
        full_path: group.full_path.clone(),
        description: group.description.clone().filter(|d| !d.is_empty()),
        parent,
        visibility: gitlab_visibility(&group.visibility),
    }
}

fn merge_request_state(state: &str) -> MergeRequestState {
    match state {
        "merged" => MergeRequestState::Merged,
        "closed" => MergeRequestState::Closed,
        _ => MergeRequestState::Open,
    }
}

/// Convert a merge request. Identifiers are `project_id!iid`.
pub fn to_merge_request(
    scope: &IdScope<'_>,
    repository: &ResourceId,
    mr: &GitLabMergeRequest,
) -> MergeRequest {
    MergeRequest {
        id: scope.id(format!("{}!{}", mr.project_id, mr.iid)),
        repository: repository.clone(),
        number: mr.iid,
        source_branch: mr.source_branch.clone(),
        target_branch: mr.target_branch.clone(),
        title: mr.title.clone(),
        description: mr.description.clone().filter(|d| !d.is_empty()),
        state: merge_request_state(&mr.state),
        author: mr.author.username.clone(),
        web_url: mr.web_url.clone(),
        created_at: mr.created_at,
        updated_at: mr.updated_at,
    }
}

pub fn to_commit(repository: &ResourceId, path: &str, branch: &str, sha: Option<String>) -> CommitRef {
    CommitRef {
        sha,
        file: FileRef {
            repository: repository.clone(),
            path: path.to_string(),
            branch: branch.to_string(),
        },
    }
}
