//! Translation from GitHub API types to the shared data model.

use crate::model::{
    CommitRef, FileRef, Group, IdScope, MergeRequest, MergeRequestState, OwnerKind, OwnerRef, Repository, ResourceId,
    User, Visibility,
};

use super::types::{GitHubContentWrite, GitHubOrg, GitHubPull, GitHubRepo, GitHubUser};

/// Branch reported for repositories without a default branch.
const FALLBACK_BRANCH: &str = "main";

/// Visibility of a repository. GitHub Enterprise `internal` repositories
/// are reported as private, since this backend has no internal level.
pub fn github_visibility(repo: &GitHubRepo) -> Visibility {
    match repo.visibility.as_deref() {
        Some("public") => Visibility::Public,
        Some(_) => Visibility::Private,
        None if repo.private => Visibility::Private,
        None => Visibility::Public,
    }
}

pub fn to_repository(scope: &IdScope<'_>, repo: &GitHubRepo) -> Repository {
    let owner_kind = if repo.owner.kind == "Organization" {
        OwnerKind::Group
    } else {
        OwnerKind::User
    };

    Repository {
        id: scope.id(repo.full_name.clone()),
        name: repo.name.clone(),
        full_name: repo.full_name.clone(),
        clone_url: repo
            .clone_url
            .clone()
            .unwrap_or_else(|| format!("{}.git", repo.html_url)),
        web_url: repo.html_url.clone(),
        default_branch: repo
            .default_branch
            .clone()
            .unwrap_or_else(|| FALLBACK_BRANCH.to_string()),
        visibility: github_visibility(repo),
        owner: OwnerRef {
            login: repo.owner.login.clone(),
            kind: owner_kind,
        },
        created_at: repo.created_at,
        updated_at: repo.updated_at,
    }
}

/// Convert a user. The login is the identifier, since every user endpoint
/// is addressed by login.
pub fn to_user(scope: &IdScope<'_>, user: &GitHubUser) -> User {
    User {
        id: scope.id(user.login.clone()),
        username: user.login.clone(),
        name: user.name.clone().filter(|n| !n.trim().is_empty()),
        email: user.email.clone().filter(|e| !e.trim().is_empty()),
        active: user.suspended_at.is_none(),
    }
}

/// Convert an organization. Organizations are flat and always visible.
pub fn to_group(scope: &IdScope<'_>, org: &GitHubOrg) -> Group {
    Group {
        id: scope.id(org.login.clone()),
        name: org
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| org.login.clone()),
        full_path: org.login.clone(),
        description: org.description.clone().filter(|d| !d.is_empty()),
        parent: None,
        visibility: Visibility::Public,
    }
}

fn pull_state(pull: &GitHubPull) -> MergeRequestState {
    match pull.state.as_str() {
        "open" => MergeRequestState::Open,
        _ if pull.merged_at.is_some() => MergeRequestState::Merged,
        _ => MergeRequestState::Closed,
    }
}

/// Convert a pull request. Identifiers are `owner/name#number`.
pub fn to_merge_request(
    scope: &IdScope<'_>,
    repository: &ResourceId,
    full_name: &str,
    pull: &GitHubPull,
) -> MergeRequest {
    MergeRequest {
        id: scope.id(format!("{}#{}", full_name, pull.number)),
        repository: repository.clone(),
        number: pull.number,
        source_branch: pull.head.name.clone(),
        target_branch: pull.base.name.clone(),
        title: pull.title.clone(),
        description: pull.body.clone().filter(|d| !d.is_empty()),
        state: pull_state(pull),
        author: pull.user.login.clone(),
        web_url: pull.html_url.clone(),
        created_at: pull.created_at,
        updated_at: pull.updated_at,
    }
}

pub fn to_commit(repository: &ResourceId, branch: &str, written: &GitHubContentWrite) -> CommitRef {
    CommitRef {
        sha: Some(written.commit.sha.clone()),
        file: FileRef {
            repository: repository.clone(),
            path: written.content.path.clone(),
            branch: branch.to_string(),
        },
    }
}
