//! Capability descriptors.
//!
//! Every backend instance carries an immutable [`Capabilities`] value that
//! declares which optional operations and features the provider supports.
//! Operations consult it before doing any provider work and fail with
//! [`BackendError::UnsupportedCapability`] instead of guessing a workaround.

use std::fmt;

use serde::Serialize;

use crate::backend::BackendError;
use crate::model::Visibility;

/// A named optional feature of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Creating user accounts through the API.
    CreateUsers,
    /// Groups nested inside other groups.
    NestedGroups,
    /// Groups or organizations at all.
    Groups,
    Forks,
    MergeRequests,
    CiCd,
    ProtectedBranches,
    Webhooks,
    DeployKeys,
    /// The `internal` visibility level.
    InternalVisibility,
}

impl Capability {
    pub const ALL: [Capability; 10] = [
        Capability::CreateUsers,
        Capability::NestedGroups,
        Capability::Groups,
        Capability::Forks,
        Capability::MergeRequests,
        Capability::CiCd,
        Capability::ProtectedBranches,
        Capability::Webhooks,
        Capability::DeployKeys,
        Capability::InternalVisibility,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::CreateUsers => "create_users",
            Capability::NestedGroups => "nested_groups",
            Capability::Groups => "groups",
            Capability::Forks => "forks",
            Capability::MergeRequests => "merge_requests",
            Capability::CiCd => "ci_cd",
            Capability::ProtectedBranches => "protected_branches",
            Capability::Webhooks => "webhooks",
            Capability::DeployKeys => "deploy_keys",
            Capability::InternalVisibility => "internal_visibility",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a provider models groups of users and repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupModel {
    /// Native groups (GitLab).
    Native,
    /// Organizations mapped 1:1 onto groups (GitHub).
    Organization,
}

/// How a provider models change requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeRequestModel {
    MergeRequest,
    /// Pull requests mapped 1:1 onto merge requests.
    PullRequest,
}

/// Immutable set of capability flags attached to a backend instance.
///
/// Built once when the backend is constructed; the `with` builder consumes
/// and returns a new value so a descriptor never changes after it is handed
/// to a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    create_users: bool,
    nested_groups: bool,
    groups: bool,
    forks: bool,
    merge_requests: bool,
    ci_cd: bool,
    protected_branches: bool,
    webhooks: bool,
    deploy_keys: bool,
    internal_visibility: bool,
    group_model: GroupModel,
    change_request_model: ChangeRequestModel,
}

impl Capabilities {
    /// A descriptor with every flag disabled.
    #[must_use]
    pub fn none(group_model: GroupModel, change_request_model: ChangeRequestModel) -> Self {
        Self {
            create_users: false,
            nested_groups: false,
            groups: false,
            forks: false,
            merge_requests: false,
            ci_cd: false,
            protected_branches: false,
            webhooks: false,
            deploy_keys: false,
            internal_visibility: false,
            group_model,
            change_request_model,
        }
    }

    /// Return a copy with `capability` set to `enabled`.
    #[must_use]
    pub fn with(mut self, capability: Capability, enabled: bool) -> Self {
        *self.flag_mut(capability) = enabled;
        self
    }

    /// GitLab supports the whole operation surface natively.
    #[must_use]
    pub fn gitlab() -> Self {
        Capability::ALL
            .into_iter()
            .fold(
                Self::none(GroupModel::Native, ChangeRequestModel::MergeRequest),
                |caps, cap| caps.with(cap, true),
            )
    }

    /// GitHub: no user creation, flat organizations, no `internal` level.
    #[must_use]
    pub fn github() -> Self {
        Self::none(GroupModel::Organization, ChangeRequestModel::PullRequest)
            .with(Capability::Groups, true)
            .with(Capability::Forks, true)
            .with(Capability::MergeRequests, true)
            .with(Capability::CiCd, true)
            .with(Capability::ProtectedBranches, true)
            .with(Capability::Webhooks, true)
            .with(Capability::DeployKeys, true)
    }

    /// Keep only the flags enabled in both `self` and `overrides`.
    ///
    /// A backend's preset is the ceiling of what it can do, so overrides can
    /// switch features off but never on. Group and change-request models
    /// stay those of `self`.
    #[must_use]
    pub fn restrict(self, overrides: &Capabilities) -> Self {
        Capability::ALL.into_iter().fold(self, |caps, cap| {
            let enabled = caps.supports(cap) && overrides.supports(cap);
            caps.with(cap, enabled)
        })
    }

    #[must_use]
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::CreateUsers => self.create_users,
            Capability::NestedGroups => self.nested_groups,
            Capability::Groups => self.groups,
            Capability::Forks => self.forks,
            Capability::MergeRequests => self.merge_requests,
            Capability::CiCd => self.ci_cd,
            Capability::ProtectedBranches => self.protected_branches,
            Capability::Webhooks => self.webhooks,
            Capability::DeployKeys => self.deploy_keys,
            Capability::InternalVisibility => self.internal_visibility,
        }
    }

    /// Fail with `UnsupportedCapability` unless `capability` is enabled.
    pub fn require(&self, capability: Capability, backend: &str) -> Result<(), BackendError> {
        if self.supports(capability) {
            Ok(())
        } else {
            Err(BackendError::unsupported(backend, capability))
        }
    }

    /// All enabled capabilities, in declaration order.
    #[must_use]
    pub fn enabled(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|cap| self.supports(*cap))
            .collect()
    }

    #[must_use]
    pub fn group_model(&self) -> GroupModel {
        self.group_model
    }

    #[must_use]
    pub fn change_request_model(&self) -> ChangeRequestModel {
        self.change_request_model
    }

    /// Map a requested visibility onto the nearest level this backend has.
    ///
    /// Deterministic: `internal` becomes `private` whenever the backend lacks
    /// [`Capability::InternalVisibility`]; other levels pass through.
    #[must_use]
    pub fn map_visibility(&self, requested: Visibility) -> Visibility {
        match requested {
            Visibility::Internal if !self.internal_visibility => Visibility::Private,
            other => other,
        }
    }

    fn flag_mut(&mut self, capability: Capability) -> &mut bool {
        match capability {
            Capability::CreateUsers => &mut self.create_users,
            Capability::NestedGroups => &mut self.nested_groups,
            Capability::Groups => &mut self.groups,
            Capability::Forks => &mut self.forks,
            Capability::MergeRequests => &mut self.merge_requests,
            Capability::CiCd => &mut self.ci_cd,
            Capability::ProtectedBranches => &mut self.protected_branches,
            Capability::Webhooks => &mut self.webhooks,
            Capability::DeployKeys => &mut self.deploy_keys,
            Capability::InternalVisibility => &mut self.internal_visibility,
        }
    }
}
