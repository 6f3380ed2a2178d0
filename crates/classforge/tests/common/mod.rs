//! In-memory backend shared by the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use classforge::backend::{
    AuthResult, Backend, BackendError, Credentials, NewGroup, NewUser, Page, PageRequest,
    RepositoryFilter, RepositoryOptions, Result, require_non_empty,
};
use classforge::capability::{Capabilities, Capability, ChangeRequestModel, GroupModel};
use classforge::factory::BackendFactory;
use classforge::model::{
    AccessLevel, CommitRef, FileRef, Group, IdScope, MergeRequest, MergeRequestState, OwnerKind,
    OwnerRef, Repository, ResourceId, User, Visibility,
};
use classforge::settings::{BackendDefaults, EnvLookup, ResolvedBackend};
use uuid::Uuid;

pub const MEMORY_TYPE: &str = "memory";

/// Token the in-memory backend rejects.
pub const EXPIRED_TOKEN: &str = "expired";

#[derive(Default)]
struct State {
    next_id: u64,
    repositories: BTreeMap<u64, Repository>,
    users: BTreeMap<u64, User>,
    groups: BTreeMap<u64, Group>,
    members: Vec<(String, String, AccessLevel)>,
    files: Vec<(String, String, String)>,
    merge_requests: Vec<MergeRequest>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Backend keeping everything in memory, with GitLab-like semantics.
pub struct InMemoryBackend {
    instance_id: Uuid,
    capabilities: Capabilities,
    defaults: BackendDefaults,
    host: String,
    calls: AtomicUsize,
    session: Mutex<Option<AuthResult>>,
    state: Mutex<State>,
}

impl InMemoryBackend {
    pub fn new(defaults: BackendDefaults) -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            capabilities: Capabilities::none(GroupModel::Native, ChangeRequestModel::MergeRequest)
                .with(Capability::Groups, true)
                .with(Capability::NestedGroups, true)
                .with(Capability::CreateUsers, true)
                .with(Capability::Forks, true)
                .with(Capability::MergeRequests, true)
                .with(Capability::InternalVisibility, true),
            defaults,
            host: "https://git.example.edu".to_string(),
            calls: AtomicUsize::new(0),
            session: Mutex::new(None),
            state: Mutex::new(State::default()),
        }
    }

    pub fn from_settings(resolved: &ResolvedBackend) -> Result<Self> {
        let mut backend = Self::new(resolved.defaults.clone());
        if let Some(url) = &resolved.settings.url {
            backend.host = url.trim_end_matches('/').to_string();
        }
        Ok(backend)
    }

    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Number of simulated provider round-trips so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn scope(&self) -> IdScope<'_> {
        IdScope::new(MEMORY_TYPE, self.instance_id)
    }

    /// Simulate one round-trip; fails unless authenticated.
    fn round_trip(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let session = self.session.lock().unwrap();
        session
            .as_ref()
            .map(|s| s.user.username.clone())
            .ok_or_else(|| BackendError::authentication("backend is not authenticated"))
    }

    fn numeric(&self, id: &ResourceId) -> Result<u64> {
        let raw = self.native(id)?;
        raw.parse()
            .map_err(|_| BackendError::validation(format!("`{}` is not a numeric id", raw)))
    }

    fn page_of<T: Clone>(items: Vec<T>, page: &PageRequest) -> Page<T> {
        let start: usize = page
            .cursor
            .as_deref()
            .and_then(|c| c.parse().ok())
            .unwrap_or(0);
        let per_page = page.effective_per_page() as usize;
        let end = (start + per_page).min(items.len());
        let next_cursor = (end < items.len()).then(|| end.to_string());

        Page {
            items: items.get(start..end).map(<[T]>::to_vec).unwrap_or_default(),
            next_cursor,
            total: Some(items.len()),
        }
    }

    fn new_repository(&self, id: u64, name: &str, owner: &str, visibility: Visibility) -> Repository {
        let full_name = format!("{}/{}", owner, name);
        Repository {
            id: self.scope().id(id.to_string()),
            name: name.to_string(),
            full_name: full_name.clone(),
            clone_url: format!("{}/{}.git", self.host, full_name),
            web_url: format!("{}/{}", self.host, full_name),
            default_branch: "main".to_string(),
            visibility: self.capabilities.map_visibility(visibility),
            owner: OwnerRef {
                login: owner.to_string(),
                kind: OwnerKind::Group,
            },
            created_at: Some(Utc::now()),
            updated_at: None,
        }
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    fn backend_type(&self) -> &str {
        MEMORY_TYPE
    }

    fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn defaults(&self) -> &BackendDefaults {
        &self.defaults
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if credentials.token() == EXPIRED_TOKEN || credentials.token().is_empty() {
            return Err(BackendError::authentication("token expired"));
        }

        let result = AuthResult {
            backend_type: MEMORY_TYPE.to_string(),
            user: User {
                id: self.scope().id("1"),
                username: "instructor".to_string(),
                name: Some("Instructor".to_string()),
                email: None,
                active: true,
            },
            authenticated_at: Utc::now(),
        };
        *self.session.lock().unwrap() = Some(result.clone());
        Ok(result)
    }

    async fn create_repository(
        &self,
        name: &str,
        visibility: Visibility,
        options: &RepositoryOptions,
    ) -> Result<Repository> {
        require_non_empty("repository name", name)?;
        let username = self.round_trip()?;
        let owner = options.namespace.clone().unwrap_or(username);

        let mut state = self.state.lock().unwrap();
        if state
            .repositories
            .values()
            .any(|r| r.name == name && r.owner.login == owner)
        {
            return Err(BackendError::conflict(format!("{}/{}", owner, name)));
        }
        let id = state.next_id();
        let repo = self.new_repository(id, name, &owner, visibility);
        state.repositories.insert(id, repo.clone());
        Ok(repo)
    }

    async fn get_repository(&self, id: &ResourceId) -> Result<Repository> {
        let id = self.numeric(id)?;
        self.round_trip()?;
        let state = self.state.lock().unwrap();
        state
            .repositories
            .get(&id)
            .cloned()
            .ok_or_else(|| BackendError::not_found(format!("repository {}", id)))
    }

    async fn list_repositories(&self, filter: &RepositoryFilter) -> Result<Page<Repository>> {
        self.round_trip()?;
        let state = self.state.lock().unwrap();
        let items: Vec<Repository> = state
            .repositories
            .values()
            .filter(|r| {
                filter
                    .namespace
                    .as_deref()
                    .is_none_or(|ns| r.owner.login == ns)
            })
            .filter(|r| filter.search.as_deref().is_none_or(|s| r.name.contains(s)))
            .cloned()
            .collect();
        Ok(Self::page_of(items, &filter.page))
    }

    async fn fork_repository(
        &self,
        id: &ResourceId,
        target_namespace: Option<&str>,
    ) -> Result<Repository> {
        self.require(Capability::Forks)?;
        let source = self.get_repository(id).await?;
        let username = self.round_trip()?;
        let owner = target_namespace.map(str::to_string).unwrap_or(username);

        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        let fork = self.new_repository(id, &source.name, &owner, source.visibility);
        state.repositories.insert(id, fork.clone());
        Ok(fork)
    }

    async fn delete_repository(&self, id: &ResourceId) -> Result<()> {
        let id = self.numeric(id)?;
        self.round_trip()?;
        let mut state = self.state.lock().unwrap();
        state
            .repositories
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| BackendError::not_found(format!("repository {}", id)))
    }

    async fn create_user(&self, user: &NewUser) -> Result<User> {
        self.require(Capability::CreateUsers)?;
        require_non_empty("username", &user.username)?;
        self.round_trip()?;

        let mut state = self.state.lock().unwrap();
        if state.users.values().any(|u| u.username == user.username) {
            return Err(BackendError::conflict(user.username.clone()));
        }
        let id = state.next_id();
        let created = User {
            id: self.scope().id(id.to_string()),
            username: user.username.clone(),
            name: Some(user.name.clone()),
            email: Some(user.email.clone()),
            active: true,
        };
        state.users.insert(id, created.clone());
        Ok(created)
    }

    async fn get_user(&self, id: &ResourceId) -> Result<User> {
        let id = self.numeric(id)?;
        self.round_trip()?;
        let state = self.state.lock().unwrap();
        state
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| BackendError::not_found(format!("user {}", id)))
    }

    async fn list_users(&self, page: &PageRequest) -> Result<Page<User>> {
        self.round_trip()?;
        let state = self.state.lock().unwrap();
        Ok(Self::page_of(state.users.values().cloned().collect(), page))
    }

    async fn create_group(&self, group: &NewGroup) -> Result<Group> {
        self.require(Capability::Groups)?;
        if group.parent.is_some() {
            self.require(Capability::NestedGroups)?;
        }
        require_non_empty("group name", &group.name)?;
        self.round_trip()?;

        let mut state = self.state.lock().unwrap();
        let parent = match &group.parent {
            Some(parent) => Some(
                state
                    .groups
                    .values()
                    .find(|g| g.full_path == *parent || g.id.value == *parent)
                    .cloned()
                    .ok_or_else(|| BackendError::not_found(format!("group {}", parent)))?,
            ),
            None => None,
        };
        let full_path = match &parent {
            Some(parent) => format!("{}/{}", parent.full_path, group.effective_path()),
            None => group.effective_path(),
        };

        let id = state.next_id();
        let created = Group {
            id: self.scope().id(id.to_string()),
            name: group.name.clone(),
            full_path,
            description: group.description.clone(),
            parent: parent.map(|p| p.id),
            visibility: self.capabilities.map_visibility(group.visibility),
        };
        state.groups.insert(id, created.clone());
        Ok(created)
    }

    async fn get_group(&self, id: &ResourceId) -> Result<Group> {
        self.require(Capability::Groups)?;
        let id = self.numeric(id)?;
        self.round_trip()?;
        let state = self.state.lock().unwrap();
        state
            .groups
            .get(&id)
            .cloned()
            .ok_or_else(|| BackendError::not_found(format!("group {}", id)))
    }

    async fn list_groups(&self, page: &PageRequest) -> Result<Page<Group>> {
        self.require(Capability::Groups)?;
        self.round_trip()?;
        let state = self.state.lock().unwrap();
        Ok(Self::page_of(state.groups.values().cloned().collect(), page))
    }

    async fn add_user_to_group(
        &self,
        group: &ResourceId,
        user: &ResourceId,
        access: AccessLevel,
    ) -> Result<()> {
        self.require(Capability::Groups)?;
        let group = self.native(group)?.to_string();
        let user = self.native(user)?.to_string();
        self.round_trip()?;
        self.state.lock().unwrap().members.push((group, user, access));
        Ok(())
    }

    async fn create_file(
        &self,
        repo: &ResourceId,
        path: &str,
        content: &str,
        commit_message: &str,
    ) -> Result<CommitRef> {
        require_non_empty("file path", path)?;
        require_non_empty("commit message", commit_message)?;
        let existing = self.get_repository(repo).await?;

        let mut state = self.state.lock().unwrap();
        state
            .files
            .push((existing.full_name, path.to_string(), content.to_string()));
        let sha = format!("{:040x}", state.next_id());
        Ok(CommitRef {
            sha: Some(sha),
            file: FileRef {
                repository: repo.clone(),
                path: path.to_string(),
                branch: existing.default_branch,
            },
        })
    }

    async fn create_merge_request(
        &self,
        repo: &ResourceId,
        source_branch: &str,
        target_branch: &str,
        title: &str,
    ) -> Result<MergeRequest> {
        self.require(Capability::MergeRequests)?;
        if source_branch == target_branch {
            return Err(BackendError::validation(
                "source and target branch must differ",
            ));
        }
        let existing = self.get_repository(repo).await?;
        let author = self.round_trip()?;

        let mut state = self.state.lock().unwrap();
        let number = state.merge_requests.len() as u64 + 1;
        let mr = MergeRequest {
            id: self.scope().id(format!("{}!{}", repo.value, number)),
            repository: repo.clone(),
            number,
            source_branch: source_branch.to_string(),
            target_branch: target_branch.to_string(),
            title: title.to_string(),
            description: None,
            state: MergeRequestState::Open,
            author,
            web_url: format!("{}/-/merge_requests/{}", existing.web_url, number),
            created_at: Some(Utc::now()),
            updated_at: None,
        };
        state.merge_requests.push(mr.clone());
        Ok(mr)
    }
}

/// Environment lookup over a fixed set of variables.
pub fn env_from(pairs: &[(&str, &str)]) -> EnvLookup {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    Arc::new(move |name: &str| vars.get(name).cloned())
}

/// A factory that also knows the in-memory backend.
pub fn factory_with_memory(env: EnvLookup) -> BackendFactory {
    let factory = BackendFactory::new().with_env_lookup(env);
    factory.register_backend(MEMORY_TYPE, |resolved: &ResolvedBackend| {
        let backend = InMemoryBackend::from_settings(resolved)?;
        Ok(Arc::new(backend) as Arc<dyn Backend>)
    });
    factory
}
