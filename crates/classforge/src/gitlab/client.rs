//! GitLab backend over the REST v4 API.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use uuid::Uuid;

use super::convert::{to_commit, to_group, to_merge_request, to_repository, to_user};
use super::error::{GitLabError, short_error_message};
use super::types::{
    GitLabBranch, GitLabFileCreated, GitLabGroup, GitLabMergeRequest, GitLabNamespaceRef,
    GitLabProject, GitLabUser,
};
use crate::backend::session::SessionCache;
use crate::backend::{
    ApiRateLimiter, AuthResult, Backend, BackendError, Credentials, NewGroup, NewUser, Page,
    PageRequest, RepositoryFilter, RepositoryOptions, Result, require_non_empty,
};
use crate::capability::{Capabilities, Capability};
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use crate::model::{
    AccessLevel, CommitRef, Group, IdScope, MergeRequest, Repository, ResourceId, User, Visibility,
};
use crate::retry::{RetryPolicy, with_retry};
use crate::settings::{BackendDefaults, BackendSettings, ConfigError, ResolvedBackend};

/// Registered backend type name.
pub const BACKEND_TYPE: &str = "gitlab";

/// Default GitLab host.
pub const DEFAULT_HOST: &str = "https://gitlab.com";

const USER_AGENT: &str = "classforge";

fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

fn project_path(id: &str) -> String {
    format!("/projects/{}", encode(id))
}

fn page_query(page: &PageRequest) -> String {
    let number = page.cursor.as_deref().unwrap_or("1");
    format!(
        "per_page={}&page={}",
        page.effective_per_page(),
        encode(number)
    )
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T> {
    response
        .json()
        .map_err(|e| BackendError::from(GitLabError::Json(e)))
}

/// GitLab implementation of [`Backend`].
///
/// Works against gitlab.com and self-managed instances. Identifiers are
/// GitLab's numeric ids; merge requests use `project_id!iid`. Path-style
/// identifiers (`group/project`) adopted through [`Backend::adopt_id`] are
/// accepted too, since GitLab resolves URL-encoded paths.
#[derive(Clone)]
pub struct GitLabBackend {
    transport: Arc<dyn HttpTransport>,
    api_base: String,
    instance_id: Uuid,
    capabilities: Capabilities,
    defaults: BackendDefaults,
    namespace: Option<String>,
    retry: RetryPolicy,
    rate_limiter: Option<ApiRateLimiter>,
    session: SessionCache,
}

impl GitLabBackend {
    /// Build a backend with a reqwest transport from resolved settings.
    pub fn from_settings(resolved: &ResolvedBackend) -> Result<Self> {
        let transport = ReqwestTransport::with_timeout(resolved.settings.timeout())
            .map_err(|e| ConfigError::Validation(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self::with_transport(
            &resolved.settings,
            resolved.defaults.clone(),
            Arc::new(transport),
        ))
    }

    pub fn with_transport(
        settings: &BackendSettings,
        defaults: BackendDefaults,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let host = settings
            .url
            .as_deref()
            .unwrap_or(DEFAULT_HOST)
            .trim_end_matches('/');

        Self {
            transport,
            api_base: format!("{}/api/v4", host),
            instance_id: Uuid::new_v4(),
            capabilities: Capabilities::gitlab(),
            defaults,
            namespace: settings.namespace.clone(),
            retry: settings.retry_policy(),
            rate_limiter: settings.requests_per_second.map(ApiRateLimiter::new),
            session: SessionCache::default(),
        }
    }

    /// Narrow the capability descriptor, e.g. for tokens without admin rights.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = self.capabilities.restrict(&capabilities);
        self
    }

    /// Base URL of the REST API (`https://host/api/v4`).
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn scope(&self) -> IdScope<'_> {
        IdScope::new(BACKEND_TYPE, self.instance_id)
    }

    /// Send one request, retrying transient failures.
    async fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        token: &str,
    ) -> Result<HttpResponse> {
        let url = format!("{}{}", self.api_base, path);
        let label = format!("{} {}", method.as_str(), path);
        let url = url.as_str();
        let label_ref = label.as_str();

        with_retry(&self.retry, &label, || async move {
            if let Some(limiter) = &self.rate_limiter {
                limiter.wait().await;
            }

            let mut request = HttpRequest::new(method, url)
                .header("Accept", "application/json")
                .header("User-Agent", USER_AGENT)
                .header("PRIVATE-TOKEN", token);
            if let Some(body) = body {
                request = request.json_body(body);
            }

            tracing::debug!("GitLab {}", label_ref);
            let response = match self.transport.send(request).await {
                Ok(response) => response,
                Err(e) => return Err(BackendError::from(GitLabError::Http(e.to_string()))),
            };

            if response.is_success() {
                return Ok(response);
            }

            let err = GitLabError::from_response(
                response.status,
                &response.body,
                response.header("retry-after"),
            );
            tracing::debug!("GitLab {} failed: {}", label_ref, short_error_message(&err));
            Err(BackendError::from(err))
        })
        .await
    }

    /// Authenticated request with a JSON response.
    async fn request<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T> {
        let token = self.session.token().await?;
        let response = self.execute(method, path, body, &token).await?;
        decode(&response)
    }

    /// Authenticated request whose response body is ignored.
    async fn request_empty(&self, method: HttpMethod, path: &str) -> Result<()> {
        let token = self.session.token().await?;
        self.execute(method, path, None, &token).await?;
        Ok(())
    }

    /// Fetch one page; GitLab reports the next page in `x-next-page`.
    async fn fetch_page<T, R, F>(&self, path: &str, convert: F) -> Result<Page<R>>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> R,
    {
        let token = self.session.token().await?;
        let response = self.execute(HttpMethod::Get, path, None, &token).await?;
        let raw: Vec<T> = decode(&response)?;

        let next_cursor = response
            .header("x-next-page")
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let total = response
            .header("x-total")
            .and_then(|v| v.trim().parse::<usize>().ok());

        Ok(Page {
            items: raw.iter().map(convert).collect(),
            next_cursor,
            total,
        })
    }

    /// Numeric id of a group given its id or full path.
    async fn resolve_group_id(&self, group: &str) -> Result<u64> {
        if let Ok(id) = group.parse::<u64>() {
            return Ok(id);
        }
        let raw: GitLabGroup = self
            .request(HttpMethod::Get, &format!("/groups/{}", encode(group)), None)
            .await?;
        Ok(raw.id)
    }
}

#[async_trait]
impl Backend for GitLabBackend {
    fn backend_type(&self) -> &str {
        BACKEND_TYPE
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
        if let Some(cached) = self.session.cached(credentials).await {
            tracing::debug!("Reusing GitLab session for {}", cached.user.username);
            return Ok(cached);
        }
        if credentials.token().trim().is_empty() {
            return Err(BackendError::authentication("GitLab token is empty"));
        }

        let response = self
            .execute(HttpMethod::Get, "/user", None, credentials.token())
            .await?;
        let raw: GitLabUser = decode(&response)?;

        let result = AuthResult {
            backend_type: BACKEND_TYPE.to_string(),
            user: to_user(&self.scope(), &raw),
            authenticated_at: Utc::now(),
        };
        self.session.store(credentials.clone(), result.clone()).await;

        tracing::info!(
            "Authenticated to GitLab at {} as {}",
            self.api_base,
            result.user.username
        );
        Ok(result)
    }

    async fn create_repository(
        &self,
        name: &str,
        visibility: Visibility,
        options: &RepositoryOptions,
    ) -> Result<Repository> {
        require_non_empty("repository name", name)?;

        let mut body = json!({
            "name": name,
            "visibility": self.capabilities.map_visibility(visibility).as_str(),
            "initialize_with_readme": options.initialize_readme,
        });
        if let Some(description) = &options.description {
            body["description"] = json!(description);
        }

        let namespace = options.namespace.as_deref().or(self.namespace.as_deref());
        if let Some(namespace) = namespace {
            let ns: GitLabNamespaceRef = self
                .request(
                    HttpMethod::Get,
                    &format!("/namespaces/{}", encode(namespace)),
                    None,
                )
                .await?;
            body["namespace_id"] = json!(ns.id);
        }

        let project: GitLabProject = self
            .request(HttpMethod::Post, "/projects", Some(&body))
            .await?;
        Ok(to_repository(&self.scope(), &project))
    }

    async fn get_repository(&self, id: &ResourceId) -> Result<Repository> {
        let id = self.native(id)?;
        let project: GitLabProject = self
            .request(HttpMethod::Get, &project_path(id), None)
            .await?;
        Ok(to_repository(&self.scope(), &project))
    }

    async fn list_repositories(&self, filter: &RepositoryFilter) -> Result<Page<Repository>> {
        let mut path = match &filter.namespace {
            Some(namespace) => format!(
                "/groups/{}/projects?include_subgroups=true&",
                encode(namespace)
            ),
            None => "/projects?membership=true&".to_string(),
        };
        path.push_str(&page_query(&filter.page));
        if let Some(search) = &filter.search {
            path.push_str(&format!("&search={}", encode(search)));
        }

        let scope = self.scope();
        self.fetch_page(&path, |p: &GitLabProject| to_repository(&scope, p))
            .await
    }

    async fn fork_repository(
        &self,
        id: &ResourceId,
        target_namespace: Option<&str>,
    ) -> Result<Repository> {
        self.require(Capability::Forks)?;
        let id = self.native(id)?;

        let body = match target_namespace {
            Some(namespace) => json!({ "namespace_path": namespace }),
            None => json!({}),
        };
        let project: GitLabProject = self
            .request(
                HttpMethod::Post,
                &format!("{}/fork", project_path(id)),
                Some(&body),
            )
            .await?;
        Ok(to_repository(&self.scope(), &project))
    }

    async fn delete_repository(&self, id: &ResourceId) -> Result<()> {
        let id = self.native(id)?;
        self.request_empty(HttpMethod::Delete, &project_path(id))
            .await
    }

    async fn create_user(&self, user: &NewUser) -> Result<User> {
        self.require(Capability::CreateUsers)?;
        require_non_empty("username", &user.username)?;
        require_non_empty("email", &user.email)?;
        require_non_empty("name", &user.name)?;

        let mut body = json!({
            "username": user.username,
            "email": user.email,
            "name": user.name,
            "skip_confirmation": true,
        });
        match &user.password {
            Some(password) => body["password"] = json!(password),
            None => body["reset_password"] = json!(true),
        }

        let raw: GitLabUser = self
            .request(HttpMethod::Post, "/users", Some(&body))
            .await?;
        Ok(to_user(&self.scope(), &raw))
    }

    async fn get_user(&self, id: &ResourceId) -> Result<User> {
        let id = self.native(id)?;
        let raw: GitLabUser = self
            .request(HttpMethod::Get, &format!("/users/{}", encode(id)), None)
            .await?;
        Ok(to_user(&self.scope(), &raw))
    }

    async fn list_users(&self, page: &PageRequest) -> Result<Page<User>> {
        let scope = self.scope();
        self.fetch_page(&format!("/users?{}", page_query(page)), |u: &GitLabUser| {
            to_user(&scope, u)
        })
        .await
    }

    async fn create_group(&self, group: &NewGroup) -> Result<Group> {
        self.require(Capability::Groups)?;
        if group.parent.is_some() {
            self.require(Capability::NestedGroups)?;
        }
        require_non_empty("group name", &group.name)?;
        let path = group.effective_path();
        require_non_empty("group path", &path)?;

        let mut body = json!({
            "name": group.name,
            "path": path,
            "visibility": self.capabilities.map_visibility(group.visibility).as_str(),
        });
        if let Some(description) = &group.description {
            body["description"] = json!(description);
        }
        if let Some(parent) = &group.parent {
            body["parent_id"] = json!(self.resolve_group_id(parent).await?);
        }

        let raw: GitLabGroup = self
            .request(HttpMethod::Post, "/groups", Some(&body))
            .await?;
        Ok(to_group(&self.scope(), &self.capabilities, &raw))
    }

    async fn get_group(&self, id: &ResourceId) -> Result<Group> {
        self.require(Capability::Groups)?;
        let id = self.native(id)?;
        let raw: GitLabGroup = self
            .request(HttpMethod::Get, &format!("/groups/{}", encode(id)), None)
            .await?;
        Ok(to_group(&self.scope(), &self.capabilities, &raw))
    }

    async fn list_groups(&self, page: &PageRequest) -> Result<Page<Group>> {
        self.require(Capability::Groups)?;
        let scope = self.scope();
        let capabilities = &self.capabilities;
        self.fetch_page(&format!("/groups?{}", page_query(page)), |g: &GitLabGroup| {
            to_group(&scope, capabilities, g)
        })
        .await
    }

    async fn add_user_to_group(
        &self,
        group: &ResourceId,
        user: &ResourceId,
        access: AccessLevel,
    ) -> Result<()> {
        self.require(Capability::Groups)?;
        let group_id = self.native(group)?;
        let user_id = self.native(user)?;
        let user_id: u64 = user_id.parse().map_err(|_| {
            BackendError::validation(format!(
                "GitLab user identifiers are numeric, got `{}`",
                user_id
            ))
        })?;

        let body = json!({
            "user_id": user_id,
            "access_level": access.gitlab_level(),
        });
        let _: Value = self
            .request(
                HttpMethod::Post,
                &format!("/groups/{}/members", encode(group_id)),
                Some(&body),
            )
            .await?;
        Ok(())
    }

    async fn create_file(
        &self,
        repo: &ResourceId,
        path: &str,
        content: &str,
        commit_message: &str,
    ) -> Result<CommitRef> {
        let project_id = self.native(repo)?;
        require_non_empty("file path", path)?;
        require_non_empty("commit message", commit_message)?;

        let project: GitLabProject = self
            .request(HttpMethod::Get, &project_path(project_id), None)
            .await?;
        let branch = to_repository(&self.scope(), &project).default_branch;

        let body = json!({
            "branch": branch,
            "content": content,
            "commit_message": commit_message,
        });
        let created: GitLabFileCreated = self
            .request(
                HttpMethod::Post,
                &format!(
                    "{}/repository/files/{}",
                    project_path(project_id),
                    encode(path)
                ),
                Some(&body),
            )
            .await?;

        let head: GitLabBranch = self
            .request(
                HttpMethod::Get,
                &format!(
                    "{}/repository/branches/{}",
                    project_path(project_id),
                    encode(&created.branch)
                ),
                None,
            )
            .await?;

        Ok(to_commit(
            repo,
            &created.file_path,
            &created.branch,
            Some(head.commit.id),
        ))
    }

    async fn create_merge_request(
        &self,
        repo: &ResourceId,
        source_branch: &str,
        target_branch: &str,
        title: &str,
    ) -> Result<MergeRequest> {
        self.require(Capability::MergeRequests)?;
        let project_id = self.native(repo)?;
        require_non_empty("source branch", source_branch)?;
        require_non_empty("target branch", target_branch)?;
        require_non_empty("title", title)?;
        if source_branch == target_branch {
            return Err(BackendError::validation(
                "source and target branch must differ",
            ));
        }

        let body = json!({
            "source_branch": source_branch,
            "target_branch": target_branch,
            "title": title,
        });
        let mr: GitLabMergeRequest = self
            .request(
                HttpMethod::Post,
                &format!("{}/merge_requests", project_path(project_id)),
                Some(&body),
            )
            .await?;
        Ok(to_merge_request(&self.scope(), repo, &mr))
    }
}
