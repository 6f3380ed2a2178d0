//! GitHub backend over the REST API.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use uuid::Uuid;

use super::convert::{to_commit, to_group, to_merge_request, to_repository, to_user};
use super::error::{GitHubError, short_error_message};
use super::pagination::parse_link_header;
use super::types::{GitHubContentWrite, GitHubOrg, GitHubPull, GitHubRepo, GitHubUser};
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
pub const BACKEND_TYPE: &str = "github";

/// Default API base for github.com.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = "classforge";
const API_VERSION: &str = "2022-11-28";

fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Split an `owner/name` identifier into its API path.
fn repo_path(id: &str) -> Result<String> {
    match id.split_once('/') {
        Some((owner, name))
            if !owner.trim().is_empty() && !name.trim().is_empty() && !name.contains('/') =>
        {
            Ok(format!("/repos/{}/{}", encode(owner), encode(name)))
        }
        _ => Err(BackendError::validation(format!(
            "GitHub repository identifiers are `owner/name`, got `{}`",
            id
        ))),
    }
}

/// Encode a file path segment by segment, keeping the separators.
fn content_path(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .map(encode)
        .collect::<Vec<_>>()
        .join("/")
}

fn page_query(page: &PageRequest) -> String {
    let number = page.cursor.as_deref().unwrap_or("1");
    format!(
        "per_page={}&page={}",
        page.effective_per_page(),
        encode(number)
    )
}

/// Organization role granted for an access level. GitHub organizations
/// only distinguish members from owners.
fn org_role(access: AccessLevel) -> &'static str {
    if access >= AccessLevel::Maintainer {
        "admin"
    } else {
        "member"
    }
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T> {
    response
        .json()
        .map_err(|e| BackendError::from(GitHubError::Json(e)))
}

/// GitHub implementation of [`Backend`].
///
/// Works against github.com and GitHub Enterprise Server (set `url` to the
/// instance's API base, e.g. `https://github.example.edu/api/v3`).
/// Repository identifiers are `owner/name`, users and organizations are
/// identified by login and pull requests by `owner/name#number`.
///
/// GitHub cannot create user accounts, has no nested organizations and no
/// `internal` visibility; see [`Capabilities::github`].
#[derive(Clone)]
pub struct GitHubBackend {
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

impl GitHubBackend {
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
        let api_base = settings
            .url
            .as_deref()
            .unwrap_or(DEFAULT_API_URL)
            .trim_end_matches('/')
            .to_string();

        Self {
            transport,
            api_base,
            instance_id: Uuid::new_v4(),
            capabilities: Capabilities::github(),
            defaults,
            namespace: settings.namespace.clone(),
            retry: settings.retry_policy(),
            rate_limiter: settings.requests_per_second.map(ApiRateLimiter::new),
            session: SessionCache::default(),
        }
    }

    /// Narrow the capability descriptor, e.g. to disable organization
    /// management for tokens without admin rights. Flags GitHub lacks stay
    /// disabled.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = self.capabilities.restrict(&capabilities);
        self
    }

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
        let authorization = format!("Bearer {}", token);
        let authorization = authorization.as_str();

        with_retry(&self.retry, &label, || async move {
            if let Some(limiter) = &self.rate_limiter {
                limiter.wait().await;
            }

            let mut request = HttpRequest::new(method, url)
                .header("Accept", "application/vnd.github+json")
                .header("X-GitHub-Api-Version", API_VERSION)
                .header("User-Agent", USER_AGENT)
                .header("Authorization", authorization);
            if let Some(body) = body {
                request = request.json_body(body);
            }

            tracing::debug!("GitHub {}", label_ref);
            let response = match self.transport.send(request).await {
                Ok(response) => response,
                Err(e) => return Err(BackendError::from(GitHubError::Http(e.to_string()))),
            };

            if response.is_success() {
                return Ok(response);
            }

            let err = GitHubError::from_response(response.status, &response.headers, &response.body);
            tracing::debug!("GitHub {} failed: {}", label_ref, short_error_message(&err));
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
    async fn request_empty(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> Result<()> {
        let token = self.session.token().await?;
        self.execute(method, path, body, &token).await?;
        Ok(())
    }

    /// Fetch one page; the next cursor is the `cursor_param` of the
    /// `rel="next"` link.
    async fn fetch_page<T, R, F>(
        &self,
        path: &str,
        cursor_param: &str,
        convert: F,
    ) -> Result<Page<R>>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> R,
    {
        let token = self.session.token().await?;
        let response = self.execute(HttpMethod::Get, path, None, &token).await?;
        let raw: Vec<T> = decode(&response)?;

        let next_cursor = response
            .header("link")
            .map(parse_link_header)
            .and_then(|links| links.next_cursor(cursor_param));

        Ok(Page {
            items: raw.iter().map(convert).collect(),
            next_cursor,
            total: None,
        })
    }

    async fn fetch_repo(&self, full_name: &str) -> Result<GitHubRepo> {
        self.request(HttpMethod::Get, &repo_path(full_name)?, None)
            .await
    }
}

#[async_trait]
impl Backend for GitHubBackend {
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
            tracing::debug!("Reusing GitHub session for {}", cached.user.username);
            return Ok(cached);
        }
        if credentials.token().trim().is_empty() {
            return Err(BackendError::authentication("GitHub token is empty"));
        }

        let response = self
            .execute(HttpMethod::Get, "/user", None, credentials.token())
            .await?;
        let raw: GitHubUser = decode(&response)?;

        let result = AuthResult {
            backend_type: BACKEND_TYPE.to_string(),
            user: to_user(&self.scope(), &raw),
            authenticated_at: Utc::now(),
        };
        self.session.store(credentials.clone(), result.clone()).await;

        tracing::info!(
            "Authenticated to GitHub at {} as {}",
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

        let effective = self.capabilities.map_visibility(visibility);
        if effective != visibility {
            tracing::warn!(
                "GitHub has no {} visibility, creating {} as {}",
                visibility.as_str(),
                name,
                effective.as_str()
            );
        }

        let mut body = json!({
            "name": name,
            "private": effective != Visibility::Public,
            "auto_init": options.initialize_readme,
        });
        if let Some(description) = &options.description {
            body["description"] = json!(description);
        }

        let username = self.session.username().await?;
        let namespace = options.namespace.as_deref().or(self.namespace.as_deref());
        let path = match namespace {
            Some(org) if !org.eq_ignore_ascii_case(&username) => {
                format!("/orgs/{}/repos", encode(org))
            }
            _ => "/user/repos".to_string(),
        };

        let repo: GitHubRepo = self.request(HttpMethod::Post, &path, Some(&body)).await?;
        Ok(to_repository(&self.scope(), &repo))
    }

    async fn get_repository(&self, id: &ResourceId) -> Result<Repository> {
        let full_name = self.native(id)?;
        let repo = self.fetch_repo(full_name).await?;
        Ok(to_repository(&self.scope(), &repo))
    }

    /// GitHub's listing endpoints have no name search, so `search` filters
    /// each page locally; pages may therefore be shorter than requested.
    async fn list_repositories(&self, filter: &RepositoryFilter) -> Result<Page<Repository>> {
        let path = match &filter.namespace {
            Some(org) => format!("/orgs/{}/repos?{}", encode(org), page_query(&filter.page)),
            None => format!("/user/repos?{}", page_query(&filter.page)),
        };

        let scope = self.scope();
        let mut page = self
            .fetch_page(&path, "page", |r: &GitHubRepo| to_repository(&scope, r))
            .await?;

        if let Some(search) = &filter.search {
            let needle = search.to_lowercase();
            page.items.retain(|repo| repo.name.to_lowercase().contains(&needle));
        }
        Ok(page)
    }

    async fn fork_repository(
        &self,
        id: &ResourceId,
        target_namespace: Option<&str>,
    ) -> Result<Repository> {
        self.require(Capability::Forks)?;
        let full_name = self.native(id)?;

        let body = match target_namespace {
            Some(org) => json!({ "organization": org }),
            None => json!({}),
        };
        let repo: GitHubRepo = self
            .request(
                HttpMethod::Post,
                &format!("{}/forks", repo_path(full_name)?),
                Some(&body),
            )
            .await?;
        Ok(to_repository(&self.scope(), &repo))
    }

    async fn delete_repository(&self, id: &ResourceId) -> Result<()> {
        let full_name = self.native(id)?;
        self.request_empty(HttpMethod::Delete, &repo_path(full_name)?, None)
            .await
    }

    async fn create_user(&self, _user: &NewUser) -> Result<User> {
        self.require(Capability::CreateUsers)?;
        // No user-creation endpoint exists, even on Enterprise Server.
        Err(BackendError::unsupported(
            BACKEND_TYPE,
            Capability::CreateUsers,
        ))
    }

    async fn get_user(&self, id: &ResourceId) -> Result<User> {
        let login = self.native(id)?;
        let raw: GitHubUser = self
            .request(HttpMethod::Get, &format!("/users/{}", encode(login)), None)
            .await?;
        Ok(to_user(&self.scope(), &raw))
    }

    /// `/users` pages by the highest user id already seen (`since`).
    async fn list_users(&self, page: &PageRequest) -> Result<Page<User>> {
        let mut path = format!("/users?per_page={}", page.effective_per_page());
        if let Some(since) = &page.cursor {
            path.push_str(&format!("&since={}", encode(since)));
        }

        let scope = self.scope();
        self.fetch_page(&path, "since", |u: &GitHubUser| to_user(&scope, u))
            .await
    }

    /// Creates an organization through the Enterprise Server admin API,
    /// with the authenticated user as its owner.
    async fn create_group(&self, group: &NewGroup) -> Result<Group> {
        self.require(Capability::Groups)?;
        if group.parent.is_some() {
            self.require(Capability::NestedGroups)?;
        }
        require_non_empty("group name", &group.name)?;
        let login = group.effective_path();
        require_non_empty("group path", &login)?;

        let admin = self.session.username().await?;
        let body = json!({
            "login": login,
            "profile_name": group.name,
            "admin": admin,
        });
        let raw: GitHubOrg = self
            .request(HttpMethod::Post, "/admin/organizations", Some(&body))
            .await?;

        let mut created = to_group(&self.scope(), &raw);
        if created.description.is_none() {
            created.description = group.description.clone();
        }
        Ok(created)
    }

    async fn get_group(&self, id: &ResourceId) -> Result<Group> {
        self.require(Capability::Groups)?;
        let login = self.native(id)?;
        let raw: GitHubOrg = self
            .request(HttpMethod::Get, &format!("/orgs/{}", encode(login)), None)
            .await?;
        Ok(to_group(&self.scope(), &raw))
    }

    async fn list_groups(&self, page: &PageRequest) -> Result<Page<Group>> {
        self.require(Capability::Groups)?;
        let scope = self.scope();
        self.fetch_page(
            &format!("/user/orgs?{}", page_query(page)),
            "page",
            |o: &GitHubOrg| to_group(&scope, o),
        )
        .await
    }

    async fn add_user_to_group(
        &self,
        group: &ResourceId,
        user: &ResourceId,
        access: AccessLevel,
    ) -> Result<()> {
        self.require(Capability::Groups)?;
        let org = self.native(group)?;
        let login = self.native(user)?;

        let body = json!({ "role": org_role(access) });
        self.request_empty(
            HttpMethod::Put,
            &format!("/orgs/{}/memberships/{}", encode(org), encode(login)),
            Some(&body),
        )
        .await
    }

    async fn create_file(
        &self,
        repo: &ResourceId,
        path: &str,
        content: &str,
        commit_message: &str,
    ) -> Result<CommitRef> {
        let full_name = self.native(repo)?;
        require_non_empty("file path", path)?;
        require_non_empty("commit message", commit_message)?;

        let raw = self.fetch_repo(full_name).await?;
        let branch = to_repository(&self.scope(), &raw).default_branch;

        let body = json!({
            "message": commit_message,
            "content": BASE64.encode(content.as_bytes()),
            "branch": branch,
        });
        let written: GitHubContentWrite = self
            .request(
                HttpMethod::Put,
                &format!("{}/contents/{}", repo_path(full_name)?, content_path(path)),
                Some(&body),
            )
            .await?;

        Ok(to_commit(repo, &branch, &written))
    }

    async fn create_merge_request(
        &self,
        repo: &ResourceId,
        source_branch: &str,
        target_branch: &str,
        title: &str,
    ) -> Result<MergeRequest> {
        self.require(Capability::MergeRequests)?;
        let full_name = self.native(repo)?;
        require_non_empty("source branch", source_branch)?;
        require_non_empty("target branch", target_branch)?;
        require_non_empty("title", title)?;
        if source_branch == target_branch {
            return Err(BackendError::validation(
                "source and target branch must differ",
            ));
        }

        let body = json!({
            "title": title,
            "head": source_branch,
            "base": target_branch,
        });
        let pull: GitHubPull = self
            .request(
                HttpMethod::Post,
                &format!("{}/pulls", repo_path(full_name)?),
                Some(&body),
            )
            .await?;
        Ok(to_merge_request(&self.scope(), repo, full_name, &pull))
    }
}
