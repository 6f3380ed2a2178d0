use std::sync::Arc;

use crate::backend::{
    Backend, BackendError, BackendHandle, DEFAULT_PER_PAGE, NewGroup, NewUser, PageRequest,
    RepositoryFilter, RepositoryOptions, pager,
};
use crate::factory::BackendFactory;
use crate::model::AccessLevel;
use crate::settings::ConfigDocument;

use super::shapes::{
    LegacyError, LegacyFile, LegacyGroup, LegacyMergeRequest, LegacyProject, LegacyUser,
};

type LegacyResult<T> = std::result::Result<T, LegacyError>;

/// The single-provider client surface, backed by any [`Backend`].
///
/// Each method forwards to exactly one backend operation on the backend the
/// handle holds at call time, then reshapes the result. Identifiers are the
/// raw provider values legacy code already stores.
#[derive(Debug, Clone)]
pub struct LegacyGitClient {
    handle: BackendHandle,
}

impl LegacyGitClient {
    pub fn new(handle: BackendHandle) -> Self {
        Self { handle }
    }

    pub fn from_backend(backend: Arc<dyn Backend>) -> Self {
        Self::new(BackendHandle::new(backend))
    }

    /// Build the configured backend through `factory` and wrap it.
    pub async fn from_config(
        factory: &BackendFactory,
        document: &ConfigDocument,
    ) -> LegacyResult<Self> {
        let backend = factory.create_from_config(document, None).await?;
        Ok(Self::from_backend(backend))
    }

    /// The handle this client reads on every call. Replacing the backend
    /// through it (or any clone of it) redirects subsequent calls.
    pub fn handle(&self) -> &BackendHandle {
        &self.handle
    }

    fn backend(&self) -> Arc<dyn Backend> {
        self.handle.current()
    }

    /// Create a project with the backend's default visibility.
    pub async fn create_project(
        &self,
        name: &str,
        namespace: Option<&str>,
    ) -> LegacyResult<LegacyProject> {
        let backend = self.backend();
        let options = RepositoryOptions {
            namespace: namespace.map(str::to_string),
            ..Default::default()
        };
        let repo = backend
            .create_repository(name, backend.defaults().visibility, &options)
            .await?;
        Ok(repo.into())
    }

    pub async fn get_project(&self, project_id: &str) -> LegacyResult<LegacyProject> {
        let backend = self.backend();
        let repo = backend.get_repository(&backend.adopt_id(project_id)).await?;
        Ok(repo.into())
    }

    /// Every project visible to the caller, optionally within `namespace`
    /// and matching `search`.
    pub async fn list_projects(
        &self,
        namespace: Option<&str>,
        search: Option<&str>,
    ) -> LegacyResult<Vec<LegacyProject>> {
        let backend = self.backend();
        let filter = RepositoryFilter {
            namespace: namespace.map(str::to_string),
            search: search.map(str::to_string),
            page: PageRequest::first(DEFAULT_PER_PAGE),
        };
        let repos = pager::repositories(backend.as_ref(), filter)
            .collect_all()
            .await?;
        Ok(repos.into_iter().map(LegacyProject::from).collect())
    }

    pub async fn fork_project(
        &self,
        project_id: &str,
        namespace: Option<&str>,
    ) -> LegacyResult<LegacyProject> {
        let backend = self.backend();
        let repo = backend
            .fork_repository(&backend.adopt_id(project_id), namespace)
            .await?;
        Ok(repo.into())
    }

    pub async fn delete_project(&self, project_id: &str) -> LegacyResult<()> {
        let backend = self.backend();
        backend
            .delete_repository(&backend.adopt_id(project_id))
            .await?;
        Ok(())
    }

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        name: &str,
        password: Option<&str>,
    ) -> LegacyResult<LegacyUser> {
        let backend = self.backend();
        let user = backend
            .create_user(&NewUser {
                username: username.to_string(),
                email: email.to_string(),
                name: name.to_string(),
                password: password.map(str::to_string),
            })
            .await?;
        Ok(user.into())
    }

    pub async fn get_user(&self, user_id: &str) -> LegacyResult<LegacyUser> {
        let backend = self.backend();
        let user = backend.get_user(&backend.adopt_id(user_id)).await?;
        Ok(user.into())
    }

    /// Create a group with the backend's default visibility.
    pub async fn create_group(
        &self,
        name: &str,
        path: Option<&str>,
        parent_id: Option<&str>,
    ) -> LegacyResult<LegacyGroup> {
        let backend = self.backend();
        let group = backend
            .create_group(&NewGroup {
                name: name.to_string(),
                path: path.map(str::to_string),
                description: None,
                visibility: backend.defaults().visibility,
                parent: parent_id.map(str::to_string),
            })
            .await?;
        Ok(group.into())
    }

    /// `access_level` is GitLab's numeric level (10, 20, 30, 40 or 50).
    pub async fn add_user_to_group(
        &self,
        group_id: &str,
        user_id: &str,
        access_level: u32,
    ) -> LegacyResult<()> {
        let access = AccessLevel::from_gitlab_level(access_level).ok_or_else(|| {
            BackendError::validation(format!("unknown access level {}", access_level))
        })?;

        let backend = self.backend();
        backend
            .add_user_to_group(
                &backend.adopt_id(group_id),
                &backend.adopt_id(user_id),
                access,
            )
            .await?;
        Ok(())
    }

    pub async fn create_file(
        &self,
        project_id: &str,
        file_path: &str,
        content: &str,
        commit_message: &str,
    ) -> LegacyResult<LegacyFile> {
        let backend = self.backend();
        let commit = backend
            .create_file(&backend.adopt_id(project_id), file_path, content, commit_message)
            .await?;
        Ok(commit.into())
    }

    pub async fn create_merge_request(
        &self,
        project_id: &str,
        source_branch: &str,
        target_branch: &str,
        title: &str,
    ) -> LegacyResult<LegacyMergeRequest> {
        let backend = self.backend();
        let mr = backend
            .create_merge_request(
                &backend.adopt_id(project_id),
                source_branch,
                target_branch,
                title,
            )
            .await?;
        Ok(mr.into())
    }
}
