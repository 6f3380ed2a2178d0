use std::sync::Arc;

use tokio::sync::Mutex;

use super::errors::{BackendError, Result};
use super::types::{AuthResult, Credentials};

/// Authenticated session shared by clones of a provider.
#[derive(Clone, Default)]
pub(crate) struct SessionCache {
    inner: Arc<Mutex<Option<Session>>>,
}

struct Session {
    credentials: Credentials,
    result: AuthResult,
}

impl SessionCache {
    /// The cached result, if the session was established with `credentials`.
    pub(crate) async fn cached(&self, credentials: &Credentials) -> Option<AuthResult> {
        let session = self.inner.lock().await;
        session
            .as_ref()
            .filter(|s| s.credentials == *credentials)
            .map(|s| s.result.clone())
    }

    /// Replace the session.
    pub(crate) async fn store(&self, credentials: Credentials, result: AuthResult) {
        let mut session = self.inner.lock().await;
        *session = Some(Session {
            credentials,
            result,
        });
    }

    /// Token of the current session.
    pub(crate) async fn token(&self) -> Result<String> {
        let session = self.inner.lock().await;
        session
            .as_ref()
            .map(|s| s.credentials.token().to_string())
            .ok_or_else(|| BackendError::authentication("backend is not authenticated"))
    }

    /// The authenticated user's login.
    pub(crate) async fn username(&self) -> Result<String> {
        let session = self.inner.lock().await;
        session
            .as_ref()
            .map(|s| s.result.user.username.clone())
            .ok_or_else(|| BackendError::authentication("backend is not authenticated"))
    }
}
