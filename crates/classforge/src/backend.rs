//! The backend contract shared by every git hosting provider.
//!
//! This module defines the `Backend` trait, the error taxonomy every
//! provider classifies into, and the small value types passed across the
//! contract boundary.
//!
//! # Example
//!
//! ```ignore
//! use classforge::backend::{Backend, RepositoryOptions};
//! use classforge::model::Visibility;
//!
//! async fn provision(backend: &dyn Backend) -> classforge::backend::Result<()> {
//!     let repo = backend
//!         .create_repository("homework-1", Visibility::Private, &RepositoryOptions::default())
//!         .await?;
//!     let same = backend.get_repository(&repo.id).await?;
//!     assert_eq!(same.name, "homework-1");
//!     Ok(())
//! }
//! ```

mod errors;
mod handle;
pub mod pager;
mod rate_limit;
pub(crate) mod session;
mod types;

pub use errors::{BackendError, ErrorKind, Result, short_error_message};
pub use handle::BackendHandle;
pub use pager::{Listing, Pager};
pub use rate_limit::ApiRateLimiter;
pub use types::{
    AuthResult, Backend, Credentials, DEFAULT_PER_PAGE, MAX_PER_PAGE, NewGroup, NewUser, Page,
    PageRequest, RepositoryFilter, RepositoryOptions, require_non_empty,
};

#[cfg(test)]
mod tests {
    use crate::capability::Capability;
    use crate::settings::ConfigError;

    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            BackendError::authentication("bad token").kind(),
            ErrorKind::Authentication
        );
        assert_eq!(
            BackendError::unsupported("github", Capability::CreateUsers).kind(),
            ErrorKind::UnsupportedCapability
        );
        assert_eq!(BackendError::not_found("x").kind(), ErrorKind::NotFound);
        assert_eq!(BackendError::validation("x").kind(), ErrorKind::Validation);
        assert_eq!(BackendError::conflict("x").kind(), ErrorKind::Conflict);
        assert_eq!(
            BackendError::transient("x", Some(503)).kind(),
            ErrorKind::TransientProvider
        );
        assert_eq!(
            BackendError::from(ConfigError::NoBackendConfigured).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            BackendError::unknown_backend("bitbucket").kind(),
            ErrorKind::UnknownBackend
        );
    }

    #[test]
    fn test_only_transient_errors_are_retryable() {
        assert!(BackendError::transient("timeout", None).is_retryable());
        assert!(!BackendError::validation("bad").is_retryable());
        assert!(!BackendError::authentication("bad").is_retryable());
        assert!(!BackendError::conflict("repo").is_retryable());
        assert!(!BackendError::not_found("repo").is_retryable());
    }

    #[test]
    fn test_unsupported_message_names_capability() {
        let err = BackendError::unsupported("github", Capability::NestedGroups);
        let msg = err.to_string();
        assert!(msg.contains("github"));
        assert!(msg.contains("nested_groups"));
    }

    #[test]
    fn test_unknown_backend_message_names_type() {
        let err = BackendError::unknown_backend("bitbucket");
        assert!(err.to_string().contains("bitbucket"));
    }

    #[test]
    fn test_guidance() {
        assert!(BackendError::authentication("x").guidance().is_some());
        assert!(BackendError::transient("x", None).guidance().is_some());
        assert!(BackendError::not_found("x").guidance().is_none());
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::UnsupportedCapability).unwrap();
        assert_eq!(json, "\"unsupported_capability\"");
        assert_eq!(ErrorKind::TransientProvider.to_string(), "transient_provider");
    }

    #[test]
    fn test_short_error_message_takes_first_line() {
        let err = BackendError::validation("first line\nsecond line");
        assert_eq!(short_error_message(&err), "Validation error: first line");
    }

    #[test]
    fn test_page_request_clamps_per_page() {
        assert_eq!(PageRequest::first(0).effective_per_page(), 1);
        assert_eq!(PageRequest::first(500).effective_per_page(), MAX_PER_PAGE);
        assert_eq!(PageRequest::default().effective_per_page(), DEFAULT_PER_PAGE);
    }

    #[test]
    fn test_page_has_more() {
        let page = Page {
            items: vec![1, 2],
            next_cursor: Some("3".to_string()),
            total: None,
        };
        assert!(page.has_more());
        assert!(!Page::last(vec![1]).has_more());
    }

    #[test]
    fn test_new_group_effective_path() {
        assert_eq!(NewGroup::named("CS 101: Intro").effective_path(), "cs-101-intro");
        let group = NewGroup {
            path: Some("custom".to_string()),
            ..NewGroup::named("Whatever")
        };
        assert_eq!(group.effective_path(), "custom");
    }

    #[test]
    fn test_require_non_empty() {
        assert!(require_non_empty("name", "repo").is_ok());
        let err = require_non_empty("name", "   ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = Credentials::new("glpat-secret");
        let debug = format!("{creds:?}");
        assert!(!debug.contains("glpat-secret"));
        assert_eq!(creds.token(), "glpat-secret");
    }

    #[test]
    fn test_new_user_debug_is_redacted() {
        let user = NewUser {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            password: Some("hunter2".to_string()),
        };
        let debug = format!("{user:?}");
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }
}
