//! GitLab backend.
//!
//! Talks to the GitLab REST v4 API of gitlab.com or a self-managed instance
//! and translates projects, users, groups and merge requests into the shared
//! data model. GitLab supports every capability natively.
//!
//! # Module Structure
//!
//! - [`error`] - Error types and their classification
//! - `types` - Wire types for the API responses we read
//! - `client` - The [`GitLabBackend`] itself
//! - `convert` - Translation into the shared data model
//!
//! # Example
//!
//! ```ignore
//! use classforge::factory::BackendFactory;
//! use serde_json::json;
//!
//! let settings = json!({"url": "https://gitlab.example.edu", "token": "${GITLAB_TOKEN}"});
//! let backend = BackendFactory::new()
//!     .create_backend("gitlab", settings.as_object().unwrap())
//!     .await?;
//! ```

mod client;
mod convert;
pub mod error;
mod types;

pub use client::{BACKEND_TYPE, DEFAULT_HOST, GitLabBackend};
pub use error::GitLabError;
