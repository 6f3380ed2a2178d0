//! GitHub backend.
//!
//! Talks to the REST API of github.com or GitHub Enterprise Server and
//! translates repositories, users, organizations and pull requests into the
//! shared data model. Organizations stand in for groups; pull requests stand
//! in for merge requests.
//!
//! # Module Structure
//!
//! - [`error`] - Error types and their classification
//! - `types` - Wire types for the API responses we read
//! - `pagination` - `Link` header parsing
//! - `client` - The [`GitHubBackend`] itself
//! - `convert` - Translation into the shared data model
//!
//! # Example
//!
//! ```ignore
//! use classforge::factory::BackendFactory;
//! use serde_json::json;
//!
//! let settings = json!({"token": "${GITHUB_TOKEN}", "namespace": "cs101-fall"});
//! let backend = BackendFactory::new()
//!     .create_backend("github", settings.as_object().unwrap())
//!     .await?;
//! ```

mod client;
mod convert;
pub mod error;
mod pagination;
mod types;

pub use client::{BACKEND_TYPE, DEFAULT_API_URL, GitHubBackend};
pub use error::GitHubError;
pub use pagination::{LinkPagination, parse_link_header};
