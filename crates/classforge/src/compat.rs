//! Compatibility surface for code written against the single-provider
//! client.
//!
//! [`LegacyGitClient`] keeps the old method names and parameter order and
//! returns GitLab-v4-shaped payloads, while every call is forwarded to
//! whichever [`Backend`](crate::backend::Backend) its [`BackendHandle`]
//! currently holds. The legacy surface is frozen: it is kept working but new
//! operations are only added to the backend contract.
//!
//! # Example
//!
//! ```ignore
//! use classforge::compat::LegacyGitClient;
//! use classforge::factory::BackendFactory;
//!
//! let factory = BackendFactory::new();
//! let document = factory.load_config_file("classforge.yaml")?;
//! let client = LegacyGitClient::from_config(&factory, &document).await?;
//!
//! let project = client.create_project("homework-1", None).await?;
//! println!("{}", project.http_url_to_repo);
//! ```
//!
//! [`BackendHandle`]: crate::backend::BackendHandle

mod legacy;
mod shapes;

pub use legacy::LegacyGitClient;
pub use shapes::{
    LegacyAuthor, LegacyError, LegacyFile, LegacyGroup, LegacyMergeRequest, LegacyNamespace,
    LegacyProject, LegacyUser,
};
