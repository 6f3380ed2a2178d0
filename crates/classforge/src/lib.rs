//! Classforge - a backend abstraction over git hosting providers.
//!
//! Course tooling talks to one [`Backend`] trait for repositories, users,
//! groups, files and merge requests; GitLab and GitHub implement it, and
//! further providers can be registered at start-up without touching this
//! crate.
//!
//! # Features
//!
//! - `gitlab` - GitLab REST v4 backend (default)
//! - `github` - GitHub REST backend (default)
//!
//! # Example
//!
//! ```ignore
//! use classforge::{Backend, BackendFactory, RepositoryOptions, Visibility};
//!
//! let factory = BackendFactory::new();
//! let document = factory.load_config_file("classforge.yaml")?;
//! let backend = factory.create_from_config(&document, None).await?;
//!
//! let repo = backend
//!     .create_repository("homework-1", Visibility::Private, &RepositoryOptions::default())
//!     .await?;
//! println!("{}", repo.clone_url);
//! ```

pub mod backend;
pub mod capability;
pub mod compat;
pub mod factory;
pub mod http;
pub mod model;
pub mod retry;
pub mod settings;

#[cfg(feature = "github")]
pub mod github;

#[cfg(feature = "gitlab")]
pub mod gitlab;

pub use backend::{
    AuthResult, Backend, BackendError, BackendHandle, Credentials, ErrorKind, NewGroup, NewUser,
    Page, PageRequest, Pager, RepositoryFilter, RepositoryOptions,
};
pub use capability::{Capabilities, Capability, ChangeRequestModel, GroupModel};
pub use compat::{LegacyError, LegacyGitClient};
pub use factory::{BackendFactory, BackendRegistry};
pub use model::{
    AccessLevel, CommitRef, FileRef, Group, MergeRequest, MergeRequestState, Repository,
    ResourceId, User, Visibility,
};
pub use settings::{BackendDefaults, BackendSettings, ConfigDocument, ConfigError, ConfigLoader};
