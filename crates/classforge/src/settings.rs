//! Backend configuration documents.
//!
//! A configuration document selects one backend and carries its connection
//! settings:
//!
//! ```yaml
//! backend:
//!   type: gitlab
//!   settings:
//!     url: https://gitlab.example.edu
//!     token: ${GITLAB_TOKEN}
//!     max_attempts: 4
//!   defaults:
//!     visibility: private
//! ```
//!
//! [`ConfigLoader`] parses YAML or JSON documents through the `config` crate,
//! optionally layering `CLASSFORGE_`-prefixed environment variables on top
//! (e.g. `CLASSFORGE_BACKEND__TYPE=github`). Placeholders of the form
//! `${VAR}` are left untouched by the loader and expanded by
//! [`expand_placeholders`] when a backend is constructed.

mod document;
mod expand;
mod loader;

use thiserror::Error;

pub use document::{
    BackendDefaults, BackendSection, BackendSettings, ConfigDocument, ResolvedBackend,
};
pub use expand::{EnvLookup, expand_placeholders, process_env};
pub use loader::{ConfigFormat, ConfigLoader, ENV_PREFIX};

/// Errors raised while loading or resolving backend configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The document is not well-formed YAML/JSON.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// The document is well-formed but its content is invalid.
    #[error("invalid configuration: {0}")]
    Validation(String),

    /// A `${VAR}` placeholder resolved to nothing.
    #[error("missing credential: `${{{variable}}}` referenced by `{setting}` is unset or empty")]
    MissingCredential { variable: String, setting: String },

    /// A setting required by the selected backend is absent.
    #[error("missing setting `{setting}`")]
    MissingSetting { setting: String },

    /// Neither the caller nor the document named a backend type.
    #[error("no backend configured: set `backend.type` or pass a backend type explicitly")]
    NoBackendConfigured,

    #[error("failed to read configuration file {path}: {message}")]
    Io { path: String, message: String },
}
