use serde::Serialize;
use thiserror::Error;

use crate::capability::Capability;
use crate::settings::ConfigError;

/// Machine-readable error kind shared by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Authentication,
    UnsupportedCapability,
    NotFound,
    Validation,
    Conflict,
    TransientProvider,
    Configuration,
    UnknownBackend,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Authentication => "authentication",
            ErrorKind::UnsupportedCapability => "unsupported_capability",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Validation => "validation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::TransientProvider => "transient_provider",
            ErrorKind::Configuration => "configuration",
            ErrorKind::UnknownBackend => "unknown_backend",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can cross the backend contract boundary.
///
/// Providers classify every native failure into exactly one of these
/// variants; no provider-specific error type escapes a backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Credentials are missing, invalid or expired, or (`forbidden`) valid
    /// but lacking permission for the operation.
    #[error("{}: {message}", auth_label(.forbidden))]
    Authentication { message: String, forbidden: bool },

    /// The backend's capability descriptor marks the operation unsupported.
    #[error("Operation not supported by the {backend} backend: missing capability `{capability}`")]
    UnsupportedCapability {
        backend: String,
        capability: Capability,
    },

    /// The identifier does not resolve on this backend.
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Malformed input, or an identifier from a different backend instance.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// The resource already exists.
    #[error("Conflict: {resource}")]
    Conflict { resource: String },

    /// Network failure, rate limiting, or a 5xx response. Retryable.
    #[error("Transient provider error: {message}")]
    TransientProvider {
        message: String,
        status: Option<u16>,
    },

    /// Bad or incomplete backend configuration.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The factory has no constructor registered for this type.
    #[error("Unknown backend type: {backend_type}")]
    UnknownBackend { backend_type: String },
}

impl BackendError {
    #[inline]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            forbidden: false,
        }
    }

    /// The credentials were accepted but may not perform this operation.
    #[inline]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            forbidden: true,
        }
    }

    #[inline]
    pub fn unsupported(backend: impl Into<String>, capability: Capability) -> Self {
        Self::UnsupportedCapability {
            backend: backend.into(),
            capability,
        }
    }

    #[inline]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    #[inline]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    #[inline]
    pub fn conflict(resource: impl Into<String>) -> Self {
        Self::Conflict {
            resource: resource.into(),
        }
    }

    #[inline]
    pub fn transient(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::TransientProvider {
            message: message.into(),
            status,
        }
    }

    #[inline]
    pub fn unknown_backend(backend_type: impl Into<String>) -> Self {
        Self::UnknownBackend {
            backend_type: backend_type.into(),
        }
    }

    /// The machine-readable kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::UnsupportedCapability { .. } => ErrorKind::UnsupportedCapability,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::TransientProvider { .. } => ErrorKind::TransientProvider,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::UnknownBackend { .. } => ErrorKind::UnknownBackend,
        }
    }

    /// Whether the operation may succeed if simply retried.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientProvider { .. })
    }

    /// Whether valid credentials were refused permission (HTTP 403).
    #[inline]
    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Authentication { forbidden: true, .. })
    }

    /// A short hint a CLI can show next to the error message.
    #[must_use]
    pub fn guidance(&self) -> Option<&'static str> {
        match self.kind() {
            ErrorKind::Authentication if self.is_forbidden() => {
                Some("the token lacks permission for this operation, check its scopes and role")
            }
            ErrorKind::Authentication => Some("token invalid or expired, please re-authenticate"),
            ErrorKind::UnsupportedCapability => {
                Some("this backend does not offer the requested feature")
            }
            ErrorKind::TransientProvider => Some("the provider is unavailable, try again later"),
            ErrorKind::Configuration => Some("check the backend section of your configuration"),
            ErrorKind::UnknownBackend => Some("check `backend.type` in your configuration"),
            ErrorKind::NotFound | ErrorKind::Validation | ErrorKind::Conflict => None,
        }
    }
}

fn auth_label(forbidden: &bool) -> &'static str {
    if *forbidden {
        "Permission denied"
    } else {
        "Authentication failed"
    }
}

/// Extract a short error message suitable for display.
///
/// Takes the first line of an error message, which keeps multi-line
/// provider responses out of progress output and logs.
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;
