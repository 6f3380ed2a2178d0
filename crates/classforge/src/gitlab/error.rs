//! Error types for GitLab API operations.

use thiserror::Error;

use crate::backend::BackendError;

/// Errors that can occur when interacting with the GitLab API.
#[derive(Debug, Error)]
pub enum GitLabError {
    /// The request never produced a response.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The response body did not have the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },
}

impl GitLabError {
    /// Build an error from a non-2xx response.
    ///
    /// GitLab reports failures as `{"message": "..."}`, as
    /// `{"message": {"field": ["reason"]}}` for validation failures, or as
    /// `{"error": "..."}` for OAuth problems.
    pub fn from_response(status: u16, body: &[u8], retry_after: Option<&str>) -> Self {
        if status == 429 {
            return GitLabError::RateLimited {
                retry_after: retry_after.and_then(|v| v.trim().parse().ok()),
            };
        }
        GitLabError::Api {
            status,
            message: extract_message(body),
        }
    }
}

fn extract_message(body: &[u8]) -> String {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) else {
        return String::from_utf8_lossy(body).trim().to_string();
    };

    match value.get("message").or_else(|| value.get("error")) {
        Some(serde_json::Value::String(message)) => message.clone(),
        Some(serde_json::Value::Object(fields)) => fields
            .iter()
            .map(|(field, reasons)| match reasons {
                serde_json::Value::Array(items) => {
                    let reasons: Vec<&str> = items.iter().filter_map(|r| r.as_str()).collect();
                    format!("{} {}", field, reasons.join(", "))
                }
                other => format!("{} {}", field, other),
            })
            .collect::<Vec<_>>()
            .join("; "),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join("; "),
        Some(other) => other.to_string(),
        None => value.to_string(),
    }
}

fn is_duplicate(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("has already been taken") || lower.contains("already exists")
}

impl From<GitLabError> for BackendError {
    fn from(err: GitLabError) -> Self {
        match err {
            GitLabError::Http(message) => BackendError::transient(message, None),
            GitLabError::Json(e) => {
                // Only decoded after a 2xx, when the request has already been applied.
                BackendError::validation(format!("unexpected response from GitLab: {}", e))
            }
            GitLabError::RateLimited { .. } => {
                BackendError::transient("GitLab rate limit exceeded", Some(429))
            }
            GitLabError::Api { status, message } => match status {
                401 => BackendError::authentication(message),
                403 => BackendError::forbidden(message),
                404 => BackendError::not_found(message),
                409 => BackendError::conflict(message),
                400 | 422 if is_duplicate(&message) => BackendError::conflict(message),
                500..=599 => BackendError::transient(message, Some(status)),
                _ => BackendError::validation(message),
            },
        }
    }
}

/// Get a short error message suitable for display.
pub fn short_error_message(err: &GitLabError) -> String {
    match err {
        GitLabError::Http(_) => "Network error".to_string(),
        GitLabError::Json(_) => "JSON parse error".to_string(),
        GitLabError::Api { status, message } => {
            if message.len() > 50 {
                let truncated: String = message.chars().take(47).collect();
                format!("HTTP {}: {}...", status, truncated)
            } else {
                format!("HTTP {}: {}", status, message)
            }
        }
        GitLabError::RateLimited { .. } => "Rate limited".to_string(),
    }
}
