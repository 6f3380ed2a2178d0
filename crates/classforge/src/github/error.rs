//! Error types for GitHub API operations.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::backend::BackendError;
use crate::http::{HttpHeaders, header_get};

/// Errors that can occur when interacting with the GitHub API.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// The request never produced a response.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The response body did not have the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Primary or secondary rate limit exceeded.
    #[error("Rate limit exceeded. Resets at {reset_at:?}")]
    RateLimited { reset_at: Option<DateTime<Utc>> },
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
    field: Option<String>,
    code: Option<String>,
}

impl ErrorDetail {
    fn describe(&self) -> Option<String> {
        if let Some(message) = &self.message {
            return Some(message.clone());
        }
        match (&self.field, &self.code) {
            (Some(field), Some(code)) => Some(format!("{} {}", field, code.replace('_', " "))),
            (None, Some(code)) => Some(code.replace('_', " ")),
            _ => None,
        }
    }
}

impl GitHubError {
    /// Build an error from a non-2xx response.
    ///
    /// GitHub signals its primary rate limit with 403 or 429 and
    /// `x-ratelimit-remaining: 0`, and its secondary limit with a 403 whose
    /// message mentions it.
    pub fn from_response(status: u16, headers: &HttpHeaders, body: &[u8]) -> Self {
        let message = extract_message(body);

        let exhausted = header_get(headers, "x-ratelimit-remaining").map(str::trim) == Some("0");
        let secondary = message.to_ascii_lowercase().contains("secondary rate limit");
        if status == 429 || (status == 403 && (exhausted || secondary)) {
            let reset_at = header_get(headers, "x-ratelimit-reset")
                .and_then(|v| v.trim().parse::<i64>().ok())
                .and_then(|epoch| DateTime::from_timestamp(epoch, 0));
            return GitHubError::RateLimited { reset_at };
        }

        GitHubError::Api { status, message }
    }
}

fn extract_message(body: &[u8]) -> String {
    let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body) else {
        return String::from_utf8_lossy(body).trim().to_string();
    };

    let details: Vec<String> = parsed.errors.iter().filter_map(ErrorDetail::describe).collect();
    match (parsed.message, details.is_empty()) {
        (Some(message), true) => message,
        (Some(message), false) => format!("{}: {}", message, details.join("; ")),
        (None, _) => details.join("; "),
    }
}

fn is_duplicate(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("already exists") || lower.contains("already_exists")
}

impl From<GitHubError> for BackendError {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::Http(message) => BackendError::transient(message, None),
            GitHubError::Json(e) => {
                // Only decoded after a 2xx, when the request has already been applied.
                BackendError::validation(format!("unexpected response from GitHub: {}", e))
            }
            GitHubError::RateLimited { reset_at } => {
                let message = match reset_at {
                    Some(reset_at) => format!("GitHub rate limit exceeded until {}", reset_at),
                    None => "GitHub rate limit exceeded".to_string(),
                };
                BackendError::transient(message, Some(429))
            }
            GitHubError::Api { status, message } => match status {
                401 => BackendError::authentication(message),
                403 => BackendError::forbidden(message),
                404 => BackendError::not_found(message),
                409 => BackendError::conflict(message),
                422 if is_duplicate(&message) => BackendError::conflict(message),
                500..=599 => BackendError::transient(message, Some(status)),
                _ => BackendError::validation(message),
            },
        }
    }
}

/// Get a short error message suitable for display.
pub fn short_error_message(err: &GitHubError) -> String {
    match err {
        GitHubError::Http(_) => "Network error".to_string(),
        GitHubError::Json(_) => "JSON parse error".to_string(),
        GitHubError::Api { status, message } => {
            if message.len() > 50 {
                let truncated: String = message.chars().take(47).collect();
                format!("HTTP {}: {}...", status, truncated)
            } else {
                format!("HTTP {}: {}", status, message)
            }
        }
        GitHubError::RateLimited { .. } => "Rate limited".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ErrorKind;

    fn headers(pairs: &[(&str, &str)]) -> HttpHeaders {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn classify(status: u16, pairs: &[(&str, &str)], body: &str) -> BackendError {
        GitHubError::from_response(status, &headers(pairs), body.as_bytes()).into()
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(
            classify(401, &[], r#"{"message":"Bad credentials"}"#).kind(),
            ErrorKind::Authentication
        );
        let forbidden = classify(
            403,
            &[("x-ratelimit-remaining", "4999")],
            r#"{"message":"Must have admin rights"}"#,
        );
        assert_eq!(forbidden.kind(), ErrorKind::Authentication);
        assert!(forbidden.is_forbidden());
        assert!(forbidden.to_string().starts_with("Permission denied"));
        assert!(!forbidden.guidance().unwrap_or_default().contains("re-authenticate"));
        assert_eq!(
            classify(404, &[], r#"{"message":"Not Found"}"#).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(classify(500, &[], "").kind(), ErrorKind::TransientProvider);
        assert_eq!(
            classify(422, &[], r#"{"message":"Validation Failed"}"#).kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_exhausted_rate_limit_is_transient() {
        let err = GitHubError::from_response(
            403,
            &headers(&[("X-RateLimit-Remaining", "0"), ("X-RateLimit-Reset", "1700000000")]),
            br#"{"message":"API rate limit exceeded"}"#,
        );
        assert!(matches!(err, GitHubError::RateLimited { reset_at: Some(_) }));
        assert!(BackendError::from(err).is_retryable());
    }

    #[test]
    fn test_secondary_rate_limit_is_transient() {
        let err = classify(
            403,
            &[],
            r#"{"message":"You have exceeded a secondary rate limit."}"#,
        );
        assert_eq!(err.kind(), ErrorKind::TransientProvider);
    }

    #[test]
    fn test_duplicate_repository_is_conflict() {
        let err = classify(
            422,
            &[],
            r#"{"message":"Repository creation failed.","errors":[{"resource":"Repository","code":"custom","field":"name","message":"name already exists on this account"}]}"#,
        );
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.to_string().contains("name already exists on this account"));
    }

    #[test]
    fn test_error_details_without_message() {
        let err = classify(
            422,
            &[],
            r#"{"message":"Validation Failed","errors":[{"resource":"PullRequest","field":"head","code":"invalid"}]}"#,
        );
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("head invalid"));
    }

    #[test]
    fn test_decode_errors_are_not_retryable() {
        let json_err = serde_json::from_str::<serde_json::Value>("[").unwrap_err();
        let err = BackendError::from(GitHubError::Json(json_err));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_non_json_body() {
        let err = GitHubError::from_response(502, &Vec::new(), b"<html>Bad Gateway</html>");
        assert!(matches!(err, GitHubError::Api { status: 502, ref message } if message.contains("Bad Gateway")));
    }

    #[test]
    fn test_short_error_message() {
        assert_eq!(
            short_error_message(&GitHubError::RateLimited { reset_at: None }),
            "Rate limited"
        );
        assert_eq!(
            short_error_message(&GitHubError::Api {
                status: 404,
                message: "Not Found".to_string()
            }),
            "HTTP 404: Not Found"
        );
    }
}
