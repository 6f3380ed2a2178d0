use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::Visibility;
use crate::retry::{
    DEFAULT_BACKOFF_BASE_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF_MS, RetryPolicy,
};

use super::ConfigError;

/// Default HTTP timeout for provider requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A parsed configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigDocument {
    pub backend: BackendSection,
}

/// The `backend` section of a configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSection {
    /// Registered backend type name.
    #[serde(rename = "type")]
    pub backend_type: Option<String>,
    /// Raw provider settings, placeholders unexpanded.
    pub settings: Map<String, Value>,
    pub defaults: BackendDefaults,
}

/// Defaults applied by a backend when the caller does not say otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendDefaults {
    pub visibility: Visibility,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_backoff_base_ms() -> u64 {
    DEFAULT_BACKOFF_BASE_MS
}

fn default_max_backoff_ms() -> u64 {
    DEFAULT_MAX_BACKOFF_MS
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Typed view of `backend.settings` after placeholder expansion.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Provider base URL. Each provider has its own default.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    /// Namespace used for repository creation when none is given.
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Client-side pacing; unlimited when absent.
    #[serde(default)]
    pub requests_per_second: Option<u32>,
    /// Provider-specific settings not covered above.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            namespace: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            requests_per_second: None,
            extra: BTreeMap::new(),
        }
    }
}

impl fmt::Debug for BackendSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSettings")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("namespace", &self.namespace)
            .field("max_attempts", &self.max_attempts)
            .field("backoff_base_ms", &self.backoff_base_ms)
            .field("max_backoff_ms", &self.max_backoff_ms)
            .field("timeout_secs", &self.timeout_secs)
            .field("requests_per_second", &self.requests_per_second)
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl BackendSettings {
    /// Deserialize expanded settings and check their ranges.
    pub fn from_map(map: Map<String, Value>) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_value(Value::Object(map))
            .map_err(|e| ConfigError::Validation(format!("backend.settings: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "backend.settings.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "backend.settings.timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.requests_per_second == Some(0) {
            return Err(ConfigError::Validation(
                "backend.settings.requests_per_second must be at least 1".to_string(),
            ));
        }
        if let Some(url) = &self.url
            && !(url.starts_with("https://") || url.starts_with("http://"))
        {
            return Err(ConfigError::Validation(format!(
                "backend.settings.url must be an http(s) URL, got `{url}`"
            )));
        }
        Ok(())
    }

    /// The token, or `MissingSetting` when it is absent or blank.
    pub fn require_token(&self) -> Result<&str, ConfigError> {
        self.token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingSetting {
                setting: "backend.settings.token".to_string(),
            })
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.backoff_base_ms),
            Duration::from_millis(self.max_backoff_ms),
        )
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Everything a backend constructor needs, fully resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBackend {
    pub backend_type: String,
    pub settings: BackendSettings,
    pub defaults: BackendDefaults,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn defaults_apply_when_settings_are_empty() {
        let settings = BackendSettings::from_map(Map::new()).unwrap();
        assert_eq!(settings, BackendSettings::default());
        assert_eq!(settings.retry_policy(), RetryPolicy::default());
        assert_eq!(settings.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn unknown_keys_are_kept_in_extra() {
        let settings = BackendSettings::from_map(map(json!({
            "url": "https://gitlab.example.edu",
            "token": "abc",
            "ssl_verify": false,
        })))
        .unwrap();
        assert_eq!(settings.url.as_deref(), Some("https://gitlab.example.edu"));
        assert_eq!(settings.extra.get("ssl_verify"), Some(&json!(false)));
    }

    #[test]
    fn retry_knobs_feed_the_policy() {
        let settings = BackendSettings::from_map(map(json!({
            "max_attempts": 2,
            "backoff_base_ms": 100,
            "max_backoff_ms": 1000,
        })))
        .unwrap();
        let policy = settings.retry_policy();
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.backoff_base, Duration::from_millis(100));
        assert_eq!(policy.max_backoff, Duration::from_secs(1));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for bad in [
            json!({"max_attempts": 0}),
            json!({"timeout_secs": 0}),
            json!({"requests_per_second": 0}),
            json!({"url": "gitlab.example.edu"}),
            json!({"max_attempts": "many"}),
        ] {
            let err = BackendSettings::from_map(map(bad.clone())).unwrap_err();
            assert!(matches!(err, ConfigError::Validation(_)), "{bad}: {err:?}");
        }
    }

    #[test]
    fn require_token_rejects_blank_tokens() {
        let mut settings = BackendSettings::default();
        assert!(matches!(
            settings.require_token(),
            Err(ConfigError::MissingSetting { .. })
        ));
        settings.token = Some("  ".to_string());
        assert!(settings.require_token().is_err());
        settings.token = Some("glpat-x".to_string());
        assert_eq!(settings.require_token().unwrap(), "glpat-x");
    }

    #[test]
    fn debug_output_redacts_token() {
        let settings = BackendSettings {
            token: Some("glpat-secret".to_string()),
            ..Default::default()
        };
        let debug = format!("{settings:?}");
        assert!(!debug.contains("glpat-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
