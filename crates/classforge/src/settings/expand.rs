use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::{Map, Value};

use super::ConfigError;

/// Source of environment variable values.
///
/// The factory takes this as a parameter so callers (and tests) can resolve
/// placeholders from something other than the process environment.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Look variables up in the process environment.
#[must_use]
pub fn process_env() -> EnvLookup {
    Arc::new(|name: &str| std::env::var(name).ok())
}

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
});

/// Expand every `${VAR}` placeholder in string values of `settings`.
///
/// Nested objects and arrays are walked recursively. A placeholder whose
/// variable is unset or blank fails with [`ConfigError::MissingCredential`]
/// naming both the variable and the setting that referenced it. Substituted
/// values are not expanded again.
pub fn expand_placeholders(
    settings: &Map<String, Value>,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<Map<String, Value>, ConfigError> {
    settings
        .iter()
        .map(|(key, value)| Ok((key.clone(), expand_value(key, value, env)?)))
        .collect::<Result<Map<_, _>, ConfigError>>()
}

fn expand_value(
    setting: &str,
    value: &Value,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<Value, ConfigError> {
    match value {
        Value::String(raw) => Ok(Value::String(expand_str(setting, raw, env)?)),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| expand_value(&format!("{setting}[{i}]"), item, env))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => map
            .iter()
            .map(|(key, item)| {
                let nested = expand_value(&format!("{setting}.{key}"), item, env)?;
                Ok((key.clone(), nested))
            })
            .collect::<Result<Map<_, _>, ConfigError>>()
            .map(Value::Object),
        other => Ok(other.clone()),
    }
}

fn expand_str(
    setting: &str,
    raw: &str,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<String, ConfigError> {
    let mut expanded = String::with_capacity(raw.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(raw) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = env(name.as_str())
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingCredential {
                variable: name.as_str().to_string(),
                setting: setting.to_string(),
            })?;

        expanded.push_str(&raw[last..whole.start()]);
        expanded.push_str(&value);
        last = whole.end();
    }

    expanded.push_str(&raw[last..]);
    Ok(expanded)
}
