use std::collections::HashMap;
use std::path::Path;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};

use super::ConfigError;
use super::document::ConfigDocument;

/// Prefix for environment variables layered over a document.
pub const ENV_PREFIX: &str = "CLASSFORGE";

/// Syntax of a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Infer the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            "json" => Some(ConfigFormat::Json),
            _ => None,
        }
    }

    fn file_format(self) -> FileFormat {
        match self {
            ConfigFormat::Yaml => FileFormat::Yaml,
            ConfigFormat::Json => FileFormat::Json,
        }
    }
}

/// Overlay keys kept verbatim; a digits-only token must not become a number.
const TEXT_KEYS: &[&str] = &[
    "BACKEND__TYPE",
    "BACKEND__SETTINGS__URL",
    "BACKEND__SETTINGS__TOKEN",
    "BACKEND__SETTINGS__NAMESPACE",
];

#[derive(Debug, Clone)]
enum EnvOverlay {
    Process,
    Vars(HashMap<String, String>),
}

impl EnvOverlay {
    fn vars(&self) -> HashMap<String, String> {
        match self {
            EnvOverlay::Process => std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .filter(|(k, _)| strip_prefix(k).is_some())
                .collect(),
            EnvOverlay::Vars(vars) => vars.clone(),
        }
    }
}

/// The part of `name` after `CLASSFORGE_`, if it carries the prefix.
fn strip_prefix(name: &str) -> Option<&str> {
    let (prefix, rest) = name.split_at_checked(ENV_PREFIX.len())?;
    let rest = rest.strip_prefix('_')?;
    (prefix.eq_ignore_ascii_case(ENV_PREFIX) && !rest.is_empty()).then_some(rest)
}

fn is_text_key(name: &str) -> bool {
    strip_prefix(name).is_some_and(|key| TEXT_KEYS.iter().any(|k| key.eq_ignore_ascii_case(k)))
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

/// Parses configuration documents.
///
/// By default only the document itself is read. [`ConfigLoader::with_env_overlay`]
/// layers `CLASSFORGE_`-prefixed variables on top, using `__` to separate
/// nesting levels (`CLASSFORGE_BACKEND__SETTINGS__URL`).
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    overlay: Option<EnvOverlay>,
    known_types: Option<Vec<String>>,
}

impl ConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer `CLASSFORGE_*` process environment variables over the document.
    #[must_use]
    pub fn with_env_overlay(mut self) -> Self {
        self.overlay = Some(EnvOverlay::Process);
        self
    }

    /// Layer the given `CLASSFORGE_*` variables instead of the process environment.
    #[must_use]
    pub fn with_env_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.overlay = Some(EnvOverlay::Vars(vars));
        self
    }

    /// Reject documents whose `backend.type` is not one of `types`.
    #[must_use]
    pub fn with_known_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    /// Parse a document from a string.
    pub fn load_str(&self, content: &str, format: ConfigFormat) -> Result<ConfigDocument, ConfigError> {
        self.build(File::from_str(content, format.file_format()))
    }

    /// Read and parse a document; the format follows the file extension.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<ConfigDocument, ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path).ok_or_else(|| {
            ConfigError::Parse(format!(
                "cannot infer configuration format of {}: expected .yaml, .yml or .json",
                path.display()
            ))
        })?;
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        tracing::debug!("Loading backend configuration from {}", path.display());
        self.load_str(&content, format)
    }

    fn build<S>(&self, source: S) -> Result<ConfigDocument, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let mut builder = ConfigBuilder::builder().add_source(source);

        if let Some(overlay) = &self.overlay {
            let (text, parsed): (HashMap<_, _>, HashMap<_, _>) = overlay
                .vars()
                .into_iter()
                .partition(|(name, _)| is_text_key(name));
            builder = builder
                .add_source(
                    env_source()
                        .try_parsing(true)
                        .source(Some(parsed.into_iter().collect())),
                )
                .add_source(env_source().source(Some(text.into_iter().collect())));
        }

        let document: ConfigDocument = builder
            .build()
            .map_err(|e| ConfigError::Parse(e.to_string()))?
            .try_deserialize()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        self.validate(document)
    }

    fn validate(&self, mut document: ConfigDocument) -> Result<ConfigDocument, ConfigError> {
        if let Some(backend_type) = document.backend.backend_type.take() {
            let backend_type = backend_type.trim().to_string();
            if backend_type.is_empty() {
                return Err(ConfigError::Validation(
                    "backend.type must not be empty".to_string(),
                ));
            }
            if let Some(known) = &self.known_types
                && !known.iter().any(|k| *k == backend_type)
            {
                return Err(ConfigError::Validation(format!(
                    "backend type `{backend_type}` is not registered (known: {})",
                    known.join(", ")
                )));
            }
            document.backend.backend_type = Some(backend_type);
        }
        Ok(document)
    }
}
