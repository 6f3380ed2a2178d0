//! Backend construction from configuration.
//!
//! The [`BackendFactory`] owns an open registry mapping backend type names to
//! constructors. Built-in providers are registered at start-up; callers add
//! more with [`BackendFactory::register_backend`] without touching this
//! module.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use serde_json::{Map, Value};

use crate::backend::{Backend, BackendError, Credentials, Result};
use crate::settings::{
    BackendDefaults, BackendSettings, ConfigDocument, ConfigError, ConfigFormat, ConfigLoader,
    EnvLookup, ResolvedBackend, expand_placeholders, process_env,
};

/// Builds an unauthenticated backend from resolved settings.
pub type BackendConstructor =
    Arc<dyn Fn(&ResolvedBackend) -> Result<Arc<dyn Backend>> + Send + Sync>;

/// Registry of backend constructors keyed by type name.
#[derive(Default)]
pub struct BackendRegistry {
    constructors: RwLock<HashMap<String, BackendConstructor>>,
}

impl BackendRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every provider compiled into this crate.
    #[must_use]
    pub fn with_builtin() -> Self {
        let registry = Self::new();

        #[cfg(feature = "gitlab")]
        registry.register(crate::gitlab::BACKEND_TYPE, |resolved: &ResolvedBackend| {
            let backend = crate::gitlab::GitLabBackend::from_settings(resolved)?;
            Ok(Arc::new(backend) as Arc<dyn Backend>)
        });

        #[cfg(feature = "github")]
        registry.register(crate::github::BACKEND_TYPE, |resolved: &ResolvedBackend| {
            let backend = crate::github::GitHubBackend::from_settings(resolved)?;
            Ok(Arc::new(backend) as Arc<dyn Backend>)
        });

        registry
    }

    /// Register `constructor` under `backend_type`, replacing any previous one.
    pub fn register<F>(&self, backend_type: impl Into<String>, constructor: F)
    where
        F: Fn(&ResolvedBackend) -> Result<Arc<dyn Backend>> + Send + Sync + 'static,
    {
        let backend_type = backend_type.into();
        let mut constructors = self
            .constructors
            .write()
            .unwrap_or_else(|e| e.into_inner());
        if constructors
            .insert(backend_type.clone(), Arc::new(constructor))
            .is_some()
        {
            tracing::warn!("Replacing constructor for backend type {}", backend_type);
        } else {
            tracing::debug!("Registered backend type {}", backend_type);
        }
    }

    #[must_use]
    pub fn contains(&self, backend_type: &str) -> bool {
        self.constructors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(backend_type)
    }

    /// Registered type names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .constructors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    fn get(&self, backend_type: &str) -> Option<BackendConstructor> {
        self.constructors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(backend_type)
            .cloned()
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("types", &self.names())
            .finish()
    }
}

/// Resolves configuration into ready, authenticated backends.
#[derive(Clone)]
pub struct BackendFactory {
    registry: Arc<BackendRegistry>,
    env: EnvLookup,
}

impl Default for BackendFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendFactory {
    /// A factory with the built-in providers, reading the process environment.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Arc::new(BackendRegistry::with_builtin()),
            env: process_env(),
        }
    }

    /// A factory over an explicit registry.
    #[must_use]
    pub fn with_registry(registry: BackendRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            env: process_env(),
        }
    }

    /// Resolve `${VAR}` placeholders through `env` instead of the process
    /// environment.
    #[must_use]
    pub fn with_env_lookup(mut self, env: EnvLookup) -> Self {
        self.env = env;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Register an additional backend type.
    pub fn register_backend<F>(&self, backend_type: impl Into<String>, constructor: F)
    where
        F: Fn(&ResolvedBackend) -> Result<Arc<dyn Backend>> + Send + Sync + 'static,
    {
        self.registry.register(backend_type, constructor);
    }

    /// A loader that rejects documents naming unregistered backend types.
    #[must_use]
    pub fn loader(&self) -> ConfigLoader {
        ConfigLoader::new().with_known_types(self.registry.names())
    }

    pub fn load_config_str(&self, content: &str, format: ConfigFormat) -> Result<ConfigDocument> {
        Ok(self.loader().load_str(content, format)?)
    }

    pub fn load_config_file(&self, path: impl AsRef<Path>) -> Result<ConfigDocument> {
        Ok(self.loader().load_file(path)?)
    }

    /// Expand and type-check settings for `backend_type`.
    ///
    /// Pure apart from environment lookups: resolving the same input twice
    /// with an unchanged environment yields equal results.
    pub fn resolve(
        &self,
        backend_type: &str,
        settings: &Map<String, Value>,
        defaults: &BackendDefaults,
    ) -> Result<ResolvedBackend> {
        if !self.registry.contains(backend_type) {
            return Err(BackendError::unknown_backend(backend_type));
        }

        let expanded = expand_placeholders(settings, &*self.env)?;
        let settings = BackendSettings::from_map(expanded)?;

        Ok(ResolvedBackend {
            backend_type: backend_type.to_string(),
            settings,
            defaults: defaults.clone(),
        })
    }

    /// Build and authenticate a backend of `backend_type`.
    pub async fn create_backend(
        &self,
        backend_type: &str,
        settings: &Map<String, Value>,
    ) -> Result<Arc<dyn Backend>> {
        let resolved = self.resolve(backend_type, settings, &BackendDefaults::default())?;
        self.build(&resolved).await
    }

    /// Build a backend from a parsed document.
    ///
    /// `backend_type` overrides `backend.type`. When neither is given the
    /// call fails; no provider is ever chosen implicitly.
    pub async fn create_from_config(
        &self,
        document: &ConfigDocument,
        backend_type: Option<&str>,
    ) -> Result<Arc<dyn Backend>> {
        let backend_type = backend_type
            .or(document.backend.backend_type.as_deref())
            .ok_or(ConfigError::NoBackendConfigured)?;

        let resolved = self.resolve(
            backend_type,
            &document.backend.settings,
            &document.backend.defaults,
        )?;
        self.build(&resolved).await
    }

    /// Construct and authenticate from already resolved settings.
    pub async fn build(&self, resolved: &ResolvedBackend) -> Result<Arc<dyn Backend>> {
        let constructor = self
            .registry
            .get(&resolved.backend_type)
            .ok_or_else(|| BackendError::unknown_backend(&resolved.backend_type))?;

        let token = resolved.settings.require_token()?;
        let backend = constructor(resolved)?;
        let auth = backend.authenticate(&Credentials::new(token)).await?;

        tracing::info!(
            backend = %resolved.backend_type,
            instance = %backend.instance_id(),
            user = %auth.user.username,
            "Backend ready"
        );
        Ok(backend)
    }
}

impl std::fmt::Debug for BackendFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendFactory")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
