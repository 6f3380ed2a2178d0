//! Backend-scoped resource identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a resource on one backend instance.
///
/// `value` is the provider-native identifier (a numeric id on GitLab, an
/// `owner/name` path or login on GitHub). It is only unique within the
/// backend instance that produced it, so the identifier also records the
/// backend type and the instance it belongs to. Cross-backend joins should
/// use [`ResourceId::join_key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    /// Backend type name (e.g. "gitlab").
    pub backend_type: String,
    /// Instance that issued this identifier.
    pub instance_id: Uuid,
    /// Provider-native identifier.
    pub value: String,
}

impl ResourceId {
    pub fn new(
        backend_type: impl Into<String>,
        instance_id: Uuid,
        value: impl Into<String>,
    ) -> Self {
        Self {
            backend_type: backend_type.into(),
            instance_id,
            value: value.into(),
        }
    }

    /// The provider-native identifier.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Key suitable for joining resources across backends of different types.
    #[inline]
    #[must_use]
    pub fn join_key(&self) -> (&str, &str) {
        (&self.backend_type, &self.value)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Issues [`ResourceId`]s for one backend instance.
///
/// Providers hand a scope to their translation functions so every entity
/// they build carries identifiers bound to the right instance.
#[derive(Debug, Clone, Copy)]
pub struct IdScope<'a> {
    backend_type: &'a str,
    instance_id: Uuid,
}

impl<'a> IdScope<'a> {
    pub fn new(backend_type: &'a str, instance_id: Uuid) -> Self {
        Self {
            backend_type,
            instance_id,
        }
    }

    #[must_use]
    pub fn id(&self, value: impl Into<String>) -> ResourceId {
        ResourceId::new(self.backend_type, self.instance_id, value)
    }

    #[must_use]
    pub fn owns(&self, id: &ResourceId) -> bool {
        id.instance_id == self.instance_id && id.backend_type == self.backend_type
    }
}
