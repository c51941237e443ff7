use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, RevisalError};
use crate::versionable::Versionable;

/// Discriminated reference to a versioned entity
///
/// One versions table serves many owner types; the pair of type tag and id
/// identifies the owning row without runtime type inspection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerRef {
    pub owner_type: String,
    pub owner_id: String,
}

impl OwnerRef {
    pub fn new(owner_type: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            owner_type: owner_type.into(),
            owner_id: owner_id.into(),
        }
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.owner_type, self.owner_id)
    }
}

/// Loader resolving an owner id into a live entity
pub type OwnerLoader = Box<dyn Fn(&str) -> Result<Box<dyn Versionable>> + Send + Sync>;

/// Registry mapping owner type tags to loader functions
///
/// Integrators register one loader per versionable record type; the engine
/// uses the registry when it only holds an `OwnerRef` (e.g. resolving the
/// owning entity of a stored version row).
#[derive(Default)]
pub struct OwnerRegistry {
    loaders: HashMap<String, OwnerLoader>,
}

impl OwnerRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            loaders: HashMap::new(),
        }
    }

    /// Register a loader for an owner type tag, replacing any previous one
    pub fn register(
        &mut self,
        owner_type: impl Into<String>,
        loader: impl Fn(&str) -> Result<Box<dyn Versionable>> + Send + Sync + 'static,
    ) {
        self.loaders.insert(owner_type.into(), Box::new(loader));
    }

    /// Resolve an owner reference through its registered loader
    ///
    /// # Errors
    ///
    /// Returns `UnknownOwnerType` when no loader is registered for the tag;
    /// loader failures (e.g. `OwnerNotFound`) propagate unchanged.
    pub fn load(&self, owner: &OwnerRef) -> Result<Box<dyn Versionable>> {
        let loader = self.loaders.get(&owner.owner_type).ok_or_else(|| {
            RevisalError::UnknownOwnerType {
                owner_type: owner.owner_type.clone(),
            }
        })?;
        loader(&owner.owner_id)
    }

    /// Check whether a loader is registered for the tag
    pub fn is_registered(&self, owner_type: &str) -> bool {
        self.loaders.contains_key(owner_type)
    }
}

impl fmt::Debug for OwnerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnerRegistry")
            .field("owner_types", &self.loaders.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    #[test]
    fn test_load_unregistered_type_fails() {
        let registry = OwnerRegistry::new();
        let err = registry.load(&OwnerRef::new("post", "1")).err().unwrap();
        assert!(matches!(err, RevisalError::UnknownOwnerType { .. }));
    }

    #[test]
    fn test_registered_loader_is_invoked() {
        let mut registry = OwnerRegistry::new();
        registry.register("post", |id| {
            Ok(Box::new(Record::new("post", id)) as Box<dyn Versionable>)
        });

        assert!(registry.is_registered("post"));
        let entity = registry.load(&OwnerRef::new("post", "7")).unwrap();
        assert_eq!(entity.owner_ref(), OwnerRef::new("post", "7"));
    }

    #[test]
    fn test_loader_errors_propagate() {
        let mut registry = OwnerRegistry::new();
        registry.register("post", |id| {
            Err(RevisalError::OwnerNotFound {
                owner: format!("post:{}", id),
            })
        });

        let err = registry.load(&OwnerRef::new("post", "404")).err().unwrap();
        assert!(matches!(err, RevisalError::OwnerNotFound { .. }));
    }
}
