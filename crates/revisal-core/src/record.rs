//! Reference record implementation and in-memory record store.
//!
//! `Record` is an attribute-map-backed entity with dirty tracking, used by
//! the engine's own tests and as the template for integrating real record
//! types. `MemoryRecordStore` is the matching single-threaded store; a
//! production deployment substitutes its own `RecordStore` adapter.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::contents::Contents;
use crate::errors::{Result, RevisalError};
use crate::model::OwnerRef;
use crate::strategy::VersionStrategy;
use crate::versionable::{RecordStore, Versionable};

type ShouldVersionHook = Arc<dyn Fn(&Record) -> bool + Send + Sync>;

/// Attribute-map-backed versionable record
///
/// Versioning configuration lives behind optional extension points: a record
/// built with [`Record::without_extension_points`] rejects configuration
/// with a `Configuration` error, mirroring entity types that never declared
/// the capability.
#[derive(Clone)]
pub struct Record {
    owner: OwnerRef,
    attributes: Contents,
    pending: Contents,
    versionable: Option<Vec<String>>,
    dont_versionable: Option<Vec<String>>,
    strategy: Option<VersionStrategy>,
    user_id: Option<String>,
    force_delete: bool,
    updated_at: DateTime<Utc>,
    should_version_hook: Option<ShouldVersionHook>,
}

impl Record {
    /// Create a record with all versioning extension points declared
    pub fn new(owner_type: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            owner: OwnerRef::new(owner_type, owner_id),
            attributes: Contents::new(),
            pending: Contents::new(),
            versionable: Some(Vec::new()),
            dont_versionable: Some(Vec::new()),
            strategy: Some(VersionStrategy::Diff),
            user_id: None,
            force_delete: false,
            updated_at: Utc::now(),
            should_version_hook: None,
        }
    }

    /// Create a record whose type declares no versioning extension points
    pub fn without_extension_points(
        owner_type: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            versionable: None,
            dont_versionable: None,
            strategy: None,
            ..Self::new(owner_type, owner_id)
        }
    }

    /// Current value of an attribute (staged change wins over persisted)
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.pending.get(key).or_else(|| self.attributes.get(key))
    }

    /// Stage an attribute change
    ///
    /// Setting a value equal to the persisted one un-stages the key, so the
    /// dirty set always reflects real differences.
    pub fn set(&mut self, key: impl Into<String>, value: serde_json::Value) {
        let key = key.into();
        if self.attributes.get(&key) == Some(&value) {
            self.pending.remove(&key);
        } else {
            self.pending.insert(key, value);
        }
    }

    /// Stage many attribute changes
    pub fn fill(&mut self, attrs: &Contents) {
        for (key, value) in attrs.iter() {
            self.set(key.clone(), value.clone());
        }
    }

    /// Fold staged changes into the persisted attributes and clear dirty state
    ///
    /// Integrators call this after the capture hooks have run, the way an ORM
    /// syncs originals at the end of a save.
    pub fn clear_dirty(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        self.attributes.merge(&pending);
        self.updated_at = Utc::now();
    }

    /// Configure the versionable allow-list
    ///
    /// # Errors
    ///
    /// Returns `Configuration` when the record type declares no allow-list
    /// extension point.
    pub fn set_versionable(&mut self, keys: Vec<String>) -> Result<()> {
        match &mut self.versionable {
            Some(slot) => {
                *slot = keys;
                Ok(())
            }
            None => Err(RevisalError::Configuration {
                reason: "versionable extension point not declared".to_string(),
            }),
        }
    }

    /// Configure the exclude-list (`"*"` excludes everything)
    ///
    /// # Errors
    ///
    /// Returns `Configuration` when the record type declares no exclude-list
    /// extension point.
    pub fn set_dont_versionable(&mut self, keys: Vec<String>) -> Result<()> {
        match &mut self.dont_versionable {
            Some(slot) => {
                *slot = keys;
                Ok(())
            }
            None => Err(RevisalError::Configuration {
                reason: "dont_versionable extension point not declared".to_string(),
            }),
        }
    }

    /// Configure the capture mode
    ///
    /// # Errors
    ///
    /// Returns `Configuration` when the record type declares no strategy
    /// extension point.
    pub fn set_version_strategy(&mut self, strategy: VersionStrategy) -> Result<()> {
        match &mut self.strategy {
            Some(slot) => {
                *slot = strategy;
                Ok(())
            }
            None => Err(RevisalError::Configuration {
                reason: "version strategy extension point not declared".to_string(),
            }),
        }
    }

    /// Configure the capture mode from a token (e.g. configuration files)
    ///
    /// # Errors
    ///
    /// `InvalidStrategy` for unknown tokens, `Configuration` for undeclared
    /// extension points.
    pub fn set_version_strategy_str(&mut self, token: &str) -> Result<()> {
        self.set_version_strategy(token.parse()?)
    }

    /// Attribute captures to a fixed user instead of the store's current user
    pub fn set_user_id(&mut self, user_id: impl Into<String>) {
        self.user_id = Some(user_id.into());
    }

    /// Redirect removal operations to permanent deletion
    pub fn enable_force_delete_version(&mut self) {
        self.force_delete = true;
    }

    /// Restore soft-delete removal semantics
    pub fn disable_force_delete_version(&mut self) {
        self.force_delete = false;
    }

    /// Install a custom capture-trigger predicate
    pub fn set_should_version_hook(
        &mut self,
        hook: impl Fn(&Record) -> bool + Send + Sync + 'static,
    ) {
        self.should_version_hook = Some(Arc::new(hook));
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("owner", &self.owner)
            .field("attributes", &self.attributes)
            .field("pending", &self.pending)
            .field("strategy", &self.strategy)
            .finish()
    }
}

impl Versionable for Record {
    fn owner_ref(&self) -> OwnerRef {
        self.owner.clone()
    }

    fn raw_attributes(&self) -> Contents {
        self.attributes.clone()
    }

    fn dirty_attributes(&self) -> Contents {
        self.pending.clone()
    }

    fn apply_raw_attributes(&mut self, attrs: &Contents) {
        for (key, value) in attrs.iter() {
            self.set(key.clone(), value.clone());
        }
    }

    fn versionable_keys(&self) -> Vec<String> {
        self.versionable.clone().unwrap_or_default()
    }

    fn dont_versionable_keys(&self) -> Vec<String> {
        self.dont_versionable.clone().unwrap_or_default()
    }

    fn version_strategy(&self) -> VersionStrategy {
        self.strategy.unwrap_or_default()
    }

    fn version_user_id(&self) -> Option<String> {
        self.user_id.clone()
    }

    fn force_delete_version(&self) -> bool {
        self.force_delete
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        Some(self.updated_at)
    }

    fn should_version(&self) -> Option<bool> {
        self.should_version_hook.as_ref().map(|hook| hook(self))
    }
}

/// In-memory record store
///
/// HashMap-based persisted state per owner. Not thread-safe; designed for
/// single-writer-per-entity use, like the engine itself.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: HashMap<OwnerRef, (Contents, DateTime<Utc>)>,
    current_user: Option<String>,
}

impl MemoryRecordStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user attributed to subsequent captures
    pub fn set_current_user(&mut self, user_id: impl Into<String>) {
        self.current_user = Some(user_id.into());
    }

    /// Check if an owner has persisted state
    pub fn contains(&self, owner: &OwnerRef) -> bool {
        self.records.contains_key(owner)
    }
}

impl RecordStore for MemoryRecordStore {
    fn fresh_copy(&self, owner: &OwnerRef) -> Result<Box<dyn Versionable>> {
        let (attributes, updated_at) =
            self.records
                .get(owner)
                .cloned()
                .ok_or_else(|| RevisalError::OwnerNotFound {
                    owner: owner.to_string(),
                })?;

        let mut record = Record::new(owner.owner_type.clone(), owner.owner_id.clone());
        record.attributes = attributes;
        record.updated_at = updated_at;
        Ok(Box::new(record))
    }

    fn current_user_id(&self) -> Option<String> {
        self.current_user.clone()
    }

    fn persist(&mut self, entity: &mut dyn Versionable) -> Result<()> {
        let mut state = entity.raw_attributes();
        state.merge(&entity.dirty_attributes());
        self.records
            .insert(entity.owner_ref(), (state, Utc::now()));
        Ok(())
    }
}
