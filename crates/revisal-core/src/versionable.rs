//! Capability interface attaching versioning behavior to record types.
//!
//! The engine never depends on concrete entity types; any record that
//! implements [`Versionable`] can be captured, reverted and diffed. The
//! record store behind the entities is an external collaborator reached
//! through [`RecordStore`].

use chrono::{DateTime, Utc};

use crate::contents::Contents;
use crate::errors::Result;
use crate::model::OwnerRef;
use crate::strategy::VersionStrategy;

/// Capability interface for versionable record types
///
/// Dirty state is relative to the last fresh load from the record store.
/// Capture hooks run after an update has persisted but before the
/// integrator resets dirty tracking, so implementations must keep the dirty
/// set alive across `RecordStore::persist`.
pub trait Versionable {
    /// Polymorphic reference identifying this entity
    fn owner_ref(&self) -> OwnerRef;

    /// Originally-persisted, pre-cast attribute values
    fn raw_attributes(&self) -> Contents;

    /// Keys changed since the last fresh load, with their current raw values
    fn dirty_attributes(&self) -> Contents;

    /// Overlay raw values onto the in-memory state (used by revert); keys
    /// whose value differs from the persisted state become dirty
    fn apply_raw_attributes(&mut self, attrs: &Contents);

    /// Allow-list of capturable attributes; empty means all
    fn versionable_keys(&self) -> Vec<String> {
        Vec::new()
    }

    /// Exclude-list of attributes; `"*"` excludes everything
    fn dont_versionable_keys(&self) -> Vec<String> {
        Vec::new()
    }

    /// Capture mode for this entity
    fn version_strategy(&self) -> VersionStrategy {
        VersionStrategy::Diff
    }

    /// Attributed user for captures; falls back to `RecordStore::current_user_id`
    fn version_user_id(&self) -> Option<String> {
        None
    }

    /// When true, removal operations permanently delete instead of trashing
    fn force_delete_version(&self) -> bool {
        false
    }

    /// Last persisted-update timestamp; back-dates the initial version
    fn updated_at(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// Optional trigger-logic override
    ///
    /// `None` selects the standard rule: capture when the chain is empty or
    /// the dirty set intersects the keys that would be captured under the
    /// entity's mode.
    fn should_version(&self) -> Option<bool> {
        None
    }
}

/// Record store adapter: the external persistence layer entities live in
pub trait RecordStore {
    /// Re-fetch an entity from storage, bypassing in-memory state
    ///
    /// # Errors
    ///
    /// Returns `OwnerNotFound` when no such record is persisted.
    fn fresh_copy(&self, owner: &OwnerRef) -> Result<Box<dyn Versionable>>;

    /// The user attributed to captures when the entity names none
    fn current_user_id(&self) -> Option<String> {
        None
    }

    /// Persist the entity's in-memory state
    ///
    /// Implementations must not reset the entity's dirty tracking here; the
    /// capture hooks still read it after persisting.
    fn persist(&mut self, entity: &mut dyn Versionable) -> Result<()>;
}
