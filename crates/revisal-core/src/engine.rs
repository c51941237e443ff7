//! Engine orchestrating capture, chain maintenance, revert and diff.
//!
//! The engine owns the decision logic; the integrator wires its lifecycle
//! hooks to the record store's events (created / updating / updated /
//! deleted) and wraps each capture-then-prune sequence in the store's
//! transaction boundary.

use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::capture::{capture_attributes, should_be_versioning};
use crate::chain;
use crate::config::RevisalConfig;
use crate::contents::Contents;
use crate::diff::{Diff, DiffOptions};
use crate::errors::{Result, RevisalError};
use crate::model::{NewVersion, OwnerRef, Version, VersionId};
use crate::repo::VersionRepository;
use crate::revert;
use crate::strategy::VersionStrategy;
use crate::versionable::{RecordStore, Versionable};

/// Restores the prior enabled state when dropped, so a panicking scope
/// cannot leak a disabled engine.
struct VersioningGuard<'a> {
    flag: &'a AtomicBool,
    prior: bool,
}

impl Drop for VersioningGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(self.prior, AtomicOrdering::SeqCst);
    }
}

/// Versioning engine over a version repository
pub struct VersionEngine<R> {
    repo: R,
    config: RevisalConfig,
    versioning: AtomicBool,
}

impl<R: VersionRepository> VersionEngine<R> {
    /// Create an engine with versioning enabled
    pub fn new(repo: R, config: RevisalConfig) -> Self {
        Self {
            repo,
            config,
            versioning: AtomicBool::new(true),
        }
    }

    /// Access the underlying repository
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Mutable access to the underlying repository
    pub fn repo_mut(&mut self) -> &mut R {
        &mut self.repo
    }

    /// Active configuration
    pub fn config(&self) -> &RevisalConfig {
        &self.config
    }

    // ===== Versioning switch =====

    /// Whether lifecycle hooks currently capture versions
    pub fn is_versioning_enabled(&self) -> bool {
        self.versioning.load(AtomicOrdering::SeqCst)
    }

    /// Enable lifecycle capture
    pub fn enable_versioning(&self) {
        self.versioning.store(true, AtomicOrdering::SeqCst);
    }

    /// Disable lifecycle capture (manual captures still work)
    pub fn disable_versioning(&self) {
        self.versioning.store(false, AtomicOrdering::SeqCst);
    }

    /// Run a closure with versioning disabled, restoring the prior state
    /// afterwards, including on early return or panic
    pub fn without_versioning<T>(&self, f: impl FnOnce() -> T) -> T {
        let _guard = VersioningGuard {
            flag: &self.versioning,
            prior: self.versioning.swap(false, AtomicOrdering::SeqCst),
        };
        f()
    }

    // ===== Lifecycle hooks =====

    /// Hook: the entity was created in the record store
    ///
    /// Captures the initial full-snapshot version when versioning is on.
    pub fn on_created(
        &mut self,
        store: &dyn RecordStore,
        entity: &dyn Versionable,
    ) -> Result<Option<Version>> {
        if !self.is_versioning_enabled() {
            return Ok(None);
        }
        self.create_initial_version(store, entity).map(Some)
    }

    /// Hook: an update is about to persist
    ///
    /// Self-healing baseline: an entity created while versioning was
    /// disabled still gets its initial version before the first captured
    /// update.
    pub fn on_updating(
        &mut self,
        store: &dyn RecordStore,
        entity: &dyn Versionable,
    ) -> Result<Option<Version>> {
        if !self.is_versioning_enabled() || self.repo.count(&entity.owner_ref())? > 0 {
            return Ok(None);
        }
        self.create_initial_version(store, entity).map(Some)
    }

    /// Hook: an update has persisted
    ///
    /// Captures per the entity's mode when the change warrants it, then
    /// prunes to the configured retention count.
    pub fn on_updated(
        &mut self,
        store: &dyn RecordStore,
        entity: &dyn Versionable,
    ) -> Result<Option<Version>> {
        if !self.is_versioning_enabled() {
            return Ok(None);
        }
        let owner = entity.owner_ref();
        if !should_be_versioning(entity, store, self.repo.count(&owner)?)? {
            return Ok(None);
        }

        let contents =
            capture_attributes(entity, store, entity.version_strategy(), &Contents::new())?;
        let version = self.append(store, entity, contents, None)?;
        self.remove_old_versions(&owner, self.config.keep_versions)?;
        Ok(Some(version))
    }

    /// Hook: the entity was deleted from the record store
    ///
    /// Permanent deletion cascades to every version; soft deletion of the
    /// owner leaves the chain untouched.
    pub fn on_deleted(&mut self, entity: &dyn Versionable, force_deleting: bool) -> Result<usize> {
        if !force_deleting {
            return Ok(0);
        }
        self.force_remove_all_versions(&entity.owner_ref())
    }

    // ===== Capture =====

    /// Capture the guaranteed-first full snapshot, back-dated to the
    /// entity's last persisted update
    pub fn create_initial_version(
        &mut self,
        store: &dyn RecordStore,
        entity: &dyn Versionable,
    ) -> Result<Version> {
        let owner = entity.owner_ref();
        let fresh = store.fresh_copy(&owner)?;
        let contents =
            capture_attributes(entity, store, VersionStrategy::Snapshot, &Contents::new())?;
        let version = self.append(store, entity, contents, fresh.updated_at())?;
        debug!(owner = %owner, id = %version.id, "created initial version");
        Ok(version)
    }

    /// Manual capture with explicit replacement values
    ///
    /// Replacements are the entity's dirty attributes merged with
    /// `overrides` (overrides win). A version is captured when the standard
    /// trigger fires or any replacements exist; manual capture ignores the
    /// versioning switch. `at` back-dates the row for bootstrap/backfill.
    /// Returns `None` when nothing warranted a version.
    pub fn create_version(
        &mut self,
        store: &dyn RecordStore,
        entity: &dyn Versionable,
        overrides: &Contents,
        at: Option<DateTime<Utc>>,
    ) -> Result<Option<Version>> {
        let owner = entity.owner_ref();
        let mut replacements = entity.dirty_attributes();
        replacements.merge(overrides);

        let should = should_be_versioning(entity, store, self.repo.count(&owner)?)?;
        if !should && replacements.is_empty() {
            return Ok(None);
        }

        let contents =
            capture_attributes(entity, store, entity.version_strategy(), &replacements)?;
        let version = self.append(store, entity, contents, at)?;
        self.remove_old_versions(&owner, self.config.keep_versions)?;
        Ok(Some(version))
    }

    fn append(
        &mut self,
        store: &dyn RecordStore,
        entity: &dyn Versionable,
        contents: Contents,
        at: Option<DateTime<Utc>>,
    ) -> Result<Version> {
        self.repo.append(NewVersion {
            owner: entity.owner_ref(),
            user_id: entity.version_user_id().or_else(|| store.current_user_id()),
            contents,
            created_at: at,
        })
    }

    // ===== Queries =====

    /// Live versions in chain order, oldest first
    pub fn versions(&self, owner: &OwnerRef) -> Result<Vec<Version>> {
        self.repo.all(owner)
    }

    /// Maximum of the chain under the `(created_at, id)` order
    pub fn latest_version(&self, owner: &OwnerRef) -> Result<Option<Version>> {
        Ok(chain::latest(&self.repo.all(owner)?).cloned())
    }

    /// Minimum of the chain under the `(created_at, id)` order
    pub fn first_version(&self, owner: &OwnerRef) -> Result<Option<Version>> {
        Ok(chain::oldest(&self.repo.all(owner)?).cloned())
    }

    /// Latest version created at or before `time`
    pub fn version_at(
        &self,
        owner: &OwnerRef,
        time: DateTime<Utc>,
    ) -> Result<Option<Version>> {
        Ok(chain::at_time(&self.repo.all(owner)?, time).cloned())
    }

    /// Fetch a live version by id
    ///
    /// # Errors
    ///
    /// `VersionNotFound` when the id does not exist or is soft-deleted.
    pub fn get_version(&self, owner: &OwnerRef, id: &VersionId) -> Result<Version> {
        self.repo
            .find(owner, id)?
            .ok_or_else(|| RevisalError::VersionNotFound {
                version_id: id.to_string(),
            })
    }

    /// The greatest live version strictly before `version`
    pub fn previous_version(
        &self,
        owner: &OwnerRef,
        version: &Version,
    ) -> Result<Option<Version>> {
        Ok(chain::previous_of(&self.repo.all(owner)?, version).cloned())
    }

    /// The smallest live version strictly after `version`
    pub fn next_version(&self, owner: &OwnerRef, version: &Version) -> Result<Option<Version>> {
        Ok(chain::next_of(&self.repo.all(owner)?, version).cloned())
    }

    /// True iff no live version compares greater
    pub fn is_latest(&self, owner: &OwnerRef, version: &Version) -> Result<bool> {
        Ok(chain::is_latest(&self.repo.all(owner)?, version))
    }

    /// Soft-deleted versions in chain order
    pub fn trashed_versions(&self, owner: &OwnerRef) -> Result<Vec<Version>> {
        self.repo.trashed(owner)
    }

    // ===== Removal =====

    /// Restore a soft-deleted version
    pub fn restore_trashed_version(&mut self, owner: &OwnerRef, id: &VersionId) -> Result<bool> {
        self.repo.restore(owner, id)
    }

    /// Remove one version through the entity's configured removal mode
    ///
    /// # Errors
    ///
    /// `VersionNotFound` when no matching live version exists (for soft
    /// removal) or no row at all (for forced removal).
    pub fn remove_version(
        &mut self,
        entity: &dyn Versionable,
        id: &VersionId,
    ) -> Result<()> {
        let owner = entity.owner_ref();
        let removed = if entity.force_delete_version() {
            self.repo.hard_delete(&owner, id)?
        } else {
            self.repo.soft_delete(&owner, id)?
        };
        if !removed {
            return Err(RevisalError::VersionNotFound {
                version_id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Remove many versions through the entity's configured removal mode,
    /// skipping ids that do not match; returns the number removed
    pub fn remove_versions(
        &mut self,
        entity: &dyn Versionable,
        ids: &[VersionId],
    ) -> Result<usize> {
        let owner = entity.owner_ref();
        let mut removed = 0;
        for id in ids {
            let hit = if entity.force_delete_version() {
                self.repo.hard_delete(&owner, id)?
            } else {
                self.repo.soft_delete(&owner, id)?
            };
            if hit {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Remove every version of the entity through its configured removal mode
    pub fn remove_all_versions(&mut self, entity: &dyn Versionable) -> Result<usize> {
        let owner = entity.owner_ref();
        if entity.force_delete_version() {
            return self.repo.hard_delete_all(&owner);
        }
        let ids: Vec<VersionId> = self
            .repo
            .all(&owner)?
            .into_iter()
            .map(|v| v.id)
            .collect();
        let mut removed = 0;
        for id in &ids {
            if self.repo.soft_delete(&owner, id)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Permanently remove one version, bypassing soft-delete semantics
    ///
    /// # Errors
    ///
    /// `VersionNotFound` when no row matches.
    pub fn force_remove_version(&mut self, owner: &OwnerRef, id: &VersionId) -> Result<()> {
        if !self.repo.hard_delete(owner, id)? {
            return Err(RevisalError::VersionNotFound {
                version_id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Permanently remove every version of an owner
    pub fn force_remove_all_versions(&mut self, owner: &OwnerRef) -> Result<usize> {
        let removed = self.repo.hard_delete_all(owner)?;
        debug!(owner = %owner, removed, "hard-deleted all versions");
        Ok(removed)
    }

    /// Prune the chain to the newest `keep` live versions
    ///
    /// `keep == 0` keeps everything. Victims are soft-deleted; repeated
    /// calls with no new versions delete nothing further.
    pub fn remove_old_versions(&mut self, owner: &OwnerRef, keep: u32) -> Result<usize> {
        if keep == 0 {
            return Ok(0);
        }
        let victims = chain::retention_victims(&self.repo.all(owner)?, keep);
        let mut removed = 0;
        for id in &victims {
            if self.repo.soft_delete(owner, id)? {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(owner = %owner, removed, keep, "pruned old versions");
        }
        Ok(removed)
    }

    // ===== Revert =====

    /// Reconstruct the state at `id` and apply it to the entity's in-memory
    /// attributes without persisting
    ///
    /// # Errors
    ///
    /// `VersionNotFound` when the target id does not exist.
    pub fn revert_without_saving(
        &self,
        entity: &mut dyn Versionable,
        id: &VersionId,
    ) -> Result<Contents> {
        let owner = entity.owner_ref();
        let target = self.get_version(&owner, id)?;
        let chain = self.repo.all(&owner)?;
        let state = revert::reconstruct(entity, &target, &chain);
        entity.apply_raw_attributes(&state);
        Ok(state)
    }

    /// Revert to `id`, persist through the record store, and capture the
    /// resulting mutation as a new forward version
    ///
    /// Reverting never rolls history back; when the reverted state differs
    /// from the current one the usual capture rules append a new version.
    pub fn revert_to_version(
        &mut self,
        store: &mut dyn RecordStore,
        entity: &mut dyn Versionable,
        id: &VersionId,
    ) -> Result<Option<Version>> {
        self.revert_without_saving(entity, id)?;
        store.persist(entity)?;
        self.on_updated(store, entity)
    }

    // ===== Diff =====

    /// Diff a version against another, or against its implicit predecessor
    ///
    /// With `other == None` the predecessor under the chain order is used;
    /// a version with no predecessor is diffed against an empty placeholder.
    ///
    /// # Errors
    ///
    /// `VersionNotFound` for either id.
    pub fn diff(
        &self,
        entity: &dyn Versionable,
        id: &VersionId,
        other: Option<&VersionId>,
        options: DiffOptions,
    ) -> Result<Diff> {
        let owner = entity.owner_ref();
        let chain = self.repo.all(&owner)?;
        let new_version = self.get_version(&owner, id)?;
        let old_version = match other {
            Some(other_id) => self.get_version(&owner, other_id)?,
            None => chain::previous_of(&chain, &new_version)
                .cloned()
                .unwrap_or_else(|| Version::placeholder(&owner)),
        };

        Ok(Diff::new(
            new_version,
            old_version,
            &chain,
            entity.version_strategy(),
            options,
        ))
    }
}
