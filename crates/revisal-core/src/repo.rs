//! Version repository trait and in-memory reference implementation.
//!
//! The SQLite-backed repository lives in the `revisal-store` crate; this
//! in-memory variant backs the core engine tests and small embedded uses.

use chrono::Utc;
use uuid::Uuid;

use crate::config::IdentityStyle;
use crate::errors::Result;
use crate::model::{NewVersion, OwnerRef, Version, VersionId};

/// Storage contract for the version chain
///
/// `all`, `find` and `count` see live rows only; trashed rows are reachable
/// through the explicit trashed queries until hard-deleted. A capture
/// followed by retention pruning must be wrapped in the implementation's
/// transaction boundary by the integrator; the repository itself does not
/// arbitrate atomicity.
pub trait VersionRepository {
    /// Insert a new version row, assigning identity and timestamps
    ///
    /// No merging or coalescing: every qualifying mutation produces a row.
    fn append(&mut self, version: NewVersion) -> Result<Version>;

    /// Live versions of an owner in chain order (oldest first)
    fn all(&self, owner: &OwnerRef) -> Result<Vec<Version>>;

    /// Soft-deleted versions of an owner in chain order
    fn trashed(&self, owner: &OwnerRef) -> Result<Vec<Version>>;

    /// Find a live version by id
    fn find(&self, owner: &OwnerRef, id: &VersionId) -> Result<Option<Version>>;

    /// Find a soft-deleted version by id
    fn find_trashed(&self, owner: &OwnerRef, id: &VersionId) -> Result<Option<Version>>;

    /// Mark a live version soft-deleted; false if no live row matched
    fn soft_delete(&mut self, owner: &OwnerRef, id: &VersionId) -> Result<bool>;

    /// Clear the soft-delete marker; false if no trashed row matched
    fn restore(&mut self, owner: &OwnerRef, id: &VersionId) -> Result<bool>;

    /// Permanently delete a version regardless of soft-delete state
    fn hard_delete(&mut self, owner: &OwnerRef, id: &VersionId) -> Result<bool>;

    /// Permanently delete every version of an owner; returns rows removed
    fn hard_delete_all(&mut self, owner: &OwnerRef) -> Result<usize>;

    /// Number of live versions for an owner
    fn count(&self, owner: &OwnerRef) -> Result<usize>;
}

/// In-memory version repository
///
/// Vec-backed storage with a monotonic id counter. Single-threaded, like the
/// engine's concurrency model.
#[derive(Debug)]
pub struct MemoryVersionRepo {
    versions: Vec<Version>,
    next_id: i64,
    identity: IdentityStyle,
}

impl Default for MemoryVersionRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryVersionRepo {
    /// Create an empty repository with numeric identity
    pub fn new() -> Self {
        Self {
            versions: Vec::new(),
            next_id: 1,
            identity: IdentityStyle::Numeric,
        }
    }

    /// Create an empty repository with the given identity style
    pub fn with_identity(identity: IdentityStyle) -> Self {
        Self {
            identity,
            ..Self::new()
        }
    }

    fn assign_id(&mut self) -> VersionId {
        match self.identity {
            IdentityStyle::Numeric => {
                let id = self.next_id;
                self.next_id += 1;
                VersionId::Numeric(id)
            }
            IdentityStyle::Uuid => VersionId::Uuid(Uuid::now_v7()),
        }
    }

    fn select(&self, owner: &OwnerRef, trashed: bool) -> Vec<Version> {
        let mut rows: Vec<Version> = self
            .versions
            .iter()
            .filter(|v| &v.owner == owner && v.is_trashed() == trashed)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.chain_cmp(b));
        rows
    }

    fn row_mut(&mut self, owner: &OwnerRef, id: &VersionId) -> Option<&mut Version> {
        self.versions
            .iter_mut()
            .find(|v| &v.owner == owner && &v.id == id)
    }
}

impl VersionRepository for MemoryVersionRepo {
    fn append(&mut self, version: NewVersion) -> Result<Version> {
        let now = Utc::now();
        let row = Version {
            id: self.assign_id(),
            owner: version.owner,
            user_id: version.user_id,
            contents: version.contents,
            created_at: version.created_at.unwrap_or(now),
            updated_at: now,
            deleted_at: None,
        };
        self.versions.push(row.clone());
        Ok(row)
    }

    fn all(&self, owner: &OwnerRef) -> Result<Vec<Version>> {
        Ok(self.select(owner, false))
    }

    fn trashed(&self, owner: &OwnerRef) -> Result<Vec<Version>> {
        Ok(self.select(owner, true))
    }

    fn find(&self, owner: &OwnerRef, id: &VersionId) -> Result<Option<Version>> {
        Ok(self
            .versions
            .iter()
            .find(|v| &v.owner == owner && &v.id == id && !v.is_trashed())
            .cloned())
    }

    fn find_trashed(&self, owner: &OwnerRef, id: &VersionId) -> Result<Option<Version>> {
        Ok(self
            .versions
            .iter()
            .find(|v| &v.owner == owner && &v.id == id && v.is_trashed())
            .cloned())
    }

    fn soft_delete(&mut self, owner: &OwnerRef, id: &VersionId) -> Result<bool> {
        let now = Utc::now();
        match self.row_mut(owner, id) {
            Some(row) if !row.is_trashed() => {
                row.deleted_at = Some(now);
                row.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn restore(&mut self, owner: &OwnerRef, id: &VersionId) -> Result<bool> {
        let now = Utc::now();
        match self.row_mut(owner, id) {
            Some(row) if row.is_trashed() => {
                row.deleted_at = None;
                row.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn hard_delete(&mut self, owner: &OwnerRef, id: &VersionId) -> Result<bool> {
        let before = self.versions.len();
        self.versions
            .retain(|v| !(&v.owner == owner && &v.id == id));
        Ok(self.versions.len() < before)
    }

    fn hard_delete_all(&mut self, owner: &OwnerRef) -> Result<usize> {
        let before = self.versions.len();
        self.versions.retain(|v| &v.owner != owner);
        Ok(before - self.versions.len())
    }

    fn count(&self, owner: &OwnerRef) -> Result<usize> {
        Ok(self
            .versions
            .iter()
            .filter(|v| &v.owner == owner && !v.is_trashed())
            .count())
    }
}
