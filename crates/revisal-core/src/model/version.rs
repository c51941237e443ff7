use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::owner::OwnerRef;
use crate::contents::Contents;

/// Version identity, numeric or UUID depending on deployment configuration
///
/// Numeric ids come from the storage layer's monotonic rowid; UUID ids are
/// time-ordered v7 values generated at append. The variant is uniform within
/// one deployment; the cross-variant ordering only exists to keep the
/// comparator total.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VersionId {
    Numeric(i64),
    Uuid(Uuid),
}

impl Ord for VersionId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (VersionId::Numeric(a), VersionId::Numeric(b)) => a.cmp(b),
            (VersionId::Uuid(a), VersionId::Uuid(b)) => a.cmp(b),
            (VersionId::Numeric(_), VersionId::Uuid(_)) => Ordering::Less,
            (VersionId::Uuid(_), VersionId::Numeric(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for VersionId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionId::Numeric(n) => write!(f, "{}", n),
            VersionId::Uuid(u) => write!(f, "{}", u),
        }
    }
}

/// An immutable-once-written snapshot of captured attributes
///
/// Only `deleted_at` ever transitions after the row is written (soft delete
/// and restore). Everything else is fixed at capture time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    /// Identity assigned by the version repository at append
    pub id: VersionId,

    /// Polymorphic reference to the owning entity
    pub owner: OwnerRef,

    /// Who triggered the capture, if known
    pub user_id: Option<String>,

    /// Attribute name to raw value mapping; may be empty
    pub contents: Contents,

    /// Capture timestamp (back-dated only at creation, for bootstrap/backfill)
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last row update (soft delete / restore)
    pub updated_at: DateTime<Utc>,

    /// Soft-delete marker; None for live rows
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Version {
    /// Chain order comparator: `(created_at, id)`, both ascending
    ///
    /// Back-dated rows carry a larger id than their neighbors but an earlier
    /// timestamp, so the timestamp must be the primary key and the id only a
    /// tie-break.
    pub fn chain_cmp(&self, other: &Version) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| self.id.cmp(&other.id))
    }

    /// Check if this version is soft-deleted
    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Empty stand-in used as the "old" side when a version has no predecessor
    pub fn placeholder(owner: &OwnerRef) -> Version {
        Version {
            id: VersionId::Numeric(0),
            owner: owner.clone(),
            user_id: None,
            contents: Contents::new(),
            created_at: DateTime::UNIX_EPOCH,
            updated_at: DateTime::UNIX_EPOCH,
            deleted_at: None,
        }
    }
}

/// An unpersisted capture payload
///
/// The repository assigns `id`, `created_at` (now, unless back-dated here)
/// and `updated_at` when appending.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVersion {
    pub owner: OwnerRef,
    pub user_id: Option<String>,
    pub contents: Contents,
    /// Explicit back-dating for bootstrap/backfill captures
    pub created_at: Option<DateTime<Utc>>,
}
