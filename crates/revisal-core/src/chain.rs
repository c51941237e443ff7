//! Version chain algorithms: ordering, neighbor lookup, retention.
//!
//! Pure functions over slices of live versions already in chain order
//! (`(created_at, id)` ascending, as returned by `VersionRepository::all`).

use chrono::{DateTime, Utc};
use std::cmp::Ordering;

use crate::model::{Version, VersionId};

/// Sort versions into chain order
pub fn sort(chain: &mut [Version]) {
    chain.sort_by(|a, b| a.chain_cmp(b));
}

/// The greatest version strictly less than `version` under the chain order
pub fn previous_of<'a>(chain: &'a [Version], version: &Version) -> Option<&'a Version> {
    chain
        .iter()
        .filter(|v| v.chain_cmp(version) == Ordering::Less)
        .max_by(|a, b| a.chain_cmp(b))
}

/// The smallest version strictly greater than `version` under the chain order
pub fn next_of<'a>(chain: &'a [Version], version: &Version) -> Option<&'a Version> {
    chain
        .iter()
        .filter(|v| v.chain_cmp(version) == Ordering::Greater)
        .min_by(|a, b| a.chain_cmp(b))
}

/// True iff no version in the chain compares greater
pub fn is_latest(chain: &[Version], version: &Version) -> bool {
    next_of(chain, version).is_none()
}

/// Maximum of the chain under the chain order
pub fn latest(chain: &[Version]) -> Option<&Version> {
    chain.iter().max_by(|a, b| a.chain_cmp(b))
}

/// Minimum of the chain under the chain order
pub fn oldest(chain: &[Version]) -> Option<&Version> {
    chain.iter().min_by(|a, b| a.chain_cmp(b))
}

/// Latest version created at or before `time`
pub fn at_time<'a>(chain: &'a [Version], time: DateTime<Utc>) -> Option<&'a Version> {
    chain
        .iter()
        .filter(|v| v.created_at <= time)
        .max_by(|a, b| a.chain_cmp(b))
}

/// All versions strictly before `version`, oldest first
pub fn before<'a>(chain: &'a [Version], version: &Version) -> Vec<&'a Version> {
    let mut rows: Vec<&Version> = chain
        .iter()
        .filter(|v| v.chain_cmp(version) == Ordering::Less)
        .collect();
    rows.sort_by(|a, b| a.chain_cmp(b));
    rows
}

/// Ids to prune under a keep-newest retention policy
///
/// `keep == 0` keeps everything. Otherwise the chain is ordered newest
/// first, the first `keep` survive and the rest are victims. Operating on
/// live rows only makes repeated application idempotent.
pub fn retention_victims(chain: &[Version], keep: u32) -> Vec<VersionId> {
    if keep == 0 {
        return Vec::new();
    }
    let mut newest_first: Vec<&Version> = chain.iter().collect();
    newest_first.sort_by(|a, b| b.chain_cmp(a));
    newest_first
        .into_iter()
        .skip(keep as usize)
        .map(|v| v.id.clone())
        .collect()
}


#[cfg(test)]
mod ordering_properties {
    use super::*;
    use crate::contents::Contents;
    use crate::model::OwnerRef;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use std::cmp::Ordering;

    fn version(id: i64, ts: i64) -> Version {
        Version {
            id: VersionId::Numeric(id),
            owner: OwnerRef::new("post", "1"),
            user_id: None,
            contents: Contents::new(),
            created_at: Utc.timestamp_opt(ts, 0).unwrap(),
            updated_at: Utc.timestamp_opt(ts, 0).unwrap(),
            deleted_at: None,
        }
    }

    proptest! {
        // For any two versions with unequal (created_at, id) pairs exactly
        // one is "previous" of the other.
        #[test]
        fn chain_order_is_total_and_antisymmetric(
            id_a in 0i64..1000, ts_a in 0i64..1000,
            id_b in 0i64..1000, ts_b in 0i64..1000,
        ) {
            let a = version(id_a, ts_a);
            let b = version(id_b, ts_b);
            if (id_a, ts_a) != (id_b, ts_b) {
                let ab = a.chain_cmp(&b);
                let ba = b.chain_cmp(&a);
                prop_assert_ne!(ab, Ordering::Equal);
                prop_assert_eq!(ab, ba.reverse());
            } else {
                prop_assert_eq!(a.chain_cmp(&b), Ordering::Equal);
            }
        }

        // A back-dated insert lands at the position its timestamp dictates.
        #[test]
        fn backdated_insert_sorts_by_timestamp(ts in 0i64..1000) {
            let existing = vec![version(1, 250), version(2, 500), version(3, 750)];
            let inserted = version(4, ts);

            let mut chain = existing.clone();
            chain.push(inserted.clone());
            sort(&mut chain);

            let pos = chain.iter().position(|v| v.id == inserted.id).unwrap();
            for earlier in &chain[..pos] {
                prop_assert_eq!(earlier.chain_cmp(&inserted), Ordering::Less);
            }
            for later in &chain[pos + 1..] {
                prop_assert_eq!(later.chain_cmp(&inserted), Ordering::Greater);
            }
        }
    }
}
