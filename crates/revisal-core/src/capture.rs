//! Capture strategy: which attributes go into a new version, and when.

use tracing::debug;

use crate::contents::Contents;
use crate::errors::Result;
use crate::strategy::VersionStrategy;
use crate::versionable::{RecordStore, Versionable};

/// Compute the attributes to persist into a new version
///
/// Candidate keys come from the entity's dirty set (`Diff`) or from a
/// freshly re-fetched copy (`Snapshot`, which guards against capturing
/// attributes that never round-tripped through storage). Values are always
/// taken from the fresh copy's raw attributes so later diffing and
/// reverting see pre-cast data. The allow-list restricts candidates before
/// `overrides` merge in (overrides win and may introduce new keys); the
/// exclude-list is applied last and supports the `"*"` wildcard.
///
/// Nothing to capture degrades to an empty mapping, never an error.
///
/// # Errors
///
/// Propagates `OwnerNotFound` from the fresh fetch and any record store
/// failure.
pub fn capture_attributes(
    entity: &dyn Versionable,
    store: &dyn RecordStore,
    strategy: VersionStrategy,
    overrides: &Contents,
) -> Result<Contents> {
    let fresh = store.fresh_copy(&entity.owner_ref())?;
    let fresh_attrs = fresh.raw_attributes();

    let keys: Vec<String> = match strategy {
        VersionStrategy::Diff => entity.dirty_attributes().keys().cloned().collect(),
        VersionStrategy::Snapshot => fresh_attrs.keys().cloned().collect(),
    };

    let mut attrs = fresh_attrs.only(&keys);

    let versionable = entity.versionable_keys();
    if !versionable.is_empty() {
        attrs = attrs.only(&versionable);
    }

    attrs.merge(overrides);
    let attrs = attrs.except(&entity.dont_versionable_keys());

    debug!(
        owner = %entity.owner_ref(),
        %strategy,
        captured = attrs.len(),
        "captured attributes"
    );

    Ok(attrs)
}

/// Decide whether a persisted update warrants a new version
///
/// The entity's `should_version` hook wins when present. The standard rule:
/// the chain is empty, or the dirty set intersects the keys that would be
/// captured under the entity's mode. A change to a non-versionable field
/// alone does not trigger a capture.
///
/// # Errors
///
/// Propagates record store failures from the capture-key computation.
pub fn should_be_versioning(
    entity: &dyn Versionable,
    store: &dyn RecordStore,
    chain_len: usize,
) -> Result<bool> {
    if let Some(decision) = entity.should_version() {
        return Ok(decision);
    }

    if chain_len == 0 {
        return Ok(true);
    }

    let capturable = capture_attributes(
        entity,
        store,
        entity.version_strategy(),
        &Contents::new(),
    )?;
    let dirty = entity.dirty_attributes();
    let any_dirty = dirty.keys().any(|key| capturable.contains_key(key));
    Ok(any_dirty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{MemoryRecordStore, Record};
    use serde_json::json;

    fn persisted_post(store: &mut MemoryRecordStore) -> Record {
        let mut post = Record::new("post", "1");
        post.set("title", json!("v1"));
        post.set("content", json!("v1 content"));
        post.set("internal", json!("hidden"));
        store.persist(&mut post).unwrap();
        post.clear_dirty();
        post
    }

    #[test]
    fn test_diff_mode_captures_only_dirty_keys() {
        let mut store = MemoryRecordStore::new();
        let mut post = persisted_post(&mut store);

        post.set("title", json!("v2"));
        store.persist(&mut post).unwrap();

        let attrs =
            capture_attributes(&post, &store, VersionStrategy::Diff, &Contents::new()).unwrap();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs.get("title"), Some(&json!("v2")));
    }

    #[test]
    fn test_snapshot_mode_captures_fresh_copy_keys() {
        let mut store = MemoryRecordStore::new();
        let mut post = persisted_post(&mut store);

        post.set("title", json!("v2"));
        store.persist(&mut post).unwrap();

        let attrs =
            capture_attributes(&post, &store, VersionStrategy::Snapshot, &Contents::new())
                .unwrap();
        assert_eq!(attrs.len(), 3);
        assert_eq!(attrs.get("title"), Some(&json!("v2")));
        assert_eq!(attrs.get("content"), Some(&json!("v1 content")));
    }

    #[test]
    fn test_allow_list_restricts_candidates() {
        let mut store = MemoryRecordStore::new();
        let mut post = persisted_post(&mut store);
        post.set_versionable(vec!["title".to_string(), "content".to_string()])
            .unwrap();

        let attrs =
            capture_attributes(&post, &store, VersionStrategy::Snapshot, &Contents::new())
                .unwrap();
        assert_eq!(attrs.len(), 2);
        assert!(!attrs.contains_key("internal"));
    }

    #[test]
    fn test_overrides_win_and_may_add_keys() {
        let mut store = MemoryRecordStore::new();
        let post = persisted_post(&mut store);

        let overrides: Contents = [
            ("title".to_string(), json!("manual")),
            ("note".to_string(), json!("added")),
        ]
        .into_iter()
        .collect();

        let attrs =
            capture_attributes(&post, &store, VersionStrategy::Diff, &overrides).unwrap();
        assert_eq!(attrs.get("title"), Some(&json!("manual")));
        assert_eq!(attrs.get("note"), Some(&json!("added")));
    }

    #[test]
    fn test_exclude_list_applies_after_overrides() {
        let mut store = MemoryRecordStore::new();
        let mut post = persisted_post(&mut store);
        post.set_dont_versionable(vec!["note".to_string()]).unwrap();

        let overrides: Contents = [("note".to_string(), json!("added"))].into_iter().collect();
        let attrs =
            capture_attributes(&post, &store, VersionStrategy::Diff, &overrides).unwrap();
        assert!(attrs.is_empty());
    }

    #[test]
    fn test_wildcard_exclude_empties_the_capture() {
        let mut store = MemoryRecordStore::new();
        let mut post = persisted_post(&mut store);
        post.set_dont_versionable(vec!["*".to_string()]).unwrap();

        post.set("title", json!("v2"));
        store.persist(&mut post).unwrap();

        let attrs =
            capture_attributes(&post, &store, VersionStrategy::Snapshot, &Contents::new())
                .unwrap();
        assert!(attrs.is_empty());
    }

    #[test]
    fn test_nothing_dirty_yields_empty_mapping() {
        let mut store = MemoryRecordStore::new();
        let post = persisted_post(&mut store);

        let attrs =
            capture_attributes(&post, &store, VersionStrategy::Diff, &Contents::new()).unwrap();
        assert!(attrs.is_empty());
    }

    #[test]
    fn test_should_version_true_on_empty_chain() {
        let mut store = MemoryRecordStore::new();
        let post = persisted_post(&mut store);
        assert!(should_be_versioning(&post, &store, 0).unwrap());
    }

    #[test]
    fn test_non_versionable_change_alone_does_not_trigger() {
        let mut store = MemoryRecordStore::new();
        let mut post = persisted_post(&mut store);
        post.set_versionable(vec!["title".to_string()]).unwrap();

        post.set("internal", json!("changed"));
        store.persist(&mut post).unwrap();

        assert!(!should_be_versioning(&post, &store, 1).unwrap());

        post.set("title", json!("v2"));
        assert!(should_be_versioning(&post, &store, 1).unwrap());
    }

    #[test]
    fn test_should_version_hook_overrides_dirty_rule() {
        let mut store = MemoryRecordStore::new();
        let mut post = persisted_post(&mut store);
        post.set_should_version_hook(|_| false);

        post.set("title", json!("v2"));
        store.persist(&mut post).unwrap();

        assert!(!should_be_versioning(&post, &store, 1).unwrap());
    }
}
