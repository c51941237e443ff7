//! Revert engine: reconstructing a past attribute state.

use std::cmp::Ordering;

use crate::chain::oldest;
use crate::contents::Contents;
use crate::model::Version;
use crate::strategy::VersionStrategy;
use crate::versionable::Versionable;

/// Reconstruct the attribute state at `target`
///
/// The base is the entity's unmodified, originally-persisted attributes,
/// not its current in-memory state. On top of the base:
///
/// - `Snapshot` mode overlays the very first version of the chain, then the
///   target's own contents (the target already holds full state).
/// - `Diff` mode replays every version strictly before the target in chain
///   order, oldest first, then overlays the target. Later partial captures
///   override earlier ones for the same key; keys never touched stay at
///   their base value.
///
/// Empty contents contribute nothing. The result is returned; applying it
/// to the entity's in-memory state (and persisting) is the caller's move.
pub fn reconstruct(entity: &dyn Versionable, target: &Version, chain: &[Version]) -> Contents {
    let mut attrs = entity.raw_attributes();

    match entity.version_strategy() {
        VersionStrategy::Snapshot => {
            if let Some(first) = oldest(chain) {
                attrs.merge(&first.contents);
            }
        }
        VersionStrategy::Diff => {
            for version in chain
                .iter()
                .filter(|v| v.chain_cmp(target) == Ordering::Less)
            {
                attrs.merge(&version.contents);
            }
        }
    }

    attrs.merge(&target.contents);
    attrs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OwnerRef, VersionId};
    use crate::record::Record;
    use crate::strategy::VersionStrategy;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn version(id: i64, ts: i64, contents: &[(&str, serde_json::Value)]) -> Version {
        Version {
            id: VersionId::Numeric(id),
            owner: OwnerRef::new("post", "1"),
            user_id: None,
            contents: contents
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            created_at: Utc.timestamp_opt(ts, 0).unwrap(),
            updated_at: Utc.timestamp_opt(ts, 0).unwrap(),
            deleted_at: None,
        }
    }

    fn diff_post() -> Record {
        let mut post = Record::new("post", "1");
        post.set("title", json!("a"));
        post.set("content", json!("x"));
        post.clear_dirty();
        post
    }

    #[test]
    fn test_diff_replay_accumulates_oldest_first() {
        let post = diff_post();
        let chain = vec![
            version(1, 100, &[("title", json!("a")), ("content", json!("x"))]),
            version(2, 200, &[("title", json!("b"))]),
            version(3, 300, &[("content", json!("y"))]),
        ];

        // revert to v2: title from v2, content still from v1
        let state = reconstruct(&post, &chain[1], &chain);
        assert_eq!(state.get("title"), Some(&json!("b")));
        assert_eq!(state.get("content"), Some(&json!("x")));

        // revert to v3: v2's title survives the replay
        let state = reconstruct(&post, &chain[2], &chain);
        assert_eq!(state.get("title"), Some(&json!("b")));
        assert_eq!(state.get("content"), Some(&json!("y")));
    }

    #[test]
    fn test_untouched_keys_keep_base_values() {
        let mut post = diff_post();
        post.set("rating", json!(5));
        post.clear_dirty();

        let chain = vec![version(1, 100, &[("title", json!("b"))])];
        let state = reconstruct(&post, &chain[0], &chain);

        assert_eq!(state.get("rating"), Some(&json!(5)));
        assert_eq!(state.get("title"), Some(&json!("b")));
    }

    #[test]
    fn test_snapshot_mode_overlays_first_then_target() {
        let mut post = diff_post();
        post.set_version_strategy(VersionStrategy::Snapshot).unwrap();

        let chain = vec![
            version(1, 100, &[("title", json!("a")), ("content", json!("x"))]),
            version(2, 200, &[("title", json!("b")), ("content", json!("x"))]),
            version(3, 300, &[("title", json!("c")), ("content", json!("z"))]),
        ];

        // target carries full state, intermediate v2 is skipped
        let state = reconstruct(&post, &chain[2], &chain);
        assert_eq!(state.get("title"), Some(&json!("c")));
        assert_eq!(state.get("content"), Some(&json!("z")));
    }

    #[test]
    fn test_empty_contents_are_noop_overlays() {
        let post = diff_post();
        let chain = vec![
            version(1, 100, &[("title", json!("a"))]),
            version(2, 200, &[]),
            version(3, 300, &[("title", json!("c"))]),
        ];

        let state = reconstruct(&post, &chain[2], &chain);
        assert_eq!(state.get("title"), Some(&json!("c")));
        assert_eq!(state.get("content"), Some(&json!("x")));
    }

    #[test]
    fn test_backdated_version_replays_in_timestamp_order() {
        let post = diff_post();
        // id 4 was appended last but back-dated before id 2
        let mut chain = vec![
            version(1, 100, &[("title", json!("a"))]),
            version(2, 300, &[("title", json!("late"))]),
            version(4, 200, &[("title", json!("backdated"))]),
        ];
        crate::chain::sort(&mut chain);

        let target = version(3, 400, &[("content", json!("y"))]);
        let state = reconstruct(&post, &target, &chain);

        // id 2 has the later timestamp, so its title wins the replay
        assert_eq!(state.get("title"), Some(&json!("late")));
    }
}
