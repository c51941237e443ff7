//! End-to-end engine scenarios over the SQLite repository.
//!
//! Exercises the full capture → chain → revert → diff flow the way an
//! integrated record store would drive it.

use revisal_core::{
    Contents, DiffOptions, IdentityStyle, MemoryRecordStore, Record, RecordStore, RevisalConfig,
    RevisalError, VersionEngine, Versionable, VersionStrategy,
};
use revisal_store::{db, SqliteVersionRepo};
use serde_json::json;

fn engine_with(config: RevisalConfig) -> VersionEngine<SqliteVersionRepo> {
    let conn = db::open_in_memory().unwrap();
    let repo = SqliteVersionRepo::open(conn, &config).unwrap();
    VersionEngine::new(repo, config)
}

fn engine() -> VersionEngine<SqliteVersionRepo> {
    engine_with(RevisalConfig::default())
}

/// Create a post and run the creation hooks
fn create_post(
    engine: &mut VersionEngine<SqliteVersionRepo>,
    store: &mut MemoryRecordStore,
    attrs: &[(&str, serde_json::Value)],
) -> Record {
    let mut post = Record::new("post", "1");
    for (key, value) in attrs {
        post.set(key.to_string(), value.clone());
    }
    store.persist(&mut post).unwrap();
    engine.on_created(store, &post).unwrap();
    post.clear_dirty();
    post
}

/// Stage changes, persist, and run the update hooks
fn update_post(
    engine: &mut VersionEngine<SqliteVersionRepo>,
    store: &mut MemoryRecordStore,
    post: &mut Record,
    attrs: &[(&str, serde_json::Value)],
) {
    engine.on_updating(store, post).unwrap();
    for (key, value) in attrs {
        post.set(key.to_string(), value.clone());
    }
    store.persist(post).unwrap();
    engine.on_updated(store, post).unwrap();
    post.clear_dirty();
}

#[test]
fn diff_mode_capture_and_diff_against_previous() {
    let mut engine = engine();
    let mut store = MemoryRecordStore::new();
    let mut post = create_post(
        &mut engine,
        &mut store,
        &[("title", json!("v1")), ("content", json!("v1 content"))],
    );
    let owner = post.owner_ref();

    let versions = engine.versions(&owner).unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].contents.len(), 2);

    update_post(&mut engine, &mut store, &mut post, &[("title", json!("v2"))]);

    let latest = engine.latest_version(&owner).unwrap().unwrap();
    assert_eq!(latest.contents.len(), 1);
    assert_eq!(latest.contents.get("title"), Some(&json!("v2")));

    let diff = engine
        .diff(&post, &latest.id, None, DiffOptions::default())
        .unwrap();
    let fields = diff.to_field_diffs();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields["title"].old, json!("v1"));
    assert_eq!(fields["title"].new, json!("v2"));
}

#[test]
fn snapshot_mode_keeps_unchanged_fields_in_every_version() {
    let mut engine = engine();
    let mut store = MemoryRecordStore::new();
    let mut post = create_post(
        &mut engine,
        &mut store,
        &[("title", json!("v1")), ("content", json!("v1 content"))],
    );
    post.set_version_strategy(VersionStrategy::Snapshot).unwrap();

    update_post(&mut engine, &mut store, &mut post, &[("title", json!("v2"))]);

    let latest = engine.latest_version(&post.owner_ref()).unwrap().unwrap();
    assert_eq!(latest.contents.get("title"), Some(&json!("v2")));
    assert_eq!(latest.contents.get("content"), Some(&json!("v1 content")));
}

#[test]
fn retention_keeps_three_of_five_and_trashed_are_recoverable() {
    let mut engine = engine_with(RevisalConfig {
        keep_versions: 3,
        ..RevisalConfig::default()
    });
    let mut store = MemoryRecordStore::new();
    let mut post = create_post(&mut engine, &mut store, &[("title", json!("v1"))]);
    let owner = post.owner_ref();

    for n in 2..=5 {
        update_post(
            &mut engine,
            &mut store,
            &mut post,
            &[("title", json!(format!("v{}", n)))],
        );
    }

    assert_eq!(engine.versions(&owner).unwrap().len(), 3);
    let trashed = engine.trashed_versions(&owner).unwrap();
    assert_eq!(trashed.len(), 2);

    // a trashed version can come back
    engine
        .restore_trashed_version(&owner, &trashed[0].id)
        .unwrap();
    assert_eq!(engine.versions(&owner).unwrap().len(), 4);
}

#[test]
fn revert_chain_in_diff_mode() {
    let mut engine = engine();
    let mut store = MemoryRecordStore::new();
    let mut post = create_post(
        &mut engine,
        &mut store,
        &[("title", json!("a")), ("content", json!("x"))],
    );
    let owner = post.owner_ref();

    update_post(&mut engine, &mut store, &mut post, &[("title", json!("b"))]);
    update_post(&mut engine, &mut store, &mut post, &[("content", json!("y"))]);

    let versions = engine.versions(&owner).unwrap();
    assert_eq!(versions.len(), 3);

    engine
        .revert_to_version(&mut store, &mut post, &versions[1].id)
        .unwrap();
    post.clear_dirty();
    assert_eq!(post.get("title"), Some(&json!("b")));
    assert_eq!(post.get("content"), Some(&json!("x")));

    engine
        .revert_to_version(&mut store, &mut post, &versions[2].id)
        .unwrap();
    post.clear_dirty();
    assert_eq!(post.get("title"), Some(&json!("b")));
    assert_eq!(post.get("content"), Some(&json!("y")));
}

#[test]
fn revert_to_unknown_version_is_not_found() {
    let mut engine = engine();
    let mut store = MemoryRecordStore::new();
    let mut post = create_post(&mut engine, &mut store, &[("title", json!("v1"))]);

    let err = engine
        .revert_without_saving(&mut post, &revisal_core::VersionId::Numeric(99))
        .unwrap_err();
    assert!(matches!(err, RevisalError::VersionNotFound { .. }));
}

#[test]
fn statistics_for_fully_replaced_fields() {
    let mut engine = engine();
    let mut store = MemoryRecordStore::new();
    let mut post = create_post(
        &mut engine,
        &mut store,
        &[
            ("title", json!("example title")),
            ("content", json!("example content")),
        ],
    );
    post.set_version_strategy(VersionStrategy::Snapshot).unwrap();

    update_post(
        &mut engine,
        &mut store,
        &mut post,
        &[
            ("title", json!("changing the title")),
            ("content", json!("changing the content")),
        ],
    );

    let owner = post.owner_ref();
    let versions = engine.versions(&owner).unwrap();
    let diff = engine
        .diff(
            &post,
            &versions[1].id,
            Some(&versions[0].id),
            DiffOptions::default(),
        )
        .unwrap();

    let stats = diff.statistics();
    assert!(stats.inserted > 0);
    assert!(stats.deleted > 0);
    assert_eq!(stats.unmodified, 0);
}

#[test]
fn rendered_flavors_over_sqlite_rows() {
    let mut engine = engine();
    let mut store = MemoryRecordStore::new();
    let mut post = create_post(
        &mut engine,
        &mut store,
        &[("title", json!("v1")), ("content", json!("v1 content"))],
    );
    update_post(
        &mut engine,
        &mut store,
        &mut post,
        &[("content", json!("v2 content"))],
    );

    let latest = engine.latest_version(&post.owner_ref()).unwrap().unwrap();
    let diff = engine
        .diff(&post, &latest.id, None, DiffOptions::default())
        .unwrap();

    let unified = diff.to_text();
    assert!(unified["content"].contains("-v1 content"));
    assert!(unified["content"].contains("+v2 content"));

    let html = diff.to_inline_html();
    assert!(html["content"].contains("<del>v1 content</del>"));
    assert!(html["content"].contains("<ins>v2 content</ins>"));

    let json_text = diff.to_json_text();
    assert!(serde_json::from_str::<serde_json::Value>(&json_text["content"]).is_ok());
}

#[test]
fn manual_capture_with_overrides_and_backdating() {
    let mut engine = engine();
    let mut store = MemoryRecordStore::new();
    let mut post = create_post(&mut engine, &mut store, &[("title", json!("v2"))]);
    let owner = post.owner_ref();
    update_post(&mut engine, &mut store, &mut post, &[("title", json!("v3"))]);

    // no changes, no overrides: nothing to capture
    assert!(engine
        .create_version(&store, &post, &Contents::new(), None)
        .unwrap()
        .is_none());

    // back-dated bootstrap capture lands at the head of the chain
    let yesterday = chrono::Utc::now() - chrono::Duration::days(1);
    let overrides: Contents = [("title".to_string(), json!("v1"))].into_iter().collect();
    engine
        .create_version(&store, &post, &overrides, Some(yesterday))
        .unwrap()
        .unwrap();

    let first = engine.first_version(&owner).unwrap().unwrap();
    assert_eq!(first.contents.get("title"), Some(&json!("v1")));
    let latest = engine.latest_version(&owner).unwrap().unwrap();
    assert_eq!(latest.contents.get("title"), Some(&json!("v3")));
}

#[test]
fn force_delete_flag_redirects_removal() {
    let mut engine = engine();
    let mut store = MemoryRecordStore::new();
    let mut post = create_post(&mut engine, &mut store, &[("title", json!("v1"))]);
    let owner = post.owner_ref();
    update_post(&mut engine, &mut store, &mut post, &[("title", json!("v2"))]);
    update_post(&mut engine, &mut store, &mut post, &[("title", json!("v3"))]);

    // soft removal first
    let latest = engine.latest_version(&owner).unwrap().unwrap();
    engine.remove_version(&post, &latest.id).unwrap();
    assert_eq!(engine.versions(&owner).unwrap().len(), 2);
    assert_eq!(engine.trashed_versions(&owner).unwrap().len(), 1);

    // forced removal leaves no trashed row behind
    post.enable_force_delete_version();
    let latest = engine.latest_version(&owner).unwrap().unwrap();
    engine.remove_version(&post, &latest.id).unwrap();
    assert_eq!(engine.versions(&owner).unwrap().len(), 1);
    assert_eq!(engine.trashed_versions(&owner).unwrap().len(), 1);
}

#[test]
fn uuid_identity_full_flow() {
    let mut engine = engine_with(RevisalConfig {
        identity: IdentityStyle::Uuid,
        ..RevisalConfig::default()
    });
    let mut store = MemoryRecordStore::new();
    let mut post = create_post(
        &mut engine,
        &mut store,
        &[("title", json!("Hello world!")), ("content", json!("Hello world!"))],
    );
    let owner = post.owner_ref();

    let original = engine.first_version(&owner).unwrap().unwrap();
    assert!(matches!(original.id, revisal_core::VersionId::Uuid(_)));

    update_post(
        &mut engine,
        &mut store,
        &mut post,
        &[("title", json!("A New World!"))],
    );
    assert_eq!(engine.versions(&owner).unwrap().len(), 2);

    // lookup, revert, and removal all work through UUID ids
    engine.get_version(&owner, &original.id).unwrap();
    engine
        .revert_to_version(&mut store, &mut post, &original.id)
        .unwrap();
    post.clear_dirty();
    assert_eq!(post.get("title"), Some(&json!("Hello world!")));
    assert_eq!(engine.versions(&owner).unwrap().len(), 3);

    engine.remove_version(&post, &original.id).unwrap();
    assert_eq!(engine.versions(&owner).unwrap().len(), 2);
    engine
        .restore_trashed_version(&owner, &original.id)
        .unwrap();
    assert_eq!(engine.versions(&owner).unwrap().len(), 3);
}

#[test]
fn owner_force_delete_cascades_through_sqlite() {
    let mut engine = engine();
    let mut store = MemoryRecordStore::new();
    let mut post = create_post(&mut engine, &mut store, &[("title", json!("v1"))]);
    let owner = post.owner_ref();
    update_post(&mut engine, &mut store, &mut post, &[("title", json!("v2"))]);

    assert_eq!(engine.on_deleted(&post, false).unwrap(), 0);
    assert_eq!(engine.versions(&owner).unwrap().len(), 2);

    assert_eq!(engine.on_deleted(&post, true).unwrap(), 2);
    assert!(engine.versions(&owner).unwrap().is_empty());
    assert!(engine.trashed_versions(&owner).unwrap().is_empty());
}

#[test]
fn state_survives_reopening_an_on_disk_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("versions.db");
    let config = RevisalConfig::default();

    let mut store = MemoryRecordStore::new();
    let owner;
    {
        let conn = db::open(&path).unwrap();
        db::configure(&conn).unwrap();
        let repo = SqliteVersionRepo::open(conn, &config).unwrap();
        let mut engine = VersionEngine::new(repo, config.clone());

        let mut post = create_post(&mut engine, &mut store, &[("title", json!("v1"))]);
        owner = post.owner_ref();
        update_post(&mut engine, &mut store, &mut post, &[("title", json!("v2"))]);
    }

    // reopen: migrations are idempotent and the chain is intact
    let conn = db::open(&path).unwrap();
    let repo = SqliteVersionRepo::open(conn, &config).unwrap();
    let engine = VersionEngine::new(repo, config);

    let versions = engine.versions(&owner).unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].contents.get("title"), Some(&json!("v1")));
    assert_eq!(versions[1].contents.get("title"), Some(&json!("v2")));
}
