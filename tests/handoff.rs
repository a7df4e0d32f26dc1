//! Tests for the hand-off store and the storage adapters beneath it.

use std::sync::Arc;

mod common;
use common::*;

use qrstudio::handoff::{DiscardReason, HandoffOutcome, HandoffState, HandoffStore};
use qrstudio::storage::FileStorage;

fn store() -> (HandoffStore, Arc<MemoryStorage>) {
    let storage = test_storage();
    (HandoffStore::new(storage.clone()), storage)
}

#[test]
fn test_write_then_consume_round_trips() {
    let (mut handoff, _) = store();
    let config = premium_config();

    handoff.write(&config).unwrap();
    assert_eq!(handoff.state(), HandoffState::HandoffWritten);

    assert_eq!(handoff.consume(), HandoffOutcome::Restored(config));
    assert_eq!(handoff.state(), HandoffState::NoHandoff);
}

#[test]
fn test_second_consume_finds_nothing() {
    let (mut handoff, storage) = store();
    handoff.write(&plain_config()).unwrap();
    handoff.consume();

    assert!(storage.get(keys::HANDOFF_PENDING_CONFIG).is_none());
    assert_eq!(
        handoff.consume(),
        HandoffOutcome::Discarded(DiscardReason::Absent)
    );
}

#[test]
fn test_corrupt_snapshot_is_discarded_and_deleted() {
    let (mut handoff, storage) = store();
    storage
        .set(keys::HANDOFF_PENDING_CONFIG, "{not json")
        .unwrap();

    assert!(matches!(
        handoff.consume(),
        HandoffOutcome::Discarded(DiscardReason::Corrupt(_))
    ));
    assert!(storage.get(keys::HANDOFF_PENDING_CONFIG).is_none());
}

#[test]
fn test_pending_snapshot_is_seen_by_a_new_store() {
    let storage = test_storage();
    HandoffStore::new(storage.clone())
        .write(&plain_config())
        .unwrap();

    let reopened = HandoffStore::new(storage);
    assert_eq!(reopened.state(), HandoffState::HandoffWritten);
    assert!(reopened.is_pending());
}

#[test]
fn test_legacy_snapshot_is_restored() {
    let (mut handoff, storage) = store();
    let legacy = r##"{
        "url": "https://legacy.example",
        "fgColor": "#101010",
        "bgColor": "",
        "useGradient": true,
        "gradientColor1": "#aa0000",
        "gradientColor2": "#0000aa",
        "logo": "data:image/png;base64,AAAA"
    }"##;
    storage.set(keys::HANDOFF_PENDING_CONFIG, legacy).unwrap();

    let HandoffOutcome::Restored(config) = handoff.consume() else {
        panic!("legacy snapshot should restore");
    };
    assert_eq!(config.content(), "https://legacy.example");
    assert_eq!(config.foreground().as_str(), "#101010");
    assert_eq!(config.background().as_str(), DEFAULT_BACKGROUND);
    assert!(config.gradient().enabled);
    assert_eq!(config.gradient().stops[1].as_str(), "#0000aa");
    assert!(config.logo().is_some());
    assert_eq!(config.shape(), Shape::default());
}

#[test]
fn test_partial_snapshot_gets_defaults() {
    let (mut handoff, storage) = store();
    storage
        .set(keys::HANDOFF_PENDING_CONFIG, r#"{"content": ""}"#)
        .unwrap();

    assert_eq!(
        handoff.consume(),
        HandoffOutcome::Restored(StyleConfig::default())
    );
}

// ============ FileStorage ============

#[test]
fn test_file_storage_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();

    {
        let storage = Arc::new(FileStorage::open(dir.path()).unwrap());
        HandoffStore::new(storage)
            .write(&premium_config())
            .unwrap();
    }

    let storage = Arc::new(FileStorage::open(dir.path()).unwrap());
    let mut handoff = HandoffStore::new(storage);
    assert_eq!(handoff.consume(), HandoffOutcome::Restored(premium_config()));

    let reopened = FileStorage::open(dir.path()).unwrap();
    assert!(reopened.get(keys::HANDOFF_PENDING_CONFIG).is_none());
}

#[test]
fn test_file_storage_ignores_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(FileStorage::FILE_NAME), "garbage").unwrap();

    let storage = FileStorage::open(dir.path()).unwrap();
    assert!(storage.get(keys::ENTITLEMENT_GRANTED).is_none());

    storage.set(keys::ENTITLEMENT_GRANTED, "true").unwrap();
    let reopened = FileStorage::open(dir.path()).unwrap();
    assert_eq!(
        reopened.get(keys::ENTITLEMENT_GRANTED).as_deref(),
        Some("true")
    );
}

#[test]
fn test_file_storage_creates_missing_dir() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("a").join("b");

    let storage = FileStorage::open(&nested).unwrap();
    storage.set("k", "v").unwrap();
    assert!(storage.path().exists());
}

#[test]
fn test_failed_write_leaves_nothing_pending() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::open(dir.path()).unwrap());
    std::fs::create_dir(storage.path()).unwrap();

    let mut handoff = HandoffStore::new(storage.clone());
    assert!(handoff.write(&premium_config()).is_err());

    assert!(!handoff.is_pending());
    assert_eq!(handoff.state(), HandoffState::NoHandoff);
    assert_eq!(
        handoff.consume(),
        HandoffOutcome::Discarded(DiscardReason::Absent)
    );
}

#[test]
fn test_failed_delete_keeps_snapshot_in_step_with_disk() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::open(dir.path()).unwrap());
    let mut handoff = HandoffStore::new(storage.clone());
    handoff.write(&premium_config()).unwrap();

    std::fs::remove_file(storage.path()).unwrap();
    std::fs::create_dir(storage.path()).unwrap();

    assert_eq!(handoff.consume(), HandoffOutcome::Restored(premium_config()));
    assert!(handoff.is_pending());

    std::fs::remove_dir(storage.path()).unwrap();
    storage.remove(keys::HANDOFF_PENDING_CONFIG).unwrap();
    let reopened = FileStorage::open(dir.path()).unwrap();
    assert!(reopened.get(keys::HANDOFF_PENDING_CONFIG).is_none());
}
