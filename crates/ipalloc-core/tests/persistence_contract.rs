//! Contract Test: Startup Load & Shutdown Persistence
//!
//! This test verifies the two points where the store actor touches storage.
//!
//! Constraints verified:
//! - State written at shutdown is loaded at the next startup
//! - A fresh store is seeded with the bootstrap set
//! - A corrupted record never prevents startup
//! - Recovering from the backup never destroys the backup
//! - A record that cannot be read is never overwritten
//! - A failed write at shutdown is reported, not swallowed
//!
//! If this test fails, restarts can lose or corrupt assignments silently.

mod common;

use common::*;
use ipalloc_core::config::{BOOTSTRAP_ASSIGNMENTS, StoreConfig};
use ipalloc_core::state::FileStorage;
use ipalloc_core::state::MemoryStorage;
use ipalloc_core::state::file::RECORD_FILE_NAME;
use ipalloc_core::traits::Storage;
use ipalloc_core::{Error, MappingIndex, StoreActor, codec};
use std::sync::Arc;
use tempfile::tempdir;

async fn run_until_stopped(
    storage: Box<dyn Storage>,
    config: &StoreConfig,
    assignments: &[(&str, &str)],
) -> ipalloc_core::Result<ipalloc_core::store::StopReason> {
    let (task, handle, shutdown_tx) = StoreActor::spawn(storage, config);
    for (ip, device) in assignments {
        handle.update_device(*ip, *device).await?;
    }
    let _ = shutdown_tx.send(());
    task.await.expect("actor task does not panic")
}

#[tokio::test]
async fn file_state_survives_restart() {
    let dir = tempdir().unwrap();

    run_until_stopped(
        Box::new(FileStorage::in_dir(dir.path()).unwrap()),
        &StoreConfig::empty(),
        &[("1.2.3.4", "device1"), ("1.2.3.5", "device1"), ("1.2.9.9", "camera")],
    )
    .await
    .unwrap();

    assert!(dir.path().join(RECORD_FILE_NAME).exists());

    let (task, handle, shutdown_tx) = StoreActor::spawn(
        Box::new(FileStorage::in_dir(dir.path()).unwrap()),
        &StoreConfig::empty(),
    );
    assert_eq!(handle.get_device("1.2.3.5").await.unwrap(), "device1");
    assert_eq!(handle.get_device("1.2.9.9").await.unwrap(), "camera");

    // Ownership still enforced after reload
    let conflict = handle.update_device("1.2.3.4", "camera").await;
    assert!(matches!(conflict, Err(Error::IpInUse { .. })));

    shutdown_tx.send(()).unwrap();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn persisted_record_round_trips_both_maps() {
    let storage = MemoryStorage::new();
    let assignments = [
        ("10.2.3.4", "device1"),
        ("10.2.3.5", "device1"),
        ("10.2.3.6", "device2"),
    ];

    run_until_stopped(Box::new(storage.clone()), &StoreConfig::empty(), &assignments)
        .await
        .unwrap();

    let persisted = codec::decode(&storage.snapshot().await.unwrap()).unwrap();
    let expected = MappingIndex::from_pairs(assignments).unwrap();
    assert_eq!(persisted, expected);
    assert_eq!(persisted.ips_for("device1"), ["10.2.3.4", "10.2.3.5"]);
}

#[tokio::test]
async fn first_run_seeds_bootstrap_set() {
    let store = TestStore::spawn_with(MemoryStorage::new(), StoreConfig::default());

    for (ip, device) in BOOTSTRAP_ASSIGNMENTS {
        assert_eq!(store.handle.get_device(*ip).await.unwrap(), *device);
    }

    let (_, index) = store.stop().await;
    assert_eq!(index.len(), BOOTSTRAP_ASSIGNMENTS.len());
}

#[tokio::test]
async fn persisted_record_replaces_bootstrap_set() {
    let stored = MappingIndex::from_pairs([("1.2.3.4", "device1")]).unwrap();
    let storage = MemoryStorage::with_record(codec::encode(&stored, chrono::Utc::now()).unwrap());

    let store = TestStore::spawn_with(storage, StoreConfig::default());
    let (bootstrap_ip, _) = BOOTSTRAP_ASSIGNMENTS[0];
    let miss = store.handle.get_device(bootstrap_ip).await;
    assert!(matches!(miss, Err(Error::DeviceNotFound(_))));

    store.stop().await;
}

#[tokio::test]
async fn corrupted_record_starts_fresh() {
    let dir = tempdir().unwrap();
    tokio::fs::write(dir.path().join(RECORD_FILE_NAME), b"corrupted json data")
        .await
        .unwrap();

    let (task, handle, shutdown_tx) = StoreActor::spawn(
        Box::new(FileStorage::in_dir(dir.path()).unwrap()),
        &StoreConfig::empty(),
    );

    let miss = handle.get_device("1.2.3.4").await;
    assert!(matches!(miss, Err(Error::DeviceNotFound(_))));

    handle.update_device("1.2.3.4", "device1").await.unwrap();
    assert_eq!(handle.get_device("1.2.3.4").await.unwrap(), "device1");

    shutdown_tx.send(()).unwrap();
    task.await.unwrap().unwrap();

    // The corrupted record has been replaced by a valid one
    let bytes = tokio::fs::read(dir.path().join(RECORD_FILE_NAME)).await.unwrap();
    assert_eq!(codec::decode(&bytes).unwrap().lookup("1.2.3.4"), Some("device1"));
}

#[tokio::test]
async fn corrupted_record_recovers_from_backup() {
    let dir = tempdir().unwrap();

    // Two clean shutdowns leave a backup of the first run's state
    run_until_stopped(
        Box::new(FileStorage::in_dir(dir.path()).unwrap()),
        &StoreConfig::empty(),
        &[("1.2.3.4", "device1")],
    )
    .await
    .unwrap();
    run_until_stopped(
        Box::new(FileStorage::in_dir(dir.path()).unwrap()),
        &StoreConfig::empty(),
        &[("1.2.3.5", "device2")],
    )
    .await
    .unwrap();

    tokio::fs::write(dir.path().join(RECORD_FILE_NAME), b"{ not json")
        .await
        .unwrap();

    let (task, handle, shutdown_tx) = StoreActor::spawn(
        Box::new(FileStorage::in_dir(dir.path()).unwrap()),
        &StoreConfig::empty(),
    );

    // Backup holds the state before the last write
    assert_eq!(handle.get_device("1.2.3.4").await.unwrap(), "device1");
    assert!(matches!(
        handle.get_device("1.2.3.5").await,
        Err(Error::DeviceNotFound(_))
    ));

    handle.update_device("1.2.3.6", "device3").await.unwrap();
    shutdown_tx.send(()).unwrap();
    task.await.unwrap().unwrap();

    // The good backup is kept, the corrupted record is not copied over it
    let backup = FileStorage::in_dir(dir.path())
        .unwrap()
        .load_backup()
        .await
        .unwrap()
        .expect("backup still present");
    let backup = codec::decode(&backup).expect("backup still decodes");
    assert_eq!(backup.lookup("1.2.3.4"), Some("device1"));

    let current = tokio::fs::read(dir.path().join(RECORD_FILE_NAME)).await.unwrap();
    let current = codec::decode(&current).unwrap();
    assert_eq!(current.lookup("1.2.3.6"), Some("device3"));
}

#[tokio::test]
async fn backup_survives_repeated_corruption() {
    let dir = tempdir().unwrap();

    for (ip, device) in [("1.2.3.4", "device1"), ("1.2.3.5", "device2")] {
        run_until_stopped(
            Box::new(FileStorage::in_dir(dir.path()).unwrap()),
            &StoreConfig::empty(),
            &[(ip, device)],
        )
        .await
        .unwrap();
    }

    // Corrupt, recover, corrupt again: the second recovery still finds a
    // good backup
    for _ in 0..2 {
        tokio::fs::write(dir.path().join(RECORD_FILE_NAME), b"{ not json")
            .await
            .unwrap();
        run_until_stopped(
            Box::new(FileStorage::in_dir(dir.path()).unwrap()),
            &StoreConfig::empty(),
            &[],
        )
        .await
        .unwrap();
    }

    let store = FileStorage::in_dir(dir.path()).unwrap();
    let backup = codec::decode(&store.load_backup().await.unwrap().unwrap()).unwrap();
    assert_eq!(backup.lookup("1.2.3.4"), Some("device1"));
    let current = codec::decode(&store.load().await.unwrap().unwrap()).unwrap();
    assert_eq!(current.lookup("1.2.3.4"), Some("device1"));
}

#[tokio::test]
async fn unreadable_record_is_not_overwritten() {
    let storage = Arc::new(UnreadableStorage::new());

    let (task, handle, shutdown_tx) = StoreActor::spawn(
        Box::new(UnreadableStorage::sharing_counters_with(&storage)),
        &StoreConfig::default(),
    );

    // Startup still serves the bootstrap set
    let (ip, device) = BOOTSTRAP_ASSIGNMENTS[0];
    assert_eq!(handle.get_device(ip).await.unwrap(), device);

    shutdown_tx.send(()).unwrap();
    let result = task.await.unwrap();

    assert!(
        matches!(result, Err(Error::Persist(_))),
        "expected Persist error, got {:?}",
        result
    );
    assert_eq!(storage.save_call_count(), 0, "unreadable record must be left alone");
}

#[tokio::test]
async fn inconsistent_record_starts_fresh() {
    let storage = MemoryStorage::with_record(
        r#"{"ip_to_device":{"1.2.3.4":"device1"},"device_to_ips":{"device2":["1.2.3.4"]}}"#,
    );
    let store = TestStore::spawn_with(storage, StoreConfig::empty());

    let miss = store.handle.get_device("1.2.3.4").await;
    assert!(matches!(miss, Err(Error::DeviceNotFound(_))));

    store.stop().await;
}

#[tokio::test]
async fn write_failure_at_shutdown_is_reported() {
    let storage = Arc::new(FailingStorage::new());

    let result = run_until_stopped(
        Box::new(FailingStorage::sharing_counters_with(&storage)),
        &StoreConfig::empty(),
        &[("1.2.3.4", "device1")],
    )
    .await;

    assert!(
        matches!(result, Err(Error::Persist(_))),
        "expected Persist error, got {:?}",
        result
    );
    assert_eq!(storage.save_call_count(), 1, "no retry on the way out");
}

#[tokio::test]
async fn write_into_removed_data_dir_is_reported() {
    let dir = tempdir().unwrap();
    let storage = FileStorage::in_dir(dir.path()).unwrap();
    let data_dir = dir.path().to_path_buf();
    drop(dir);
    assert!(!data_dir.exists());

    let result = run_until_stopped(Box::new(storage), &StoreConfig::empty(), &[]).await;
    assert!(matches!(result, Err(Error::Persist(_))));
}
