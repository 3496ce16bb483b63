//! Test doubles and common utilities for store contract tests

#![allow(dead_code)]

use ipalloc_core::config::StoreConfig;
use ipalloc_core::error::Result;
use ipalloc_core::state::MemoryStorage;
use ipalloc_core::store::StopReason;
use ipalloc_core::traits::Storage;
use ipalloc_core::{Error, MappingIndex, StoreActor, StoreHandle, codec};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Storage whose writes always fail
pub struct FailingStorage {
    save_call_count: Arc<AtomicUsize>,
}

impl FailingStorage {
    pub fn new() -> Self {
        Self {
            save_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Share the save counter with another instance
    pub fn sharing_counters_with(other: &Arc<FailingStorage>) -> Self {
        Self {
            save_call_count: other.save_call_count.clone(),
        }
    }

    pub fn save_call_count(&self) -> usize {
        self.save_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Storage for FailingStorage {
    async fn load(&self) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn save(&self, _bytes: &[u8]) -> Result<()> {
        self.save_call_count.fetch_add(1, Ordering::SeqCst);
        Err(Error::storage("disk full"))
    }

    fn describe(&self) -> String {
        "failing".to_string()
    }
}

/// Storage whose record exists but cannot be read
pub struct UnreadableStorage {
    save_call_count: Arc<AtomicUsize>,
}

impl UnreadableStorage {
    pub fn new() -> Self {
        Self {
            save_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Share the save counter with another instance
    pub fn sharing_counters_with(other: &Arc<UnreadableStorage>) -> Self {
        Self {
            save_call_count: other.save_call_count.clone(),
        }
    }

    pub fn save_call_count(&self) -> usize {
        self.save_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Storage for UnreadableStorage {
    async fn load(&self) -> Result<Option<Vec<u8>>> {
        Err(Error::storage("permission denied"))
    }

    async fn save(&self, _bytes: &[u8]) -> Result<()> {
        self.save_call_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "unreadable".to_string()
    }
}

/// A running actor over an empty in-memory store
pub struct TestStore {
    pub task: JoinHandle<Result<StopReason>>,
    pub handle: StoreHandle,
    pub shutdown_tx: oneshot::Sender<()>,
    pub storage: MemoryStorage,
}

impl TestStore {
    /// Spawn an actor that starts with no assignments
    pub fn spawn_empty() -> Self {
        Self::spawn_with(MemoryStorage::new(), StoreConfig::empty())
    }

    pub fn spawn_with(storage: MemoryStorage, config: StoreConfig) -> Self {
        let (task, handle, shutdown_tx) = StoreActor::spawn(Box::new(storage.clone()), &config);
        Self {
            task,
            handle,
            shutdown_tx,
            storage,
        }
    }

    /// Fire shutdown, wait for the actor, and decode what it persisted
    pub async fn stop(self) -> (StopReason, MappingIndex) {
        let _ = self.shutdown_tx.send(());
        let reason = tokio::time::timeout(std::time::Duration::from_secs(5), self.task)
            .await
            .expect("actor stops within 5 seconds")
            .expect("actor task does not panic")
            .expect("actor persists successfully");

        let bytes = self.storage.snapshot().await.expect("record was written");
        (reason, codec::decode(&bytes).expect("persisted record decodes"))
    }
}

/// Every forward entry is listed under its device
pub fn assert_reverse_consistent(index: &MappingIndex) {
    for (ip, device) in index.iter() {
        assert!(
            index.ips_for(device).iter().any(|listed| listed == ip),
            "{} mapped to {} but missing from reverse index",
            ip,
            device
        );
    }
}
