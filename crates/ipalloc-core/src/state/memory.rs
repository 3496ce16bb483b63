// # Memory Storage
//
// In-memory implementation of Storage.
//
// ## Purpose
//
// Keeps the record in a shared buffer instead of on disk. Clones share the
// same buffer, so a test can hand one clone to the store actor and inspect
// what was persisted through another.
//
// ## Crash Behavior
//
// - The record is lost when the process exits
// - No backup copy is kept

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::Storage;

/// In-memory record storage
///
/// # Example
///
/// ```rust,no_run
/// use ipalloc_core::state::MemoryStorage;
/// use ipalloc_core::traits::Storage;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let storage = MemoryStorage::new();
///     storage.save(b"{}").await?;
///     assert_eq!(storage.load().await?, Some(b"{}".to_vec()));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<RwLock<Option<Vec<u8>>>>,
}

impl MemoryStorage {
    /// Create an empty memory storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory storage that already holds `bytes`
    pub fn with_record(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(bytes.into()))),
        }
    }

    /// Current record, if any
    pub async fn snapshot(&self) -> Option<Vec<u8>> {
        self.inner.read().await.clone()
    }

    /// Check if nothing has been stored
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_none()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn load(&self) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, bytes: &[u8]) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        *guard = Some(bytes.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
