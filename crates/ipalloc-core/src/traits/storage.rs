// # Storage Trait
//
// Defines the interface between the store actor and the medium holding the
// persisted index record.
//
// ## Purpose
//
// The store actor reads the record once at startup and writes it once at
// shutdown. A storage backend only moves opaque bytes; encoding lives in
// `crate::codec`.
//
// ## Implementations
//
// - `FileStorage`: single file with atomic replace and a backup copy
// - `MemoryStorage`: shared in-process buffer (tests, ephemeral runs)

use async_trait::async_trait;

/// Trait for record storage backends
///
/// # Thread Safety
///
/// Backends are moved into the actor task, so they must be `Send + Sync`.
/// The actor never calls them concurrently.
///
/// ## Implementation Guidelines
///
/// - **Async I/O only**: use async file operations, never blocking I/O
/// - **Whole-record writes**: `save()` replaces the previous record entirely
/// - **Absence is not an error**: `load()` returns `Ok(None)` when nothing has
///   been stored yet
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read the stored record
    ///
    /// # Returns
    ///
    /// - `Ok(Some(bytes))`: The stored record
    /// - `Ok(None)`: Nothing stored yet
    /// - `Err(Error)`: Storage error
    async fn load(&self) -> Result<Option<Vec<u8>>, crate::Error>;

    /// Read the previous good record, if the backend keeps one
    ///
    /// Used when the primary record fails to decode. Backends without a
    /// backup return `Ok(None)`.
    async fn load_backup(&self) -> Result<Option<Vec<u8>>, crate::Error> {
        Ok(None)
    }

    /// Replace the stored record with `bytes`
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Record durably written
    /// - `Err(Error)`: Storage error
    async fn save(&self, bytes: &[u8]) -> Result<(), crate::Error>;

    /// Replace a stored record that failed to decode
    ///
    /// Like `save()`, but a backend that keeps a backup must leave it as it
    /// is: the current record is not worth keeping.
    async fn save_replacing_corrupt(&self, bytes: &[u8]) -> Result<(), crate::Error> {
        self.save(bytes).await
    }

    /// Human-readable location, for logs
    fn describe(&self) -> String;
}
