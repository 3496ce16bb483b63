//! Client-side facade for the store actor

use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};
use crate::index::Assignment;

use super::message::{AssignRequest, LookupRequest};

/// Cloneable handle used by request handlers to reach the [`super::StoreActor`]
///
/// Every call builds a request with a fresh oneshot reply channel, queues it,
/// and waits for the actor's answer. The handle imposes no timeout; wrap
/// calls in [`tokio::time::timeout`] where latency must be bounded.
///
/// # Example
///
/// ```rust,no_run
/// use ipalloc_core::config::StoreConfig;
/// use ipalloc_core::state::MemoryStorage;
/// use ipalloc_core::StoreActor;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let (task, store, shutdown_tx) =
///         StoreActor::spawn(Box::new(MemoryStorage::new()), &StoreConfig::empty());
///
///     store.update_device("1.2.3.4", "device1").await?;
///     assert_eq!(store.get_device("1.2.3.4").await?, "device1");
///
///     let _ = shutdown_tx.send(());
///     task.await??;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct StoreHandle {
    lookup_tx: mpsc::Sender<LookupRequest>,
    assign_tx: mpsc::Sender<AssignRequest>,
}

impl StoreHandle {
    pub(crate) fn new(
        lookup_tx: mpsc::Sender<LookupRequest>,
        assign_tx: mpsc::Sender<AssignRequest>,
    ) -> Self {
        Self {
            lookup_tx,
            assign_tx,
        }
    }

    /// Device assigned to `ip`
    ///
    /// # Returns
    ///
    /// - `Ok(device)`: The owning device
    /// - `Err(Error::DeviceNotFound)`: Nothing assigned to `ip`
    /// - `Err(Error::StoreUnavailable)`: The actor stopped without serving
    ///   the request
    ///
    /// A request the actor never serves does not leave the caller blocked:
    /// when the actor stops, the request and its reply sender are dropped
    /// and this returns `StoreUnavailable`. While the actor is alive but
    /// busy, the call waits with no limit.
    pub async fn get_device(&self, ip: impl Into<String>) -> Result<String> {
        let (reply, reply_rx) = oneshot::channel();
        self.lookup_tx
            .send(LookupRequest {
                ip: ip.into(),
                reply,
            })
            .await
            .map_err(|_| Error::unavailable("store actor has stopped"))?;

        reply_rx
            .await
            .map_err(|_| Error::unavailable("store actor stopped before replying"))?
    }

    /// Assign `ip` to `device`
    ///
    /// # Returns
    ///
    /// - `Ok(Assignment::Created)`: New mapping stored
    /// - `Ok(Assignment::Unchanged)`: `ip` already belonged to `device`
    /// - `Err(Error::IpInUse)`: `ip` belongs to a different device
    /// - `Err(Error::StoreUnavailable)`: The actor stopped without serving
    ///   the request; the assignment was not applied
    pub async fn update_device(
        &self,
        ip: impl Into<String>,
        device: impl Into<String>,
    ) -> Result<Assignment> {
        let (reply, reply_rx) = oneshot::channel();
        self.assign_tx
            .send(AssignRequest {
                ip: ip.into(),
                device: device.into(),
                reply,
            })
            .await
            .map_err(|_| Error::unavailable("store actor has stopped"))?;

        reply_rx
            .await
            .map_err(|_| Error::unavailable("store actor stopped before replying"))?
    }

    /// Check if the actor has stopped accepting requests
    pub fn is_closed(&self) -> bool {
        self.lookup_tx.is_closed() || self.assign_tx.is_closed()
    }
}
