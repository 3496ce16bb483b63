//! Store actor
//!
//! The StoreActor is responsible for:
//! - Loading the persisted index at startup (or seeding a fresh one)
//! - Serving lookups and assignments one at a time
//! - Writing the index back to storage when told to stop
//!
//! ## Lifecycle
//!
//! ```text
//! Initializing ──▶ Serving ──▶ Terminating
//!  load record      lookup       encode
//!  or bootstrap     assign       save
//! ```
//!
//! 1. Create with [`StoreActor::new()`] (or [`StoreActor::spawn()`])
//! 2. Drive with [`StoreActor::run()`]
//! 3. Fire the shutdown oneshot (or drop every [`StoreHandle`])
//! 4. `run()` persists the index and returns
//!
//! ## Ordering
//!
//! The shutdown input is checked before every request. Once it has fired,
//! requests still sitting in the channels are dropped unserved and their
//! callers observe [`crate::Error::StoreUnavailable`]. Between the lookup
//! and assign channels there is no priority.

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::codec;
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::index::{Assignment, MappingIndex};
use crate::traits::Storage;

use super::handle::StoreHandle;
use super::message::{AssignRequest, LookupRequest, Request};

/// Why the actor left its serving loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The shutdown oneshot fired or its sender was dropped
    ShutdownSignal,
    /// Every [`StoreHandle`] was dropped; no request can arrive any more
    HandlesDropped,
}

/// What startup found in storage, which decides how the index is written back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordState {
    /// Record decoded, or nothing stored yet
    Usable,
    /// Record present but did not decode; it must not become the backup
    Corrupt,
    /// Record could not be read; it must not be overwritten
    Unreadable,
}

/// Single owner of the live [`MappingIndex`]
///
/// Nothing else in the process can reach the index: handlers only hold
/// channel senders. All mutation happens on this task, one request at a
/// time, so two assignments can never interleave.
pub struct StoreActor {
    /// Backend holding the persisted record
    storage: Box<dyn Storage>,

    /// Pairs seeded when no usable record exists
    bootstrap: Vec<(String, String)>,

    /// Incoming lookups
    lookup_rx: mpsc::Receiver<LookupRequest>,

    /// Incoming assignments
    assign_rx: mpsc::Receiver<AssignRequest>,

    /// Termination input
    shutdown_rx: oneshot::Receiver<()>,
}

impl StoreActor {
    /// Create a store actor
    ///
    /// # Parameters
    ///
    /// - `storage`: Backend the record is loaded from and saved to
    /// - `config`: Store configuration
    ///
    /// # Returns
    ///
    /// A tuple of (actor, handle, shutdown_tx). Sending on (or dropping)
    /// `shutdown_tx` makes the actor persist and stop.
    pub fn new(
        storage: Box<dyn Storage>,
        config: &StoreConfig,
    ) -> (Self, StoreHandle, oneshot::Sender<()>) {
        let capacity = config.channel_capacity.max(1);
        let (lookup_tx, lookup_rx) = mpsc::channel(capacity);
        let (assign_tx, assign_rx) = mpsc::channel(capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let actor = Self {
            storage,
            bootstrap: config.bootstrap(),
            lookup_rx,
            assign_rx,
            shutdown_rx,
        };

        (actor, StoreHandle::new(lookup_tx, assign_tx), shutdown_tx)
    }

    /// Create a store actor and run it on a new tokio task
    pub fn spawn(
        storage: Box<dyn Storage>,
        config: &StoreConfig,
    ) -> (JoinHandle<Result<StopReason>>, StoreHandle, oneshot::Sender<()>) {
        let (actor, handle, shutdown_tx) = Self::new(storage, config);
        (tokio::spawn(actor.run()), handle, shutdown_tx)
    }

    /// Run the actor until shutdown
    ///
    /// # Returns
    ///
    /// - `Ok(StopReason)`: Index persisted, actor stopped
    /// - `Err(Error::Persist)`: Actor stopped but the index could not be
    ///   written (or the record was unreadable at startup and was left
    ///   alone); the state held in memory is lost
    pub async fn run(mut self) -> Result<StopReason> {
        let (mut index, record) = Self::initialize(self.storage.as_ref(), &self.bootstrap).await;
        info!(
            "Store actor serving {} assignment(s) across {} device(s)",
            index.len(),
            index.device_count()
        );

        let reason = loop {
            tokio::select! {
                biased;

                _ = &mut self.shutdown_rx => {
                    info!("Shutdown signal received");
                    break StopReason::ShutdownSignal;
                }

                request = Self::next_request(&mut self.lookup_rx, &mut self.assign_rx) => {
                    match request {
                        Some(request) => Self::handle(&mut index, request),
                        None => {
                            info!("All store handles dropped");
                            break StopReason::HandlesDropped;
                        }
                    }
                }
            }
        };

        Self::persist(self.storage.as_ref(), &index, record).await?;
        info!("Index persisted, store actor stopped ({:?})", reason);

        Ok(reason)
    }

    /// Load the persisted index, falling back to backup, then bootstrap
    ///
    /// Never fails: every problem is logged and the actor starts with
    /// whatever could be recovered.
    async fn initialize(
        storage: &dyn Storage,
        bootstrap: &[(String, String)],
    ) -> (MappingIndex, RecordState) {
        let location = storage.describe();

        let record = match storage.load().await {
            Ok(Some(bytes)) => match codec::decode(&bytes) {
                Ok(index) => {
                    info!("Loaded {} assignment(s) from {}", index.len(), location);
                    return (index, RecordState::Usable);
                }
                Err(e) => {
                    warn!(
                        "Record at {} appears corrupted: {}. Attempting recovery from backup.",
                        location, e
                    );

                    match storage.load_backup().await {
                        Ok(Some(backup)) => match codec::decode(&backup) {
                            Ok(index) => {
                                info!("Recovered {} assignment(s) from backup", index.len());
                                return (index, RecordState::Corrupt);
                            }
                            Err(backup_err) => {
                                error!(
                                    "Backup also corrupted: {}. Starting from bootstrap set.",
                                    backup_err
                                );
                            }
                        },
                        Ok(None) => {
                            warn!("No backup record found. Starting from bootstrap set.");
                        }
                        Err(backup_err) => {
                            error!(
                                "Failed to read backup record: {}. Starting from bootstrap set.",
                                backup_err
                            );
                        }
                    }
                    RecordState::Corrupt
                }
            },
            Ok(None) => {
                debug!("No record at {}, starting from bootstrap set", location);
                RecordState::Usable
            }
            Err(e) => {
                error!(
                    "Failed to read record at {}: {}. Starting from bootstrap set; \
                    the record will not be overwritten at shutdown.",
                    location, e
                );
                RecordState::Unreadable
            }
        };

        (Self::bootstrap_index(bootstrap), record)
    }

    fn bootstrap_index(bootstrap: &[(String, String)]) -> MappingIndex {
        let mut index = MappingIndex::new();
        for (ip, device) in bootstrap {
            if let Err(e) = index.assign(ip.as_str(), device.as_str()) {
                warn!("Skipping bootstrap pair {} -> {}: {}", ip, device, e);
            }
        }
        index
    }

    /// Wait for the next request on either channel
    ///
    /// Returns `None` once both channels are closed. The choice between two
    /// ready channels is left to `select!`'s random branch order.
    async fn next_request(
        lookup_rx: &mut mpsc::Receiver<LookupRequest>,
        assign_rx: &mut mpsc::Receiver<AssignRequest>,
    ) -> Option<Request> {
        tokio::select! {
            Some(request) = lookup_rx.recv() => Some(Request::Lookup(request)),
            Some(request) = assign_rx.recv() => Some(Request::Assign(request)),
            else => None,
        }
    }

    /// Apply one request to the index and reply to its caller
    fn handle(index: &mut MappingIndex, request: Request) {
        match request {
            Request::Lookup(LookupRequest { ip, reply }) => {
                let result = match index.lookup(&ip) {
                    Some(device) => Ok(device.to_string()),
                    None => Err(Error::device_not_found(ip.as_str())),
                };
                debug!("Lookup {} -> {:?}", ip, result.as_ref().ok());

                if reply.send(result).is_err() {
                    debug!("Lookup caller for {} went away before the reply", ip);
                }
            }
            Request::Assign(AssignRequest { ip, device, reply }) => {
                let result = index.assign(ip.as_str(), device.as_str());
                match &result {
                    Ok(Assignment::Created) => info!("Assigned {} -> {}", ip, device),
                    Ok(Assignment::Unchanged) => debug!("{} already assigned to {}", ip, device),
                    Err(e) => debug!("Rejected {} -> {}: {}", ip, device, e),
                }

                if reply.send(result).is_err() {
                    debug!("Assign caller for {} went away before the reply", ip);
                }
            }
        }
    }

    /// Encode the index and write it to storage
    async fn persist(storage: &dyn Storage, index: &MappingIndex, record: RecordState) -> Result<()> {
        if record == RecordState::Unreadable {
            error!(
                "Record at {} was unreadable at startup, not overwriting it; {} assignment(s) lost",
                storage.describe(),
                index.len()
            );
            return Err(Error::persist(format!(
                "record at {} was unreadable at startup",
                storage.describe()
            )));
        }

        let bytes = codec::encode(index, Utc::now()).map_err(|e| {
            error!("Failed to encode index: {}", e);
            Error::persist(format!("encode failed: {}", e))
        })?;

        let saved = match record {
            RecordState::Corrupt => storage.save_replacing_corrupt(&bytes).await,
            _ => storage.save(&bytes).await,
        };
        saved.map_err(|e| {
            error!(
                "Failed to persist {} assignment(s) to {}: {}",
                index.len(),
                storage.describe(),
                e
            );
            Error::persist(e.to_string())
        })?;

        info!(
            "Wrote {} assignment(s) to {}",
            index.len(),
            storage.describe()
        );
        Ok(())
    }
}
