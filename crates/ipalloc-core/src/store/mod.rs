//! Actor-owned mapping store
//!
//! The [`StoreActor`] is the single owner of the live [`crate::MappingIndex`].
//! Request handlers hold a cloneable [`StoreHandle`] and talk to the actor
//! over channels, each request carrying its own reply channel.
//!
//! ```text
//!  handler ──┐
//!  handler ──┼── StoreHandle ── lookup channel ──┐
//!  handler ──┘               └─ assign channel ──┼──▶ StoreActor ──▶ MappingIndex
//!                                                │         │
//!  host signal ───────────── shutdown oneshot ───┘         ▼
//!                                                       Storage
//! ```

pub mod actor;
pub mod handle;
pub(crate) mod message;

pub use actor::{StopReason, StoreActor};
pub use handle::StoreHandle;
