// # ipalloc-core
//
// Core library for the ipalloc IP-to-device allocation service.
//
// ## Architecture Overview
//
// - **MappingIndex**: forward (IP → device) and reverse (device → IPs) maps
//   with the single-owner assignment rule
// - **codec**: whole-index JSON encoding used for the on-disk record
// - **Storage**: trait seam for the byte store behind the actor
// - **StoreActor**: the only task that ever reads or mutates the index
// - **StoreHandle**: cloneable facade that request handlers talk to
//
// ## Design Principles
//
// 1. **Single owner**: the index lives inside one task, no locks around it
// 2. **Message passing**: every read and write is a request with its own
//    reply channel
// 3. **Explicit shutdown**: the host wires its signals to a oneshot; the
//    actor persists the index and returns
// 4. **Library-first**: the daemon and HTTP layer are thin wrappers

pub mod codec;
pub mod config;
pub mod error;
pub mod index;
pub mod state;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use config::IpallocConfig;
pub use error::{DecodeError, Error, Result};
pub use index::{Assignment, MappingIndex};
pub use state::{FileStorage, MemoryStorage};
pub use store::{StoreActor, StoreHandle};
pub use traits::Storage;
