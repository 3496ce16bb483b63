//! Core traits for the ipalloc system
//!
//! - [`Storage`]: byte store holding the persisted index record

pub mod storage;

pub use storage::Storage;
