// # Storage Implementations
//
// This module provides implementations of the Storage trait for
// different persistence strategies.

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;
