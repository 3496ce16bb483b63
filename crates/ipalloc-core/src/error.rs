//! Error types for the ipalloc system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for ipalloc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the ipalloc system
#[derive(Error, Debug)]
pub enum Error {
    /// The IP is already assigned to a different device
    #[error("IP Address is in use by another device")]
    IpInUse {
        /// Address that was requested
        ip: String,
        /// Device currently holding the address
        current_device: String,
    },

    /// Lookup miss
    #[error("No device was found for IP address")]
    DeviceNotFound(String),

    /// The store actor is gone or did not answer in time
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Writing the index to storage failed
    #[error("Persist error: {0}")]
    Persist(String),

    /// Storage backend errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an "IP in use" error
    pub fn ip_in_use(ip: impl Into<String>, current_device: impl Into<String>) -> Self {
        Self::IpInUse {
            ip: ip.into(),
            current_device: current_device.into(),
        }
    }

    /// Create a "device not found" error
    pub fn device_not_found(ip: impl Into<String>) -> Self {
        Self::DeviceNotFound(ip.into())
    }

    /// Create a store unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Create a persist error
    pub fn persist(msg: impl Into<String>) -> Self {
        Self::Persist(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Failure to turn stored bytes back into a [`crate::MappingIndex`]
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Bytes are not a valid record document
    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Forward and reverse maps disagree
    #[error("inconsistent record: {0}")]
    Inconsistent(String),
}
