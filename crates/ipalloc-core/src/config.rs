//! Configuration types for the ipalloc system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// IP/device pairs seeded into a store that has no persisted record yet
pub const BOOTSTRAP_ASSIGNMENTS: &[(&str, &str)] = &[
    ("1.2.0.1", "gateway"),
    ("1.2.0.2", "nameserver"),
    ("1.2.0.10", "printer"),
];

/// Main ipalloc configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpallocConfig {
    /// Directory holding the persisted index record
    pub data_dir: PathBuf,

    /// Store actor settings
    #[serde(default)]
    pub store: StoreConfig,

    /// HTTP surface settings
    #[serde(default)]
    pub http: HttpConfig,
}

impl IpallocConfig {
    /// Create a configuration with defaults for everything but the data directory
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            store: StoreConfig::default(),
            http: HttpConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(crate::Error::config("Data directory cannot be empty"));
        }

        self.store.validate()?;
        self.http.validate()?;

        Ok(())
    }
}

/// Store actor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Record file name inside the data directory
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Seed [`BOOTSTRAP_ASSIGNMENTS`] when no usable record exists
    #[serde(default = "default_seed_bootstrap")]
    pub seed_bootstrap: bool,

    /// Capacity of each request channel into the actor
    ///
    /// When full, callers wait for room before their request is queued.
    ///
    /// Default: 1024 requests
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl StoreConfig {
    /// Configuration for a store that starts empty
    pub fn empty() -> Self {
        Self {
            seed_bootstrap: false,
            ..Self::default()
        }
    }

    /// Set the request channel capacity
    pub fn with_channel_capacity(mut self, channel_capacity: usize) -> Self {
        self.channel_capacity = channel_capacity;
        self
    }

    /// Pairs to seed a fresh store with
    pub fn bootstrap(&self) -> Vec<(String, String)> {
        if !self.seed_bootstrap {
            return Vec::new();
        }
        BOOTSTRAP_ASSIGNMENTS
            .iter()
            .map(|(ip, device)| (ip.to_string(), device.to_string()))
            .collect()
    }

    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.file_name.is_empty() {
            return Err(crate::Error::config("Record file name cannot be empty"));
        }
        if self.file_name.contains(['/', '\\']) {
            return Err(crate::Error::config(format!(
                "Record file name must not contain path separators: {}",
                self.file_name
            )));
        }
        if self.channel_capacity == 0 {
            return Err(crate::Error::config("Channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            file_name: default_file_name(),
            seed_bootstrap: default_seed_bootstrap(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// HTTP surface configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Address to bind the listener to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// CIDR range assignable addresses must fall in
    #[serde(default = "default_address_range")]
    pub address_range: String,

    /// Upper bound on waiting for the store actor per request (in milliseconds)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl HttpConfig {
    /// Listener address as `host:port`
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Validate the HTTP configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.bind_address.is_empty() {
            return Err(crate::Error::config("Bind address cannot be empty"));
        }
        if self.address_range.is_empty() {
            return Err(crate::Error::config("Address range cannot be empty"));
        }
        if self.request_timeout_ms == 0 {
            return Err(crate::Error::config("Request timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            address_range: default_address_range(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_file_name() -> String {
    crate::state::file::RECORD_FILE_NAME.to_string()
}

fn default_seed_bootstrap() -> bool {
    true
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_address_range() -> String {
    "1.2.0.0/16".to_string()
}

fn default_request_timeout_ms() -> u64 {
    5000
}
