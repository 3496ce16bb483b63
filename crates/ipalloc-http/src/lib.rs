// # ipalloc HTTP API
//
// Thin HTTP surface over the ipalloc store facade.
//
// ## Endpoints
//
// - `GET /devices/{ip}`: device currently holding `ip`
// - `POST /addresses/assign`: assign `{"ip", "device"}`
//
// ## Responsibilities
//
// This crate validates and encodes; it never touches the mapping index.
// Every store call goes through `StoreHandle` and is bounded by the
// configured request timeout.

pub mod handlers;
pub mod routes;
pub mod validate;

use std::sync::Arc;
use std::time::Duration;

use ipalloc_core::StoreHandle;
use ipalloc_core::config::HttpConfig;
use ipnet::Ipv4Net;
use tokio::net::TcpListener;

pub use routes::router;
pub use validate::{ValidationError, parse_range};

/// Shared application state
#[derive(Debug, Clone)]
pub struct AppState {
    store: StoreHandle,
    address_range: Ipv4Net,
    request_timeout: Duration,
}

impl AppState {
    /// Build handler state from the store facade and HTTP settings
    ///
    /// Fails if the configured address range is not valid CIDR.
    pub fn new(store: StoreHandle, config: &HttpConfig) -> Result<Self, ValidationError> {
        Ok(Self {
            store,
            address_range: parse_range(&config.address_range)?,
            request_timeout: Duration::from_millis(config.request_timeout_ms),
        })
    }

    /// Wrap in an `Arc` for use as router state
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

/// Serve the API on an already bound listener until the future is dropped
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    axum::serve(listener, router(state)).await
}
