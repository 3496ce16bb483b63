// # ipallocd - ipalloc Daemon
//
// Thin integration layer: all allocation logic lives in ipalloc-core and
// all request handling in ipalloc-http.
//
// The ipallocd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Starting the store actor and the HTTP API
// 4. Turning SIGINT/SIGTERM into a store shutdown, so the index is persisted
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// - `IPALLOC_DATAPATH`: Directory holding the record file (required)
// - `IPALLOC_FILE_NAME`: Record file name (default: ipmapper)
// - `IPALLOC_BIND_ADDRESS`: Listen address (default: 127.0.0.1)
// - `IPALLOC_PORT`: Listen port (default: 8080)
// - `IPALLOC_ADDRESS_RANGE`: Assignable CIDR range (default: 1.2.0.0/16)
// - `IPALLOC_SEED`: Seed the bootstrap set on first run (default: true)
// - `IPALLOC_REQUEST_TIMEOUT_MS`: Per-request store timeout (default: 5000)
// - `IPALLOC_CHANNEL_CAPACITY`: Store request queue size (default: 1024)
// - `IPALLOC_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// export IPALLOC_DATAPATH=/var/lib/ipalloc
// export IPALLOC_PORT=8080
//
// ipallocd
// ```

use anyhow::{Context, Result};
use ipalloc_core::config::IpallocConfig;
use ipalloc_core::state::FileStorage;
use ipalloc_core::{StoreActor, StoreHandle};
use ipalloc_http::AppState;
use std::env;
use std::process::ExitCode;
use tokio::net::TcpListener;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error, including failure to persist at shutdown
#[derive(Debug, Clone, Copy)]
enum IpallocExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure or lost state)
    RuntimeError = 2,
}

impl From<IpallocExitCode> for ExitCode {
    fn from(code: IpallocExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    ipalloc: IpallocConfig,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup
    fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = get("IPALLOC_DATAPATH").filter(|s| !s.is_empty()).ok_or_else(|| {
            anyhow::anyhow!(
                "IPALLOC_DATAPATH environment variable must be set to path containing app data"
            )
        })?;

        let mut ipalloc = IpallocConfig::new(data_dir);

        if let Some(file_name) = get("IPALLOC_FILE_NAME") {
            ipalloc.store.file_name = file_name;
        }
        if let Some(seed) = get("IPALLOC_SEED") {
            ipalloc.store.seed_bootstrap = parse_bool("IPALLOC_SEED", &seed)?;
        }
        if let Some(capacity) = get("IPALLOC_CHANNEL_CAPACITY") {
            ipalloc.store.channel_capacity = capacity
                .parse()
                .with_context(|| format!("IPALLOC_CHANNEL_CAPACITY is not a number: {}", capacity))?;
        }
        if let Some(bind) = get("IPALLOC_BIND_ADDRESS") {
            ipalloc.http.bind_address = bind;
        }
        if let Some(port) = get("IPALLOC_PORT") {
            ipalloc.http.port = port
                .parse()
                .with_context(|| format!("IPALLOC_PORT is not a valid port: {}", port))?;
        }
        if let Some(range) = get("IPALLOC_ADDRESS_RANGE") {
            ipalloc.http.address_range = range;
        }
        if let Some(timeout) = get("IPALLOC_REQUEST_TIMEOUT_MS") {
            ipalloc.http.request_timeout_ms = timeout.parse().with_context(|| {
                format!("IPALLOC_REQUEST_TIMEOUT_MS is not a number: {}", timeout)
            })?;
        }

        Ok(Self {
            ipalloc,
            log_level: get("IPALLOC_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// The data directory must already exist: a missing directory is fatal
    /// before the store actor is ever started.
    fn validate(&self) -> Result<()> {
        self.ipalloc.validate()?;

        if !self.ipalloc.data_dir.is_dir() {
            anyhow::bail!(
                "IPALLOC_DATAPATH directory does not exist: {}. \
                Create it first: mkdir -p {}",
                self.ipalloc.data_dir.display(),
                self.ipalloc.data_dir.display()
            );
        }

        ipalloc_http::parse_range(&self.ipalloc.http.address_range)
            .with_context(|| {
                format!(
                    "IPALLOC_ADDRESS_RANGE is not valid CIDR: {}",
                    self.ipalloc.http.address_range
                )
            })?;

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "IPALLOC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{} must be true or false. Got: {}", key, value),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return IpallocExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return IpallocExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return IpallocExitCode::ConfigError.into();
    }

    info!("Starting ipallocd daemon");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return IpallocExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(run_daemon(config));

    match result {
        Ok(()) => IpallocExitCode::CleanShutdown.into(),
        Err(DaemonError::Startup(e)) => {
            error!("Startup error: {:#}", e);
            IpallocExitCode::ConfigError.into()
        }
        Err(DaemonError::Runtime(e)) => {
            error!("Daemon error: {:#}", e);
            IpallocExitCode::RuntimeError.into()
        }
    }
}

/// Failures after configuration was accepted
enum DaemonError {
    /// Could not get to the point of serving requests
    Startup(anyhow::Error),
    /// Failed while serving or while persisting on the way out
    Runtime(anyhow::Error),
}

/// Run the daemon
async fn run_daemon(config: Config) -> std::result::Result<(), DaemonError> {
    let settings = config.ipalloc;

    let storage = FileStorage::in_dir_named(&settings.data_dir, &settings.store.file_name)
        .context("Failed to open data directory")
        .map_err(DaemonError::Startup)?;
    info!("Record file: {}", storage.path().display());

    // Bind before the actor starts so a busy port never rewrites the record
    let addr = settings.http.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))
        .map_err(DaemonError::Startup)?;
    info!("HTTP server: http://{}", addr);
    info!("Address range: {}", settings.http.address_range);

    let (store_task, store, shutdown_tx) = StoreActor::spawn(Box::new(storage), &settings.store);

    let served = serve_until_signal(listener, store, &settings).await;

    // Exit beats in-flight requests: anything still queued is dropped
    let _ = shutdown_tx.send(());
    let stopped = store_task
        .await
        .context("Store actor task failed")
        .map_err(DaemonError::Runtime)?;

    served.map_err(DaemonError::Runtime)?;

    let reason = stopped
        .context("Failed to persist assignments at shutdown")
        .map_err(DaemonError::Runtime)?;
    info!("Store stopped ({:?}), daemon exiting", reason);

    Ok(())
}

/// Serve HTTP until a shutdown signal arrives
async fn serve_until_signal(
    listener: TcpListener,
    store: StoreHandle,
    settings: &IpallocConfig,
) -> Result<()> {
    let state = AppState::new(store, &settings.http)
        .context("Invalid HTTP configuration")?
        .shared();

    tokio::select! {
        result = ipalloc_http::serve(listener, state) => {
            result.context("HTTP server failed")?;
            anyhow::bail!("HTTP server exited unexpectedly");
        }
        received = wait_for_shutdown_signal() => {
            info!("Received shutdown signal: {}", received?);
            info!("Shutting down daemon");
            Ok(())
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(name)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
