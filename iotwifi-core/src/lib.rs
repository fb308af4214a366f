//! Core library for the IoT Wi-Fi control gateway.
//!
//! This crate defines the adapter-manager interface (`traits`), the JSON
//! envelope protocol spoken over HTTP (`envelope`), the command channel and
//! lifecycle used to shut the gateway down (`command`, `lifecycle`), the
//! background worker (`worker`) and the axum web server that ties them
//! together (`web_server`). Concrete adapter managers live in `backends`.

pub mod backends;
pub mod command;
pub mod config;
pub mod envelope;
pub mod lifecycle;
pub mod middleware;
pub mod structs;
pub mod traits;
pub mod web_server;
pub mod worker;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::GatewayConfig;
use crate::lifecycle::Lifecycle;
use crate::traits::AdapterManager;
use crate::web_server::AppState;
use crate::worker::WorkerExit;

// Define a shared Error and Result type for the entire crate.

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// Failure reported by the adapter manager itself.
    #[error("{0}")]
    Adapter(String),

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("Invalid request body: {0}")]
    Decode(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Service is shutting down")]
    ShuttingDown,

    #[error("Config error: {0}")]
    Config(String),
}

/// A specialized `Result` type for this crate's operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Runs the gateway until the lifecycle leaves `Running`.
///
/// Spawns the background worker that owns the command channel's receiving
/// end, serves HTTP on `listener`, and returns how the worker stopped once
/// the server has drained.
pub async fn run_gateway(
    listener: TcpListener,
    config: &GatewayConfig,
    adapter: Arc<dyn AdapterManager>,
    lifecycle: Lifecycle,
) -> Result<WorkerExit> {
    tracing::info!("🚀 Starting IoT Wifi gateway...");

    let (commands, receiver) =
        command::channel(config.command_capacity, config.command_send_timeout());

    let worker = tokio::spawn(worker::run_worker(
        adapter.clone(),
        receiver,
        lifecycle.clone(),
        config.shutdown_drain(),
    ));

    let state = AppState::new(adapter, commands, config.call_timeout());
    let served =
        web_server::run_server(listener, state, lifecycle.clone(), config.shutdown_drain()).await;

    // The server only returns on its own if it failed; make sure the worker follows.
    lifecycle.begin_shutdown();

    let exit = match worker.await {
        Ok(exit) => exit,
        Err(e) => {
            tracing::error!("❌ Background worker panicked: {}", e);
            WorkerExit::AdapterStopped
        }
    };

    served?;
    tracing::info!(?exit, "🛑 Gateway stopped.");
    Ok(exit)
}
