use crate::command::{CommandMessage, CommandSender};
use crate::envelope::{self, decode_body};
use crate::lifecycle::Lifecycle;
use crate::middleware::{access_log, cors_layer};
use crate::structs::Credentials;
use crate::traits::AdapterManager;
use crate::{Error, Result};
use axum::{
    Router,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    middleware,
    response::Response,
    routing::{get, post},
};
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

// The shared state for our web server.
// By using `Arc<dyn Trait>`, we can inject any implementation
// that satisfies the trait bounds.
pub type WebServerState = State<Arc<AppState>>;

/// Application context, built once at startup and injected into every handler.
pub struct AppState {
    pub adapter: Arc<dyn AdapterManager>,
    pub commands: CommandSender,
    /// Upper bound for every adapter call.
    pub call_timeout: Duration,
}

impl AppState {
    pub fn new(
        adapter: Arc<dyn AdapterManager>,
        commands: CommandSender,
        call_timeout: Duration,
    ) -> Self {
        Self {
            adapter,
            commands,
            call_timeout,
        }
    }
}

/// Builds the router: CORS -> access log -> handlers.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status_handler))
        .route("/connect", post(connect_handler))
        .route("/disconnect", post(disconnect_handler))
        .route("/scan", get(scan_handler))
        .route("/kill", get(kill_handler))
        .layer(middleware::from_fn(access_log))
        .layer(cors_layer())
        .with_state(Arc::new(state))
}

/// Serves `state` on `listener` until the lifecycle shuts down.
///
/// Once shutdown begins the listener stops accepting, in-flight requests get
/// `drain` to finish, and anything still running after that is abandoned.
pub async fn run_server(
    listener: TcpListener,
    state: AppState,
    lifecycle: Lifecycle,
    drain: Duration,
) -> Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!("🌐 HTTP Listening on {}", addr);

    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();

    let signal = lifecycle.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.cancelled().await;
            tracing::info!("Draining in-flight requests (up to {:?})", drain);
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => result?,
        _ = async {
            lifecycle.cancelled().await;
            tokio::time::sleep(drain).await;
        } => {
            tracing::warn!("Drain period elapsed, abandoning remaining requests");
        }
    }

    Ok(())
}

/// Runs an adapter call, giving up after `limit`.
async fn bounded<T>(
    operation: &'static str,
    limit: Duration,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| Error::Timeout {
            operation,
            timeout: limit,
        })?
}

// --- Route Handlers ---

/// GET /status
async fn status_handler(State(state): WebServerState) -> Result<Response> {
    let status = bounded("status", state.call_timeout, state.adapter.status()).await?;
    Ok(envelope::encode_success("status", &status))
}

/// POST /disconnect. Best effort: always answers OK.
async fn disconnect_handler(State(state): WebServerState) -> Response {
    // ignoring content since we're simply disconnecting all networks
    if tokio::time::timeout(state.call_timeout, state.adapter.disconnect())
        .await
        .is_err()
    {
        tracing::warn!("Disconnect timed out after {:?}", state.call_timeout);
    }
    envelope::encode_success("status", &serde_json::Map::new())
}

/// POST /connect with `{ssid, psk}`.
///
/// Body rejections (oversized, unreadable) are answered with an envelope like
/// any other decode failure.
async fn connect_handler(
    State(state): WebServerState,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Response> {
    let body = body.map_err(|rejection| Error::Decode(rejection.body_text()))?;
    let creds: Credentials = decode_body(&body)?;
    tracing::info!(ssid = %creds.ssid, "Connect handler got credentials");

    let connection = bounded(
        "connect",
        state.call_timeout,
        state.adapter.connect_network(&creds),
    )
    .await?;
    Ok(envelope::encode_success("Connection", &connection))
}

/// GET /scan
async fn scan_handler(State(state): WebServerState) -> Result<Response> {
    tracing::info!("Got Scan");
    let networks = bounded("scan", state.call_timeout, state.adapter.scan_networks()).await?;
    Ok(envelope::encode_success("Networks", &networks))
}

/// GET /kill. Answers as soon as the command is queued, not when the worker stops.
async fn kill_handler(State(state): WebServerState) -> Result<Response> {
    state.commands.send(CommandMessage::kill()).await?;
    tracing::info!("Kill command queued");
    Ok(envelope::encode_message("Killing service."))
}
