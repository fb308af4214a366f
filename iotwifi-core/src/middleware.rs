//! Cross-cutting request processing: access logging and CORS.

use axum::extract::{ConnectInfo, Request};
use axum::http::{HeaderName, Method, header};
use axum::middleware::Next;
use axum::response::Response;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};

/// Logs remote address, method and URI of every request, then hands it on untouched.
pub async fn access_log(req: Request, next: Next) -> Response {
    // Only present when served with `into_make_service_with_connect_info`.
    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    tracing::info!(
        remote = %remote,
        method = %req.method(),
        url = %req.uri(),
        "HTTP"
    );

    next.run(req).await
}

/// Permissive CORS policy. Preflight `OPTIONS` requests are answered here
/// and never reach the router.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::POST,
            Method::PUT,
            Method::OPTIONS,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::CONTENT_LENGTH,
            HeaderName::from_static("x-requested-with"),
            header::ACCEPT,
            header::ORIGIN,
        ])
}
