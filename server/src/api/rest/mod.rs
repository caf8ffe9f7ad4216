//! REST API module
//!
//! Browser-facing routes for the served directory, wrapped in the origin
//! guard, security headers, request IDs, tracing and body timeouts.

mod error;
mod files;
mod guard;
mod page;
mod server;
mod types;

use crate::api::AppState;
use axum::body::Body;
use axum::http::header;
use axum::{middleware, Router};
use tower::ServiceBuilder;
use tower_http::map_request_body::MapRequestBodyLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::{RequestBodyTimeoutLayer, ResponseBodyTimeoutLayer, TimeoutBody};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use error::AppError;
use files::file_routes;

pub use server::serve;

/// Build the full application router for `state`.
pub fn router(state: AppState) -> Router {
    let config = state.config.clone();

    // Request ID header name
    let x_request_id = header::HeaderName::from_static("x-request-id");

    // Tracing layer with request ID included in spans
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().include_headers(true).level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let [nosniff, deny_framing, xss_filter] = guard::security_headers();

    Router::new()
        .merge(file_routes(config.max_upload_bytes))
        .fallback(not_found)
        .layer(middleware::from_fn(guard::origin_guard))
        .layer(nosniff)
        .layer(deny_framing)
        .layer(xss_filter)
        // Stalled clients: bound the gap between body frames in both directions
        .layer(
            ServiceBuilder::new()
                .layer(RequestBodyTimeoutLayer::new(config.read_timeout))
                .layer(MapRequestBodyLayer::new(|body: TimeoutBody<Body>| Body::new(body))),
        )
        .layer(ResponseBodyTimeoutLayer::new(config.write_timeout))
        // Request ID: Generate UUID, set on request, propagate to response
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .layer(trace_layer)
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound("Not Found".into())
}
