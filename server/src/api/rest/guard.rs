//! Request guard applied in front of every route
//!
//! Answers `OPTIONS` requests directly and refuses requests whose `Origin`
//! does not mention the host they were sent to. The origin comparison is
//! substring containment, not an exact match.

use axum::{
    extract::Request,
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::set_header::SetResponseHeaderLayer;

use super::error::AppError;

pub const ALLOWED_METHODS: &str = "GET, POST, DELETE";

pub async fn origin_guard(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return (
            StatusCode::NO_CONTENT,
            [(header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS))],
        )
            .into_response();
    }

    if let Some(origin) = request.headers().get(header::ORIGIN) {
        let origin = origin.to_str().unwrap_or_default();
        let allowed = match request_host(&request) {
            Some(host) => origin.contains(host),
            None => false,
        };
        if !allowed {
            tracing::warn!(
                origin = %origin,
                method = %request.method(),
                path = %request.uri().path(),
                "rejected cross-origin request"
            );
            return AppError::Forbidden("Forbidden: Cross-origin request denied".into())
                .into_response();
        }
    }

    next.run(request).await
}

/// Host the request was addressed to: the `Host` header, or the URI
/// authority for HTTP/2.
fn request_host(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| request.uri().authority().map(|a| a.as_str()))
        .filter(|host| !host.is_empty())
}

/// Defensive headers set on every response, guard rejections included.
pub fn security_headers() -> [SetResponseHeaderLayer<HeaderValue>; 3] {
    [
        SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ),
        SetResponseHeaderLayer::overriding(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY")),
        SetResponseHeaderLayer::overriding(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ),
    ]
}
