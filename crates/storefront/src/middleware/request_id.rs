//! Request ID middleware for request tracing and correlation.
//!
//! Reuses an `x-request-id` set by an upstream proxy, otherwise generates a
//! UUID v4. The id is recorded on the `http_request` span, tagged on the
//! Sentry scope, exposed to handlers as a [`RequestId`] extension and echoed
//! in the response headers.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest incoming id accepted as-is.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Request id of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Use the incoming header if it is short printable ASCII, else a fresh UUID.
fn resolve_request_id(header: Option<&HeaderValue>) -> String {
    header
        .and_then(|h| h.to_str().ok())
        .filter(|id| {
            !id.is_empty()
                && id.len() <= MAX_REQUEST_ID_LEN
                && id.bytes().all(|b| b.is_ascii_graphic())
        })
        .map_or_else(|| Uuid::new_v4().to_string(), String::from)
}

/// Middleware that ensures every request has a unique request ID.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = resolve_request_id(request.headers().get(REQUEST_ID_HEADER));

    Span::current().record("request_id", request_id.as_str());

    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_upstream_id() {
        let header = HeaderValue::from_static("cf-1234-abcd");
        assert_eq!(resolve_request_id(Some(&header)), "cf-1234-abcd");
    }

    #[test]
    fn test_generates_uuid_when_missing_or_invalid() {
        let generated = resolve_request_id(None);
        assert!(Uuid::parse_str(&generated).is_ok());

        let too_long = HeaderValue::from_str(&"a".repeat(MAX_REQUEST_ID_LEN + 1)).unwrap();
        assert!(Uuid::parse_str(&resolve_request_id(Some(&too_long))).is_ok());

        let spaced = HeaderValue::from_static("has space");
        assert!(Uuid::parse_str(&resolve_request_id(Some(&spaced))).is_ok());
    }
}
