//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, capture errors)
//! 2. `TraceLayer` (`http_request` span)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with `PostgreSQL` store)
//! 5. Security headers (CSP, frame options, cache control)
//!
//! Access control is not a layer: handlers take `RequireAuth` or
//! `RequireAdmin` extractors.

pub mod auth;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    AuthRejection, OptionalAuth, RequireAdmin, RequireAuth, authorize, authorize_owner,
    clear_current_user, push_flash, set_current_user, take_flashes,
};
pub use request_id::{RequestId, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use session::{create_session_layer, session_layer};
