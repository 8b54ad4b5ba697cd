//! Session middleware configuration.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions. The cookie only
//! carries the session id, signed with a key derived from the session secret.

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha512};
use sqlx::PgPool;
use tower_sessions::{
    Expiry, SessionManagerLayer, SessionStore,
    cookie::{Key, SameSite, time::Duration},
    service::SignedCookie,
};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "tienda_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer with `PostgreSQL` store.
///
/// # Arguments
///
/// * `pool` - `PostgreSQL` connection pool
/// * `config` - Storefront configuration (for session secret)
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> SessionManagerLayer<PostgresStore, SignedCookie> {
    // The tower_sessions.session table is created by migration
    let store = PostgresStore::new(pool.clone());
    session_layer(store, &config.session_secret, config.is_https())
}

/// Session layer over any store. Used directly by tests with `MemoryStore`.
#[must_use]
pub fn session_layer<S: SessionStore>(
    store: S,
    secret: &SecretString,
    secure: bool,
) -> SessionManagerLayer<S, SignedCookie> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(
            SESSION_EXPIRY_SECONDS,
        )))
        .with_secure(secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(signing_key(secret))
}

/// 64-byte cookie signing key: SHA-512 of the configured secret.
fn signing_key(secret: &SecretString) -> Key {
    let digest = Sha512::digest(secret.expose_secret().as_bytes());
    Key::from(digest.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_key_is_deterministic() {
        let secret = SecretString::from("k7Qz!m2Vx9#pL4wR8@nB6tY1&cH3jF5s");
        let a = signing_key(&secret);
        let b = signing_key(&secret);
        assert_eq!(a.master(), b.master());

        let other = signing_key(&SecretString::from("another-value-entirely-9f8e7d6c5b"));
        assert_ne!(a.master(), other.master());
    }
}
