//! Authentication middleware and extractors.
//!
//! `RequireAuth` and `RequireAdmin` are the only access checks in the
//! application. Handlers state what they need in their signature; nothing
//! compares roles by hand.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use tienda_core::{Role, UserId};

use crate::db::UserRepository;
use crate::error::AppError;
use crate::models::{CurrentUser, Flash, session_keys};
use crate::routes::api::cart::CartResponse;
use crate::state::AppState;

/// Extractor that requires a logged-in user.
///
/// The session only names the user; the account is re-read from the database
/// on every request so a deleted account or a changed role takes effect
/// immediately.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hola, {}", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires a logged-in administrator.
///
/// Customers get `403 Forbidden`; the handler never runs.
pub struct RequireAdmin(pub CurrentUser);

/// Error returned when a request does not meet the access requirement.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin,
    /// Unauthorized response (for API requests).
    Unauthorized,
    /// Logged in, but the role is not enough.
    Forbidden,
    /// The account could not be loaded.
    Internal(AppError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/login").into_response(),
            Self::Unauthorized => CartResponse::failure(
                StatusCode::UNAUTHORIZED,
                AppError::Unauthorized("no session".to_string()).public_message(),
                None,
            )
            .into_response(),
            Self::Forbidden => {
                AppError::Forbidden("administrator role required".to_string()).into_response()
            }
            Self::Internal(err) => err.into_response(),
        }
    }
}

fn missing_login(parts: &Parts) -> AuthRejection {
    // Nested routers see a stripped URI
    let path = parts
        .extensions
        .get::<OriginalUri>()
        .map_or_else(|| parts.uri.path(), |uri| uri.0.path());

    // API callers get a status code, browsers get the login page
    if path.starts_with("/api/") {
        AuthRejection::Unauthorized
    } else {
        AuthRejection::RedirectToLogin
    }
}

/// Check that `user` holds `required`.
///
/// # Errors
///
/// Returns `AuthRejection::Forbidden` when the role is insufficient.
pub fn authorize(user: &CurrentUser, required: Role) -> Result<(), AuthRejection> {
    if user.role.has(required) {
        Ok(())
    } else {
        Err(AuthRejection::Forbidden)
    }
}

/// Check that `user` may see a record belonging to `owner_id`: its owner
/// or an administrator.
///
/// # Errors
///
/// Returns `AuthRejection::Forbidden` for any other customer.
pub fn authorize_owner(user: &CurrentUser, owner_id: UserId) -> Result<(), AuthRejection> {
    if user.id == owner_id {
        Ok(())
    } else {
        authorize(user, Role::Administrator)
    }
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AuthRejection::Unauthorized)?;

        let cached: CurrentUser = session
            .get(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| missing_login(parts))?;

        let user = UserRepository::new(state.pool())
            .get_by_id(cached.id)
            .await
            .map_err(|e| AuthRejection::Internal(e.into()))?;

        let Some(user) = user else {
            tracing::warn!(user_id = %cached.id, "Session refers to a missing user");
            if let Err(e) = clear_current_user(&session).await {
                tracing::error!("Failed to clear session: {}", e);
            }
            return Err(missing_login(parts));
        };

        let current = CurrentUser::from(&user);
        if current != cached
            && let Err(e) = set_current_user(&session, &current).await
        {
            tracing::error!("Failed to refresh session user: {}", e);
        }

        Ok(Self(current))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if let Err(rejection) = authorize(&user, Role::Administrator) {
            tracing::warn!(
                user_id = %user.id,
                path = %parts.uri.path(),
                "Customer attempted an administrator operation"
            );
            return Err(rejection);
        }
        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user from the session.
///
/// Unlike `RequireAuth`, this does not reject the request and does not touch
/// the database. Use it only for navigation decisions, never for access.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(user))
    }
}

/// Helper to set the current user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}

/// Queue a flash message for the next rendered page.
///
/// Session failures are logged and ignored.
pub async fn push_flash(session: &Session, flash: Flash) {
    let mut flashes: Vec<Flash> = session
        .get(session_keys::FLASHES)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    flashes.push(flash);
    if let Err(e) = session.insert(session_keys::FLASHES, flashes).await {
        tracing::error!("Failed to store flash message: {}", e);
    }
}

/// Take and clear all pending flash messages.
pub async fn take_flashes(session: &Session) -> Vec<Flash> {
    session
        .remove::<Vec<Flash>>(session_keys::FLASHES)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tienda_core::{Email, UserId};
    use tower_sessions::MemoryStore;

    use super::*;

    fn user(role: Role) -> CurrentUser {
        CurrentUser {
            id: UserId::new(7),
            name: "Luis".to_string(),
            email: Email::parse("luis@example.com").unwrap(),
            role,
        }
    }

    #[test]
    fn test_authorize_by_role() {
        assert!(authorize(&user(Role::Administrator), Role::Administrator).is_ok());
        assert!(authorize(&user(Role::Administrator), Role::Customer).is_ok());
        assert!(matches!(
            authorize(&user(Role::Customer), Role::Administrator),
            Err(AuthRejection::Forbidden)
        ));
    }

    #[test]
    fn test_authorize_owner() {
        let owner = user(Role::Customer);
        assert!(authorize_owner(&owner, UserId::new(7)).is_ok());
        assert!(matches!(
            authorize_owner(&owner, UserId::new(8)),
            Err(AuthRejection::Forbidden)
        ));
        assert!(authorize_owner(&user(Role::Administrator), UserId::new(8)).is_ok());
    }

    #[tokio::test]
    async fn test_unauthorized_rejection_has_cart_shape() {
        let response = AuthRejection::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Debes iniciar sesión.");
        assert_eq!(json["items"], serde_json::json!([]));
        assert_eq!(json["count"], 0);
    }

    #[test]
    fn test_forbidden_rejection_status() {
        let response = AuthRejection::Forbidden.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = AuthRejection::RedirectToLogin.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/login");
    }

    #[tokio::test]
    async fn test_flashes_are_consumed_once() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        push_flash(&session, Flash::success("uno")).await;
        push_flash(&session, Flash::error("dos")).await;

        let flashes = take_flashes(&session).await;
        assert_eq!(flashes.len(), 2);
        assert_eq!(flashes[0].message, "uno");
        assert_eq!(flashes[1], Flash::error("dos"));

        assert!(take_flashes(&session).await.is_empty());
    }

    #[tokio::test]
    async fn test_set_and_clear_current_user() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        set_current_user(&session, &user(Role::Customer))
            .await
            .unwrap();
        let stored: Option<CurrentUser> = session.get(session_keys::CURRENT_USER).await.unwrap();
        assert_eq!(stored, Some(user(Role::Customer)));

        clear_current_user(&session).await.unwrap();
        let stored: Option<CurrentUser> = session.get(session_keys::CURRENT_USER).await.unwrap();
        assert!(stored.is_none());
    }
}
