//! Authentication route handlers.
//!
//! Handles login, logout, registration and token-based password reset.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, Flash};
use crate::routes::{PageContext, flash_redirect};
use crate::services::{AuthError, AuthService};
use crate::state::AppState;

/// Same answer whether or not the email has an account.
const RESET_REQUESTED_MESSAGE: &str = "Si existe una cuenta con ese correo, te hemos enviado un \
                                       enlace para restablecer la contraseña.";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

/// Reset password form data.
#[derive(Deserialize)]
pub struct ResetPasswordForm {
    pub password: String,
    pub password_confirm: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub ctx: PageContext,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub ctx: PageContext,
    pub error: Option<String>,
    pub name: String,
    pub email: String,
}

/// Forgot password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub ctx: PageContext,
}

/// Reset password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password.html")]
pub struct ResetPasswordTemplate {
    pub ctx: PageContext,
    pub error: Option<String>,
    pub token: String,
}

/// Internal failures become error responses; everything else is shown on the form.
fn user_facing(err: AuthError) -> Result<String, AppError> {
    match err {
        AuthError::Repository(_) | AuthError::PasswordHash => Err(err.into()),
        other => Ok(other.user_message()),
    }
}

// =============================================================================
// Landing
// =============================================================================

/// Send logged-in users to their landing page and everyone else to login.
pub async fn home(OptionalAuth(user): OptionalAuth) -> Redirect {
    Redirect::to(user.as_ref().map_or("/login", CurrentUser::landing_path))
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(session: Session, OptionalAuth(user): OptionalAuth) -> Response {
    if let Some(user) = user {
        return Redirect::to(user.landing_path()).into_response();
    }
    LoginTemplate {
        ctx: PageContext::new(&session, None).await,
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let user = match AuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            tracing::info!(error = %e, "Login failed");
            let message = user_facing(e)?;
            return Ok(flash_redirect(&session, Flash::error(message), "/login").await);
        }
    };

    // New session id on privilege change
    if let Err(e) = session.cycle_id().await {
        tracing::error!("Failed to cycle session id: {}", e);
    }

    let current = CurrentUser::from(&user);
    if let Err(e) = set_current_user(&session, &current).await {
        tracing::error!("Failed to set session: {}", e);
        return Err(AppError::Internal("session store unavailable".to_string()));
    }

    set_sentry_user(&user.id, Some(user.email.as_str()));
    tracing::info!(user_id = %user.id, role = %user.role, "User logged in");

    Ok(flash_redirect(
        &session,
        Flash::success(format!("Bienvenido, {}.", user.name)),
        current.landing_path(),
    )
    .await)
}

// =============================================================================
// Logout Route
// =============================================================================

/// Handle logout.
pub async fn logout(session: Session) -> Response {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!("Failed to clear session: {}", e);
    }

    // Also destroy the entire session
    if let Err(e) = session.flush().await {
        tracing::error!("Failed to flush session: {}", e);
    }

    clear_sentry_user();

    flash_redirect(&session, Flash::info("Has cerrado sesión."), "/login").await
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(session: Session) -> impl IntoResponse {
    RegisterTemplate {
        ctx: PageContext::new(&session, None).await,
        error: None,
        name: String::new(),
        email: String::new(),
    }
}

/// Handle registration form submission.
///
/// New accounts are always customers. The form is shown again, keeping name
/// and email, when validation fails.
#[instrument(skip(state, session, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    match AuthService::new(state.pool())
        .register(
            &form.name,
            &form.email,
            &form.password,
            &form.password_confirm,
        )
        .await
    {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "Customer registered");
            Ok(flash_redirect(
                &session,
                Flash::success("Cuenta creada. Ya puedes iniciar sesión."),
                "/login",
            )
            .await)
        }
        Err(e) => {
            tracing::info!(error = %e, "Registration refused");
            Ok(RegisterTemplate {
                ctx: PageContext::new(&session, None).await,
                error: Some(user_facing(e)?),
                name: form.name,
                email: form.email,
            }
            .into_response())
        }
    }
}

// =============================================================================
// Password Reset Routes
// =============================================================================

/// Display the forgot password page.
pub async fn forgot_password_page(session: Session) -> impl IntoResponse {
    ForgotPasswordTemplate {
        ctx: PageContext::new(&session, None).await,
    }
}

/// Handle forgot password form submission.
///
/// Always answers with the same message to prevent email enumeration.
#[instrument(skip(state, session, form))]
pub async fn forgot_password(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ForgotPasswordForm>,
) -> Result<Response, AppError> {
    let issued = AuthService::new(state.pool())
        .create_reset_token(&form.email)
        .await?;

    if let Some((user, token)) = issued {
        let reset_url = state.config().absolute_url(&format!("/recuperar/{token}"));
        match state.email() {
            Some(email) => {
                if let Err(e) = email
                    .send_password_reset(user.email.as_str(), &user.name, &reset_url)
                    .await
                {
                    tracing::error!(user_id = %user.id, error = %e, "Failed to send reset email");
                }
            }
            None => {
                tracing::info!(user_id = %user.id, %reset_url, "Password reset link (SMTP not configured)");
            }
        }
    }

    Ok(flash_redirect(&session, Flash::info(RESET_REQUESTED_MESSAGE), "/recuperar").await)
}

/// Display the reset password page for a token.
#[instrument(skip_all)]
pub async fn reset_password_page(
    State(state): State<AppState>,
    session: Session,
    Path(token): Path<String>,
) -> Result<Response, AppError> {
    if !AuthService::new(state.pool())
        .is_reset_token_valid(&token)
        .await?
    {
        return Ok(invalid_reset_link(&session).await);
    }

    Ok(ResetPasswordTemplate {
        ctx: PageContext::new(&session, None).await,
        error: None,
        token,
    }
    .into_response())
}

/// Handle reset password form submission.
#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    session: Session,
    Path(token): Path<String>,
    Form(form): Form<ResetPasswordForm>,
) -> Result<Response, AppError> {
    match AuthService::new(state.pool())
        .reset_password(&token, &form.password, &form.password_confirm)
        .await
    {
        Ok(user_id) => {
            tracing::info!(%user_id, "Password reset");
            Ok(flash_redirect(
                &session,
                Flash::success("Contraseña actualizada. Ya puedes iniciar sesión."),
                "/login",
            )
            .await)
        }
        Err(AuthError::InvalidResetToken) => Ok(invalid_reset_link(&session).await),
        Err(e) => Ok(ResetPasswordTemplate {
            ctx: PageContext::new(&session, None).await,
            error: Some(user_facing(e)?),
            token,
        }
        .into_response()),
    }
}

async fn invalid_reset_link(session: &Session) -> Response {
    flash_redirect(
        session,
        Flash::error(AuthError::InvalidResetToken.user_message()),
        "/recuperar",
    )
    .await
}
