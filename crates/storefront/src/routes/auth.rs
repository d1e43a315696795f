//! Authentication route handlers.
//!
//! Handles login, registration and logout with locally stored argon2
//! password hashes. Failures redirect back to the form with an `?error=`
//! code that the template turns into a message.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::views::{Nav, error_message, success_message};
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::filters;
use crate::models::{CurrentUser, User};
use crate::services::{AuthError, AuthService, CartService};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// Query parameters for error/success display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub nav: Nav,
    pub error: Option<String>,
    pub success: Option<String>,
    pub next: String,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub nav: Nav,
    pub error: Option<String>,
}

/// Only allow same-site relative redirects after login.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/",
    }
}

/// Put `user` in the session and move their guest cart into their account.
async fn sign_in(state: &AppState, session: &Session, user: &User) -> Result<(), AppError> {
    let current = CurrentUser::from(user);
    set_current_user(session, &current).await?;
    CartService::new(state.pool())
        .merge_session_into_user(session, user.id)
        .await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to("/account").into_response();
    }
    LoginTemplate {
        nav: Nav::default(),
        error: query.error.as_deref().map(error_message),
        success: query.success.as_deref().map(success_message),
        next: safe_next(query.next.as_deref()).to_string(),
    }
    .into_response()
}

/// Handle login form submission.
///
/// # Errors
///
/// Returns `AppError` if the session cannot be written.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Redirect, AppError> {
    let user = match AuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => user,
        Err(err @ (AuthError::Repository(_) | AuthError::PasswordHash)) => return Err(err.into()),
        Err(err) => {
            tracing::warn!(error = %err, "Login failed");
            return Ok(Redirect::to(&format!("/login?error={}", err.code())));
        }
    };

    sign_in(&state, &session, &user).await?;
    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Redirect::to(safe_next(form.next.as_deref())))
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to("/account").into_response();
    }
    RegisterTemplate {
        nav: Nav::default(),
        error: query.error.as_deref().map(error_message),
    }
    .into_response()
}

/// Handle registration form submission.
///
/// New accounts are signed in straight away.
///
/// # Errors
///
/// Returns `AppError` if the account or session cannot be written.
#[instrument(skip(state, session, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Redirect, AppError> {
    if form.password != form.password_confirm {
        return Ok(Redirect::to("/register?error=password_mismatch"));
    }

    let user = match AuthService::new(state.pool())
        .register(&form.name, &form.email, &form.password)
        .await
    {
        Ok(user) => user,
        Err(err @ (AuthError::Repository(_) | AuthError::PasswordHash)) => return Err(err.into()),
        Err(err) => {
            tracing::info!(error = %err, "Registration rejected");
            return Ok(Redirect::to(&format!("/register?error={}", err.code())));
        }
    };

    sign_in(&state, &session, &user).await?;
    tracing::info!(user_id = %user.id, "User registered");
    Ok(Redirect::to("/"))
}

// =============================================================================
// Logout
// =============================================================================

/// Log out and drop the session.
///
/// # Errors
///
/// Returns `AppError::Session` if the session cannot be cleared.
pub async fn logout(session: Session) -> Result<Redirect, AppError> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next_rejects_offsite_redirects() {
        assert_eq!(safe_next(Some("/checkout")), "/checkout");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(Some("/\\evil.example")), "/");
        assert_eq!(safe_next(None), "/");
    }
}
