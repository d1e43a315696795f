//! Account route handlers.
//!
//! All routes require a signed-in user.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::views::{Nav, OrderView, error_message, success_message};
use crate::db::OrderRepository;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, session_keys};
use crate::services::{AuthError, AuthService};
use crate::services::auth::ProfileUpdate;
use crate::state::AppState;

/// Profile form data. Blank password fields mean "unchanged".
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

/// Query parameters for error/success display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/profile.html")]
pub struct ProfileTemplate {
    pub nav: Nav,
    pub name: String,
    pub email: String,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct OrdersTemplate {
    pub nav: Nav,
    pub orders: Vec<OrderView>,
}

fn non_blank(value: &str) -> Option<&str> {
    Some(value).filter(|v| !v.is_empty())
}

/// Display the profile form.
///
/// # Errors
///
/// Returns `AppError::Auth` if the user record cannot be loaded.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let stored = AuthService::new(state.pool()).get_user(user.id).await?;

    Ok(ProfileTemplate {
        nav: Nav::new(Some(&user)),
        name: stored.name,
        email: stored.email.to_string(),
        error: query.error.as_deref().map(error_message),
        success: query.success.as_deref().map(success_message),
    })
}

/// Save profile changes.
///
/// # Errors
///
/// Returns `AppError` on database or session failures. Validation problems
/// redirect back with an error code.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ProfileForm>,
) -> Result<Redirect, AppError> {
    let new_password = non_blank(&form.new_password);
    let current_password = non_blank(&form.current_password);
    if new_password.is_some() && current_password.is_none() {
        return Ok(Redirect::to("/account?error=current_password"));
    }

    let update = ProfileUpdate {
        name: &form.name,
        email: &form.email,
        current_password,
        new_password,
    };

    match AuthService::new(state.pool())
        .update_profile(user.id, &update)
        .await
    {
        Ok(updated) => {
            let current = CurrentUser::from(&updated);
            session.insert(session_keys::CURRENT_USER, &current).await?;
            Ok(Redirect::to("/account?success=profile_updated"))
        }
        Err(err @ (AuthError::Repository(_) | AuthError::PasswordHash)) => Err(err.into()),
        Err(AuthError::InvalidCredentials) => Ok(Redirect::to("/account?error=wrong_password")),
        Err(err) => {
            tracing::info!(error = %err, "Profile update rejected");
            Ok(Redirect::to(&format!("/account?error={}", err.code())))
        }
    }
}

/// Display the user's orders, newest first.
///
/// # Errors
///
/// Returns `AppError::Database` if the orders cannot be loaded.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, AppError> {
    let orders = OrderRepository::new(state.pool())
        .list_by_user(user.id)
        .await?;

    Ok(OrdersTemplate {
        nav: Nav::new(Some(&user)),
        orders: orders.iter().map(OrderView::from).collect(),
    })
}
