use axum::{
    extract::State,
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse},
    Extension, Json,
};
use planit_shared::api::{EnterpriseSessionResponse, LoginRequest};
use planit_shared::User;

use crate::auth::{clear_session_cookie, session_cookie, AuthUser};
use crate::error::AppError;
use crate::routes::AppState;

use super::access::fetch_user;
use super::auth::{authenticate, issue_token};

/// The enterprise console is limited to approved company-level accounts.
pub fn check_enterprise_access(user: &User) -> Result<(), AppError> {
    if !user.role.is_enterprise() || !user.is_approved {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// POST /api/enterprise-login
pub async fn enterprise_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = authenticate(&state, &req.email, &req.password).await?;

    if let Err(e) = check_enterprise_access(&user) {
        tracing::warn!(user_id = %user.id, role = %user.role, "Enterprise login refused");
        return Err(e);
    }

    let token = issue_token(&state, &user)?;
    let cookie = session_cookie(&state.config, &token);

    tracing::info!(user_id = %user.id, role = %user.role, "Enterprise session started");

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(EnterpriseSessionResponse {
            user,
            expires_in: state.config.jwt_expires_in,
        }),
    ))
}

/// POST /api/enterprise-logout
///
/// Always succeeds; the token itself stays valid until it expires.
pub async fn enterprise_logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        AppendHeaders([(SET_COOKIE, clear_session_cookie(&state.config))]),
        Json(serde_json::json!({ "message": "Logged out" })),
    )
}

/// GET /api/enterprise/session
pub async fn enterprise_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<User>, AppError> {
    let user = fetch_user(&state.db, user.id).await?;
    check_enterprise_access(&user)?;
    Ok(Json(user))
}
