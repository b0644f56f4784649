use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use planit_shared::UserRole;
use uuid::Uuid;

use crate::{error::AppError, routes::AppState};

use super::jwt::verify_token;
use super::session::{bearer_token, cookie_token};

/// Caller identity attached to every authenticated request. `role` is read
/// from the database on each request, not from the token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn require_admin_tier(&self) -> Result<(), AppError> {
        if self.role.is_admin_tier() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

/// Account columns the middleware needs to admit a request.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountRow {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub is_active: bool,
}

impl AccountRow {
    pub fn admit(self) -> Result<AuthUser, AppError> {
        if !self.is_active {
            return Err(AppError::AccountDisabled);
        }
        Ok(AuthUser {
            id: self.id,
            email: self.email,
            role: self.role,
        })
    }
}

async fn load_account(state: &AppState, user_id: Uuid) -> Result<AuthUser, AppError> {
    let row: Option<AccountRow> =
        sqlx::query_as("SELECT id, email, role, is_active FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&state.db)
            .await?;

    row.ok_or(AppError::Unauthorized)?.admit()
}

/// Accepts either a bearer token or the session cookie.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .or_else(|| cookie_token(request.headers(), &state.config.session_cookie_name))
        .ok_or(AppError::Unauthorized)?;

    let claims = verify_token(&token, &state.config.jwt_secret)?;
    let auth_user = load_account(&state, claims.sub).await?;

    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Cookie-only session for the enterprise console; company-level roles only.
pub async fn enterprise_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = cookie_token(request.headers(), &state.config.session_cookie_name)
        .ok_or(AppError::Unauthorized)?;

    let claims = verify_token(&token, &state.config.jwt_secret)?;
    let auth_user = load_account(&state, claims.sub).await?;

    if !auth_user.role.is_enterprise() {
        tracing::warn!(user_id = %auth_user.id, role = %auth_user.role, "Enterprise session rejected");
        return Err(AppError::Forbidden);
    }

    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(role: UserRole, is_active: bool) -> AccountRow {
        AccountRow {
            id: Uuid::new_v4(),
            email: "x@example.com".into(),
            role,
            is_active,
        }
    }

    #[test]
    fn inactive_accounts_are_refused() {
        assert!(matches!(
            row(UserRole::SuperAdmin, false).admit(),
            Err(AppError::AccountDisabled)
        ));
    }

    #[test]
    fn active_accounts_keep_their_role() {
        let user = row(UserRole::Manager, true).admit().unwrap();
        assert_eq!(user.role, UserRole::Manager);
    }

    #[test]
    fn admin_tier_gate() {
        for role in UserRole::ALL {
            let user = row(role, true).admit().unwrap();
            assert_eq!(user.require_admin_tier().is_ok(), role.is_admin_tier(), "{role}");
        }
    }
}
