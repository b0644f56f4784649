use axum::{extract::State, http::StatusCode, Extension, Json};
use planit_shared::api::{
    AdminSignupRequest, AdminSignupResponse, AuthResponse, LoginRequest, RegisterRequest,
};
use planit_shared::{AdminRequest, AdminRequestStatus, User, UserRole};
use uuid::Uuid;

use crate::auth::{create_token, hash_password, verify_password, AuthUser};
use crate::error::{is_unique_violation, AppError};
use crate::routes::AppState;

use super::access::{fetch_user, USER_COLUMNS};

/// A user row together with its credential hash. Only ever used server-side.
#[derive(Debug, sqlx::FromRow)]
pub struct UserRecord {
    #[sqlx(flatten)]
    pub user: User,
    pub password_hash: String,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_signup(email: &str, password: &str, name: &str) -> Result<(), AppError> {
    if email.is_empty() || password.is_empty() || name.trim().is_empty() {
        return Err(AppError::Validation("All fields are required".to_string()));
    }

    if !email.contains('@') {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }

    if password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    Ok(())
}

/// Checks a login attempt against the stored record. Unknown email and wrong
/// password are indistinguishable; a deactivated account is refused even
/// when the password is right.
pub fn check_credentials(record: Option<UserRecord>, password: &str) -> Result<User, AppError> {
    let record = record.ok_or(AppError::Unauthorized)?;

    if !verify_password(password, &record.password_hash)? {
        return Err(AppError::Unauthorized);
    }

    if !record.user.is_active {
        return Err(AppError::AccountDisabled);
    }

    Ok(record.user)
}

pub(crate) async fn find_user_record(
    state: &AppState,
    email: &str,
) -> Result<Option<UserRecord>, AppError> {
    let query = format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1");
    let record = sqlx::query_as::<_, UserRecord>(&query)
        .bind(email)
        .fetch_optional(&state.db)
        .await?;
    Ok(record)
}

/// Verifies credentials and stamps the login time.
pub(crate) async fn authenticate(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<User, AppError> {
    let email = normalize_email(email);
    let record = find_user_record(state, &email).await?;

    let mut user = check_credentials(record, password).map_err(|e| {
        tracing::info!(email = %email, error = %e, "Login rejected");
        e
    })?;

    let (last_login_at,): (chrono::DateTime<chrono::Utc>,) =
        sqlx::query_as("UPDATE users SET last_login_at = NOW() WHERE id = $1 RETURNING last_login_at")
            .bind(user.id)
            .fetch_one(&state.db)
            .await?;
    user.last_login_at = Some(last_login_at);

    Ok(user)
}

pub(crate) fn issue_token(state: &AppState, user: &User) -> Result<String, AppError> {
    create_token(
        user.id,
        &user.email,
        user.role,
        &state.config.jwt_secret,
        state.config.jwt_expires_in,
    )
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let email = normalize_email(&req.email);
    validate_signup(&email, &req.password, &req.name)?;

    let password_hash = hash_password(&req.password)?;

    let query = format!(
        r#"
        INSERT INTO users (id, email, password_hash, name, role)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {USER_COLUMNS}
        "#
    );
    let user = sqlx::query_as::<_, User>(&query)
        .bind(Uuid::new_v4())
        .bind(&email)
        .bind(&password_hash)
        .bind(req.name.trim())
        .bind(UserRole::Member)
        .fetch_one(&state.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Email already registered".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

    tracing::info!(user_id = %user.id, "User registered");

    let token = issue_token(&state, &user)?;

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = authenticate(&state, &req.email, &req.password).await?;
    let token = issue_token(&state, &user)?;

    Ok(Json(AuthResponse { token, user }))
}

/// POST /api/auth/signup-admin
///
/// Creates an unapproved member account and files its role request in the
/// same transaction. No token is issued; the account signs in normally and
/// gains the role once an approver accepts.
pub async fn signup_admin(
    State(state): State<AppState>,
    Json(req): Json<AdminSignupRequest>,
) -> Result<(StatusCode, Json<AdminSignupResponse>), AppError> {
    let email = normalize_email(&req.email);
    validate_signup(&email, &req.password, &req.name)?;
    super::admin_requests::validate_requested_role(UserRole::Member, req.requested_role)?;

    let reason = req.reason.trim();
    if reason.is_empty() {
        return Err(AppError::Validation("A reason is required".to_string()));
    }

    let password_hash = hash_password(&req.password)?;
    let mut tx = state.db.begin().await?;

    let query = format!(
        r#"
        INSERT INTO users (id, email, password_hash, name, role, is_approved,
                           admin_request_status, admin_request_reason)
        VALUES ($1, $2, $3, $4, $5, FALSE, $6, $7)
        RETURNING {USER_COLUMNS}
        "#
    );
    let user = sqlx::query_as::<_, User>(&query)
        .bind(Uuid::new_v4())
        .bind(&email)
        .bind(&password_hash)
        .bind(req.name.trim())
        .bind(UserRole::Member)
        .bind(AdminRequestStatus::Pending)
        .bind(reason)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Email already registered".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

    let request: AdminRequest = sqlx::query_as(
        r#"
        INSERT INTO admin_requests (id, user_id, requested_role, reason, status)
        VALUES ($1, $2, $3, $4, 'pending')
        RETURNING id, user_id, requested_role, reason, status, decided_by, decided_at,
                  decision_note, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(req.requested_role)
    .bind(reason)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        user_id = %user.id,
        request_id = %request.id,
        requested_role = %request.requested_role,
        "Admin access requested at signup"
    );

    Ok((
        StatusCode::CREATED,
        Json(AdminSignupResponse {
            user,
            request,
            message: "Your request has been submitted and is awaiting approval".to_string(),
        }),
    ))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<User>, AppError> {
    Ok(Json(fetch_user(&state.db, user.id).await?))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn record(password: &str, is_active: bool) -> UserRecord {
        let now = Utc::now();
        UserRecord {
            user: User {
                id: Uuid::new_v4(),
                email: "u1@example.com".into(),
                name: "U One".into(),
                role: UserRole::Member,
                is_active,
                is_approved: true,
                admin_request_status: None,
                admin_request_reason: None,
                last_login_at: None,
                created_at: now,
                updated_at: now,
            },
            password_hash: hash_password(password).unwrap(),
        }
    }

    #[test]
    fn correct_password_logs_in() {
        let user = check_credentials(Some(record("hunter22!", true)), "hunter22!").unwrap();
        assert_eq!(user.email, "u1@example.com");
    }

    #[test]
    fn wrong_password_and_unknown_email_look_alike() {
        assert!(matches!(
            check_credentials(Some(record("hunter22!", true)), "hunter23!"),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            check_credentials(None, "hunter22!"),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn deactivated_account_fails_with_correct_password() {
        assert!(matches!(
            check_credentials(Some(record("hunter22!", false)), "hunter22!"),
            Err(AppError::AccountDisabled)
        ));
    }

    #[test]
    fn signup_validation() {
        assert!(validate_signup("a@b.co", "longenough", "A").is_ok());
        assert!(validate_signup("", "longenough", "A").is_err());
        assert!(validate_signup("a@b.co", "short", "A").is_err());
        assert!(validate_signup("not-an-email", "longenough", "A").is_err());
        assert!(validate_signup("a@b.co", "longenough", "   ").is_err());
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }
}
