use axum::{
    extract::{Path, State},
    Extension, Json,
};
use planit_shared::api::{SetUserActiveRequest, UpdateUserRoleRequest};
use planit_shared::{AdminRequest, AdminRequestStatus, User, UserRole};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::routes::AppState;

use super::access::{fetch_user, USER_COLUMNS};
use super::admin_requests::{is_overtaken, REQUEST_COLUMNS};

/// Direct admin action on another account: never on oneself, never on
/// someone ranked above the actor.
pub fn check_user_management(actor: &AuthUser, target: &User) -> Result<(), AppError> {
    actor.require_admin_tier()?;
    if actor.id == target.id {
        return Err(AppError::Validation(
            "You cannot change your own account this way".to_string(),
        ));
    }
    if target.role.outranks(actor.role) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<User>>, AppError> {
    user.require_admin_tier()?;

    let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC");
    let users = sqlx::query_as::<_, User>(&query)
        .fetch_all(&state.db)
        .await?;

    Ok(Json(users))
}

/// PATCH /api/admin/users/:id/role
pub async fn update_user_role(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateUserRoleRequest>,
) -> Result<Json<User>, AppError> {
    actor.require_admin_tier()?;

    let target = fetch_user(&state.db, user_id).await?;
    check_user_management(&actor, &target)?;

    if !actor.role.can_grant(req.role) {
        return Err(AppError::Forbidden);
    }

    // Same lock order as a queue decision: pending request first, then the user.
    let mut tx = state.db.begin().await?;

    let query = format!(
        "SELECT {REQUEST_COLUMNS} FROM admin_requests \
         WHERE user_id = $1 AND status = 'pending' FOR UPDATE"
    );
    let overtaken = sqlx::query_as::<_, AdminRequest>(&query)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .filter(|request| is_overtaken(request, req.role));

    if let Some(request) = &overtaken {
        sqlx::query(
            r#"
            UPDATE admin_requests
            SET status = 'approved', decided_by = $1, decided_at = NOW(), decision_note = $2
            WHERE id = $3
            "#,
        )
        .bind(actor.id)
        .bind(format!("Superseded by direct role change to {}", req.role))
        .bind(request.id)
        .execute(&mut *tx)
        .await?;
    }

    let query = format!(
        r#"
        UPDATE users
        SET role = $1,
            admin_request_status = COALESCE($2, admin_request_status),
            is_approved = is_approved OR $3,
            updated_at = NOW()
        WHERE id = $4
        RETURNING {USER_COLUMNS}
        "#
    );
    let updated = sqlx::query_as::<_, User>(&query)
        .bind(req.role)
        .bind(overtaken.as_ref().map(|_| AdminRequestStatus::Approved))
        .bind(overtaken.is_some())
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(
        user_id = %user_id,
        actor_id = %actor.id,
        from = %target.role,
        to = %updated.role,
        closed_request = ?overtaken.as_ref().map(|r| r.id),
        "User role changed by admin"
    );

    if let Some(request) = overtaken {
        state.notifier.request_decided(user_id, request.id, true);
    }

    Ok(Json(updated))
}

/// PATCH /api/admin/users/:id/active
pub async fn set_user_active(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<SetUserActiveRequest>,
) -> Result<Json<User>, AppError> {
    actor.require_admin_tier()?;

    let target = fetch_user(&state.db, user_id).await?;
    check_user_management(&actor, &target)?;

    let query = format!(
        "UPDATE users SET is_active = $1, updated_at = NOW() WHERE id = $2 RETURNING {USER_COLUMNS}"
    );
    let updated = sqlx::query_as::<_, User>(&query)
        .bind(req.is_active)
        .bind(user_id)
        .fetch_one(&state.db)
        .await?;

    tracing::info!(
        user_id = %user_id,
        actor_id = %actor.id,
        is_active = updated.is_active,
        "User activation changed"
    );

    Ok(Json(updated))
}
