use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use planit_shared::api::{
    ApprovalListParams, CreateAdminRequest, DecisionNote, DecisionRequest, DecisionResponse,
};
use planit_shared::{
    AdminRequest, AdminRequestStatus, AdminRequestWithUser, DecisionAction, User, UserRole,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{is_unique_violation, AppError};
use crate::routes::AppState;

use super::access::USER_COLUMNS;

pub(super) const REQUEST_COLUMNS: &str = "id, user_id, requested_role, reason, status, decided_by, \
     decided_at, decision_note, created_at";

/// A role request must ask for more than the user already has, and
/// super-admin is never handed out through the queue.
pub fn validate_requested_role(current: UserRole, requested: UserRole) -> Result<(), AppError> {
    if requested == UserRole::SuperAdmin {
        return Err(AppError::Validation(
            "super-admin cannot be requested".to_string(),
        ));
    }
    if !requested.outranks(current) {
        return Err(AppError::Validation(format!(
            "Requested role {requested} is not above current role {current}"
        )));
    }
    Ok(())
}

/// A pending request is overtaken once the requester already holds the
/// requested role or something above it.
pub fn is_overtaken(request: &AdminRequest, current_role: UserRole) -> bool {
    !request.requested_role.outranks(current_role)
}

/// Decides what a decision does to a request, without touching storage.
/// `current_role` is the requester's role as locked for the decision; an
/// approval never lowers it.
pub fn plan_decision(
    actor: &AuthUser,
    request: &AdminRequest,
    current_role: UserRole,
    action: DecisionAction,
) -> Result<AdminRequestStatus, AppError> {
    if request.user_id == actor.id {
        return Err(AppError::Forbidden);
    }
    if action == DecisionAction::Approve && !actor.role.can_grant(request.requested_role) {
        return Err(AppError::Forbidden);
    }
    let next = request.status.decide(action)?;
    if next == AdminRequestStatus::Approved && is_overtaken(request, current_role) {
        return Err(AppError::Conflict(format!(
            "User already holds role {current_role}, which is not below {}",
            request.requested_role
        )));
    }
    Ok(next)
}

/// POST /api/admin-requests
pub async fn create_request(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateAdminRequest>,
) -> Result<(StatusCode, Json<AdminRequest>), AppError> {
    validate_requested_role(user.role, req.requested_role)?;

    let reason = req.reason.trim();
    if reason.is_empty() {
        return Err(AppError::Validation("A reason is required".to_string()));
    }

    let mut tx = state.db.begin().await?;

    let query = format!(
        r#"
        INSERT INTO admin_requests (id, user_id, requested_role, reason, status)
        VALUES ($1, $2, $3, $4, 'pending')
        RETURNING {REQUEST_COLUMNS}
        "#
    );
    let request = sqlx::query_as::<_, AdminRequest>(&query)
        .bind(Uuid::new_v4())
        .bind(user.id)
        .bind(req.requested_role)
        .bind(reason)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("A request is already pending".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

    sqlx::query(
        r#"
        UPDATE users
        SET admin_request_status = 'pending', admin_request_reason = $1, updated_at = NOW()
        WHERE id = $2
        "#,
    )
    .bind(reason)
    .bind(user.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        user_id = %user.id,
        request_id = %request.id,
        requested_role = %request.requested_role,
        "Admin request filed"
    );

    Ok((StatusCode::CREATED, Json(request)))
}

/// GET /api/admin-requests/mine
pub async fn my_requests(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<AdminRequest>>, AppError> {
    let query = format!(
        "SELECT {REQUEST_COLUMNS} FROM admin_requests WHERE user_id = $1 ORDER BY created_at DESC"
    );
    let requests = sqlx::query_as::<_, AdminRequest>(&query)
        .bind(user.id)
        .fetch_all(&state.db)
        .await?;

    Ok(Json(requests))
}

/// GET /api/admin/approvals
pub async fn list_approvals(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ApprovalListParams>,
) -> Result<Json<Vec<AdminRequestWithUser>>, AppError> {
    user.require_admin_tier()?;

    let status = params.status.unwrap_or(AdminRequestStatus::Pending);

    let rows: Vec<AdminRequestWithUser> = sqlx::query_as(
        r#"
        SELECT ar.id, ar.user_id, ar.requested_role, ar.reason, ar.status, ar.decided_by,
               ar.decided_at, ar.decision_note, ar.created_at,
               u.email AS user_email, u.name AS user_name, u.role AS current_role
        FROM admin_requests ar
        JOIN users u ON u.id = ar.user_id
        WHERE ar.status = $1
        ORDER BY ar.created_at ASC
        "#,
    )
    .bind(status)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(rows))
}

/// POST /api/admin/approvals/:id
pub async fn decide_approval(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(request_id): Path<Uuid>,
    Json(req): Json<DecisionRequest>,
) -> Result<Json<DecisionResponse>, AppError> {
    user.require_admin_tier()?;

    let action: DecisionAction = req
        .action
        .parse()
        .map_err(|e: planit_shared::ParseActionError| AppError::Validation(e.to_string()))?;

    apply_decision(&state, &user, request_id, action, req.note).await
}

/// POST /api/admin-requests/:id/accept
pub async fn accept_request(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(request_id): Path<Uuid>,
    body: Option<Json<DecisionNote>>,
) -> Result<Json<DecisionResponse>, AppError> {
    user.require_admin_tier()?;
    let note = body.and_then(|Json(b)| b.note);
    apply_decision(&state, &user, request_id, DecisionAction::Approve, note).await
}

/// POST /api/admin-requests/:id/reject
pub async fn reject_request(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(request_id): Path<Uuid>,
    body: Option<Json<DecisionNote>>,
) -> Result<Json<DecisionResponse>, AppError> {
    user.require_admin_tier()?;
    let note = body.and_then(|Json(b)| b.note);
    apply_decision(&state, &user, request_id, DecisionAction::Reject, note).await
}

/// Applies an approve/reject to a request and its requester atomically.
/// The request row is locked so two approvers cannot both decide it.
async fn apply_decision(
    state: &AppState,
    actor: &AuthUser,
    request_id: Uuid,
    action: DecisionAction,
    note: Option<String>,
) -> Result<Json<DecisionResponse>, AppError> {
    let mut tx = state.db.begin().await?;

    let query = format!("SELECT {REQUEST_COLUMNS} FROM admin_requests WHERE id = $1 FOR UPDATE");
    let request = sqlx::query_as::<_, AdminRequest>(&query)
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound)?;

    let (current_role,): (UserRole,) =
        sqlx::query_as("SELECT role FROM users WHERE id = $1 FOR UPDATE")
            .bind(request.user_id)
            .fetch_one(&mut *tx)
            .await?;

    let next = plan_decision(actor, &request, current_role, action).map_err(|e| {
        tracing::info!(
            request_id = %request_id,
            actor_id = %actor.id,
            status = %request.status,
            error = %e,
            "Admin request decision refused"
        );
        e
    })?;

    let note = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());

    let query = format!(
        r#"
        UPDATE admin_requests
        SET status = $1, decided_by = $2, decided_at = NOW(), decision_note = $3
        WHERE id = $4
        RETURNING {REQUEST_COLUMNS}
        "#
    );
    let request = sqlx::query_as::<_, AdminRequest>(&query)
        .bind(next)
        .bind(actor.id)
        .bind(&note)
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await?;

    let user = if next == AdminRequestStatus::Approved {
        let query = format!(
            r#"
            UPDATE users
            SET role = $1, is_approved = TRUE, admin_request_status = 'approved', updated_at = NOW()
            WHERE id = $2
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&query)
            .bind(request.requested_role)
            .bind(request.user_id)
            .fetch_one(&mut *tx)
            .await?
    } else {
        let query = format!(
            r#"
            UPDATE users
            SET admin_request_status = 'rejected', updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&query)
            .bind(request.user_id)
            .fetch_one(&mut *tx)
            .await?
    };

    tx.commit().await?;

    tracing::info!(
        request_id = %request.id,
        user_id = %user.id,
        actor_id = %actor.id,
        status = %request.status,
        role = %user.role,
        "Admin request decided"
    );

    state
        .notifier
        .request_decided(user.id, request.id, next == AdminRequestStatus::Approved);

    Ok(Json(DecisionResponse { request, user }))
}
