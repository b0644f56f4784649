use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use planit_shared::{
    api::{AddMemberRequest, CreateWorkspaceRequest, UpdateWorkspaceRequest},
    Workspace, WorkspaceMemberWithUser, WorkspaceRole, WorkspaceWithRole,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{is_unique_violation, AppError};
use crate::routes::AppState;

use super::access::{check_membership, has_admin_rights};

const WORKSPACE_COLUMNS: &str =
    "id, name, description, owner_id, is_personal, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct WorkspaceRoleRow {
    #[sqlx(flatten)]
    workspace: Workspace,
    role: WorkspaceRole,
}

impl From<WorkspaceRoleRow> for WorkspaceWithRole {
    fn from(row: WorkspaceRoleRow) -> Self {
        WorkspaceWithRole {
            workspace: row.workspace,
            role: row.role,
        }
    }
}

async fn fetch_workspace(state: &AppState, workspace_id: Uuid) -> Result<Workspace, AppError> {
    let query = format!("SELECT {WORKSPACE_COLUMNS} FROM workspaces WHERE id = $1");
    sqlx::query_as::<_, Workspace>(&query)
        .bind(workspace_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound)
}

/// POST /api/workspaces
pub async fn create_workspace(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateWorkspaceRequest>,
) -> Result<(StatusCode, Json<Workspace>), AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Workspace name is required".to_string()));
    }

    let mut tx = state.db.begin().await?;

    let query = format!(
        r#"
        INSERT INTO workspaces (id, name, description, owner_id, is_personal)
        VALUES ($1, $2, $3, $4, FALSE)
        RETURNING {WORKSPACE_COLUMNS}
        "#
    );
    let workspace = sqlx::query_as::<_, Workspace>(&query)
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(&req.description)
        .bind(user.id)
        .fetch_one(&mut *tx)
        .await?;

    // Add owner as member
    sqlx::query(
        r#"
        INSERT INTO workspace_members (workspace_id, user_id, role, joined_at)
        VALUES ($1, $2, 'owner', $3)
        "#,
    )
    .bind(workspace.id)
    .bind(user.id)
    .bind(workspace.created_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(workspace_id = %workspace.id, owner_id = %user.id, "Workspace created");

    Ok((StatusCode::CREATED, Json(workspace)))
}

/// GET /api/workspaces
pub async fn list_workspaces(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<WorkspaceWithRole>>, AppError> {
    let rows: Vec<WorkspaceRoleRow> = sqlx::query_as(
        r#"
        SELECT w.id, w.name, w.description, w.owner_id, w.is_personal, w.created_at,
               w.updated_at, wm.role
        FROM workspaces w
        JOIN workspace_members wm ON wm.workspace_id = w.id
        WHERE wm.user_id = $1
        ORDER BY w.is_personal DESC, w.created_at DESC
        "#,
    )
    .bind(user.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// GET /api/workspaces/:id
pub async fn get_workspace(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<WorkspaceWithRole>, AppError> {
    let role = check_membership(&state.db, workspace_id, user.id).await?;
    let workspace = fetch_workspace(&state, workspace_id).await?;

    Ok(Json(WorkspaceWithRole { workspace, role }))
}

/// PATCH /api/workspaces/:id
pub async fn update_workspace(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(workspace_id): Path<Uuid>,
    Json(req): Json<UpdateWorkspaceRequest>,
) -> Result<Json<Workspace>, AppError> {
    let role = check_membership(&state.db, workspace_id, user.id).await?;

    if !has_admin_rights(&user, role) {
        return Err(AppError::Forbidden);
    }

    if req.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::Validation("Workspace name cannot be empty".to_string()));
    }

    let query = format!(
        r#"
        UPDATE workspaces
        SET name = COALESCE($1, name),
            description = COALESCE($2, description),
            updated_at = NOW()
        WHERE id = $3
        RETURNING {WORKSPACE_COLUMNS}
        "#
    );
    let workspace = sqlx::query_as::<_, Workspace>(&query)
        .bind(req.name.as_deref().map(str::trim))
        .bind(&req.description)
        .bind(workspace_id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(workspace))
}

/// DELETE /api/workspaces/:id
pub async fn delete_workspace(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(workspace_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let role = check_membership(&state.db, workspace_id, user.id).await?;

    if !role.is_owner() {
        return Err(AppError::Forbidden);
    }

    let workspace = fetch_workspace(&state, workspace_id).await?;
    if workspace.is_personal {
        return Err(AppError::Validation(
            "The personal workspace cannot be deleted".to_string(),
        ));
    }

    // Delete workspace (cascades to members, projects, tasks and documents)
    sqlx::query("DELETE FROM workspaces WHERE id = $1")
        .bind(workspace_id)
        .execute(&state.db)
        .await?;

    tracing::info!(%workspace_id, "Workspace deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/workspaces/:id/members
pub async fn list_members(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<Vec<WorkspaceMemberWithUser>>, AppError> {
    check_membership(&state.db, workspace_id, user.id).await?;

    let members: Vec<WorkspaceMemberWithUser> = sqlx::query_as(
        r#"
        SELECT wm.user_id, u.name, u.email, u.role AS user_role, wm.role, wm.joined_at
        FROM workspace_members wm
        JOIN users u ON u.id = wm.user_id
        WHERE wm.workspace_id = $1
        ORDER BY wm.joined_at
        "#,
    )
    .bind(workspace_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(members))
}

/// POST /api/workspaces/:id/members
pub async fn add_member(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(workspace_id): Path<Uuid>,
    Json(req): Json<AddMemberRequest>,
) -> Result<(StatusCode, Json<WorkspaceMemberWithUser>), AppError> {
    let role = check_membership(&state.db, workspace_id, user.id).await?;

    if !has_admin_rights(&user, role) {
        return Err(AppError::Forbidden);
    }
    if req.role.is_owner() {
        return Err(AppError::Validation(
            "A workspace has exactly one owner".to_string(),
        ));
    }

    let workspace = fetch_workspace(&state, workspace_id).await?;
    if workspace.is_personal {
        return Err(AppError::Validation(
            "Members cannot be added to a personal workspace".to_string(),
        ));
    }

    let invitee: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(req.email.trim().to_lowercase())
        .fetch_optional(&state.db)
        .await?;
    let (invitee_id,) = invitee.ok_or(AppError::NotFound)?;

    sqlx::query(
        r#"
        INSERT INTO workspace_members (workspace_id, user_id, role, invited_by)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(workspace_id)
    .bind(invitee_id)
    .bind(req.role)
    .bind(user.id)
    .execute(&state.db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("User is already a member".to_string())
        } else {
            AppError::Database(e)
        }
    })?;

    let member: WorkspaceMemberWithUser = sqlx::query_as(
        r#"
        SELECT wm.user_id, u.name, u.email, u.role AS user_role, wm.role, wm.joined_at
        FROM workspace_members wm
        JOIN users u ON u.id = wm.user_id
        WHERE wm.workspace_id = $1 AND wm.user_id = $2
        "#,
    )
    .bind(workspace_id)
    .bind(invitee_id)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(member)))
}

/// DELETE /api/workspaces/:id/members/:user_id
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((workspace_id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let role = check_membership(&state.db, workspace_id, user.id).await?;

    // Members may always leave; removing others needs admin rights.
    if member_id != user.id && !has_admin_rights(&user, role) {
        return Err(AppError::Forbidden);
    }

    let target_role = check_membership(&state.db, workspace_id, member_id).await?;
    if target_role.is_owner() {
        return Err(AppError::Validation(
            "The workspace owner cannot be removed".to_string(),
        ));
    }

    sqlx::query("DELETE FROM workspace_members WHERE workspace_id = $1 AND user_id = $2")
        .bind(workspace_id)
        .bind(member_id)
        .execute(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
