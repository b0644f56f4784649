//! Lookups shared by the resource handlers: users, workspace membership and
//! the lazily created personal workspace.

use std::collections::HashMap;

use planit_shared::{User, UserSummary, WorkspaceRole, PERSONAL_WORKSPACE_NAME};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::error::AppError;

pub const USER_COLUMNS: &str = "id, email, name, role, is_active, is_approved, \
     admin_request_status, admin_request_reason, last_login_at, created_at, updated_at";

pub async fn fetch_user(db: &DbPool, user_id: Uuid) -> Result<User, AppError> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    sqlx::query_as::<_, User>(&query)
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn user_summaries(
    db: &DbPool,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, UserSummary>, AppError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<UserSummary> =
        sqlx::query_as("SELECT id, name, email FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(db)
            .await?;

    Ok(rows.into_iter().map(|u| (u.id, u)).collect())
}

pub async fn workspace_names(
    db: &DbPool,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, String>, AppError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(Uuid, String)> =
        sqlx::query_as("SELECT id, name FROM workspaces WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(db)
            .await?;

    Ok(rows.into_iter().collect())
}

pub async fn workspace_role(
    db: &DbPool,
    workspace_id: Uuid,
    user_id: Uuid,
) -> Result<Option<WorkspaceRole>, AppError> {
    let role: Option<(WorkspaceRole,)> = sqlx::query_as(
        "SELECT role FROM workspace_members WHERE workspace_id = $1 AND user_id = $2",
    )
    .bind(workspace_id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    Ok(role.map(|(r,)| r))
}

/// Membership role of the caller; non-members see the workspace as missing.
pub async fn check_membership(
    db: &DbPool,
    workspace_id: Uuid,
    user_id: Uuid,
) -> Result<WorkspaceRole, AppError> {
    workspace_role(db, workspace_id, user_id)
        .await?
        .ok_or(AppError::NotFound)
}

/// Workspace admin rights, either from membership or from an admin-tier
/// account role.
pub fn has_admin_rights(user: &AuthUser, role: WorkspaceRole) -> bool {
    role.can_admin() || user.role.is_admin_tier()
}

/// Returns the id of the user's personal workspace, creating it (and the
/// owner membership) the first time. Safe under concurrent first calls: the
/// partial unique index admits one row and the losers read it back.
pub async fn ensure_personal_workspace(db: &DbPool, user_id: Uuid) -> Result<Uuid, AppError> {
    let mut tx = db.begin().await?;

    let inserted: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO workspaces (id, name, description, owner_id, is_personal)
        VALUES ($1, $2, NULL, $3, TRUE)
        ON CONFLICT (owner_id) WHERE is_personal DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(PERSONAL_WORKSPACE_NAME)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let workspace_id = match inserted {
        Some((id,)) => {
            tracing::info!(%user_id, workspace_id = %id, "Created personal workspace");
            id
        }
        None => {
            let (id,): (Uuid,) = sqlx::query_as(
                "SELECT id FROM workspaces WHERE owner_id = $1 AND is_personal",
            )
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;
            id
        }
    };

    sqlx::query(
        r#"
        INSERT INTO workspace_members (workspace_id, user_id, role)
        VALUES ($1, $2, 'owner')
        ON CONFLICT (workspace_id, user_id) DO NOTHING
        "#,
    )
    .bind(workspace_id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(workspace_id)
}

/// Where a new task or document lands, and the caller's role there.
///
/// A project pins the workspace; an explicit workspace must agree with it.
/// With neither, the caller's personal workspace is used.
pub async fn resolve_workspace(
    db: &DbPool,
    user: &AuthUser,
    workspace_id: Option<Uuid>,
    project_id: Option<Uuid>,
) -> Result<(Uuid, WorkspaceRole), AppError> {
    let project_workspace = match project_id {
        Some(project_id) => Some(project_workspace(db, project_id).await?),
        None => None,
    };

    let target = match (workspace_id, project_workspace) {
        (Some(ws), Some(pws)) if ws != pws => {
            return Err(AppError::Validation(
                "Project does not belong to this workspace".to_string(),
            ))
        }
        (Some(ws), _) | (None, Some(ws)) => ws,
        (None, None) => {
            let personal = ensure_personal_workspace(db, user.id).await?;
            return Ok((personal, WorkspaceRole::Owner));
        }
    };

    let role = check_membership(db, target, user.id).await?;
    Ok((target, role))
}

pub async fn project_workspace(db: &DbPool, project_id: Uuid) -> Result<Uuid, AppError> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT workspace_id FROM projects WHERE id = $1")
        .bind(project_id)
        .fetch_optional(db)
        .await?;

    row.map(|(id,)| id)
        .ok_or_else(|| AppError::Validation("Project not found".to_string()))
}

/// Assignees must belong to the task's workspace.
pub async fn verify_assignee(
    db: &DbPool,
    workspace_id: Uuid,
    assignee_id: Uuid,
) -> Result<(), AppError> {
    if workspace_role(db, workspace_id, assignee_id).await?.is_none() {
        return Err(AppError::Validation(
            "Assignee is not a member of this workspace".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use planit_shared::UserRole;

    use super::*;

    fn user(role: UserRole) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "u@example.com".into(),
            role,
        }
    }

    #[test]
    fn admin_rights_from_either_source() {
        assert!(has_admin_rights(&user(UserRole::Member), WorkspaceRole::Owner));
        assert!(has_admin_rights(&user(UserRole::Member), WorkspaceRole::Admin));
        assert!(has_admin_rights(&user(UserRole::CompanyAdmin), WorkspaceRole::Viewer));
        assert!(!has_admin_rights(&user(UserRole::Manager), WorkspaceRole::Member));
    }

    #[test]
    fn user_columns_exclude_credentials() {
        assert!(!USER_COLUMNS.contains("password"));
    }
}
