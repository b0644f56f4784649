use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use planit_shared::{
    api::{CreateProjectRequest, ProjectListParams, UpdateProjectRequest},
    Project,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::routes::AppState;

use super::access::{check_membership, has_admin_rights, resolve_workspace};

const PROJECT_COLUMNS: &str =
    "id, workspace_id, name, description, created_by, created_at, updated_at";

async fn fetch_project(state: &AppState, project_id: Uuid) -> Result<Project, AppError> {
    let query = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1");
    sqlx::query_as::<_, Project>(&query)
        .bind(project_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound)
}

/// POST /api/projects
pub async fn create_project(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Project name is required".to_string()));
    }

    let (workspace_id, role) = resolve_workspace(&state.db, &user, req.workspace_id, None).await?;
    if !role.can_edit() {
        return Err(AppError::Forbidden);
    }

    let query = format!(
        r#"
        INSERT INTO projects (id, workspace_id, name, description, created_by)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {PROJECT_COLUMNS}
        "#
    );
    let project = sqlx::query_as::<_, Project>(&query)
        .bind(Uuid::new_v4())
        .bind(workspace_id)
        .bind(name)
        .bind(&req.description)
        .bind(user.id)
        .fetch_one(&state.db)
        .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

/// GET /api/projects
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ProjectListParams>,
) -> Result<Json<Vec<Project>>, AppError> {
    let query = format!(
        r#"
        SELECT {PROJECT_COLUMNS}
        FROM projects
        WHERE workspace_id IN (SELECT workspace_id FROM workspace_members WHERE user_id = $1)
          AND ($2::uuid IS NULL OR workspace_id = $2)
        ORDER BY created_at DESC
        "#
    );
    let projects = sqlx::query_as::<_, Project>(&query)
        .bind(user.id)
        .bind(params.workspace_id)
        .fetch_all(&state.db)
        .await?;

    Ok(Json(projects))
}

/// GET /api/projects/:id
pub async fn get_project(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Project>, AppError> {
    let project = fetch_project(&state, project_id).await?;
    check_membership(&state.db, project.workspace_id, user.id).await?;

    Ok(Json(project))
}

/// PATCH /api/projects/:id
pub async fn update_project(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> Result<Json<Project>, AppError> {
    let project = fetch_project(&state, project_id).await?;
    let role = check_membership(&state.db, project.workspace_id, user.id).await?;

    if project.created_by != user.id && !has_admin_rights(&user, role) {
        return Err(AppError::Forbidden);
    }

    if req.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::Validation("Project name cannot be empty".to_string()));
    }

    let query = format!(
        r#"
        UPDATE projects
        SET name = COALESCE($1, name),
            description = COALESCE($2, description),
            updated_at = NOW()
        WHERE id = $3
        RETURNING {PROJECT_COLUMNS}
        "#
    );
    let project = sqlx::query_as::<_, Project>(&query)
        .bind(req.name.as_deref().map(str::trim))
        .bind(&req.description)
        .bind(project_id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(project))
}

/// DELETE /api/projects/:id
///
/// Tasks and documents of the project stay in the workspace, detached.
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let project = fetch_project(&state, project_id).await?;
    let role = check_membership(&state.db, project.workspace_id, user.id).await?;

    if project.created_by != user.id && !has_admin_rights(&user, role) {
        return Err(AppError::Forbidden);
    }

    sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(project_id)
        .execute(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
