use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use planit_shared::{
    api::{CreateTaskRequest, TaskListParams, UpdateTaskRequest},
    Task, TaskDetail, TaskStatus, WorkspaceRole,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::error::AppError;
use crate::routes::AppState;

use super::access::{
    check_membership, has_admin_rights, project_workspace, resolve_workspace, user_summaries,
    verify_assignee, workspace_names,
};

pub(super) const TASK_COLUMNS: &str = "id, workspace_id, project_id, title, description, status, priority, \
     assignee_id, created_by, due_date, created_at, updated_at, completed_at";

/// Creator, assignee and workspace admins may edit a task.
pub fn can_update_task(task: &Task, user: &AuthUser, role: WorkspaceRole) -> bool {
    task.created_by == user.id
        || task.assignee_id == Some(user.id)
        || has_admin_rights(user, role)
}

/// Deleting is reserved for the creator and workspace admins.
pub fn can_delete_task(task: &Task, user: &AuthUser, role: WorkspaceRole) -> bool {
    task.created_by == user.id || has_admin_rights(user, role)
}

async fn fetch_task(state: &AppState, task_id: Uuid) -> Result<Task, AppError> {
    let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");
    sqlx::query_as::<_, Task>(&query)
        .bind(task_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound)
}

/// Resolves creator, assignee and workspace name for each task.
async fn populate(db: &DbPool, tasks: Vec<Task>) -> Result<Vec<TaskDetail>, AppError> {
    let mut user_ids: Vec<Uuid> = tasks
        .iter()
        .flat_map(|t| std::iter::once(t.created_by).chain(t.assignee_id))
        .collect();
    user_ids.sort_unstable();
    user_ids.dedup();

    let mut workspace_ids: Vec<Uuid> = tasks.iter().map(|t| t.workspace_id).collect();
    workspace_ids.sort_unstable();
    workspace_ids.dedup();

    let users = user_summaries(db, &user_ids).await?;
    let workspaces = workspace_names(db, &workspace_ids).await?;

    tasks
        .into_iter()
        .map(|task| {
            let creator = users.get(&task.created_by).cloned().ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("Creator of task {} missing", task.id))
            })?;
            let assignee = task.assignee_id.and_then(|id| users.get(&id).cloned());
            let workspace_name = workspaces.get(&task.workspace_id).cloned().unwrap_or_default();
            Ok(TaskDetail {
                task,
                workspace_name,
                creator,
                assignee,
            })
        })
        .collect()
}

async fn populate_one(db: &DbPool, task: Task) -> Result<TaskDetail, AppError> {
    populate(db, vec![task])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Task vanished while populating")))
}

/// GET /api/tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<TaskListParams>,
) -> Result<Json<Vec<TaskDetail>>, AppError> {
    if let Some(workspace_id) = params.workspace_id {
        check_membership(&state.db, workspace_id, user.id).await?;
    }

    let assignee = if params.mine.unwrap_or(false) {
        Some(user.id)
    } else {
        params.assignee_id
    };

    let query = format!(
        r#"
        SELECT {TASK_COLUMNS}
        FROM tasks
        WHERE workspace_id IN (SELECT workspace_id FROM workspace_members WHERE user_id = $1)
          AND ($2::uuid IS NULL OR workspace_id = $2)
          AND ($3::uuid IS NULL OR project_id = $3)
          AND ($4::task_status IS NULL OR status = $4)
          AND ($5::task_priority IS NULL OR priority = $5)
          AND ($6::uuid IS NULL OR assignee_id = $6)
        ORDER BY due_date ASC NULLS LAST, created_at DESC
        "#
    );
    let tasks = sqlx::query_as::<_, Task>(&query)
        .bind(user.id)
        .bind(params.workspace_id)
        .bind(params.project_id)
        .bind(params.status)
        .bind(params.priority)
        .bind(assignee)
        .fetch_all(&state.db)
        .await?;

    Ok(Json(populate(&state.db, tasks).await?))
}

/// POST /api/tasks
///
/// Without a workspace or project the task goes to the caller's personal
/// workspace, which is created on first use.
pub async fn create_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskDetail>), AppError> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Task title is required".to_string()));
    }

    let (workspace_id, role) =
        resolve_workspace(&state.db, &user, req.workspace_id, req.project_id).await?;

    if !role.can_edit() {
        return Err(AppError::Forbidden);
    }

    if let Some(assignee_id) = req.assignee_id {
        verify_assignee(&state.db, workspace_id, assignee_id).await?;
    }

    let status = req.status.unwrap_or_default();
    let now = Utc::now();
    let completed_at = TaskStatus::Todo.completed_at_after(status, None, now);

    let query = format!(
        r#"
        INSERT INTO tasks (id, workspace_id, project_id, title, description, status, priority,
                           assignee_id, created_by, due_date, created_at, updated_at, completed_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11, $12)
        RETURNING {TASK_COLUMNS}
        "#
    );
    let task = sqlx::query_as::<_, Task>(&query)
        .bind(Uuid::new_v4())
        .bind(workspace_id)
        .bind(req.project_id)
        .bind(title)
        .bind(&req.description)
        .bind(status)
        .bind(req.priority.unwrap_or_default())
        .bind(req.assignee_id)
        .bind(user.id)
        .bind(req.due_date)
        .bind(now)
        .bind(completed_at)
        .fetch_one(&state.db)
        .await?;

    tracing::debug!(task_id = %task.id, %workspace_id, "Task created");

    if let Some(assignee_id) = task.assignee_id {
        state
            .notifier
            .task_assigned(assignee_id, task.id, &task.title, workspace_id, user.id);
    }

    Ok((StatusCode::CREATED, Json(populate_one(&state.db, task).await?)))
}

/// GET /api/tasks/:id
pub async fn get_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<TaskDetail>, AppError> {
    let task = fetch_task(&state, task_id).await?;
    check_membership(&state.db, task.workspace_id, user.id).await?;

    Ok(Json(populate_one(&state.db, task).await?))
}

/// PATCH /api/tasks/:id
pub async fn update_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<TaskDetail>, AppError> {
    let existing = fetch_task(&state, task_id).await?;
    let role = check_membership(&state.db, existing.workspace_id, user.id).await?;

    if !can_update_task(&existing, &user, role) {
        return Err(AppError::Forbidden);
    }

    if req.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(AppError::Validation("Task title cannot be empty".to_string()));
    }

    if let Some(project_id) = req.project_id {
        if project_workspace(&state.db, project_id).await? != existing.workspace_id {
            return Err(AppError::Validation(
                "Project does not belong to this workspace".to_string(),
            ));
        }
    }

    if let Some(assignee_id) = req.assignee_id {
        verify_assignee(&state.db, existing.workspace_id, assignee_id).await?;
    }

    let now = Utc::now();
    let next_status = req.status.unwrap_or(existing.status);
    let completed_at = existing
        .status
        .completed_at_after(next_status, existing.completed_at, now);

    let query = format!(
        r#"
        UPDATE tasks
        SET title = COALESCE($1, title),
            description = COALESCE($2, description),
            status = $3,
            priority = COALESCE($4, priority),
            assignee_id = COALESCE($5, assignee_id),
            project_id = COALESCE($6, project_id),
            due_date = COALESCE($7, due_date),
            updated_at = $8,
            completed_at = $9
        WHERE id = $10
        RETURNING {TASK_COLUMNS}
        "#
    );
    let task = sqlx::query_as::<_, Task>(&query)
        .bind(req.title.as_deref().map(str::trim))
        .bind(&req.description)
        .bind(next_status)
        .bind(req.priority)
        .bind(req.assignee_id)
        .bind(req.project_id)
        .bind(req.due_date)
        .bind(now)
        .bind(completed_at)
        .bind(task_id)
        .fetch_one(&state.db)
        .await?;

    if let Some(assignee_id) = req.assignee_id {
        if existing.assignee_id != Some(assignee_id) {
            state.notifier.task_assigned(
                assignee_id,
                task.id,
                &task.title,
                task.workspace_id,
                user.id,
            );
        }
    }

    Ok(Json(populate_one(&state.db, task).await?))
}

/// DELETE /api/tasks/:id
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let task = fetch_task(&state, task_id).await?;
    let role = check_membership(&state.db, task.workspace_id, user.id).await?;

    if !can_delete_task(&task, &user, role) {
        return Err(AppError::Forbidden);
    }

    sqlx::query("DELETE FROM tasks WHERE id = $1")
        .bind(task_id)
        .execute(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use planit_shared::{Priority, UserRole};

    use super::*;

    fn user(role: UserRole) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "u@example.com".into(),
            role,
        }
    }

    fn task(created_by: Uuid, assignee_id: Option<Uuid>) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            workspace_id: Uuid::new_v4(),
            project_id: None,
            title: "Ship it".into(),
            description: None,
            status: TaskStatus::Todo,
            priority: Priority::High,
            assignee_id,
            created_by,
            due_date: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    #[test]
    fn creator_and_assignee_can_edit() {
        let creator = user(UserRole::Member);
        let assignee = user(UserRole::Guest);
        let t = task(creator.id, Some(assignee.id));

        assert!(can_update_task(&t, &creator, WorkspaceRole::Member));
        assert!(can_update_task(&t, &assignee, WorkspaceRole::Viewer));
        assert!(!can_delete_task(&t, &assignee, WorkspaceRole::Viewer));
        assert!(can_delete_task(&t, &creator, WorkspaceRole::Member));
    }

    #[test]
    fn bystanders_need_admin_rights() {
        let t = task(Uuid::new_v4(), None);
        let bystander = user(UserRole::Manager);

        assert!(!can_update_task(&t, &bystander, WorkspaceRole::Member));
        assert!(!can_delete_task(&t, &bystander, WorkspaceRole::Member));
        assert!(can_update_task(&t, &bystander, WorkspaceRole::Admin));
        assert!(can_delete_task(&t, &user(UserRole::Admin), WorkspaceRole::Viewer));
    }
}
