use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;
use planit_shared::{api::DashboardParams, DashboardStats, Task};

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::routes::AppState;

use super::access::check_membership;
use super::tasks::TASK_COLUMNS;

/// GET /api/dashboard
///
/// Aggregates over every workspace the caller belongs to, or just one when
/// `workspace_id` is given.
pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<DashboardParams>,
) -> Result<Json<DashboardStats>, AppError> {
    if let Some(workspace_id) = params.workspace_id {
        check_membership(&state.db, workspace_id, user.id).await?;
    }

    let query = format!(
        r#"
        SELECT {TASK_COLUMNS}
        FROM tasks
        WHERE workspace_id IN (SELECT workspace_id FROM workspace_members WHERE user_id = $1)
          AND ($2::uuid IS NULL OR workspace_id = $2)
        "#
    );
    let tasks = sqlx::query_as::<_, Task>(&query)
        .bind(user.id)
        .bind(params.workspace_id)
        .fetch_all(&state.db)
        .await?;

    let (total_documents, starred_documents): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*), COUNT(*) FILTER (WHERE starred)
        FROM documents
        WHERE workspace_id IN (SELECT workspace_id FROM workspace_members WHERE user_id = $1)
          AND ($2::uuid IS NULL OR workspace_id = $2)
        "#,
    )
    .bind(user.id)
    .bind(params.workspace_id)
    .fetch_one(&state.db)
    .await?;

    let stats = DashboardStats::from_tasks(tasks.iter(), user.id, Utc::now())
        .with_documents(total_documents, starred_documents);

    Ok(Json(stats))
}
