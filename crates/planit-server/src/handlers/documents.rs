use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use planit_shared::{
    api::{CreateDocumentRequest, DocumentListParams, UpdateDocumentRequest},
    normalize_tags, Document, DocumentDetail, WorkspaceRole,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::error::AppError;
use crate::routes::AppState;

use super::access::{
    check_membership, has_admin_rights, resolve_workspace, user_summaries, workspace_names,
};

const DOCUMENT_COLUMNS: &str = "id, workspace_id, project_id, title, content, owner_id, starred, \
     tags, created_at, updated_at";

/// Owners and workspace admins may edit or delete a document.
pub fn can_modify_document(doc: &Document, user: &AuthUser, role: WorkspaceRole) -> bool {
    doc.owner_id == user.id || has_admin_rights(user, role)
}

/// The star is one flag shared by the workspace, so read-only members cannot
/// flip it.
pub fn can_star_document(role: WorkspaceRole) -> bool {
    role.can_edit()
}

async fn fetch_document(state: &AppState, doc_id: Uuid) -> Result<Document, AppError> {
    let query = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1");
    sqlx::query_as::<_, Document>(&query)
        .bind(doc_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound)
}

async fn populate(db: &DbPool, docs: Vec<Document>) -> Result<Vec<DocumentDetail>, AppError> {
    let mut owner_ids: Vec<Uuid> = docs.iter().map(|d| d.owner_id).collect();
    owner_ids.sort_unstable();
    owner_ids.dedup();

    let mut workspace_ids: Vec<Uuid> = docs.iter().map(|d| d.workspace_id).collect();
    workspace_ids.sort_unstable();
    workspace_ids.dedup();

    let owners = user_summaries(db, &owner_ids).await?;
    let workspaces = workspace_names(db, &workspace_ids).await?;

    docs.into_iter()
        .map(|document| {
            let owner = owners.get(&document.owner_id).cloned().ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("Owner of document {} missing", document.id))
            })?;
            let workspace_name = workspaces
                .get(&document.workspace_id)
                .cloned()
                .unwrap_or_default();
            Ok(DocumentDetail {
                document,
                workspace_name,
                owner,
            })
        })
        .collect()
}

async fn populate_one(db: &DbPool, doc: Document) -> Result<DocumentDetail, AppError> {
    populate(db, vec![doc])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Document vanished while populating")))
}

/// GET /api/documents
pub async fn list_documents(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<DocumentListParams>,
) -> Result<Json<Vec<DocumentDetail>>, AppError> {
    if let Some(workspace_id) = params.workspace_id {
        check_membership(&state.db, workspace_id, user.id).await?;
    }

    let tag = params
        .tag
        .as_deref()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty());

    let query = format!(
        r#"
        SELECT {DOCUMENT_COLUMNS}
        FROM documents
        WHERE workspace_id IN (SELECT workspace_id FROM workspace_members WHERE user_id = $1)
          AND ($2::uuid IS NULL OR workspace_id = $2)
          AND ($3::uuid IS NULL OR project_id = $3)
          AND ($4::bool IS NULL OR starred = $4)
          AND ($5::text IS NULL OR $5 = ANY(tags))
        ORDER BY starred DESC, updated_at DESC
        "#
    );
    let docs = sqlx::query_as::<_, Document>(&query)
        .bind(user.id)
        .bind(params.workspace_id)
        .bind(params.project_id)
        .bind(params.starred)
        .bind(tag)
        .fetch_all(&state.db)
        .await?;

    Ok(Json(populate(&state.db, docs).await?))
}

/// POST /api/documents
pub async fn create_document(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<DocumentDetail>), AppError> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Document title is required".to_string()));
    }

    let (workspace_id, role) =
        resolve_workspace(&state.db, &user, req.workspace_id, req.project_id).await?;

    if !role.can_edit() {
        return Err(AppError::Forbidden);
    }

    let query = format!(
        r#"
        INSERT INTO documents (id, workspace_id, project_id, title, content, owner_id, starred, tags)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {DOCUMENT_COLUMNS}
        "#
    );
    let doc = sqlx::query_as::<_, Document>(&query)
        .bind(Uuid::new_v4())
        .bind(workspace_id)
        .bind(req.project_id)
        .bind(title)
        .bind(&req.content)
        .bind(user.id)
        .bind(req.starred)
        .bind(normalize_tags(&req.tags))
        .fetch_one(&state.db)
        .await?;

    Ok((StatusCode::CREATED, Json(populate_one(&state.db, doc).await?)))
}

/// GET /api/documents/:id
pub async fn get_document(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(doc_id): Path<Uuid>,
) -> Result<Json<DocumentDetail>, AppError> {
    let doc = fetch_document(&state, doc_id).await?;
    check_membership(&state.db, doc.workspace_id, user.id).await?;

    Ok(Json(populate_one(&state.db, doc).await?))
}

/// PATCH /api/documents/:id
pub async fn update_document(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(doc_id): Path<Uuid>,
    Json(req): Json<UpdateDocumentRequest>,
) -> Result<Json<DocumentDetail>, AppError> {
    let existing = fetch_document(&state, doc_id).await?;
    let role = check_membership(&state.db, existing.workspace_id, user.id).await?;

    if !can_modify_document(&existing, &user, role) {
        return Err(AppError::Forbidden);
    }

    if req.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(AppError::Validation("Document title cannot be empty".to_string()));
    }

    let query = format!(
        r#"
        UPDATE documents
        SET title = COALESCE($1, title),
            content = COALESCE($2, content),
            tags = COALESCE($3, tags),
            starred = COALESCE($4, starred),
            updated_at = NOW()
        WHERE id = $5
        RETURNING {DOCUMENT_COLUMNS}
        "#
    );
    let doc = sqlx::query_as::<_, Document>(&query)
        .bind(req.title.as_deref().map(str::trim))
        .bind(&req.content)
        .bind(req.tags.as_ref().map(normalize_tags))
        .bind(req.starred)
        .bind(doc_id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(populate_one(&state.db, doc).await?))
}

/// POST /api/documents/:id/star
pub async fn toggle_star(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(doc_id): Path<Uuid>,
) -> Result<Json<DocumentDetail>, AppError> {
    let existing = fetch_document(&state, doc_id).await?;
    let role = check_membership(&state.db, existing.workspace_id, user.id).await?;

    if !can_star_document(role) {
        return Err(AppError::Forbidden);
    }

    let query = format!(
        r#"
        UPDATE documents
        SET starred = NOT starred, updated_at = NOW()
        WHERE id = $1
        RETURNING {DOCUMENT_COLUMNS}
        "#
    );
    let doc = sqlx::query_as::<_, Document>(&query)
        .bind(doc_id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(populate_one(&state.db, doc).await?))
}

/// DELETE /api/documents/:id
pub async fn delete_document(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(doc_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let doc = fetch_document(&state, doc_id).await?;
    let role = check_membership(&state.db, doc.workspace_id, user.id).await?;

    if !can_modify_document(&doc, &user, role) {
        return Err(AppError::Forbidden);
    }

    sqlx::query("DELETE FROM documents WHERE id = $1")
        .bind(doc_id)
        .execute(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
