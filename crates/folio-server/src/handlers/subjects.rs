use axum::{
    extract::{Path, State},
    Json,
};
use folio_shared::Subject;
use uuid::Uuid;

use crate::error::AppError;
use crate::routes::AppState;

/// GET /api/v1/subjects
pub async fn list_subjects(State(state): State<AppState>) -> Result<Json<Vec<Subject>>, AppError> {
    let subjects: Vec<Subject> = sqlx::query_as(
        "SELECT id, owner_id, title, collaborators, created_at
         FROM subjects
         ORDER BY created_at ASC",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(subjects))
}

/// GET /api/v1/subjects/:id
pub async fn get_subject(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Subject>, AppError> {
    let subject: Option<Subject> = sqlx::query_as(
        "SELECT id, owner_id, title, collaborators, created_at
         FROM subjects
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&state.db)
    .await?;

    subject.map(Json).ok_or(AppError::NotFound)
}
