use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use folio_shared::{
    api::{CreateCommentRequest, UpdateCommentRequest},
    Comment, Subject,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::routes::AppState;

/// Helper to load the subject a thread hangs off of
async fn load_subject(state: &AppState, subject_id: Uuid) -> Result<Subject, AppError> {
    let subject: Option<Subject> = sqlx::query_as(
        "SELECT id, owner_id, title, collaborators, created_at FROM subjects WHERE id = $1",
    )
    .bind(subject_id)
    .fetch_optional(&state.db)
    .await?;

    subject.ok_or(AppError::NotFound)
}

/// Full comment list for a subject, in thread order. Also used by the
/// feed endpoint and after every mutation.
pub(crate) async fn fetch_thread(
    state: &AppState,
    subject_id: Uuid,
) -> Result<Vec<Comment>, AppError> {
    let comments: Vec<Comment> = sqlx::query_as(
        r#"
        SELECT id, subject_id, parent_id, author_id, author_display_name,
               author_avatar_url, text, created_at, edited_at
        FROM comments
        WHERE subject_id = $1
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(subject_id)
    .fetch_all(&state.db)
    .await?;

    Ok(comments)
}

async fn publish_thread(state: &AppState, subject_id: Uuid) -> Result<(), AppError> {
    let comments = fetch_thread(state, subject_id).await?;
    state.feeds.publish(subject_id, comments).await;
    Ok(())
}

/// GET /api/v1/subjects/:id/comments
pub async fn list_comments(
    State(state): State<AppState>,
    Path(subject_id): Path<Uuid>,
) -> Result<Json<Vec<Comment>>, AppError> {
    load_subject(&state, subject_id).await?;

    let comments = fetch_thread(&state, subject_id).await?;
    Ok(Json(comments))
}

/// POST /api/v1/subjects/:id/comments
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(subject_id): Path<Uuid>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<Json<Comment>, AppError> {
    load_subject(&state, subject_id).await?;

    if req.text.trim().is_empty() {
        return Err(AppError::Validation("Comment text is required".to_string()));
    }

    // Replies must point at a live comment under the same subject
    if let Some(parent_id) = req.parent_id {
        let parent: Option<(Uuid,)> =
            sqlx::query_as("SELECT subject_id FROM comments WHERE id = $1")
                .bind(parent_id)
                .fetch_optional(&state.db)
                .await?;

        let Some((parent_subject_id,)) = parent else {
            return Err(AppError::NotFound);
        };
        if parent_subject_id != subject_id {
            return Err(AppError::Validation(
                "Parent comment belongs to a different subject".to_string(),
            ));
        }
    }

    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO comments (id, subject_id, parent_id, author_id, author_display_name,
                              author_avatar_url, text, created_at, edited_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NULL)
        "#,
    )
    .bind(id)
    .bind(subject_id)
    .bind(req.parent_id)
    .bind(user.id)
    .bind(&user.display_name)
    .bind(&user.avatar_url)
    .bind(&req.text)
    .bind(now)
    .execute(&state.db)
    .await?;

    publish_thread(&state, subject_id).await?;

    Ok(Json(Comment {
        id,
        subject_id,
        parent_id: req.parent_id,
        author_id: user.id,
        author_display_name: user.display_name,
        author_avatar_url: user.avatar_url,
        text: req.text,
        created_at: now,
        edited_at: None,
    }))
}

/// PATCH /api/v1/subjects/:id/comments/:comment_id
pub async fn update_comment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((subject_id, comment_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateCommentRequest>,
) -> Result<Json<Comment>, AppError> {
    load_subject(&state, subject_id).await?;

    if req.text.trim().is_empty() {
        return Err(AppError::Validation("Comment text is required".to_string()));
    }

    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT author_id FROM comments WHERE id = $1 AND subject_id = $2")
            .bind(comment_id)
            .bind(subject_id)
            .fetch_optional(&state.db)
            .await?;

    let Some((author_id,)) = existing else {
        return Err(AppError::NotFound);
    };

    // Only the author may edit; ownership of the subject grants no edit rights
    if author_id != user.id {
        return Err(AppError::Forbidden);
    }

    let now = Utc::now();

    sqlx::query("UPDATE comments SET text = $1, edited_at = $2 WHERE id = $3")
        .bind(&req.text)
        .bind(now)
        .bind(comment_id)
        .execute(&state.db)
        .await?;

    let comment: Comment = sqlx::query_as(
        r#"
        SELECT id, subject_id, parent_id, author_id, author_display_name,
               author_avatar_url, text, created_at, edited_at
        FROM comments
        WHERE id = $1
        "#,
    )
    .bind(comment_id)
    .fetch_one(&state.db)
    .await?;

    publish_thread(&state, subject_id).await?;

    Ok(Json(comment))
}

/// DELETE /api/v1/subjects/:id/comments/:comment_id
///
/// Deletes exactly one comment. Replies under it are untouched;
/// clients walk the subtree and delete bottom-up.
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((subject_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<(), AppError> {
    let subject = load_subject(&state, subject_id).await?;

    let comment: Option<(Uuid,)> =
        sqlx::query_as("SELECT author_id FROM comments WHERE id = $1 AND subject_id = $2")
            .bind(comment_id)
            .bind(subject_id)
            .fetch_optional(&state.db)
            .await?;

    let Some((author_id,)) = comment else {
        return Err(AppError::NotFound);
    };

    // Author or subject owner can delete
    if author_id != user.id && !subject.can_moderate(user.id) {
        return Err(AppError::Forbidden);
    }

    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(comment_id)
        .execute(&state.db)
        .await?;

    publish_thread(&state, subject_id).await?;

    Ok(())
}
