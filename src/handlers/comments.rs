use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use super::{comment_views, current_user, viewer};
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult, ErrorBody},
    models::{Comment, CommentRequest, CommentView, User, Validate},
    ownership,
};

async fn find_comment(state: &AppState, id: Uuid) -> AppResult<Comment> {
    state
        .repo
        .find_comment(id)
        .await?
        .ok_or(AppError::NotFound("comment"))
}

async fn single_view(state: &AppState, comment: Comment, viewer: &User) -> AppResult<CommentView> {
    comment_views(&state.repo, vec![comment], Some(viewer))
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("comment view was not built".to_string()))
}

/// list_comments
///
/// [Public Route] Comments on an article in posting order.
#[utoipa::path(
    get,
    path = "/articles/{id}/comments",
    params(("id" = Uuid, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Comments", body = [CommentView]),
        (status = 404, description = "Unknown article", body = ErrorBody)
    )
)]
pub async fn list_comments(
    auth: Option<AuthUser>,
    State(state): State<AppState>,
    Path(article_id): Path<Uuid>,
) -> AppResult<Json<Vec<CommentView>>> {
    let viewer = viewer(&state.repo, auth.as_ref()).await?;
    if state.repo.find_article(article_id).await?.is_none() {
        return Err(AppError::NotFound("article"));
    }

    let comments = state.repo.comments_for_article(article_id).await?;
    Ok(Json(
        comment_views(&state.repo, comments, viewer.as_ref()).await?,
    ))
}

/// add_comment
///
/// [Authenticated Route] Appends a comment by the caller to the article's comment sequence.
#[utoipa::path(
    post,
    path = "/articles/{id}/comments",
    params(("id" = Uuid, Path, description = "Article ID")),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Created", body = CommentView),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 404, description = "Unknown article", body = ErrorBody)
    )
)]
pub async fn add_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(article_id): Path<Uuid>,
    Json(payload): Json<CommentRequest>,
) -> AppResult<(StatusCode, Json<CommentView>)> {
    payload.validate()?;
    let me = current_user(&state.repo, &auth).await?;

    let comment = state
        .repo
        .save_comment(Comment::new(article_id, auth.identity, payload.body))
        .await?;

    tracing::info!(comment_id = %comment.id, article_id = %article_id, "comment added");
    let view = single_view(&state, comment, &me).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// update_comment
///
/// [Authenticated Route] Replaces the body of a comment. Only the comment's own author may do
/// this; authoring the parent article grants nothing.
#[utoipa::path(
    put,
    path = "/comments/{id}",
    params(("id" = Uuid, Path, description = "Comment ID")),
    request_body = CommentRequest,
    responses(
        (status = 200, description = "Updated", body = CommentView),
        (status = 403, description = "Not Owner", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn update_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CommentRequest>,
) -> AppResult<Json<CommentView>> {
    payload.validate()?;
    let me = current_user(&state.repo, &auth).await?;

    let mut comment = find_comment(&state, id).await?;
    ownership::assert_owner(&comment, auth.identity).inspect_err(|_| {
        tracing::warn!(comment_id = %id, user_id = %me.id, "comment update refused");
    })?;

    comment.body = payload.body;
    comment.updated_at = Utc::now();
    let comment = state.repo.update_comment(comment).await?;

    tracing::info!(comment_id = %id, "comment updated");
    Ok(Json(single_view(&state, comment, &me).await?))
}

/// delete_comment
///
/// [Authenticated Route] Removes a comment and detaches it from its article. Comment author only.
#[utoipa::path(
    delete,
    path = "/comments/{id}",
    params(("id" = Uuid, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not Owner", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let comment = find_comment(&state, id).await?;
    ownership::assert_owner(&comment, auth.identity).inspect_err(|_| {
        tracing::warn!(comment_id = %id, user_id = %auth.identity.as_uuid(), "comment delete refused");
    })?;

    if !state.repo.delete_comment(id).await? {
        return Err(AppError::NotFound("comment"));
    }

    tracing::info!(comment_id = %id, article_id = %comment.article_id, "comment deleted");
    Ok(StatusCode::NO_CONTENT)
}
