use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{article_view, article_views, current_user, viewer};
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult, ErrorBody},
    models::{
        Article, ArticleView, CreateArticleRequest, TagsView, UpdateArticleRequest, Validate,
    },
    ownership,
    relationship::Action,
    repository::{ArticleQuery, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE},
};

// --- Filter Structs ---

/// ArticleFilter
///
/// Query parameters for `GET /articles`.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct ArticleFilter {
    /// Only articles carrying this tag.
    pub tag: Option<String>,
    /// Only articles written by this username.
    pub author: Option<String>,
    /// Only articles favorited by this username.
    pub favorited: Option<String>,
    /// Page size (default 20, max 100).
    pub limit: Option<i64>,
    /// Number of articles to skip.
    pub offset: Option<i64>,
}

/// Pagination
///
/// Query parameters for `GET /articles/feed`.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    (
        limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        offset.unwrap_or(0).max(0),
    )
}

async fn find_article(state: &AppState, id: Uuid) -> AppResult<Article> {
    state
        .repo
        .find_article(id)
        .await?
        .ok_or(AppError::NotFound("article"))
}

/// list_articles
///
/// [Public Route] Newest-first listing with optional tag / author / favorited-by filters.
/// Filters naming an unknown user yield an empty list.
#[utoipa::path(
    get,
    path = "/articles",
    params(ArticleFilter),
    responses((status = 200, description = "Articles", body = [ArticleView]))
)]
pub async fn list_articles(
    auth: Option<AuthUser>,
    State(state): State<AppState>,
    Query(filter): Query<ArticleFilter>,
) -> AppResult<Json<Vec<ArticleView>>> {
    let viewer = viewer(&state.repo, auth.as_ref()).await?;
    let (limit, offset) = page(filter.limit, filter.offset);

    let mut query = ArticleQuery {
        tag: filter.tag,
        limit,
        offset,
        ..ArticleQuery::default()
    };

    if let Some(author) = filter.author {
        match state.repo.find_user_by_username(&author).await? {
            Some(user) => query.author_ids = Some(vec![user.id]),
            None => return Ok(Json(Vec::new())),
        }
    }
    if let Some(favorited_by) = filter.favorited {
        match state.repo.find_user_by_username(&favorited_by).await? {
            Some(user) => query.article_ids = Some(user.favorited_articles),
            None => return Ok(Json(Vec::new())),
        }
    }

    let articles = state.repo.list_articles(query).await?;
    Ok(Json(
        article_views(&state.repo, articles, viewer.as_ref()).await?,
    ))
}

/// feed_articles
///
/// [Authenticated Route] Articles written by users the caller follows, newest first.
#[utoipa::path(
    get,
    path = "/articles/feed",
    params(Pagination),
    responses((status = 200, description = "Feed", body = [ArticleView]))
)]
pub async fn feed_articles(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Vec<ArticleView>>> {
    let me = current_user(&state.repo, &auth).await?;
    if me.followed_users.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let (limit, offset) = page(pagination.limit, pagination.offset);
    let query = ArticleQuery {
        author_ids: Some(me.followed_users.clone()),
        limit,
        offset,
        ..ArticleQuery::default()
    };

    let articles = state.repo.list_articles(query).await?;
    Ok(Json(article_views(&state.repo, articles, Some(&me)).await?))
}

/// get_article
///
/// [Public Route] A single article by id.
#[utoipa::path(
    get,
    path = "/articles/{id}",
    params(("id" = Uuid, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Found", body = ArticleView),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_article(
    auth: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ArticleView>> {
    let viewer = viewer(&state.repo, auth.as_ref()).await?;
    let article = find_article(&state, id).await?;
    Ok(Json(
        article_view(&state.repo, article, viewer.as_ref()).await?,
    ))
}

/// create_article
///
/// [Authenticated Route] Publishes an article authored by the caller.
#[utoipa::path(
    post,
    path = "/articles",
    request_body = CreateArticleRequest,
    responses(
        (status = 201, description = "Created", body = ArticleView),
        (status = 400, description = "Invalid input", body = ErrorBody)
    )
)]
pub async fn create_article(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateArticleRequest>,
) -> AppResult<(StatusCode, Json<ArticleView>)> {
    payload.validate()?;
    let me = current_user(&state.repo, &auth).await?;

    let article = state
        .repo
        .save_article(Article::new(auth.identity, payload))
        .await?;

    tracing::info!(article_id = %article.id, author_id = %me.id, "article created");
    let view = article_view(&state.repo, article, Some(&me)).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// update_article
///
/// [Authenticated Route] Partial update, author only.
#[utoipa::path(
    put,
    path = "/articles/{id}",
    params(("id" = Uuid, Path, description = "Article ID")),
    request_body = UpdateArticleRequest,
    responses(
        (status = 200, description = "Updated", body = ArticleView),
        (status = 403, description = "Not Owner", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn update_article(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateArticleRequest>,
) -> AppResult<Json<ArticleView>> {
    payload.validate()?;
    let me = current_user(&state.repo, &auth).await?;

    let mut article = find_article(&state, id).await?;
    ownership::assert_owner(&article, auth.identity).inspect_err(|_| {
        tracing::warn!(article_id = %id, user_id = %me.id, "article update refused");
    })?;

    article.apply_update(payload);
    let article = state.repo.update_article(article).await?;

    tracing::info!(article_id = %article.id, "article updated");
    Ok(Json(article_view(&state.repo, article, Some(&me)).await?))
}

/// delete_article
///
/// [Authenticated Route] Removes an article with its comments, author only.
#[utoipa::path(
    delete,
    path = "/articles/{id}",
    params(("id" = Uuid, Path, description = "Article ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not Owner", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_article(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let article = find_article(&state, id).await?;
    ownership::assert_owner(&article, auth.identity).inspect_err(|_| {
        tracing::warn!(article_id = %id, user_id = %auth.identity.as_uuid(), "article delete refused");
    })?;

    // A concurrent delete by the same author may win the race.
    if !state.repo.delete_article(id).await? {
        return Err(AppError::NotFound("article"));
    }

    tracing::info!(article_id = %id, "article deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn change_favorite(
    auth: AuthUser,
    state: AppState,
    id: Uuid,
    action: Action,
) -> AppResult<Json<ArticleView>> {
    let outcome = state.repo.favorite(auth.identity, id, action).await?;

    tracing::info!(
        article_id = %id,
        user_id = %outcome.user.id,
        favorited = outcome.favorited,
        favorites_count = outcome.article.favorites_count,
        "favorite state changed"
    );
    let view = article_view(&state.repo, outcome.article, Some(&outcome.user)).await?;
    Ok(Json(view))
}

/// favorite_article
///
/// [Authenticated Route] Toggles the caller's favorite on an article. Calling it twice returns
/// both membership and `favoritesCount` to where they started.
#[utoipa::path(
    post,
    path = "/articles/{id}/favorite",
    params(("id" = Uuid, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Toggled", body = ArticleView),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn favorite_article(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ArticleView>> {
    change_favorite(auth, state, id, Action::Toggle).await
}

/// unfavorite_article
///
/// [Authenticated Route] Ensures the article is not in the caller's favorites.
#[utoipa::path(
    delete,
    path = "/articles/{id}/favorite",
    params(("id" = Uuid, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Not favorited", body = ArticleView),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn unfavorite_article(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ArticleView>> {
    change_favorite(auth, state, id, Action::Remove).await
}

/// list_tags
///
/// [Public Route] Every tag used by any article, deduplicated and sorted.
#[utoipa::path(
    get,
    path = "/tags",
    responses((status = 200, description = "Tags", body = TagsView))
)]
pub async fn list_tags(State(state): State<AppState>) -> AppResult<Json<TagsView>> {
    let tags = state.repo.distinct_tags().await?;
    Ok(Json(TagsView {
        tags: tags.into_iter().collect(),
    }))
}
