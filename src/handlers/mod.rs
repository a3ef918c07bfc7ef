//! Request handlers, one module per resource.
//!
//! Every mutating handler follows the same order: validate the input schema, load the target
//! (NotFound), run the ownership guard (Forbidden), then hand the change to the repository.

use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{Article, ArticleView, Comment, CommentView, User},
    repository::RepositoryState,
};

pub mod articles;
pub mod comments;
pub mod profiles;
pub mod users;

/// Loads the full record of an authenticated caller. A token whose user has vanished is refused.
pub(crate) async fn current_user(repo: &RepositoryState, auth: &AuthUser) -> AppResult<User> {
    repo.find_user(auth.identity.as_uuid())
        .await?
        .ok_or(AppError::Unauthorized)
}

/// Loads the viewer record for endpoints that also serve anonymous callers.
pub(crate) async fn viewer(
    repo: &RepositoryState,
    auth: Option<&AuthUser>,
) -> AppResult<Option<User>> {
    match auth {
        Some(auth) => current_user(repo, auth).await.map(Some),
        None => Ok(None),
    }
}

/// Fetches every distinct author in one round trip.
async fn authors(repo: &RepositoryState, ids: Vec<Uuid>) -> AppResult<HashMap<Uuid, User>> {
    let mut ids = ids;
    ids.sort_unstable();
    ids.dedup();
    let users = repo.find_users(&ids).await?;
    Ok(users.into_iter().map(|u| (u.id, u)).collect())
}

fn missing_author(id: Uuid) -> AppError {
    AppError::Internal(format!("author {id} of an existing record is missing"))
}

pub(crate) async fn article_views(
    repo: &RepositoryState,
    articles: Vec<Article>,
    viewer: Option<&User>,
) -> AppResult<Vec<ArticleView>> {
    let authors = authors(repo, articles.iter().map(|a| a.author_id).collect()).await?;
    articles
        .into_iter()
        .map(|article| {
            let author = authors
                .get(&article.author_id)
                .ok_or_else(|| missing_author(article.author_id))?;
            Ok(ArticleView::of(article, author, viewer))
        })
        .collect()
}

pub(crate) async fn article_view(
    repo: &RepositoryState,
    article: Article,
    viewer: Option<&User>,
) -> AppResult<ArticleView> {
    let mut views = article_views(repo, vec![article], viewer).await?;
    views
        .pop()
        .ok_or_else(|| AppError::Internal("article view was not built".to_string()))
}

pub(crate) async fn comment_views(
    repo: &RepositoryState,
    comments: Vec<Comment>,
    viewer: Option<&User>,
) -> AppResult<Vec<CommentView>> {
    let authors = authors(repo, comments.iter().map(|c| c.author_id).collect()).await?;
    comments
        .into_iter()
        .map(|comment| {
            let author = authors
                .get(&comment.author_id)
                .ok_or_else(|| missing_author(comment.author_id))?;
            Ok(CommentView::of(comment, author, viewer))
        })
        .collect()
}
