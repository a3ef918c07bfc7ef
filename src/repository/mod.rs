use async_trait::async_trait;
use std::{collections::BTreeSet, sync::Arc};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Article, Comment, IdentityRef, User},
    relationship::Action,
};

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// Default and maximum page sizes for article listings.
pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// ArticleQuery
///
/// Backend-neutral listing filter. Handlers resolve usernames to ids before building one.
/// All present filters must match; results are ordered newest first.
#[derive(Debug, Clone)]
pub struct ArticleQuery {
    pub tag: Option<String>,
    // Restrict to articles written by one of these users.
    pub author_ids: Option<Vec<Uuid>>,
    // Restrict to these article ids (e.g. someone's favorited set).
    pub article_ids: Option<Vec<Uuid>>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ArticleQuery {
    fn default() -> Self {
        Self {
            tag: None,
            author_ids: None,
            article_ids: None,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

/// FavoriteOutcome
///
/// Both records exactly as committed by a favorite transition.
#[derive(Debug, Clone)]
pub struct FavoriteOutcome {
    pub user: User,
    pub article: Article,
    pub favorited: bool,
}

/// FollowOutcome
///
/// The follower as committed, plus the (unchanged) followed user.
#[derive(Debug, Clone)]
pub struct FollowOutcome {
    pub subject: User,
    pub target: User,
    pub following: bool,
}

/// Repository Trait
///
/// The identity and content stores. This is the only layer allowed to persist anything.
///
/// `save_user` is an upsert that only writes caller-editable columns. Articles and comments split
/// creation (`save_*`) from editing (`update_*`); an update never inserts, so a copy loaded before
/// a concurrent delete cannot bring the record back. None of these touch relationship sets,
/// `favorites_count` or the comment sequence. Those change only through the compound methods
/// (`favorite`, `follow`, `save_comment`, `delete_comment`, `delete_article`), each of which
/// commits all affected records atomically and serializes against concurrent writers.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Identity Store ---
    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>>;
    // Lookup by the unique, immutable username key.
    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>>;
    // Missing ids are skipped; order is unspecified.
    async fn find_users(&self, ids: &[Uuid]) -> AppResult<Vec<User>>;
    // Insert, or update display name, bio, image and password hash. Duplicate username -> Conflict.
    async fn save_user(&self, user: User) -> AppResult<User>;

    // --- Content Store: Articles ---
    async fn find_article(&self, id: Uuid) -> AppResult<Option<Article>>;
    async fn list_articles(&self, query: ArticleQuery) -> AppResult<Vec<Article>>;
    // Insert a new article. An id that already exists -> Conflict.
    async fn save_article(&self, article: Article) -> AppResult<Article>;
    /// Writes title, description, body, tag list and `updated_at` onto the existing row.
    /// NotFound when the article no longer exists.
    async fn update_article(&self, article: Article) -> AppResult<Article>;
    /// Deletes the article, its comments, and its id from every favorited set.
    /// Returns false when no such article existed.
    async fn delete_article(&self, id: Uuid) -> AppResult<bool>;
    /// Union of all articles' tags.
    async fn distinct_tags(&self) -> AppResult<BTreeSet<String>>;

    // --- Content Store: Comments ---
    async fn find_comment(&self, id: Uuid) -> AppResult<Option<Comment>>;
    // In the parent article's comment-sequence order.
    async fn comments_for_article(&self, article_id: Uuid) -> AppResult<Vec<Comment>>;
    /// Inserts the comment and attaches its id to the parent article.
    /// A missing article fails with NotFound.
    async fn save_comment(&self, comment: Comment) -> AppResult<Comment>;
    // Writes body and `updated_at`. NotFound when the comment no longer exists.
    async fn update_comment(&self, comment: Comment) -> AppResult<Comment>;
    /// Deletes the comment and detaches exactly one id from its parent. False when absent.
    async fn delete_comment(&self, id: Uuid) -> AppResult<bool>;

    // --- Relationships ---
    /// Applies `action` to the user's favorited set and the article's counter as one transition.
    /// NotFound (user or article) leaves both records untouched.
    async fn favorite(
        &self,
        user: IdentityRef,
        article_id: Uuid,
        action: Action,
    ) -> AppResult<FavoriteOutcome>;
    /// Applies `action` to the subject's followed set. Self-follow fails with InvalidOperation.
    async fn follow(
        &self,
        subject: IdentityRef,
        target_id: Uuid,
        action: Action,
    ) -> AppResult<FollowOutcome>;
}

/// RepositoryState
///
/// The explicit store handle shared through `AppState`.
pub type RepositoryState = Arc<dyn Repository>;
