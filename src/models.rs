use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

// --- Identity ---

/// IdentityRef
///
/// Opaque, stable reference to one user record. Produced once by the identity resolver
/// (`AuthUser`) and threaded explicitly into every guarded call. Ownership and relationship
/// checks compare these values, never usernames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityRef(Uuid);

impl IdentityRef {
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for IdentityRef {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

// --- Core Records (Mapped to Database) ---

/// User
///
/// Canonical identity record from the `users` table. The two relationship sets are
/// stored as UUID arrays and are only ever changed through the relationship engine.
#[derive(Debug, Clone, FromRow, Default, PartialEq)]
pub struct User {
    pub id: Uuid,
    // Unique and immutable after registration.
    pub username: String,
    pub display_name: String,
    pub password_hash: String,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub favorited_articles: Vec<Uuid>,
    // Never contains `id`.
    pub followed_users: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Builds a fresh record for registration. Relationship sets start empty.
    pub fn new(username: String, display_name: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username,
            display_name,
            password_hash,
            bio: None,
            image: None,
            favorited_articles: Vec::new(),
            followed_users: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn identity(&self) -> IdentityRef {
        IdentityRef(self.id)
    }

    pub fn has_favorited(&self, article_id: Uuid) -> bool {
        self.favorited_articles.contains(&article_id)
    }

    pub fn follows(&self, user_id: Uuid) -> bool {
        self.followed_users.contains(&user_id)
    }
}

/// Article
///
/// Row from the `articles` table. `favorites_count` is a denormalized cache of how many
/// users hold this id in their favorited set; `comments` keeps comment ids in posting order.
#[derive(Debug, Clone, FromRow, Default, PartialEq)]
pub struct Article {
    pub id: Uuid,
    // Owning user. Immutable after creation.
    pub author_id: Uuid,
    pub title: String,
    pub description: String,
    pub body: String,
    // Kept exactly as authored, duplicates included.
    pub tag_list: Vec<String>,
    pub favorites_count: i64,
    pub comments: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    pub fn new(author: IdentityRef, req: CreateArticleRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            author_id: author.as_uuid(),
            title: req.title,
            description: req.description,
            body: req.body,
            tag_list: req.tag_list,
            favorites_count: 0,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn attach_comment(&mut self, comment_id: Uuid) {
        self.comments.push(comment_id);
    }

    /// Removes exactly one occurrence of `comment_id`. Returns false when it was not attached.
    pub fn detach_comment(&mut self, comment_id: Uuid) -> bool {
        match self.comments.iter().position(|id| *id == comment_id) {
            Some(index) => {
                self.comments.remove(index);
                true
            }
            None => false,
        }
    }

    /// Applies the provided fields of a partial update. Author, counter and comments are untouched.
    pub fn apply_update(&mut self, req: UpdateArticleRequest) {
        if let Some(title) = req.title {
            self.title = title;
        }
        if let Some(description) = req.description {
            self.description = description;
        }
        if let Some(body) = req.body {
            self.body = body;
        }
        if let Some(tag_list) = req.tag_list {
            self.tag_list = tag_list;
        }
        self.updated_at = Utc::now();
    }
}

/// Comment
///
/// Row from the `comments` table. Both references are immutable.
#[derive(Debug, Clone, FromRow, Default, PartialEq)]
pub struct Comment {
    pub id: Uuid,
    pub article_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(article_id: Uuid, author: IdentityRef, body: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            article_id,
            author_id: author.as_uuid(),
            body,
            created_at: now,
            updated_at: now,
        }
    }
}

// --- Request Payloads (Input Schemas) ---

/// Validate
///
/// Explicit schema check run by every mutating handler before it touches a repository.
pub trait Validate {
    fn validate(&self) -> Result<(), AppError>;
}

/// Collects field problems so a request reports all of them at once.
#[derive(Debug, Default)]
struct FieldErrors(Vec<String>);

impl FieldErrors {
    fn require(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.0.push(format!("{} must not be blank", field));
        }
    }

    fn require_if_present(&mut self, field: &str, value: Option<&String>) {
        if let Some(value) = value {
            self.require(field, value);
        }
    }

    fn finish(self) -> Result<(), AppError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(AppError::InvalidInput(self.0.join("; ")))
        }
    }
}

/// RegisterUserRequest
///
/// Input payload for `POST /users`. Missing fields deserialize as empty strings so that
/// validation, not the JSON extractor, reports them.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(default, rename_all = "camelCase")]
#[ts(export)]
pub struct RegisterUserRequest {
    pub username: String,
    pub password: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
}

impl Validate for RegisterUserRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::default();
        errors.require("username", &self.username);
        if self.username.chars().any(|c| c.is_whitespace() || c == '/') {
            errors.0.push("username must not contain whitespace or '/'".to_string());
        }
        errors.require("password", &self.password);
        errors.finish()
    }
}

/// LoginRequest
///
/// Input payload for `POST /users/login`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(default)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::default();
        errors.require("username", &self.username);
        errors.require("password", &self.password);
        errors.finish()
    }
}

/// UpdateUserRequest
///
/// Partial update for `PUT /user`. Only `Some` fields are written.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Validate for UpdateUserRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::default();
        errors.require_if_present("displayName", self.display_name.as_ref());
        errors.require_if_present("password", self.password.as_ref());
        errors.finish()
    }
}

/// CreateArticleRequest
///
/// Input payload for `POST /articles`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(default, rename_all = "camelCase")]
#[ts(export)]
pub struct CreateArticleRequest {
    pub title: String,
    pub description: String,
    pub body: String,
    pub tag_list: Vec<String>,
}

impl Validate for CreateArticleRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::default();
        errors.require("title", &self.title);
        errors.require("description", &self.description);
        errors.require("body", &self.body);
        errors.finish()
    }
}

/// UpdateArticleRequest
///
/// Partial update for `PUT /articles/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateArticleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_list: Option<Vec<String>>,
}

impl Validate for UpdateArticleRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::default();
        errors.require_if_present("title", self.title.as_ref());
        errors.require_if_present("description", self.description.as_ref());
        errors.require_if_present("body", self.body.as_ref());
        errors.finish()
    }
}

/// CommentRequest
///
/// Input payload for posting (`POST /articles/{id}/comments`) and editing (`PUT /comments/{id}`) a comment.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(default)]
#[ts(export)]
pub struct CommentRequest {
    pub body: String,
}

impl Validate for CommentRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::default();
        errors.require("body", &self.body);
        errors.finish()
    }
}

// --- Response Views (Output) ---

/// ProfileView
///
/// Public face of a user, with `following` computed relative to the viewer.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProfileView {
    pub username: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub following: bool,
}

impl ProfileView {
    pub fn of(user: &User, viewer: Option<&User>) -> Self {
        Self {
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            bio: user.bio.clone(),
            image: user.image.clone(),
            following: viewer.is_some_and(|v| v.follows(user.id)),
        }
    }
}

/// UserView
///
/// The caller's own account. `token` is only present on register and login responses.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl UserView {
    pub fn of(user: &User, token: Option<String>) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            bio: user.bio.clone(),
            image: user.image.clone(),
            token,
        }
    }
}

/// ArticleView
///
/// Article enriched with its author's profile and the viewer's favorite state.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ArticleView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub body: String,
    pub tag_list: Vec<String>,
    pub author: ProfileView,
    pub favorited: bool,
    pub favorites_count: i64,
    pub comments: Vec<Uuid>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl ArticleView {
    pub fn of(article: Article, author: &User, viewer: Option<&User>) -> Self {
        Self {
            favorited: viewer.is_some_and(|v| v.has_favorited(article.id)),
            author: ProfileView::of(author, viewer),
            id: article.id,
            title: article.title,
            description: article.description,
            body: article.body,
            tag_list: article.tag_list,
            favorites_count: article.favorites_count,
            comments: article.comments,
            created_at: article.created_at,
            updated_at: article.updated_at,
        }
    }
}

/// CommentView
///
/// Comment enriched with its author's profile.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CommentView {
    pub id: Uuid,
    pub article_id: Uuid,
    pub body: String,
    pub author: ProfileView,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl CommentView {
    pub fn of(comment: Comment, author: &User, viewer: Option<&User>) -> Self {
        Self {
            id: comment.id,
            article_id: comment.article_id,
            body: comment.body,
            author: ProfileView::of(author, viewer),
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

/// TagsView
///
/// Output of `GET /tags`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct TagsView {
    pub tags: Vec<String>,
}
