use async_trait::async_trait;
use chrono::Utc;
use std::{
    cmp::Reverse,
    collections::{BTreeSet, HashMap},
    sync::Arc,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ArticleQuery, FavoriteOutcome, FollowOutcome, Repository};
use crate::{
    error::{AppError, AppResult},
    models::{Article, Comment, IdentityRef, User},
    relationship::{self, Action},
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    articles: HashMap<Uuid, Article>,
    comments: HashMap<Uuid, Comment>,
}

/// InMemoryRepository
///
/// Process-local implementation of `Repository`, used when no `DATABASE_URL` is configured
/// locally and as the backing store for handler and API tests.
///
/// Every table sits behind one `RwLock`; compound operations run under a single write guard,
/// so readers never observe a half-applied transition.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(article: &Article, query: &ArticleQuery) -> bool {
    let tag_ok = query
        .tag
        .as_ref()
        .is_none_or(|tag| article.tag_list.contains(tag));
    let author_ok = query
        .author_ids
        .as_ref()
        .is_none_or(|ids| ids.contains(&article.author_id));
    let id_ok = query
        .article_ids
        .as_ref()
        .is_none_or(|ids| ids.contains(&article.id));
    tag_ok && author_ok && id_ok
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_users(&self, ids: &[Uuid]) -> AppResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.users.get(id).cloned())
            .collect())
    }

    async fn save_user(&self, user: User) -> AppResult<User> {
        let mut tables = self.tables.write().await;

        let taken = tables
            .users
            .values()
            .any(|u| u.username == user.username && u.id != user.id);
        if taken {
            return Err(AppError::Conflict("username is already taken".to_string()));
        }

        let saved = match tables.users.get_mut(&user.id) {
            Some(existing) => {
                existing.display_name = user.display_name;
                existing.password_hash = user.password_hash;
                existing.bio = user.bio;
                existing.image = user.image;
                existing.updated_at = Utc::now();
                existing.clone()
            }
            None => {
                tables.users.insert(user.id, user.clone());
                user
            }
        };
        Ok(saved)
    }

    async fn find_article(&self, id: Uuid) -> AppResult<Option<Article>> {
        Ok(self.tables.read().await.articles.get(&id).cloned())
    }

    async fn list_articles(&self, query: ArticleQuery) -> AppResult<Vec<Article>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Article> = tables
            .articles
            .values()
            .filter(|a| matches(a, &query))
            .cloned()
            .collect();
        found.sort_by_key(|a| (Reverse(a.created_at), a.id));

        Ok(found
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .collect())
    }

    async fn save_article(&self, article: Article) -> AppResult<Article> {
        let mut tables = self.tables.write().await;
        if tables.articles.contains_key(&article.id) {
            return Err(AppError::Conflict("article already exists".to_string()));
        }
        tables.articles.insert(article.id, article.clone());
        Ok(article)
    }

    async fn update_article(&self, article: Article) -> AppResult<Article> {
        let mut tables = self.tables.write().await;
        let existing = tables
            .articles
            .get_mut(&article.id)
            .ok_or(AppError::NotFound("article"))?;

        existing.title = article.title;
        existing.description = article.description;
        existing.body = article.body;
        existing.tag_list = article.tag_list;
        existing.updated_at = article.updated_at;
        Ok(existing.clone())
    }

    async fn delete_article(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.articles.remove(&id).is_none() {
            return Ok(false);
        }
        tables.comments.retain(|_, c| c.article_id != id);
        for user in tables.users.values_mut() {
            user.favorited_articles.retain(|a| *a != id);
        }
        Ok(true)
    }

    async fn distinct_tags(&self) -> AppResult<BTreeSet<String>> {
        let tables = self.tables.read().await;
        Ok(tables
            .articles
            .values()
            .flat_map(|a| a.tag_list.iter().cloned())
            .collect())
    }

    async fn find_comment(&self, id: Uuid) -> AppResult<Option<Comment>> {
        Ok(self.tables.read().await.comments.get(&id).cloned())
    }

    async fn comments_for_article(&self, article_id: Uuid) -> AppResult<Vec<Comment>> {
        let tables = self.tables.read().await;
        let Some(article) = tables.articles.get(&article_id) else {
            return Ok(Vec::new());
        };
        Ok(article
            .comments
            .iter()
            .filter_map(|id| tables.comments.get(id).cloned())
            .collect())
    }

    async fn save_comment(&self, comment: Comment) -> AppResult<Comment> {
        let mut tables = self.tables.write().await;
        if tables.comments.contains_key(&comment.id) {
            return Err(AppError::Conflict("comment already exists".to_string()));
        }

        let article = tables
            .articles
            .get_mut(&comment.article_id)
            .ok_or(AppError::NotFound("article"))?;
        article.attach_comment(comment.id);
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn update_comment(&self, comment: Comment) -> AppResult<Comment> {
        let mut tables = self.tables.write().await;
        let existing = tables
            .comments
            .get_mut(&comment.id)
            .ok_or(AppError::NotFound("comment"))?;

        existing.body = comment.body;
        existing.updated_at = comment.updated_at;
        Ok(existing.clone())
    }

    async fn delete_comment(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let Some(comment) = tables.comments.remove(&id) else {
            return Ok(false);
        };
        if let Some(article) = tables.articles.get_mut(&comment.article_id) {
            article.detach_comment(id);
        }
        Ok(true)
    }

    async fn favorite(
        &self,
        user: IdentityRef,
        article_id: Uuid,
        action: Action,
    ) -> AppResult<FavoriteOutcome> {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let user = tables
            .users
            .get_mut(&user.as_uuid())
            .ok_or(AppError::NotFound("user"))?;
        let article = tables
            .articles
            .get_mut(&article_id)
            .ok_or(AppError::NotFound("article"))?;

        let favorited = relationship::favorite(user, article, action);

        Ok(FavoriteOutcome {
            user: user.clone(),
            article: article.clone(),
            favorited,
        })
    }

    async fn follow(
        &self,
        subject: IdentityRef,
        target_id: Uuid,
        action: Action,
    ) -> AppResult<FollowOutcome> {
        let mut tables = self.tables.write().await;

        let target = tables
            .users
            .get(&target_id)
            .cloned()
            .ok_or(AppError::NotFound("user"))?;
        let subject = tables
            .users
            .get_mut(&subject.as_uuid())
            .ok_or(AppError::NotFound("user"))?;

        let following = relationship::follow(subject, &target, action)?;

        Ok(FollowOutcome {
            subject: subject.clone(),
            target,
            following,
        })
    }
}
