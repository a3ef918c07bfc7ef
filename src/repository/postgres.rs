use async_trait::async_trait;
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::{ArticleQuery, FavoriteOutcome, FollowOutcome, Repository};
use crate::{
    error::{AppError, AppResult},
    models::{Article, Comment, IdentityRef, User},
    relationship::{self, Action},
};

const SELECT_USER: &str = r#"
    SELECT id, username, display_name, password_hash, bio, image,
           favorited_articles, followed_users, created_at, updated_at
    FROM users"#;

const SELECT_ARTICLE: &str = r#"
    SELECT id, author_id, title, description, body, tag_list,
           favorites_count, comments, created_at, updated_at
    FROM articles"#;

const SELECT_COMMENT: &str = r#"
    SELECT id, article_id, author_id, body, created_at, updated_at
    FROM comments"#;

/// PostgresRepository
///
/// The concrete implementation of `Repository`, backed by PostgreSQL.
///
/// Two-record transitions run inside one transaction with `FOR UPDATE` row locks. Locks are
/// always taken articles -> comments -> users, so concurrent transitions queue instead of
/// deadlocking, and dropping an uncommitted transaction rolls everything back.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let sql = format!("{SELECT_USER} WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let sql = format!("{SELECT_USER} WHERE username = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_users(&self, ids: &[Uuid]) -> AppResult<Vec<User>> {
        let sql = format!("{SELECT_USER} WHERE id = ANY($1)");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?)
    }

    /// save_user
    ///
    /// Upsert keyed on `id`. The conflict branch never touches `username` or the relationship
    /// arrays. A duplicate username surfaces as a unique violation, i.e. `Conflict`.
    async fn save_user(&self, user: User) -> AppResult<User> {
        let saved = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, display_name, password_hash, bio, image,
                               favorited_articles, followed_users, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE
            SET display_name = EXCLUDED.display_name,
                password_hash = EXCLUDED.password_hash,
                bio = EXCLUDED.bio,
                image = EXCLUDED.image,
                updated_at = NOW()
            RETURNING id, username, display_name, password_hash, bio, image,
                      favorited_articles, followed_users, created_at, updated_at
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.display_name)
        .bind(&user.password_hash)
        .bind(&user.bio)
        .bind(&user.image)
        .bind(&user.favorited_articles)
        .bind(&user.followed_users)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }

    async fn find_article(&self, id: Uuid) -> AppResult<Option<Article>> {
        let sql = format!("{SELECT_ARTICLE} WHERE id = $1");
        Ok(sqlx::query_as::<_, Article>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// list_articles
    ///
    /// Builds the filter with `QueryBuilder` so every user-supplied value is a bound parameter.
    async fn list_articles(&self, query: ArticleQuery) -> AppResult<Vec<Article>> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(SELECT_ARTICLE);
        builder.push(" WHERE TRUE");

        if let Some(tag) = query.tag {
            builder.push(" AND ");
            builder.push_bind(tag);
            builder.push(" = ANY(tag_list)");
        }
        if let Some(author_ids) = query.author_ids {
            builder.push(" AND author_id = ANY(");
            builder.push_bind(author_ids);
            builder.push(")");
        }
        if let Some(article_ids) = query.article_ids {
            builder.push(" AND id = ANY(");
            builder.push_bind(article_ids);
            builder.push(")");
        }

        builder.push(" ORDER BY created_at DESC, id LIMIT ");
        builder.push_bind(query.limit);
        builder.push(" OFFSET ");
        builder.push_bind(query.offset);

        Ok(builder
            .build_query_as::<Article>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn save_article(&self, article: Article) -> AppResult<Article> {
        let saved = sqlx::query_as::<_, Article>(
            r#"
            INSERT INTO articles (id, author_id, title, description, body, tag_list,
                                  favorites_count, comments, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, author_id, title, description, body, tag_list,
                      favorites_count, comments, created_at, updated_at
            "#,
        )
        .bind(article.id)
        .bind(article.author_id)
        .bind(&article.title)
        .bind(&article.description)
        .bind(&article.body)
        .bind(&article.tag_list)
        .bind(article.favorites_count)
        .bind(&article.comments)
        .bind(article.created_at)
        .bind(article.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }

    /// update_article
    ///
    /// Plain `UPDATE`; a row deleted since the caller loaded it yields NotFound, never an insert.
    async fn update_article(&self, article: Article) -> AppResult<Article> {
        sqlx::query_as::<_, Article>(
            r#"
            UPDATE articles
            SET title = $2, description = $3, body = $4, tag_list = $5, updated_at = $6
            WHERE id = $1
            RETURNING id, author_id, title, description, body, tag_list,
                      favorites_count, comments, created_at, updated_at
            "#,
        )
        .bind(article.id)
        .bind(&article.title)
        .bind(&article.description)
        .bind(&article.body)
        .bind(&article.tag_list)
        .bind(article.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("article"))
    }

    /// delete_article
    ///
    /// Locks the article row first. A `favorite` already holding it finishes before the
    /// favorited sets are scrubbed; one arriving later finds the row gone.
    async fn delete_article(&self, id: Uuid) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let lock_article = format!("{SELECT_ARTICLE} WHERE id = $1 FOR UPDATE");
        let locked = sqlx::query_as::<_, Article>(&lock_article)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Ok(false);
        }

        sqlx::query("DELETE FROM comments WHERE article_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE users SET favorited_articles = array_remove(favorited_articles, $1) \
             WHERE $1 = ANY(favorited_articles)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn distinct_tags(&self) -> AppResult<BTreeSet<String>> {
        let tags = sqlx::query_scalar::<_, String>("SELECT DISTINCT unnest(tag_list) FROM articles")
            .fetch_all(&self.pool)
            .await?;
        Ok(tags.into_iter().collect())
    }

    async fn find_comment(&self, id: Uuid) -> AppResult<Option<Comment>> {
        let sql = format!("{SELECT_COMMENT} WHERE id = $1");
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn comments_for_article(&self, article_id: Uuid) -> AppResult<Vec<Comment>> {
        Ok(sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.article_id, c.author_id, c.body, c.created_at, c.updated_at
            FROM articles a
            CROSS JOIN LATERAL unnest(a.comments) WITH ORDINALITY AS seq(comment_id, ord)
            JOIN comments c ON c.id = seq.comment_id
            WHERE a.id = $1
            ORDER BY seq.ord
            "#,
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn save_comment(&self, comment: Comment) -> AppResult<Comment> {
        let mut tx = self.pool.begin().await?;

        let lock_article = format!("{SELECT_ARTICLE} WHERE id = $1 FOR UPDATE");
        let mut article = sqlx::query_as::<_, Article>(&lock_article)
            .bind(comment.article_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("article"))?;

        let inserted = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (id, article_id, author_id, body, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, article_id, author_id, body, created_at, updated_at
            "#,
        )
        .bind(comment.id)
        .bind(comment.article_id)
        .bind(comment.author_id)
        .bind(&comment.body)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        article.attach_comment(inserted.id);
        sqlx::query("UPDATE articles SET comments = $2 WHERE id = $1")
            .bind(article.id)
            .bind(&article.comments)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(inserted)
    }

    async fn update_comment(&self, comment: Comment) -> AppResult<Comment> {
        sqlx::query_as::<_, Comment>(
            r#"
            UPDATE comments SET body = $2, updated_at = $3 WHERE id = $1
            RETURNING id, article_id, author_id, body, created_at, updated_at
            "#,
        )
        .bind(comment.id)
        .bind(&comment.body)
        .bind(comment.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("comment"))
    }

    async fn delete_comment(&self, id: Uuid) -> AppResult<bool> {
        // `article_id` never changes, so the parent can be locked before the comment itself.
        let Some(comment) = self.find_comment(id).await? else {
            return Ok(false);
        };

        let mut tx = self.pool.begin().await?;

        let lock_article = format!("{SELECT_ARTICLE} WHERE id = $1 FOR UPDATE");
        let parent = sqlx::query_as::<_, Article>(&lock_article)
            .bind(comment.article_id)
            .fetch_optional(&mut *tx)
            .await?;

        let lock_comment = format!("{SELECT_COMMENT} WHERE id = $1 FOR UPDATE");
        let still_there = sqlx::query_as::<_, Comment>(&lock_comment)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if still_there.is_none() {
            return Ok(false);
        }

        if let Some(mut article) = parent {
            if article.detach_comment(id) {
                sqlx::query("UPDATE articles SET comments = $2 WHERE id = $1")
                    .bind(article.id)
                    .bind(&article.comments)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn favorite(
        &self,
        user: IdentityRef,
        article_id: Uuid,
        action: Action,
    ) -> AppResult<FavoriteOutcome> {
        let mut tx = self.pool.begin().await?;

        let lock_article = format!("{SELECT_ARTICLE} WHERE id = $1 FOR UPDATE");
        let mut article = sqlx::query_as::<_, Article>(&lock_article)
            .bind(article_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("article"))?;

        let lock_user = format!("{SELECT_USER} WHERE id = $1 FOR UPDATE");
        let mut user = sqlx::query_as::<_, User>(&lock_user)
            .bind(user.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("user"))?;

        let favorited = relationship::favorite(&mut user, &mut article, action);

        sqlx::query("UPDATE users SET favorited_articles = $2 WHERE id = $1")
            .bind(user.id)
            .bind(&user.favorited_articles)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE articles SET favorites_count = $2 WHERE id = $1")
            .bind(article.id)
            .bind(article.favorites_count)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(FavoriteOutcome {
            user,
            article,
            favorited,
        })
    }

    async fn follow(
        &self,
        subject: IdentityRef,
        target_id: Uuid,
        action: Action,
    ) -> AppResult<FollowOutcome> {
        let target = self
            .find_user(target_id)
            .await?
            .ok_or(AppError::NotFound("user"))?;

        let mut tx = self.pool.begin().await?;

        let lock_user = format!("{SELECT_USER} WHERE id = $1 FOR UPDATE");
        let mut subject = sqlx::query_as::<_, User>(&lock_user)
            .bind(subject.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("user"))?;

        let following = relationship::follow(&mut subject, &target, action)?;

        sqlx::query("UPDATE users SET followed_users = $2 WHERE id = $1")
            .bind(subject.id)
            .bind(&subject.followed_users)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(FollowOutcome {
            subject,
            target,
            following,
        })
    }
}
