use crate::{
    AppState,
    handlers::{articles, comments, profiles, users},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a credential: registration, login and every read.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // --- Accounts ---
        .route("/users", post(users::register_user))
        .route("/users/login", post(users::login_user))
        // GET /profiles/{username}
        // `following` is false for anonymous callers.
        .route("/profiles/{username}", get(profiles::get_profile))
        // --- Articles ---
        // GET /articles?tag=&author=&favorited=&limit=&offset=
        .route("/articles", get(articles::list_articles))
        .route("/articles/{id}", get(articles::get_article))
        .route("/articles/{id}/comments", get(comments::list_comments))
        .route("/tags", get(articles::list_tags))
}
