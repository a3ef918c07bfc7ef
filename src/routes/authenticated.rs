use crate::{
    AppState,
    handlers::{articles, comments, profiles, users},
};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Authenticated Router Module
///
/// Every handler here receives a resolved `AuthUser` and passes its identity explicitly into
/// the ownership guard and the relationship engine.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET/PUT /user
        // The caller's own account.
        .route(
            "/user",
            get(users::get_current_user).put(users::update_current_user),
        )
        // POST toggles, DELETE always ends in "not following".
        .route(
            "/profiles/{username}/follow",
            post(profiles::follow_user).delete(profiles::unfollow_user),
        )
        // --- Articles ---
        .route("/articles/feed", get(articles::feed_articles))
        .route("/articles", post(articles::create_article))
        // Author only.
        .route(
            "/articles/{id}",
            put(articles::update_article).delete(articles::delete_article),
        )
        .route(
            "/articles/{id}/favorite",
            post(articles::favorite_article).delete(articles::unfavorite_article),
        )
        // --- Comments ---
        .route("/articles/{id}/comments", post(comments::add_comment))
        // Comment author only; authoring the parent article grants nothing.
        .route(
            "/comments/{id}",
            put(comments::update_comment).delete(comments::delete_comment),
        )
}
