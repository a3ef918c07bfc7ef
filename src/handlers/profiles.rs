use axum::{
    Json,
    extract::{Path, State},
};

use super::{current_user, viewer};
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult, ErrorBody},
    models::ProfileView,
    relationship::Action,
};

/// get_profile
///
/// [Public Route] A user's public profile; `following` is relative to the caller, if any.
#[utoipa::path(
    get,
    path = "/profiles/{username}",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "Profile", body = ProfileView),
        (status = 404, description = "Unknown user", body = ErrorBody)
    )
)]
pub async fn get_profile(
    auth: Option<AuthUser>,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Json<ProfileView>> {
    let viewer = viewer(&state.repo, auth.as_ref()).await?;
    let user = state
        .repo
        .find_user_by_username(&username)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    Ok(Json(ProfileView::of(&user, viewer.as_ref())))
}

async fn change_follow(
    auth: AuthUser,
    state: AppState,
    username: String,
    action: Action,
) -> AppResult<Json<ProfileView>> {
    // Resolves the caller first so a stale token is refused before any lookup.
    current_user(&state.repo, &auth).await?;

    let target = state
        .repo
        .find_user_by_username(&username)
        .await?
        .ok_or(AppError::NotFound("user"))?;

    let outcome = state
        .repo
        .follow(auth.identity, target.id, action)
        .await?;

    tracing::info!(
        user_id = %outcome.subject.id,
        target_id = %outcome.target.id,
        following = outcome.following,
        "follow state changed"
    );
    Ok(Json(ProfileView::of(&outcome.target, Some(&outcome.subject))))
}

/// follow_user
///
/// [Authenticated Route] Toggles whether the caller follows `username`. Following yourself is
/// rejected with 422.
#[utoipa::path(
    post,
    path = "/profiles/{username}/follow",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "Toggled", body = ProfileView),
        (status = 404, description = "Unknown user", body = ErrorBody),
        (status = 422, description = "Self follow", body = ErrorBody)
    )
)]
pub async fn follow_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Json<ProfileView>> {
    change_follow(auth, state, username, Action::Toggle).await
}

/// unfollow_user
///
/// [Authenticated Route] Ensures the caller does not follow `username`.
#[utoipa::path(
    delete,
    path = "/profiles/{username}/follow",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "Not following", body = ProfileView),
        (status = 404, description = "Unknown user", body = ErrorBody)
    )
)]
pub async fn unfollow_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Json<ProfileView>> {
    change_follow(auth, state, username, Action::Remove).await
}
