use axum::{Json, extract::State, http::StatusCode};

use super::current_user;
use crate::{
    AppState,
    auth::{AuthUser, issue_token},
    error::{AppError, AppResult, ErrorBody},
    models::{LoginRequest, RegisterUserRequest, UpdateUserRequest, User, UserView, Validate},
};

/// register_user
///
/// [Public Route] Creates an account and returns it together with a session token.
#[utoipa::path(
    post,
    path = "/users",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "Registered", body = UserView),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 409, description = "Username taken", body = ErrorBody)
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUserRequest>,
) -> AppResult<(StatusCode, Json<UserView>)> {
    payload.validate()?;

    if state
        .repo
        .find_user_by_username(&payload.username)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("username is already taken".to_string()));
    }

    let password_hash = state.credentials.hash(&payload.password)?;
    let display_name = payload
        .display_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| payload.username.clone());

    let mut user = User::new(payload.username, display_name, password_hash);
    user.bio = payload.bio;
    user.image = payload.image;

    let user = state.repo.save_user(user).await?;
    let token = issue_token(&user, &state.config)?;

    tracing::info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((StatusCode::CREATED, Json(UserView::of(&user, Some(token)))))
}

/// login_user
///
/// [Public Route] Exchanges username and password for a session token. Unknown users and wrong
/// passwords are indistinguishable to the caller.
#[utoipa::path(
    post,
    path = "/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = UserView),
        (status = 401, description = "Bad credentials", body = ErrorBody)
    )
)]
pub async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<UserView>> {
    payload.validate()?;

    let user = state
        .repo
        .find_user_by_username(&payload.username)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !state
        .credentials
        .verify(&payload.password, &user.password_hash)
    {
        tracing::info!(username = %payload.username, "login rejected");
        return Err(AppError::Unauthorized);
    }

    let token = issue_token(&user, &state.config)?;
    Ok(Json(UserView::of(&user, Some(token))))
}

/// get_current_user
///
/// [Authenticated Route] The caller's own account.
#[utoipa::path(
    get,
    path = "/user",
    responses((status = 200, description = "Current user", body = UserView))
)]
pub async fn get_current_user(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<UserView>> {
    let user = current_user(&state.repo, &auth).await?;
    Ok(Json(UserView::of(&user, None)))
}

/// update_current_user
///
/// [Authenticated Route] Partial profile update. Username and relationship sets are never
/// changed here.
#[utoipa::path(
    put,
    path = "/user",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = UserView),
        (status = 400, description = "Invalid input", body = ErrorBody)
    )
)]
pub async fn update_current_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<UserView>> {
    payload.validate()?;

    let mut user = current_user(&state.repo, &auth).await?;
    if let Some(display_name) = payload.display_name {
        user.display_name = display_name;
    }
    if let Some(bio) = payload.bio {
        user.bio = Some(bio);
    }
    if let Some(image) = payload.image {
        user.image = Some(image);
    }
    if let Some(password) = payload.password {
        user.password_hash = state.credentials.hash(&password)?;
    }

    let user = state.repo.save_user(user).await?;
    tracing::info!(user_id = %user.id, "user updated");
    Ok(Json(UserView::of(&user, None)))
}
