use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{AuthRequest, SessionResponse},
    repo_types::{Identity, Profile, ProfileUpdate},
};
use crate::{error::AppError, state::AppState};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth", post(authenticate))
        .route("/auth/sign-out", post(sign_out))
        .route("/session", get(session))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me).put(update_me))
        .route("/profiles/:id", get(get_profile))
}

#[instrument(skip(state, payload), fields(mode = ?payload.mode))]
pub async fn authenticate(
    State(state): State<AppState>,
    Json(payload): Json<AuthRequest>,
) -> Result<Json<Identity>, AppError> {
    let identity = state.accounts.submit(payload.mode, &payload.form).await?;
    Ok(Json(identity))
}

#[instrument(skip(state))]
pub async fn sign_out(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.accounts.sign_out().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn session(State(state): State<AppState>) -> Json<SessionResponse> {
    let start = state.accounts.start_destination();
    Json(SessionResponse {
        logged_in: state.accounts.is_logged_in(),
        user_id: state.accounts.current_user_id(),
        start_route: start.route(),
        start,
    })
}

#[instrument(skip(state))]
pub async fn get_me(State(state): State<AppState>) -> Result<Json<Profile>, AppError> {
    state
        .accounts
        .current_user()
        .await?
        .map(Json)
        .ok_or(AppError::NotAuthenticated)
}

#[instrument(skip(state))]
pub async fn update_me(
    State(state): State<AppState>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(state.accounts.update_profile(update).await?))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(state.accounts.get_profile(&id).await?))
}
