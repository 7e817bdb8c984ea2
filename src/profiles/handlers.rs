use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    error::ApiError,
    profiles::{
        dto::{ChannelProfile, WatchedVideo},
        services,
    },
    response::ApiResponse,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/channel/:username", get(channel_profile))
        .route("/history", get(watch_history))
}

#[instrument(skip(state))]
pub async fn channel_profile(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    Path(username): Path<String>,
) -> Result<ApiResponse<ChannelProfile>, ApiError> {
    let profile = services::channel_profile(&state, viewer, &username).await?;
    Ok(ApiResponse::ok(profile, "User channel fetched successfully"))
}

#[instrument(skip(state))]
pub async fn watch_history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<ApiResponse<Vec<WatchedVideo>>, ApiError> {
    let videos = services::watch_history(&state, user_id).await?;
    Ok(ApiResponse::ok(videos, "Watch history fetched successfully"))
}
