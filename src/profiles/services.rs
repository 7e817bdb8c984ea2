use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    error::ApiError,
    profiles::dto::{ChannelProfile, WatchedVideo},
    state::AppState,
};

#[instrument(skip(st))]
pub async fn channel_profile(
    st: &AppState,
    viewer: Uuid,
    username: &str,
) -> Result<ChannelProfile, ApiError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ApiError::validation("username is missing"));
    }

    let profile = st
        .store
        .channel_profile(username, viewer)
        .await?
        .ok_or_else(|| {
            warn!(%username, "channel not found");
            ApiError::not_found("channel does not exist")
        })?;

    info!(
        channel_id = %profile.id,
        subscribers = profile.subscribers_count,
        "channel profile fetched"
    );
    Ok(profile)
}

/// Watched videos in history order, each with its owner's public fields.
#[instrument(skip(st))]
pub async fn watch_history(st: &AppState, user_id: Uuid) -> Result<Vec<WatchedVideo>, ApiError> {
    if st.store.find_by_id(user_id).await?.is_none() {
        return Err(ApiError::not_found("User does not exist"));
    }
    let videos = st.store.watch_history(user_id).await?;
    info!(%user_id, count = videos.len(), "watch history fetched");
    Ok(videos)
}
