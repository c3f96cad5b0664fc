use axum::{Extension, Json, extract::State};

use crate::database::videos as db_videos;
use crate::handlers::common::{ApiError, ApiResponse, internal_err, ok};
use crate::types::{AppState, ChannelStats, UserPublic, VideoDto};

pub async fn get_channel_stats(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
) -> Result<Json<ApiResponse<ChannelStats>>, ApiError> {
    let stats = db_videos::channel_stats(&state.db_pool, &user.id)
        .await
        .map_err(internal_err)?;
    Ok(ok(stats, "Channel stats fetched successfully"))
}

/// All of the channel's videos, drafts included.
pub async fn get_channel_videos(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
) -> Result<Json<ApiResponse<Vec<VideoDto>>>, ApiError> {
    let videos = db_videos::channel_videos(&state.db_pool, &user.id)
        .await
        .map_err(internal_err)?;
    Ok(ok(videos, "Channel videos fetched successfully"))
}
