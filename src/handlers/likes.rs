use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::json;

use crate::database::{
    comments as db_comments, likes as db_likes, tweets as db_tweets, videos as db_videos,
};
use crate::handlers::common::{ApiError, ApiResponse, api_err, internal_err, ok};
use crate::types::{AppState, UserPublic, VideoWithOwner};

pub async fn toggle_video_like(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
    Path(video_id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let video = db_videos::find_by_id(&state.db_pool, &video_id)
        .await
        .map_err(internal_err)?;
    if video.is_none() {
        return Err(api_err(StatusCode::NOT_FOUND, "video not found"));
    }

    let is_liked = db_likes::toggle_video_like(&state.db_pool, &user.id, &video_id)
        .await
        .map_err(internal_err)?;

    Ok(ok(json!({ "is_liked": is_liked }), "Video like toggled"))
}

pub async fn toggle_comment_like(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
    Path(comment_id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if !db_comments::exists(&state.db_pool, &comment_id)
        .await
        .map_err(internal_err)?
    {
        return Err(api_err(StatusCode::NOT_FOUND, "comment not found"));
    }

    let is_liked = db_likes::toggle_comment_like(&state.db_pool, &user.id, &comment_id)
        .await
        .map_err(internal_err)?;

    Ok(ok(json!({ "is_liked": is_liked }), "Comment like toggled"))
}

pub async fn toggle_tweet_like(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
    Path(tweet_id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if !db_tweets::exists(&state.db_pool, &tweet_id)
        .await
        .map_err(internal_err)?
    {
        return Err(api_err(StatusCode::NOT_FOUND, "tweet not found"));
    }

    let is_liked = db_likes::toggle_tweet_like(&state.db_pool, &user.id, &tweet_id)
        .await
        .map_err(internal_err)?;

    Ok(ok(json!({ "is_liked": is_liked }), "Tweet like toggled"))
}

pub async fn get_liked_videos(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
) -> Result<Json<ApiResponse<Vec<VideoWithOwner>>>, ApiError> {
    let videos = db_likes::liked_videos(&state.db_pool, &user.id)
        .await
        .map_err(internal_err)?;
    Ok(ok(videos, "Liked videos fetched successfully"))
}
