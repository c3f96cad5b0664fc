use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::json;

use crate::database::{playlists as db_playlists, videos as db_videos};
use crate::handlers::common::{ApiError, ApiResponse, api_err, created, internal_err, ok};
use crate::types::{AppState, PlaylistDto, PlaylistSummary, PlaylistWithVideos, UserPublic};

#[derive(Deserialize)]
pub struct CreatePlaylistRequest {
    pub name: String,
    pub description: String,
}

pub async fn create_playlist(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
    Json(body): Json<CreatePlaylistRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PlaylistDto>>), ApiError> {
    if body.name.trim().is_empty() || body.description.trim().is_empty() {
        return Err(api_err(
            StatusCode::BAD_REQUEST,
            "name and description are required",
        ));
    }

    let playlist =
        db_playlists::create_playlist(&state.db_pool, &user.id, &body.name, &body.description)
            .await
            .map_err(internal_err)?;

    Ok(created(playlist, "Playlist created successfully"))
}

pub async fn get_user_playlists(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<PlaylistSummary>>>, ApiError> {
    let playlists = db_playlists::playlists_for_user(&state.db_pool, &user_id)
        .await
        .map_err(internal_err)?;
    Ok(ok(playlists, "Playlists fetched successfully"))
}

pub async fn get_playlist_by_id(
    State(state): State<AppState>,
    Path(playlist_id): Path<String>,
) -> Result<Json<ApiResponse<PlaylistWithVideos>>, ApiError> {
    let playlist = db_playlists::playlist_with_videos(&state.db_pool, &playlist_id)
        .await
        .map_err(internal_err)?
        .ok_or_else(|| api_err(StatusCode::NOT_FOUND, "playlist not found"))?;
    Ok(ok(playlist, "Playlist fetched successfully"))
}

#[derive(Deserialize)]
pub struct UpdatePlaylistRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

pub async fn update_playlist(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
    Path(playlist_id): Path<String>,
    Json(body): Json<UpdatePlaylistRequest>,
) -> Result<Json<ApiResponse<PlaylistDto>>, ApiError> {
    let playlist = db_playlists::update_playlist(
        &state.db_pool,
        &playlist_id,
        &user.id,
        body.name.as_deref(),
        body.description.as_deref(),
    )
    .await
    .map_err(internal_err)?
    .ok_or_else(|| api_err(StatusCode::NOT_FOUND, "playlist not found"))?;

    Ok(ok(playlist, "Playlist updated successfully"))
}

pub async fn delete_playlist(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
    Path(playlist_id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let deleted = db_playlists::delete_playlist(&state.db_pool, &playlist_id, &user.id)
        .await
        .map_err(internal_err)?;
    if !deleted {
        return Err(api_err(StatusCode::NOT_FOUND, "playlist not found"));
    }

    Ok(ok(json!({}), "Playlist deleted successfully"))
}

pub async fn add_video_to_playlist(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
    Path((video_id, playlist_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<PlaylistWithVideos>>, ApiError> {
    let video = db_videos::find_by_id(&state.db_pool, &video_id)
        .await
        .map_err(internal_err)?;
    if video.is_none() {
        return Err(api_err(StatusCode::NOT_FOUND, "video not found"));
    }

    let playlist = db_playlists::add_video(&state.db_pool, &playlist_id, &user.id, &video_id)
        .await
        .map_err(internal_err)?
        .ok_or_else(|| api_err(StatusCode::NOT_FOUND, "playlist not found"))?;

    Ok(ok(playlist, "Video added to playlist"))
}

pub async fn remove_video_from_playlist(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
    Path((video_id, playlist_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<PlaylistWithVideos>>, ApiError> {
    let playlist = db_playlists::remove_video(&state.db_pool, &playlist_id, &user.id, &video_id)
        .await
        .map_err(internal_err)?
        .ok_or_else(|| api_err(StatusCode::NOT_FOUND, "playlist not found"))?;

    Ok(ok(playlist, "Video removed from playlist"))
}
