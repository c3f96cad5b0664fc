use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use tracing::info;

use crate::database::videos as db_videos;
use crate::handlers::common::{ApiError, ApiResponse, api_err, created, internal_err, normalize_page, ok};
use crate::storage;
use crate::types::{AppState, UserPublic, VideoDto, VideoListQuery, VideoListResponse};

pub async fn get_all_videos(
    State(state): State<AppState>,
    Query(query): Query<VideoListQuery>,
) -> Result<Json<ApiResponse<VideoListResponse>>, ApiError> {
    let (page, limit) = normalize_page(query.page, query.limit);

    let videos = db_videos::list_videos(
        &state.db_pool,
        query.query.as_deref(),
        query.user_id.as_deref(),
        query.sort_by.as_deref(),
        query.sort_type.as_deref(),
        page,
        limit,
    )
    .await
    .map_err(internal_err)?;

    Ok(ok(
        VideoListResponse {
            videos,
            page,
            limit,
        },
        "Videos fetched successfully",
    ))
}

pub async fn publish_video(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<VideoDto>>), ApiError> {
    let mut title = String::new();
    let mut description = String::new();
    let mut duration = 0.0f64;
    let mut video_file: Option<(Option<String>, Vec<u8>)> = None;
    let mut thumbnail: Option<(Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| api_err(StatusCode::BAD_REQUEST, "malformed multipart body"))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => {
                title = field
                    .text()
                    .await
                    .map_err(|_| api_err(StatusCode::BAD_REQUEST, "malformed multipart body"))?
            }
            "description" => {
                description = field
                    .text()
                    .await
                    .map_err(|_| api_err(StatusCode::BAD_REQUEST, "malformed multipart body"))?
            }
            "duration" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|_| api_err(StatusCode::BAD_REQUEST, "malformed multipart body"))?;
                duration = raw.trim().parse().unwrap_or(0.0);
            }
            "videoFile" => {
                let file_name = field.file_name().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| api_err(StatusCode::BAD_REQUEST, "failed to read uploaded file"))?
                    .to_vec();
                video_file = Some((file_name, bytes));
            }
            "thumbnail" => {
                let file_name = field.file_name().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| api_err(StatusCode::BAD_REQUEST, "failed to read uploaded file"))?
                    .to_vec();
                thumbnail = Some((file_name, bytes));
            }
            _ => {}
        }
    }

    if title.trim().is_empty() || description.trim().is_empty() {
        return Err(api_err(
            StatusCode::BAD_REQUEST,
            "title and description are required",
        ));
    }
    let Some((video_name, video_bytes)) = video_file.filter(|(_, b)| !b.is_empty()) else {
        return Err(api_err(StatusCode::BAD_REQUEST, "video file is required"));
    };
    let Some((thumb_name, thumb_bytes)) = thumbnail.filter(|(_, b)| !b.is_empty()) else {
        return Err(api_err(StatusCode::BAD_REQUEST, "thumbnail file is required"));
    };

    let video_url = storage::upload_media(&state, "videos", video_name.as_deref(), video_bytes)
        .await
        .map_err(internal_err)?;
    let thumbnail_url =
        storage::upload_media(&state, "thumbnails", thumb_name.as_deref(), thumb_bytes)
            .await
            .map_err(internal_err)?;

    let video = db_videos::create_video(
        &state.db_pool,
        db_videos::NewVideo {
            owner_id: user.id.clone(),
            title,
            description,
            video_url,
            thumbnail_url,
            duration,
        },
    )
    .await
    .map_err(internal_err)?;

    info!("Video published: id={}, owner={}", video.id, user.id);

    Ok(created(video, "Video uploaded successfully"))
}

/// Fetching a video counts a view and records it in the viewer's watch
/// history.
pub async fn get_video_by_id(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
    Path(video_id): Path<String>,
) -> Result<Json<ApiResponse<VideoDto>>, ApiError> {
    // Count the view first so the returned record carries it.
    let counted = db_videos::increment_views(&state.db_pool, &video_id)
        .await
        .map_err(internal_err)?;
    if !counted {
        return Err(api_err(StatusCode::NOT_FOUND, "video not found"));
    }

    db_videos::record_watch(&state.db_pool, &user.id, &video_id)
        .await
        .map_err(internal_err)?;

    let video = db_videos::find_by_id(&state.db_pool, &video_id)
        .await
        .map_err(internal_err)?
        .ok_or_else(|| api_err(StatusCode::NOT_FOUND, "video not found"))?;

    Ok(ok(video, "Video fetched successfully"))
}

pub async fn update_video(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
    Path(video_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<VideoDto>>, ApiError> {
    let mut title: Option<String> = None;
    let mut description: Option<String> = None;
    let mut thumbnail: Option<(Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| api_err(StatusCode::BAD_REQUEST, "malformed multipart body"))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => {
                title = Some(
                    field
                        .text()
                        .await
                        .map_err(|_| api_err(StatusCode::BAD_REQUEST, "malformed multipart body"))?,
                )
            }
            "description" => {
                description = Some(
                    field
                        .text()
                        .await
                        .map_err(|_| api_err(StatusCode::BAD_REQUEST, "malformed multipart body"))?,
                )
            }
            "thumbnail" => {
                let file_name = field.file_name().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| api_err(StatusCode::BAD_REQUEST, "failed to read uploaded file"))?
                    .to_vec();
                thumbnail = Some((file_name, bytes));
            }
            _ => {}
        }
    }

    // Ownership check happens in the UPDATE itself; upload the new
    // thumbnail only after we know the video is the caller's.
    let existing = db_videos::find_owned(&state.db_pool, &video_id, &user.id)
        .await
        .map_err(internal_err)?
        .ok_or_else(|| api_err(StatusCode::NOT_FOUND, "video not found"))?;

    let new_thumbnail_url = match thumbnail.filter(|(_, b)| !b.is_empty()) {
        Some((file_name, bytes)) => Some(
            storage::upload_media(&state, "thumbnails", file_name.as_deref(), bytes)
                .await
                .map_err(internal_err)?,
        ),
        None => None,
    };

    let updated = db_videos::update_video(
        &state.db_pool,
        &video_id,
        &user.id,
        title.as_deref(),
        description.as_deref(),
        new_thumbnail_url.as_deref(),
    )
    .await
    .map_err(internal_err)?
    .ok_or_else(|| api_err(StatusCode::NOT_FOUND, "video not found"))?;

    if new_thumbnail_url.is_some() {
        storage::delete_media(&state, &existing.thumbnail_url).await;
    }

    Ok(ok(updated, "Video updated successfully"))
}

pub async fn delete_video(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
    Path(video_id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let deleted = db_videos::delete_video(&state.db_pool, &video_id, &user.id)
        .await
        .map_err(internal_err)?
        .ok_or_else(|| api_err(StatusCode::NOT_FOUND, "video not found"))?;

    storage::delete_media(&state, &deleted.video_url).await;
    storage::delete_media(&state, &deleted.thumbnail_url).await;

    info!("Video deleted: id={}, owner={}", deleted.id, user.id);

    Ok(ok(serde_json::json!({}), "Video deleted successfully"))
}

pub async fn toggle_publish_status(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
    Path(video_id): Path<String>,
) -> Result<Json<ApiResponse<VideoDto>>, ApiError> {
    let video = db_videos::toggle_publish(&state.db_pool, &video_id, &user.id)
        .await
        .map_err(internal_err)?
        .ok_or_else(|| api_err(StatusCode::NOT_FOUND, "video not found"))?;

    Ok(ok(video, "Publish status toggled successfully"))
}
