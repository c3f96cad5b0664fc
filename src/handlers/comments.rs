use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::json;

use crate::database::{comments as db_comments, videos as db_videos};
use crate::handlers::common::{ApiError, ApiResponse, api_err, created, internal_err, normalize_page, ok};
use crate::types::{AppState, CommentDto, CommentListResponse, PageQuery, UserPublic};

pub async fn get_video_comments(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<CommentListResponse>>, ApiError> {
    let video = db_videos::find_by_id(&state.db_pool, &video_id)
        .await
        .map_err(internal_err)?;
    if video.is_none() {
        return Err(api_err(StatusCode::NOT_FOUND, "video not found"));
    }

    let (page, limit) = normalize_page(query.page, query.limit);
    let comments = db_comments::list_for_video(&state.db_pool, &video_id, page, limit)
        .await
        .map_err(internal_err)?;

    Ok(ok(
        CommentListResponse {
            comments,
            page,
            limit,
        },
        "Comments fetched successfully",
    ))
}

#[derive(Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

pub async fn add_comment(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
    Path(video_id): Path<String>,
    Json(body): Json<CommentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CommentDto>>), ApiError> {
    if body.content.trim().is_empty() {
        return Err(api_err(StatusCode::BAD_REQUEST, "content is required"));
    }

    let video = db_videos::find_by_id(&state.db_pool, &video_id)
        .await
        .map_err(internal_err)?;
    if video.is_none() {
        return Err(api_err(StatusCode::NOT_FOUND, "video not found"));
    }

    let comment = db_comments::add_comment(&state.db_pool, &video_id, &user.id, &body.content)
        .await
        .map_err(internal_err)?;

    Ok(created(comment, "Comment added successfully"))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
    Path(comment_id): Path<String>,
    Json(body): Json<CommentRequest>,
) -> Result<Json<ApiResponse<CommentDto>>, ApiError> {
    if body.content.trim().is_empty() {
        return Err(api_err(StatusCode::BAD_REQUEST, "content is required"));
    }

    let comment = db_comments::update_comment(&state.db_pool, &comment_id, &user.id, &body.content)
        .await
        .map_err(internal_err)?
        .ok_or_else(|| api_err(StatusCode::NOT_FOUND, "comment not found"))?;

    Ok(ok(comment, "Comment updated successfully"))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
    Path(comment_id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let deleted = db_comments::delete_comment(&state.db_pool, &comment_id, &user.id)
        .await
        .map_err(internal_err)?;
    if !deleted {
        return Err(api_err(StatusCode::NOT_FOUND, "comment not found"));
    }

    Ok(ok(json!({}), "Comment deleted successfully"))
}
