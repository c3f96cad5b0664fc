use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::json;

use crate::database::tweets as db_tweets;
use crate::handlers::common::{ApiError, ApiResponse, api_err, created, internal_err, ok};
use crate::types::{AppState, TweetDto, UserPublic};

#[derive(Deserialize)]
pub struct TweetRequest {
    pub content: String,
}

pub async fn create_tweet(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
    Json(body): Json<TweetRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TweetDto>>), ApiError> {
    if body.content.trim().is_empty() {
        return Err(api_err(StatusCode::BAD_REQUEST, "content is required"));
    }

    let tweet = db_tweets::create_tweet(&state.db_pool, &user.id, &body.content)
        .await
        .map_err(internal_err)?;

    Ok(created(tweet, "Tweet created successfully"))
}

pub async fn get_user_tweets(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<TweetDto>>>, ApiError> {
    let tweets = db_tweets::tweets_for_user(&state.db_pool, &user_id)
        .await
        .map_err(internal_err)?;
    Ok(ok(tweets, "Tweets fetched successfully"))
}

pub async fn update_tweet(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
    Path(tweet_id): Path<String>,
    Json(body): Json<TweetRequest>,
) -> Result<Json<ApiResponse<TweetDto>>, ApiError> {
    if body.content.trim().is_empty() {
        return Err(api_err(StatusCode::BAD_REQUEST, "content is required"));
    }

    let tweet = db_tweets::update_tweet(&state.db_pool, &tweet_id, &user.id, &body.content)
        .await
        .map_err(internal_err)?
        .ok_or_else(|| api_err(StatusCode::NOT_FOUND, "tweet not found"))?;

    Ok(ok(tweet, "Tweet updated successfully"))
}

pub async fn delete_tweet(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
    Path(tweet_id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let deleted = db_tweets::delete_tweet(&state.db_pool, &tweet_id, &user.id)
        .await
        .map_err(internal_err)?;
    if !deleted {
        return Err(api_err(StatusCode::NOT_FOUND, "tweet not found"));
    }

    Ok(ok(json!({}), "Tweet deleted successfully"))
}
