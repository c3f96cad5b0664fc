use crate::config::Config;
use aws_sdk_s3::Client as S3Client;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub s3: S3Client,
    pub db_pool: SqlitePool,
}

/// User as exposed to clients. Never carries password_hash or refresh_token.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct UserPublic {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: String,
    pub cover_image_url: String,
    pub created_at: String,
}

/// Projection of a user used wherever another document embeds its owner.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct OwnerSummary {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub avatar_url: String,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct VideoDto {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub thumbnail_url: String,
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct VideoWithOwner {
    #[serde(flatten)]
    pub video: VideoDto,
    pub owner: OwnerSummary,
}

#[derive(Clone, Debug, Serialize)]
pub struct CommentDto {
    pub id: String,
    pub video_id: String,
    pub content: String,
    pub created_at: String,
    pub owner: OwnerSummary,
    pub like_count: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct TweetDto {
    pub id: String,
    pub content: String,
    pub created_at: String,
    pub owner: OwnerSummary,
    pub like_count: i64,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct PlaylistDto {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub description: String,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct PlaylistSummary {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub description: String,
    pub created_at: String,
    pub video_count: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlaylistWithVideos {
    #[serde(flatten)]
    pub playlist: PlaylistDto,
    pub videos: Vec<VideoDto>,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct ChannelProfile {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub avatar_url: String,
    pub cover_image_url: String,
    pub subscriber_count: i64,
    pub channel_subscribed_to_count: i64,
    pub is_subscribed: bool,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct ChannelStats {
    pub total_videos: i64,
    pub total_views: i64,
    pub total_likes: i64,
    pub total_subscribers: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct WatchHistoryEntry {
    pub watched_at: String,
    pub video: VideoDto,
    pub owner: OwnerSummary,
}

#[derive(Debug, Deserialize)]
pub struct VideoListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub query: Option<String>,
    pub sort_by: Option<String>,
    pub sort_type: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Serialize)]
pub struct VideoListResponse {
    pub videos: Vec<VideoDto>,
    pub page: u32,
    pub limit: u32,
}

#[derive(Serialize)]
pub struct CommentListResponse {
    pub comments: Vec<CommentDto>,
    pub page: u32,
    pub limit: u32,
}

#[derive(Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub user: UserPublic,
    pub access_token: String,
    pub refresh_token: String,
}
