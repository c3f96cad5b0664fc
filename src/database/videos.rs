use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::types::{ChannelStats, VideoDto};

const VIDEO_COLUMNS: &str = "id, owner_id, title, description, video_url, thumbnail_url, \
     duration, views, is_published, created_at";

/// Sort keys accepted by the listing endpoint. User input never reaches the
/// SQL text directly.
pub fn sort_column(sort_by: Option<&str>) -> &'static str {
    match sort_by {
        Some("views") => "views",
        Some("duration") => "duration",
        Some("title") => "title",
        _ => "created_at",
    }
}

pub fn sort_direction(sort_type: Option<&str>) -> &'static str {
    match sort_type {
        Some("ascending") => "ASC",
        _ => "DESC",
    }
}

pub struct NewVideo {
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub thumbnail_url: String,
    pub duration: f64,
}

pub async fn create_video(pool: &SqlitePool, new_video: NewVideo) -> Result<VideoDto> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO videos (id, owner_id, title, description, video_url, thumbnail_url, duration) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&new_video.owner_id)
    .bind(&new_video.title)
    .bind(&new_video.description)
    .bind(&new_video.video_url)
    .bind(&new_video.thumbnail_url)
    .bind(new_video.duration)
    .execute(pool)
    .await?;

    info!("Video saved: id={}, title={}", id, new_video.title);

    let video = find_by_id(pool, &id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("video vanished right after insert"))?;
    Ok(video)
}

pub async fn find_by_id(pool: &SqlitePool, video_id: &str) -> Result<Option<VideoDto>> {
    let video = sqlx::query_as::<_, VideoDto>(&format!(
        "SELECT {} FROM videos WHERE id = ?",
        VIDEO_COLUMNS
    ))
    .bind(video_id)
    .fetch_optional(pool)
    .await?;
    Ok(video)
}

/// Owner-scoped lookup; a miss means "absent or not yours".
pub async fn find_owned(
    pool: &SqlitePool,
    video_id: &str,
    owner_id: &str,
) -> Result<Option<VideoDto>> {
    let video = sqlx::query_as::<_, VideoDto>(&format!(
        "SELECT {} FROM videos WHERE id = ? AND owner_id = ?",
        VIDEO_COLUMNS
    ))
    .bind(video_id)
    .bind(owner_id)
    .fetch_optional(pool)
    .await?;
    Ok(video)
}

/// Escape LIKE metacharacters so a search string always matches literally.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

pub async fn list_videos(
    pool: &SqlitePool,
    search: Option<&str>,
    owner_id: Option<&str>,
    sort_by: Option<&str>,
    sort_type: Option<&str>,
    page: u32,
    limit: u32,
) -> Result<Vec<VideoDto>> {
    let sql = format!(
        "SELECT {} FROM videos \
         WHERE is_published = 1 \
           AND (?1 IS NULL OR title LIKE ?1 ESCAPE '\\' OR description LIKE ?1 ESCAPE '\\') \
           AND (?2 IS NULL OR owner_id = ?2) \
         ORDER BY {} {} \
         LIMIT ?3 OFFSET ?4",
        VIDEO_COLUMNS,
        sort_column(sort_by),
        sort_direction(sort_type),
    );

    let pattern = search.map(like_pattern);
    let videos = sqlx::query_as::<_, VideoDto>(&sql)
        .bind(pattern)
        .bind(owner_id)
        .bind(limit as i64)
        .bind(((page - 1) * limit) as i64)
        .fetch_all(pool)
        .await?;
    Ok(videos)
}

pub async fn update_video(
    pool: &SqlitePool,
    video_id: &str,
    owner_id: &str,
    title: Option<&str>,
    description: Option<&str>,
    thumbnail_url: Option<&str>,
) -> Result<Option<VideoDto>> {
    let rows_affected = sqlx::query(
        "UPDATE videos SET \
           title = COALESCE(?, title), \
           description = COALESCE(?, description), \
           thumbnail_url = COALESCE(?, thumbnail_url) \
         WHERE id = ? AND owner_id = ?",
    )
    .bind(title)
    .bind(description)
    .bind(thumbnail_url)
    .bind(video_id)
    .bind(owner_id)
    .execute(pool)
    .await?
    .rows_affected();

    if rows_affected == 0 {
        return Ok(None);
    }

    info!("Video updated: id={}", video_id);
    find_by_id(pool, video_id).await
}

/// Returns the deleted row so the handler can clean up stored objects.
pub async fn delete_video(
    pool: &SqlitePool,
    video_id: &str,
    owner_id: &str,
) -> Result<Option<VideoDto>> {
    let Some(video) = find_owned(pool, video_id, owner_id).await? else {
        return Ok(None);
    };

    sqlx::query("DELETE FROM videos WHERE id = ?")
        .bind(video_id)
        .execute(pool)
        .await?;

    info!("Video deleted: id={}", video_id);
    Ok(Some(video))
}

pub async fn toggle_publish(
    pool: &SqlitePool,
    video_id: &str,
    owner_id: &str,
) -> Result<Option<VideoDto>> {
    let rows_affected =
        sqlx::query("UPDATE videos SET is_published = 1 - is_published WHERE id = ? AND owner_id = ?")
            .bind(video_id)
            .bind(owner_id)
            .execute(pool)
            .await?
            .rows_affected();

    if rows_affected == 0 {
        return Ok(None);
    }
    find_by_id(pool, video_id).await
}

/// Returns false when the video does not exist.
pub async fn increment_views(pool: &SqlitePool, video_id: &str) -> Result<bool> {
    let rows_affected = sqlx::query("UPDATE videos SET views = views + 1 WHERE id = ?")
        .bind(video_id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(rows_affected > 0)
}

/// One history row per (user, video); re-watching refreshes the timestamp.
pub async fn record_watch(pool: &SqlitePool, user_id: &str, video_id: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO watch_history (user_id, video_id) VALUES (?, ?) \
         ON CONFLICT (user_id, video_id) DO UPDATE SET watched_at = datetime('now')",
    )
    .bind(user_id)
    .bind(video_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// The dashboard aggregate: totals over the channel's videos plus its
/// subscriber count.
pub async fn channel_stats(pool: &SqlitePool, owner_id: &str) -> Result<ChannelStats> {
    let stats = sqlx::query_as::<_, ChannelStats>(
        "SELECT \
           (SELECT COUNT(*) FROM videos WHERE owner_id = ?1) AS total_videos, \
           (SELECT COALESCE(SUM(views), 0) FROM videos WHERE owner_id = ?1) AS total_views, \
           (SELECT COUNT(*) FROM likes l JOIN videos v ON l.video_id = v.id WHERE v.owner_id = ?1) AS total_likes, \
           (SELECT COUNT(*) FROM subscriptions WHERE channel_id = ?1) AS total_subscribers",
    )
    .bind(owner_id)
    .fetch_one(pool)
    .await?;
    Ok(stats)
}

/// Every video of the channel, drafts included.
pub async fn channel_videos(pool: &SqlitePool, owner_id: &str) -> Result<Vec<VideoDto>> {
    let videos = sqlx::query_as::<_, VideoDto>(&format!(
        "SELECT {} FROM videos WHERE owner_id = ? ORDER BY datetime(created_at) DESC",
        VIDEO_COLUMNS
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await?;
    Ok(videos)
}
