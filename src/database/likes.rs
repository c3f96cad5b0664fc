use anyhow::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::types::{OwnerSummary, VideoDto, VideoWithOwner};

/// Delete-then-insert toggle. Returns the new liked state.
async fn toggle(
    pool: &SqlitePool,
    user_id: &str,
    target_column: &'static str,
    target_id: &str,
) -> Result<bool> {
    let deleted = sqlx::query(&format!(
        "DELETE FROM likes WHERE liked_by = ? AND {} = ?",
        target_column
    ))
    .bind(user_id)
    .bind(target_id)
    .execute(pool)
    .await?
    .rows_affected();

    if deleted > 0 {
        return Ok(false);
    }

    sqlx::query(&format!(
        "INSERT INTO likes (id, liked_by, {}) VALUES (?, ?, ?)",
        target_column
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(target_id)
    .execute(pool)
    .await?;

    Ok(true)
}

pub async fn toggle_video_like(pool: &SqlitePool, user_id: &str, video_id: &str) -> Result<bool> {
    toggle(pool, user_id, "video_id", video_id).await
}

pub async fn toggle_comment_like(
    pool: &SqlitePool,
    user_id: &str,
    comment_id: &str,
) -> Result<bool> {
    toggle(pool, user_id, "comment_id", comment_id).await
}

pub async fn toggle_tweet_like(pool: &SqlitePool, user_id: &str, tweet_id: &str) -> Result<bool> {
    toggle(pool, user_id, "tweet_id", tweet_id).await
}

#[derive(sqlx::FromRow)]
struct LikedVideoRow {
    id: String,
    owner_id: String,
    title: String,
    description: String,
    video_url: String,
    thumbnail_url: String,
    duration: f64,
    views: i64,
    is_published: bool,
    created_at: String,
    u_id: String,
    u_username: String,
    u_full_name: String,
    u_avatar_url: String,
}

/// All videos the user has liked, newest like first, each joined with its
/// owner summary.
pub async fn liked_videos(pool: &SqlitePool, user_id: &str) -> Result<Vec<VideoWithOwner>> {
    let rows: Vec<LikedVideoRow> = sqlx::query_as(
        "SELECT v.id, v.owner_id, v.title, v.description, v.video_url, v.thumbnail_url, \
           v.duration, v.views, v.is_published, v.created_at, \
           u.id AS u_id, u.username AS u_username, u.full_name AS u_full_name, u.avatar_url AS u_avatar_url \
         FROM likes l \
         JOIN videos v ON v.id = l.video_id \
         JOIN users u ON u.id = v.owner_id \
         WHERE l.liked_by = ? AND l.video_id IS NOT NULL \
         ORDER BY datetime(l.created_at) DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| VideoWithOwner {
            video: VideoDto {
                id: r.id,
                owner_id: r.owner_id,
                title: r.title,
                description: r.description,
                video_url: r.video_url,
                thumbnail_url: r.thumbnail_url,
                duration: r.duration,
                views: r.views,
                is_published: r.is_published,
                created_at: r.created_at,
            },
            owner: OwnerSummary {
                id: r.u_id,
                username: r.u_username,
                full_name: r.u_full_name,
                avatar_url: r.u_avatar_url,
            },
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::comments;
    use crate::database::test_support::{seed_user, seed_video, test_pool};
    use crate::database::tweets;

    #[tokio::test]
    async fn video_like_toggles() {
        let pool = test_pool().await;
        let owner = seed_user(&pool, "owner").await;
        let fan = seed_user(&pool, "fan").await;
        let video = seed_video(&pool, &owner.id, "clip").await;

        assert!(toggle_video_like(&pool, &fan.id, &video.id).await.unwrap());
        assert!(!toggle_video_like(&pool, &fan.id, &video.id).await.unwrap());
        assert!(toggle_video_like(&pool, &fan.id, &video.id).await.unwrap());

        let liked = liked_videos(&pool, &fan.id).await.unwrap();
        assert_eq!(liked.len(), 1);
        assert_eq!(liked[0].video.title, "clip");
        assert_eq!(liked[0].owner.username, "owner");
    }

    #[tokio::test]
    async fn likes_are_scoped_per_target() {
        let pool = test_pool().await;
        let owner = seed_user(&pool, "owner").await;
        let video = seed_video(&pool, &owner.id, "clip").await;
        let comment = comments::add_comment(&pool, &video.id, &owner.id, "hi").await.unwrap();
        let tweet = tweets::create_tweet(&pool, &owner.id, "hello").await.unwrap();

        assert!(toggle_video_like(&pool, &owner.id, &video.id).await.unwrap());
        assert!(toggle_comment_like(&pool, &owner.id, &comment.id).await.unwrap());
        assert!(toggle_tweet_like(&pool, &owner.id, &tweet.id).await.unwrap());

        // Untoggling the comment like leaves the other two alone
        assert!(!toggle_comment_like(&pool, &owner.id, &comment.id).await.unwrap());
        let liked = liked_videos(&pool, &owner.id).await.unwrap();
        assert_eq!(liked.len(), 1);
    }
}
