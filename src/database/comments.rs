use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::types::{CommentDto, OwnerSummary};

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: String,
    video_id: String,
    content: String,
    created_at: String,
    like_count: i64,
    u_id: String,
    u_username: String,
    u_full_name: String,
    u_avatar_url: String,
}

impl CommentRow {
    fn into_dto(self) -> CommentDto {
        CommentDto {
            id: self.id,
            video_id: self.video_id,
            content: self.content,
            created_at: self.created_at,
            like_count: self.like_count,
            owner: OwnerSummary {
                id: self.u_id,
                username: self.u_username,
                full_name: self.u_full_name,
                avatar_url: self.u_avatar_url,
            },
        }
    }
}

const COMMENT_SELECT: &str = "SELECT c.id, c.video_id, c.content, c.created_at, \
       (SELECT COUNT(*) FROM likes l WHERE l.comment_id = c.id) AS like_count, \
       u.id AS u_id, u.username AS u_username, u.full_name AS u_full_name, u.avatar_url AS u_avatar_url \
     FROM comments c JOIN users u ON u.id = c.owner_id";

pub async fn add_comment(
    pool: &SqlitePool,
    video_id: &str,
    owner_id: &str,
    content: &str,
) -> Result<CommentDto> {
    let id = Uuid::new_v4().to_string();

    sqlx::query("INSERT INTO comments (id, video_id, owner_id, content) VALUES (?, ?, ?, ?)")
        .bind(&id)
        .bind(video_id)
        .bind(owner_id)
        .bind(content)
        .execute(pool)
        .await?;

    info!("Comment added: id={}, video_id={}", id, video_id);

    let comment = find_by_id(pool, &id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("comment vanished right after insert"))?;
    Ok(comment)
}

pub async fn find_by_id(pool: &SqlitePool, comment_id: &str) -> Result<Option<CommentDto>> {
    let row: Option<CommentRow> =
        sqlx::query_as(&format!("{} WHERE c.id = ?", COMMENT_SELECT))
            .bind(comment_id)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(CommentRow::into_dto))
}

pub async fn exists(pool: &SqlitePool, comment_id: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE id = ?")
        .bind(comment_id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Newest first, with owner summary and like count per comment.
pub async fn list_for_video(
    pool: &SqlitePool,
    video_id: &str,
    page: u32,
    limit: u32,
) -> Result<Vec<CommentDto>> {
    let rows: Vec<CommentRow> = sqlx::query_as(&format!(
        "{} WHERE c.video_id = ? ORDER BY datetime(c.created_at) DESC LIMIT ? OFFSET ?",
        COMMENT_SELECT
    ))
    .bind(video_id)
    .bind(limit as i64)
    .bind(((page - 1) * limit) as i64)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(CommentRow::into_dto).collect())
}

pub async fn update_comment(
    pool: &SqlitePool,
    comment_id: &str,
    owner_id: &str,
    content: &str,
) -> Result<Option<CommentDto>> {
    let rows_affected = sqlx::query("UPDATE comments SET content = ? WHERE id = ? AND owner_id = ?")
        .bind(content)
        .bind(comment_id)
        .bind(owner_id)
        .execute(pool)
        .await?
        .rows_affected();

    if rows_affected == 0 {
        return Ok(None);
    }
    find_by_id(pool, comment_id).await
}

pub async fn delete_comment(pool: &SqlitePool, comment_id: &str, owner_id: &str) -> Result<bool> {
    let rows_affected = sqlx::query("DELETE FROM comments WHERE id = ? AND owner_id = ?")
        .bind(comment_id)
        .bind(owner_id)
        .execute(pool)
        .await?
        .rows_affected();

    if rows_affected > 0 {
        info!("Comment deleted: id={}", comment_id);
    }
    Ok(rows_affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::likes;
    use crate::database::test_support::{seed_user, seed_video, test_pool};

    #[tokio::test]
    async fn comment_lifecycle() {
        let pool = test_pool().await;
        let owner = seed_user(&pool, "owner").await;
        let commenter = seed_user(&pool, "commenter").await;
        let video = seed_video(&pool, &owner.id, "clip").await;

        let comment = add_comment(&pool, &video.id, &commenter.id, "first!").await.unwrap();
        assert_eq!(comment.owner.username, "commenter");
        assert_eq!(comment.like_count, 0);

        // Stranger cannot edit
        let denied = update_comment(&pool, &comment.id, &owner.id, "hijacked")
            .await
            .unwrap();
        assert!(denied.is_none());

        let updated = update_comment(&pool, &comment.id, &commenter.id, "edited")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.content, "edited");

        assert!(!delete_comment(&pool, &comment.id, &owner.id).await.unwrap());
        assert!(delete_comment(&pool, &comment.id, &commenter.id).await.unwrap());
        assert!(find_by_id(&pool, &comment.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn listing_is_paginated_with_like_counts() {
        let pool = test_pool().await;
        let owner = seed_user(&pool, "owner").await;
        let video = seed_video(&pool, &owner.id, "clip").await;

        for i in 0..15 {
            add_comment(&pool, &video.id, &owner.id, &format!("comment {}", i))
                .await
                .unwrap();
        }
        let first = list_for_video(&pool, &video.id, 1, 10).await.unwrap();
        assert_eq!(first.len(), 10);
        let second = list_for_video(&pool, &video.id, 2, 10).await.unwrap();
        assert_eq!(second.len(), 5);

        let target = &first[0];
        likes::toggle_comment_like(&pool, &owner.id, &target.id).await.unwrap();
        let reloaded = find_by_id(&pool, &target.id).await.unwrap().unwrap();
        assert_eq!(reloaded.like_count, 1);
    }
}
