use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::types::{OwnerSummary, TweetDto};

#[derive(sqlx::FromRow)]
struct TweetRow {
    id: String,
    content: String,
    created_at: String,
    like_count: i64,
    u_id: String,
    u_username: String,
    u_full_name: String,
    u_avatar_url: String,
}

impl TweetRow {
    fn into_dto(self) -> TweetDto {
        TweetDto {
            id: self.id,
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

const TWEET_SELECT: &str = "SELECT t.id, t.content, t.created_at, \
       (SELECT COUNT(*) FROM likes l WHERE l.tweet_id = t.id) AS like_count, \
       u.id AS u_id, u.username AS u_username, u.full_name AS u_full_name, u.avatar_url AS u_avatar_url \
     FROM tweets t JOIN users u ON u.id = t.owner_id";

pub async fn create_tweet(pool: &SqlitePool, owner_id: &str, content: &str) -> Result<TweetDto> {
    let id = Uuid::new_v4().to_string();

    sqlx::query("INSERT INTO tweets (id, owner_id, content) VALUES (?, ?, ?)")
        .bind(&id)
        .bind(owner_id)
        .bind(content)
        .execute(pool)
        .await?;

    info!("Tweet created: id={}", id);

    let tweet = find_by_id(pool, &id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("tweet vanished right after insert"))?;
    Ok(tweet)
}

pub async fn find_by_id(pool: &SqlitePool, tweet_id: &str) -> Result<Option<TweetDto>> {
    let row: Option<TweetRow> = sqlx::query_as(&format!("{} WHERE t.id = ?", TWEET_SELECT))
        .bind(tweet_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(TweetRow::into_dto))
}

pub async fn exists(pool: &SqlitePool, tweet_id: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tweets WHERE id = ?")
        .bind(tweet_id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// A user's tweets with owner summary and like counts, newest first.
pub async fn tweets_for_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<TweetDto>> {
    let rows: Vec<TweetRow> = sqlx::query_as(&format!(
        "{} WHERE t.owner_id = ? ORDER BY datetime(t.created_at) DESC",
        TWEET_SELECT
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(TweetRow::into_dto).collect())
}

pub async fn update_tweet(
    pool: &SqlitePool,
    tweet_id: &str,
    owner_id: &str,
    content: &str,
) -> Result<Option<TweetDto>> {
    let rows_affected = sqlx::query("UPDATE tweets SET content = ? WHERE id = ? AND owner_id = ?")
        .bind(content)
        .bind(tweet_id)
        .bind(owner_id)
        .execute(pool)
        .await?
        .rows_affected();

    if rows_affected == 0 {
        return Ok(None);
    }
    find_by_id(pool, tweet_id).await
}

pub async fn delete_tweet(pool: &SqlitePool, tweet_id: &str, owner_id: &str) -> Result<bool> {
    let rows_affected = sqlx::query("DELETE FROM tweets WHERE id = ? AND owner_id = ?")
        .bind(tweet_id)
        .bind(owner_id)
        .execute(pool)
        .await?
        .rows_affected();

    if rows_affected > 0 {
        info!("Tweet deleted: id={}", tweet_id);
    }
    Ok(rows_affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::likes;
    use crate::database::test_support::{seed_user, test_pool};

    #[tokio::test]
    async fn tweet_lifecycle() {
        let pool = test_pool().await;
        let alice = seed_user(&pool, "alice").await;
        let bob = seed_user(&pool, "bob").await;

        let tweet = create_tweet(&pool, &alice.id, "hello world").await.unwrap();
        assert_eq!(tweet.owner.username, "alice");

        let denied = update_tweet(&pool, &tweet.id, &bob.id, "hijacked").await.unwrap();
        assert!(denied.is_none());

        let updated = update_tweet(&pool, &tweet.id, &alice.id, "edited").await.unwrap().unwrap();
        assert_eq!(updated.content, "edited");

        assert!(!delete_tweet(&pool, &tweet.id, &bob.id).await.unwrap());
        assert!(delete_tweet(&pool, &tweet.id, &alice.id).await.unwrap());
        assert!(find_by_id(&pool, &tweet.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn user_tweets_carry_like_counts() {
        let pool = test_pool().await;
        let alice = seed_user(&pool, "alice").await;
        let fan = seed_user(&pool, "fan").await;

        let tweet = create_tweet(&pool, &alice.id, "first").await.unwrap();
        create_tweet(&pool, &alice.id, "second").await.unwrap();
        likes::toggle_tweet_like(&pool, &fan.id, &tweet.id).await.unwrap();

        let tweets = tweets_for_user(&pool, &alice.id).await.unwrap();
        assert_eq!(tweets.len(), 2);
        let first = tweets.iter().find(|t| t.content == "first").unwrap();
        assert_eq!(first.like_count, 1);
    }
}
