use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::types::OwnerSummary;

/// Toggle the subscription of `subscriber_id` to `channel_id`. Returns the
/// new subscribed state.
pub async fn toggle(pool: &SqlitePool, subscriber_id: &str, channel_id: &str) -> Result<bool> {
    let deleted = sqlx::query("DELETE FROM subscriptions WHERE subscriber_id = ? AND channel_id = ?")
        .bind(subscriber_id)
        .bind(channel_id)
        .execute(pool)
        .await?
        .rows_affected();

    if deleted > 0 {
        info!(
            "Unsubscribed: subscriber={}, channel={}",
            subscriber_id, channel_id
        );
        return Ok(false);
    }

    sqlx::query("INSERT INTO subscriptions (id, subscriber_id, channel_id) VALUES (?, ?, ?)")
        .bind(Uuid::new_v4().to_string())
        .bind(subscriber_id)
        .bind(channel_id)
        .execute(pool)
        .await?;

    info!(
        "Subscribed: subscriber={}, channel={}",
        subscriber_id, channel_id
    );
    Ok(true)
}

/// Who subscribes to this channel.
pub async fn channel_subscribers(pool: &SqlitePool, channel_id: &str) -> Result<Vec<OwnerSummary>> {
    let subscribers = sqlx::query_as::<_, OwnerSummary>(
        "SELECT u.id, u.username, u.full_name, u.avatar_url \
         FROM subscriptions s JOIN users u ON u.id = s.subscriber_id \
         WHERE s.channel_id = ? \
         ORDER BY datetime(s.created_at) DESC",
    )
    .bind(channel_id)
    .fetch_all(pool)
    .await?;
    Ok(subscribers)
}

/// Which channels this user subscribes to.
pub async fn subscribed_channels(
    pool: &SqlitePool,
    subscriber_id: &str,
) -> Result<Vec<OwnerSummary>> {
    let channels = sqlx::query_as::<_, OwnerSummary>(
        "SELECT u.id, u.username, u.full_name, u.avatar_url \
         FROM subscriptions s JOIN users u ON u.id = s.channel_id \
         WHERE s.subscriber_id = ? \
         ORDER BY datetime(s.created_at) DESC",
    )
    .bind(subscriber_id)
    .fetch_all(pool)
    .await?;
    Ok(channels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::{seed_user, test_pool};

    #[tokio::test]
    async fn subscription_toggles_both_directions() {
        let pool = test_pool().await;
        let channel = seed_user(&pool, "channel").await;
        let fan = seed_user(&pool, "fan").await;

        assert!(toggle(&pool, &fan.id, &channel.id).await.unwrap());

        let subs = channel_subscribers(&pool, &channel.id).await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].username, "fan");

        let followed = subscribed_channels(&pool, &fan.id).await.unwrap();
        assert_eq!(followed.len(), 1);
        assert_eq!(followed[0].username, "channel");

        assert!(!toggle(&pool, &fan.id, &channel.id).await.unwrap());
        assert!(channel_subscribers(&pool, &channel.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn subscriber_lists_are_independent() {
        let pool = test_pool().await;
        let a = seed_user(&pool, "a").await;
        let b = seed_user(&pool, "b").await;

        toggle(&pool, &a.id, &b.id).await.unwrap();

        // a follows b, not the other way around
        assert_eq!(subscribed_channels(&pool, &a.id).await.unwrap().len(), 1);
        assert!(subscribed_channels(&pool, &b.id).await.unwrap().is_empty());
        assert!(channel_subscribers(&pool, &a.id).await.unwrap().is_empty());
    }
}
