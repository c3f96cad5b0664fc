use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::types::{ChannelProfile, OwnerSummary, UserPublic, VideoDto, WatchHistoryEntry};

const PUBLIC_COLUMNS: &str =
    "id, username, email, full_name, avatar_url, cover_image_url, created_at";

pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar_url: String,
    pub cover_image_url: String,
}

/// Credential-side view of a user, only ever handed to the auth flows.
#[derive(sqlx::FromRow)]
pub struct UserAuth {
    pub id: String,
    pub password_hash: String,
    pub refresh_token: Option<String>,
}

pub async fn create_user(pool: &SqlitePool, new_user: NewUser) -> Result<UserPublic> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO users (id, username, email, full_name, password_hash, avatar_url, cover_image_url) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&new_user.username)
    .bind(&new_user.email)
    .bind(&new_user.full_name)
    .bind(&new_user.password_hash)
    .bind(&new_user.avatar_url)
    .bind(&new_user.cover_image_url)
    .execute(pool)
    .await?;

    info!("User created: id={}, username={}", id, new_user.username);

    let user = find_public_by_id(pool, &id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user vanished right after insert"))?;
    Ok(user)
}

pub async fn find_public_by_id(pool: &SqlitePool, user_id: &str) -> Result<Option<UserPublic>> {
    let user = sqlx::query_as::<_, UserPublic>(&format!(
        "SELECT {} FROM users WHERE id = ?",
        PUBLIC_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn username_or_email_taken(
    pool: &SqlitePool,
    username: &str,
    email: &str,
) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ? OR email = ?")
            .bind(username)
            .bind(email)
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}

/// True when another account already holds this email.
pub async fn email_taken_by_other(pool: &SqlitePool, user_id: &str, email: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ? AND id != ?")
        .bind(email)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Look a user up by username or email for login.
pub async fn find_auth_by_identifier(
    pool: &SqlitePool,
    username: Option<&str>,
    email: Option<&str>,
) -> Result<Option<UserAuth>> {
    let row = sqlx::query_as::<_, UserAuth>(
        "SELECT id, password_hash, refresh_token FROM users \
         WHERE (?1 IS NOT NULL AND username = ?1) OR (?2 IS NOT NULL AND email = ?2)",
    )
    .bind(username)
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn find_auth_by_id(pool: &SqlitePool, user_id: &str) -> Result<Option<UserAuth>> {
    let row = sqlx::query_as::<_, UserAuth>(
        "SELECT id, password_hash, refresh_token FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn set_refresh_token(
    pool: &SqlitePool,
    user_id: &str,
    refresh_token: Option<&str>,
) -> Result<()> {
    sqlx::query("UPDATE users SET refresh_token = ? WHERE id = ?")
        .bind(refresh_token)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_password(pool: &SqlitePool, user_id: &str, password_hash: &str) -> Result<()> {
    sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
        .bind(password_hash)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Absent fields keep their current values.
pub async fn update_account_details(
    pool: &SqlitePool,
    user_id: &str,
    full_name: Option<&str>,
    email: Option<&str>,
) -> Result<Option<UserPublic>> {
    sqlx::query(
        "UPDATE users SET full_name = COALESCE(?, full_name), email = COALESCE(?, email) \
         WHERE id = ?",
    )
    .bind(full_name)
    .bind(email)
    .bind(user_id)
    .execute(pool)
    .await?;

    find_public_by_id(pool, user_id).await
}

pub async fn update_avatar(
    pool: &SqlitePool,
    user_id: &str,
    avatar_url: &str,
) -> Result<Option<UserPublic>> {
    sqlx::query("UPDATE users SET avatar_url = ? WHERE id = ?")
        .bind(avatar_url)
        .bind(user_id)
        .execute(pool)
        .await?;
    find_public_by_id(pool, user_id).await
}

pub async fn update_cover_image(
    pool: &SqlitePool,
    user_id: &str,
    cover_image_url: &str,
) -> Result<Option<UserPublic>> {
    sqlx::query("UPDATE users SET cover_image_url = ? WHERE id = ?")
        .bind(cover_image_url)
        .bind(user_id)
        .execute(pool)
        .await?;
    find_public_by_id(pool, user_id).await
}

/// Channel profile with subscriber counts and the viewer's subscription
/// state, computed with three correlated subqueries.
pub async fn channel_profile(
    pool: &SqlitePool,
    username: &str,
    viewer_id: &str,
) -> Result<Option<ChannelProfile>> {
    let profile = sqlx::query_as::<_, ChannelProfile>(
        "SELECT u.id, u.username, u.full_name, u.email, u.avatar_url, u.cover_image_url, \
           (SELECT COUNT(*) FROM subscriptions s WHERE s.channel_id = u.id) AS subscriber_count, \
           (SELECT COUNT(*) FROM subscriptions s WHERE s.subscriber_id = u.id) AS channel_subscribed_to_count, \
           EXISTS(SELECT 1 FROM subscriptions s WHERE s.channel_id = u.id AND s.subscriber_id = ?) AS is_subscribed \
         FROM users u WHERE u.username = ?",
    )
    .bind(viewer_id)
    .bind(username)
    .fetch_optional(pool)
    .await?;
    Ok(profile)
}

#[derive(sqlx::FromRow)]
struct WatchHistoryRow {
    watched_at: String,
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

/// Watch history, most recent first, each video joined with its owner
/// summary.
pub async fn watch_history(pool: &SqlitePool, user_id: &str) -> Result<Vec<WatchHistoryEntry>> {
    let rows: Vec<WatchHistoryRow> = sqlx::query_as(
        "SELECT h.watched_at, \
           v.id, v.owner_id, v.title, v.description, v.video_url, v.thumbnail_url, \
           v.duration, v.views, v.is_published, v.created_at, \
           u.id AS u_id, u.username AS u_username, u.full_name AS u_full_name, u.avatar_url AS u_avatar_url \
         FROM watch_history h \
         JOIN videos v ON v.id = h.video_id \
         JOIN users u ON u.id = v.owner_id \
         WHERE h.user_id = ? \
         ORDER BY datetime(h.watched_at) DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| WatchHistoryEntry {
            watched_at: r.watched_at,
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
    use crate::database::test_support::{seed_user, seed_video, test_pool};
    use crate::database::{subscriptions, videos};

    #[tokio::test]
    async fn create_and_find_user() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "alice").await;

        let found = find_public_by_id(&pool, &user.id).await.unwrap().unwrap();
        assert_eq!(found.username, "alice");
        assert_eq!(found.email, "alice@example.com");
    }

    #[tokio::test]
    async fn email_change_collision_detected() {
        let pool = test_pool().await;
        let alice = seed_user(&pool, "alice").await;
        seed_user(&pool, "bob").await;

        // Another account's address conflicts; keeping your own does not
        assert!(
            email_taken_by_other(&pool, &alice.id, "bob@example.com")
                .await
                .unwrap()
        );
        assert!(
            !email_taken_by_other(&pool, &alice.id, "alice@example.com")
                .await
                .unwrap()
        );
        assert!(
            !email_taken_by_other(&pool, &alice.id, "new@example.com")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn username_check_is_case_insensitive() {
        let pool = test_pool().await;
        seed_user(&pool, "alice").await;

        assert!(
            username_or_email_taken(&pool, "ALICE", "other@example.com")
                .await
                .unwrap()
        );
        assert!(
            !username_or_email_taken(&pool, "bob", "bob@example.com")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn login_lookup_by_username_or_email() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "alice").await;

        let by_name = find_auth_by_identifier(&pool, Some("alice"), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_name.id, user.id);

        let by_email = find_auth_by_identifier(&pool, None, Some("alice@example.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, user.id);

        assert!(
            find_auth_by_identifier(&pool, Some("nobody"), None)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn refresh_token_set_and_clear() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "alice").await;

        set_refresh_token(&pool, &user.id, Some("tok-1")).await.unwrap();
        let auth = find_auth_by_id(&pool, &user.id).await.unwrap().unwrap();
        assert_eq!(auth.refresh_token.as_deref(), Some("tok-1"));

        set_refresh_token(&pool, &user.id, None).await.unwrap();
        let auth = find_auth_by_id(&pool, &user.id).await.unwrap().unwrap();
        assert!(auth.refresh_token.is_none());
    }

    #[tokio::test]
    async fn account_details_partial_update() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "alice").await;

        let updated = update_account_details(&pool, &user.id, Some("Alice B"), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.full_name, "Alice B");
        assert_eq!(updated.email, "alice@example.com");
    }

    #[tokio::test]
    async fn channel_profile_counts_and_flag() {
        let pool = test_pool().await;
        let channel = seed_user(&pool, "channel").await;
        let fan = seed_user(&pool, "fan").await;
        let other = seed_user(&pool, "other").await;

        subscriptions::toggle(&pool, &fan.id, &channel.id).await.unwrap();
        subscriptions::toggle(&pool, &other.id, &channel.id).await.unwrap();
        subscriptions::toggle(&pool, &channel.id, &fan.id).await.unwrap();

        let profile = channel_profile(&pool, "channel", &fan.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.subscriber_count, 2);
        assert_eq!(profile.channel_subscribed_to_count, 1);
        assert!(profile.is_subscribed);

        let profile = channel_profile(&pool, "channel", &channel.id)
            .await
            .unwrap()
            .unwrap();
        assert!(!profile.is_subscribed);
    }

    #[tokio::test]
    async fn watch_history_dedupes_and_orders() {
        let pool = test_pool().await;
        let owner = seed_user(&pool, "owner").await;
        let viewer = seed_user(&pool, "viewer").await;
        let first = seed_video(&pool, &owner.id, "first").await;
        let second = seed_video(&pool, &owner.id, "second").await;

        videos::record_watch(&pool, &viewer.id, &first.id).await.unwrap();
        videos::record_watch(&pool, &viewer.id, &second.id).await.unwrap();
        // Re-watch must not add a second row
        videos::record_watch(&pool, &viewer.id, &first.id).await.unwrap();

        let history = watch_history(&pool, &viewer.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].owner.username, "owner");
    }
}
