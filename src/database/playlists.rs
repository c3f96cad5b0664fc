use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::types::{PlaylistDto, PlaylistSummary, PlaylistWithVideos, VideoDto};

pub async fn create_playlist(
    pool: &SqlitePool,
    owner_id: &str,
    name: &str,
    description: &str,
) -> Result<PlaylistDto> {
    let id = Uuid::new_v4().to_string();

    sqlx::query("INSERT INTO playlists (id, owner_id, name, description) VALUES (?, ?, ?, ?)")
        .bind(&id)
        .bind(owner_id)
        .bind(name)
        .bind(description)
        .execute(pool)
        .await?;

    info!("Playlist created: id={}, name={}", id, name);

    let playlist = find_dto_by_id(pool, &id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("playlist vanished right after insert"))?;
    Ok(playlist)
}

async fn find_dto_by_id(pool: &SqlitePool, playlist_id: &str) -> Result<Option<PlaylistDto>> {
    let playlist = sqlx::query_as::<_, PlaylistDto>(
        "SELECT id, owner_id, name, description, created_at FROM playlists WHERE id = ?",
    )
    .bind(playlist_id)
    .fetch_optional(pool)
    .await?;
    Ok(playlist)
}

/// A user's playlists with their video counts.
pub async fn playlists_for_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<PlaylistSummary>> {
    let playlists = sqlx::query_as::<_, PlaylistSummary>(
        "SELECT p.id, p.owner_id, p.name, p.description, p.created_at, \
           (SELECT COUNT(*) FROM playlist_videos pv WHERE pv.playlist_id = p.id) AS video_count \
         FROM playlists p WHERE p.owner_id = ? \
         ORDER BY datetime(p.created_at) DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(playlists)
}

/// Playlist plus its videos in insertion order.
pub async fn playlist_with_videos(
    pool: &SqlitePool,
    playlist_id: &str,
) -> Result<Option<PlaylistWithVideos>> {
    let Some(playlist) = find_dto_by_id(pool, playlist_id).await? else {
        return Ok(None);
    };

    let videos = sqlx::query_as::<_, VideoDto>(
        "SELECT v.id, v.owner_id, v.title, v.description, v.video_url, v.thumbnail_url, \
           v.duration, v.views, v.is_published, v.created_at \
         FROM playlist_videos pv JOIN videos v ON v.id = pv.video_id \
         WHERE pv.playlist_id = ? \
         ORDER BY pv.position",
    )
    .bind(playlist_id)
    .fetch_all(pool)
    .await?;

    Ok(Some(PlaylistWithVideos { playlist, videos }))
}

pub async fn update_playlist(
    pool: &SqlitePool,
    playlist_id: &str,
    owner_id: &str,
    name: Option<&str>,
    description: Option<&str>,
) -> Result<Option<PlaylistDto>> {
    let rows_affected = sqlx::query(
        "UPDATE playlists SET name = COALESCE(?, name), description = COALESCE(?, description) \
         WHERE id = ? AND owner_id = ?",
    )
    .bind(name)
    .bind(description)
    .bind(playlist_id)
    .bind(owner_id)
    .execute(pool)
    .await?
    .rows_affected();

    if rows_affected == 0 {
        return Ok(None);
    }
    find_dto_by_id(pool, playlist_id).await
}

pub async fn delete_playlist(pool: &SqlitePool, playlist_id: &str, owner_id: &str) -> Result<bool> {
    let rows_affected = sqlx::query("DELETE FROM playlists WHERE id = ? AND owner_id = ?")
        .bind(playlist_id)
        .bind(owner_id)
        .execute(pool)
        .await?
        .rows_affected();

    if rows_affected > 0 {
        info!("Playlist deleted: id={}", playlist_id);
    }
    Ok(rows_affected > 0)
}

/// Append a video at the next position. Adding the same video twice is a
/// no-op. Returns the refreshed playlist, or None when the playlist is
/// absent or not owned by the caller.
pub async fn add_video(
    pool: &SqlitePool,
    playlist_id: &str,
    owner_id: &str,
    video_id: &str,
) -> Result<Option<PlaylistWithVideos>> {
    let owned: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM playlists WHERE id = ? AND owner_id = ?")
            .bind(playlist_id)
            .bind(owner_id)
            .fetch_one(pool)
            .await?;
    if owned == 0 {
        return Ok(None);
    }

    sqlx::query(
        "INSERT OR IGNORE INTO playlist_videos (playlist_id, video_id, position) \
         VALUES (?1, ?2, \
           (SELECT COALESCE(MAX(position), 0) + 1 FROM playlist_videos WHERE playlist_id = ?1))",
    )
    .bind(playlist_id)
    .bind(video_id)
    .execute(pool)
    .await?;

    playlist_with_videos(pool, playlist_id).await
}

pub async fn remove_video(
    pool: &SqlitePool,
    playlist_id: &str,
    owner_id: &str,
    video_id: &str,
) -> Result<Option<PlaylistWithVideos>> {
    let owned: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM playlists WHERE id = ? AND owner_id = ?")
            .bind(playlist_id)
            .bind(owner_id)
            .fetch_one(pool)
            .await?;
    if owned == 0 {
        return Ok(None);
    }

    sqlx::query("DELETE FROM playlist_videos WHERE playlist_id = ? AND video_id = ?")
        .bind(playlist_id)
        .bind(video_id)
        .execute(pool)
        .await?;

    playlist_with_videos(pool, playlist_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::{seed_user, seed_video, test_pool};

    #[tokio::test]
    async fn playlist_crud() {
        let pool = test_pool().await;
        let alice = seed_user(&pool, "alice").await;
        let bob = seed_user(&pool, "bob").await;

        let playlist = create_playlist(&pool, &alice.id, "faves", "the good ones")
            .await
            .unwrap();

        let denied = update_playlist(&pool, &playlist.id, &bob.id, Some("stolen"), None)
            .await
            .unwrap();
        assert!(denied.is_none());

        let updated = update_playlist(&pool, &playlist.id, &alice.id, Some("favourites"), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "favourites");
        assert_eq!(updated.description, "the good ones");

        assert!(!delete_playlist(&pool, &playlist.id, &bob.id).await.unwrap());
        assert!(delete_playlist(&pool, &playlist.id, &alice.id).await.unwrap());
    }

    #[tokio::test]
    async fn videos_keep_insertion_order_and_dedupe() {
        let pool = test_pool().await;
        let alice = seed_user(&pool, "alice").await;
        let v1 = seed_video(&pool, &alice.id, "one").await;
        let v2 = seed_video(&pool, &alice.id, "two").await;
        let playlist = create_playlist(&pool, &alice.id, "faves", "").await.unwrap();

        add_video(&pool, &playlist.id, &alice.id, &v1.id).await.unwrap();
        add_video(&pool, &playlist.id, &alice.id, &v2.id).await.unwrap();
        // Duplicate add is a no-op
        let loaded = add_video(&pool, &playlist.id, &alice.id, &v1.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.videos.len(), 2);
        assert_eq!(loaded.videos[0].title, "one");
        assert_eq!(loaded.videos[1].title, "two");

        let loaded = remove_video(&pool, &playlist.id, &alice.id, &v1.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.videos.len(), 1);
        assert_eq!(loaded.videos[0].title, "two");
    }

    #[tokio::test]
    async fn add_video_requires_ownership() {
        let pool = test_pool().await;
        let alice = seed_user(&pool, "alice").await;
        let bob = seed_user(&pool, "bob").await;
        let video = seed_video(&pool, &alice.id, "clip").await;
        let playlist = create_playlist(&pool, &alice.id, "faves", "").await.unwrap();

        let denied = add_video(&pool, &playlist.id, &bob.id, &video.id).await.unwrap();
        assert!(denied.is_none());
    }

    #[tokio::test]
    async fn user_playlists_carry_counts() {
        let pool = test_pool().await;
        let alice = seed_user(&pool, "alice").await;
        let video = seed_video(&pool, &alice.id, "clip").await;
        let playlist = create_playlist(&pool, &alice.id, "faves", "").await.unwrap();
        create_playlist(&pool, &alice.id, "empty", "").await.unwrap();

        add_video(&pool, &playlist.id, &alice.id, &video.id).await.unwrap();

        let summaries = playlists_for_user(&pool, &alice.id).await.unwrap();
        assert_eq!(summaries.len(), 2);
        let faves = summaries.iter().find(|p| p.name == "faves").unwrap();
        assert_eq!(faves.video_count, 1);
    }
}
