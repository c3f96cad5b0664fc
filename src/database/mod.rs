pub mod comments;
pub mod likes;
pub mod playlists;
pub mod subscriptions;
pub mod tweets;
pub mod users;
pub mod videos;

use anyhow::{Context, Result};
use sqlx::{Sqlite, SqlitePool, migrate::MigrateDatabase};
use tracing::info;

pub async fn initialize_database(database_url: &str) -> Result<SqlitePool> {
    if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
        info!("Creating database: {}", database_url);
        Sqlite::create_database(database_url)
            .await
            .context("Failed to create database")?;
    }

    let db_pool = SqlitePool::connect(database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .context("Failed to run migrations")?;

    info!("Database initialized successfully");

    Ok(db_pool)
}

#[cfg(test)]
pub(crate) mod test_support {
    use sqlx::SqlitePool;
    use sqlx::sqlite::SqlitePoolOptions;

    use super::users;
    use crate::types::UserPublic;

    /// Single-connection pool so every test query hits the same :memory: db.
    pub async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    pub async fn seed_user(pool: &SqlitePool, username: &str) -> UserPublic {
        users::create_user(
            pool,
            users::NewUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                full_name: format!("{} example", username),
                password_hash: "$argon2id$fake".to_string(),
                avatar_url: format!("https://media.example.com/avatars/{}.png", username),
                cover_image_url: String::new(),
            },
        )
        .await
        .unwrap()
    }

    pub async fn seed_video(pool: &SqlitePool, owner_id: &str, title: &str) -> crate::types::VideoDto {
        super::videos::create_video(
            pool,
            super::videos::NewVideo {
                owner_id: owner_id.to_string(),
                title: title.to_string(),
                description: format!("{} description", title),
                video_url: format!("https://media.example.com/videos/{}.mp4", title),
                thumbnail_url: format!("https://media.example.com/thumbnails/{}.png", title),
                duration: 42.0,
            },
        )
        .await
        .unwrap()
    }
}
