mod auth;
mod config;
mod database;
mod handlers;
mod storage;
mod types;

use anyhow::{Context, Result};
use aws_sdk_s3::{Client as S3Client, config::Region};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, patch, post},
};
use std::net::SocketAddr;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use types::AppState;

fn cors_layer(cors_origin: Option<&str>) -> Result<CorsLayer> {
    let origin = match cors_origin {
        Some(origin) => AllowOrigin::exact(
            origin
                .parse::<HeaderValue>()
                .context("invalid cors_origin in config")?,
        ),
        None => AllowOrigin::mirror_request(),
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true))
}

fn api_router(state: AppState) -> Result<Router> {
    let public_routes = Router::new()
        .route("/healthcheck", get(handlers::common::healthcheck))
        .route("/users/register", post(handlers::users::register_user))
        .route("/users/login", post(handlers::users::login_user))
        .route(
            "/users/refresh-token",
            post(handlers::users::refresh_access_token),
        )
        .route("/users/userid/{user_id}", get(handlers::users::get_user))
        .route(
            "/comments/{video_id}",
            get(handlers::comments::get_video_comments),
        );

    let protected_routes = Router::new()
        .route("/users/logout", post(handlers::users::logout_user))
        .route(
            "/users/get-current-user",
            get(handlers::users::get_current_user),
        )
        .route(
            "/users/change-password",
            patch(handlers::users::change_password),
        )
        .route(
            "/users/change-account-details",
            patch(handlers::users::update_account_details),
        )
        .route(
            "/users/change-avatar",
            patch(handlers::users::update_user_avatar),
        )
        .route(
            "/users/change-cover-image",
            patch(handlers::users::update_user_cover_image),
        )
        .route(
            "/users/channel-profile/{username}",
            get(handlers::users::get_user_channel_profile),
        )
        .route("/users/history", get(handlers::users::get_watch_history))
        .route(
            "/videos",
            get(handlers::videos::get_all_videos).post(handlers::videos::publish_video),
        )
        .route(
            "/videos/{video_id}",
            get(handlers::videos::get_video_by_id)
                .patch(handlers::videos::update_video)
                .delete(handlers::videos::delete_video),
        )
        .route(
            "/videos/toggle/publish/{video_id}",
            patch(handlers::videos::toggle_publish_status),
        )
        .route("/comments/{video_id}", post(handlers::comments::add_comment))
        .route(
            "/comments/c/{comment_id}",
            patch(handlers::comments::update_comment).delete(handlers::comments::delete_comment),
        )
        .route(
            "/likes/toggle/v/{video_id}",
            post(handlers::likes::toggle_video_like),
        )
        .route(
            "/likes/toggle/c/{comment_id}",
            post(handlers::likes::toggle_comment_like),
        )
        .route(
            "/likes/toggle/t/{tweet_id}",
            post(handlers::likes::toggle_tweet_like),
        )
        .route("/likes/videos", get(handlers::likes::get_liked_videos))
        .route(
            "/subscriptions/c/{channel_id}",
            post(handlers::subscriptions::toggle_subscription)
                .get(handlers::subscriptions::get_channel_subscribers),
        )
        .route(
            "/subscriptions/u/{subscriber_id}",
            get(handlers::subscriptions::get_subscribed_channels),
        )
        .route("/playlist", post(handlers::playlists::create_playlist))
        .route(
            "/playlist/user/{user_id}",
            get(handlers::playlists::get_user_playlists),
        )
        .route(
            "/playlist/{playlist_id}",
            get(handlers::playlists::get_playlist_by_id)
                .patch(handlers::playlists::update_playlist)
                .delete(handlers::playlists::delete_playlist),
        )
        .route(
            "/playlist/add/{video_id}/{playlist_id}",
            patch(handlers::playlists::add_video_to_playlist),
        )
        .route(
            "/playlist/remove/{video_id}/{playlist_id}",
            patch(handlers::playlists::remove_video_from_playlist),
        )
        .route("/tweets", post(handlers::tweets::create_tweet))
        .route(
            "/tweets/user/{user_id}",
            get(handlers::tweets::get_user_tweets),
        )
        .route(
            "/tweets/{tweet_id}",
            patch(handlers::tweets::update_tweet).delete(handlers::tweets::delete_tweet),
        )
        .route("/dashboard/stats", get(handlers::dashboard::get_channel_stats))
        .route(
            "/dashboard/videos",
            get(handlers::dashboard::get_channel_videos),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    let api_routes = Router::new().merge(public_routes).merge(protected_routes);

    let max_body_bytes = state.config.server.max_body_bytes;
    let cors = cors_layer(state.config.server.cors_origin.as_deref())?;

    Ok(Router::new()
        .nest("/api/v1", api_routes)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,videotube=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load("config.yml").await?;

    let s3_config = aws_sdk_s3::config::Builder::new()
        .endpoint_url(&config.r2.endpoint)
        .region(Region::new("auto"))
        .credentials_provider(aws_sdk_s3::config::Credentials::new(
            &config.r2.access_key_id,
            &config.r2.secret_access_key,
            None,
            None,
            "r2",
        ))
        .build();
    let s3 = S3Client::from_conf(s3_config);

    let db_pool = database::initialize_database(&config.database.url).await?;

    let host = config.server.host.clone();
    let port = config.server.port;

    let state = AppState {
        config,
        s3,
        db_pool,
    };

    let app = api_router(state)?;

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("invalid host/port in config")?;
    info!("listening on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server error")?;
    Ok(())
}
