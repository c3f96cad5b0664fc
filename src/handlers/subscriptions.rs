use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::json;

use crate::database::{subscriptions as db_subs, users as db_users};
use crate::handlers::common::{ApiError, ApiResponse, api_err, internal_err, ok};
use crate::types::{AppState, OwnerSummary, UserPublic};

/// Subscribing to yourself is never allowed.
fn ensure_not_own_channel(subscriber_id: &str, channel_id: &str) -> Result<(), ApiError> {
    if subscriber_id == channel_id {
        return Err(api_err(
            StatusCode::BAD_REQUEST,
            "cannot subscribe to your own channel",
        ));
    }
    Ok(())
}

pub async fn toggle_subscription(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
    Path(channel_id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    ensure_not_own_channel(&user.id, &channel_id)?;

    let channel = db_users::find_public_by_id(&state.db_pool, &channel_id)
        .await
        .map_err(internal_err)?;
    if channel.is_none() {
        return Err(api_err(StatusCode::NOT_FOUND, "channel not found"));
    }

    let subscribed = db_subs::toggle(&state.db_pool, &user.id, &channel_id)
        .await
        .map_err(internal_err)?;

    Ok(ok(json!({ "subscribed": subscribed }), "Subscription toggled"))
}

pub async fn get_channel_subscribers(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<OwnerSummary>>>, ApiError> {
    let channel = db_users::find_public_by_id(&state.db_pool, &channel_id)
        .await
        .map_err(internal_err)?;
    if channel.is_none() {
        return Err(api_err(StatusCode::NOT_FOUND, "channel not found"));
    }

    let subscribers = db_subs::channel_subscribers(&state.db_pool, &channel_id)
        .await
        .map_err(internal_err)?;
    Ok(ok(subscribers, "Subscribers fetched successfully"))
}

pub async fn get_subscribed_channels(
    State(state): State<AppState>,
    Path(subscriber_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<OwnerSummary>>>, ApiError> {
    let subscriber = db_users::find_public_by_id(&state.db_pool, &subscriber_id)
        .await
        .map_err(internal_err)?;
    if subscriber.is_none() {
        return Err(api_err(StatusCode::NOT_FOUND, "user not found"));
    }

    let channels = db_subs::subscribed_channels(&state.db_pool, &subscriber_id)
        .await
        .map_err(internal_err)?;
    Ok(ok(channels, "Subscribed channels fetched successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribing_to_own_channel_is_rejected() {
        let (status, _) = ensure_not_own_channel("user-1", "user-1").unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert!(ensure_not_own_channel("user-1", "user-2").is_ok());
    }
}
