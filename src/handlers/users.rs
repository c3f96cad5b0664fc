use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::{HeaderMap, HeaderName, StatusCode, header},
    response::AppendHeaders,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::auth::{self, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::database::users as db_users;
use crate::handlers::common::{
    ApiError, ApiResponse, api_err, created, internal_err, is_valid_email, ok,
};
use crate::storage;
use crate::types::{
    AppState, ChannelProfile, LoginResponse, TokenPair, UserPublic, WatchHistoryEntry,
};

type CookieHeaders = AppendHeaders<[(HeaderName, String); 2]>;

fn auth_cookies(state: &AppState, access_token: &str, refresh_token: &str) -> CookieHeaders {
    AppendHeaders([
        (
            header::SET_COOKIE,
            auth::auth_cookie(
                ACCESS_COOKIE,
                access_token,
                state.config.auth.access_token_ttl_secs,
            ),
        ),
        (
            header::SET_COOKIE,
            auth::auth_cookie(
                REFRESH_COOKIE,
                refresh_token,
                state.config.auth.refresh_token_ttl_secs,
            ),
        ),
    ])
}

fn cleared_cookies() -> CookieHeaders {
    AppendHeaders([
        (header::SET_COOKIE, auth::expired_cookie(ACCESS_COOKIE)),
        (header::SET_COOKIE, auth::expired_cookie(REFRESH_COOKIE)),
    ])
}

/// Issue a fresh access/refresh pair and persist the refresh token on the
/// user row, invalidating any previously issued refresh token.
async fn issue_token_pair(
    state: &AppState,
    user: &UserPublic,
) -> Result<(String, String), ApiError> {
    let access_token = auth::issue_access_token(&state.config.auth, user).map_err(internal_err)?;
    let refresh_token =
        auth::issue_refresh_token(&state.config.auth, &user.id).map_err(internal_err)?;
    db_users::set_refresh_token(&state.db_pool, &user.id, Some(&refresh_token))
        .await
        .map_err(internal_err)?;
    Ok((access_token, refresh_token))
}

struct UploadedFile {
    file_name: Option<String>,
    bytes: Vec<u8>,
}

/// Scan a multipart body for a single named file field.
async fn read_file_field(
    multipart: &mut Multipart,
    want: &str,
) -> Result<Option<UploadedFile>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| api_err(StatusCode::BAD_REQUEST, "malformed multipart body"))?
    {
        if field.name() == Some(want) {
            let file_name = field.file_name().map(|s| s.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|_| api_err(StatusCode::BAD_REQUEST, "failed to read uploaded file"))?
                .to_vec();
            return Ok(Some(UploadedFile { file_name, bytes }));
        }
    }
    Ok(None)
}

pub async fn register_user(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<UserPublic>>), ApiError> {
    let mut username = String::new();
    let mut email = String::new();
    let mut full_name = String::new();
    let mut password = String::new();
    let mut avatar: Option<UploadedFile> = None;
    let mut cover_image: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| api_err(StatusCode::BAD_REQUEST, "malformed multipart body"))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "username" => {
                username = field
                    .text()
                    .await
                    .map_err(|_| api_err(StatusCode::BAD_REQUEST, "malformed multipart body"))?
            }
            "email" => {
                email = field
                    .text()
                    .await
                    .map_err(|_| api_err(StatusCode::BAD_REQUEST, "malformed multipart body"))?
            }
            "fullName" => {
                full_name = field
                    .text()
                    .await
                    .map_err(|_| api_err(StatusCode::BAD_REQUEST, "malformed multipart body"))?
            }
            "password" => {
                password = field
                    .text()
                    .await
                    .map_err(|_| api_err(StatusCode::BAD_REQUEST, "malformed multipart body"))?
            }
            "avatar" => {
                let file_name = field.file_name().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| api_err(StatusCode::BAD_REQUEST, "failed to read uploaded file"))?
                    .to_vec();
                avatar = Some(UploadedFile { file_name, bytes });
            }
            "coverImage" => {
                let file_name = field.file_name().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| api_err(StatusCode::BAD_REQUEST, "failed to read uploaded file"))?
                    .to_vec();
                cover_image = Some(UploadedFile { file_name, bytes });
            }
            _ => {}
        }
    }

    if [&username, &email, &full_name, &password]
        .iter()
        .any(|f| f.trim().is_empty())
    {
        return Err(api_err(StatusCode::BAD_REQUEST, "all fields are required"));
    }
    if !is_valid_email(&email) {
        return Err(api_err(StatusCode::BAD_REQUEST, "email format is not valid"));
    }

    if db_users::username_or_email_taken(&state.db_pool, &username, &email)
        .await
        .map_err(internal_err)?
    {
        return Err(api_err(
            StatusCode::CONFLICT,
            "username or email already exists",
        ));
    }

    let Some(avatar) = avatar else {
        return Err(api_err(StatusCode::BAD_REQUEST, "avatar file is required"));
    };
    if avatar.bytes.is_empty() {
        return Err(api_err(StatusCode::BAD_REQUEST, "avatar file is required"));
    }

    let avatar_url = storage::upload_media(&state, "avatars", avatar.file_name.as_deref(), avatar.bytes)
        .await
        .map_err(internal_err)?;

    let cover_image_url = match cover_image.filter(|f| !f.bytes.is_empty()) {
        Some(file) => storage::upload_media(&state, "covers", file.file_name.as_deref(), file.bytes)
            .await
            .map_err(internal_err)?,
        None => String::new(),
    };

    let password_hash = auth::hash_password(&password).map_err(internal_err)?;

    let user = db_users::create_user(
        &state.db_pool,
        db_users::NewUser {
            username,
            email,
            full_name,
            password_hash,
            avatar_url,
            cover_image_url,
        },
    )
    .await
    .map_err(internal_err)?;

    Ok(created(user, "User created successfully"))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

pub async fn login_user(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieHeaders, Json<ApiResponse<LoginResponse>>), ApiError> {
    if body.username.is_none() && body.email.is_none() {
        return Err(api_err(
            StatusCode::BAD_REQUEST,
            "username or email is required",
        ));
    }

    let account = db_users::find_auth_by_identifier(
        &state.db_pool,
        body.username.as_deref(),
        body.email.as_deref(),
    )
    .await
    .map_err(internal_err)?
    .ok_or_else(|| {
        api_err(
            StatusCode::NOT_FOUND,
            "user does not exist with this username or email",
        )
    })?;

    let password_ok =
        auth::verify_password(&body.password, &account.password_hash).map_err(internal_err)?;
    if !password_ok {
        return Err(api_err(StatusCode::UNAUTHORIZED, "password is not correct"));
    }

    let user = db_users::find_public_by_id(&state.db_pool, &account.id)
        .await
        .map_err(internal_err)?
        .ok_or_else(|| api_err(StatusCode::NOT_FOUND, "user not found"))?;

    let (access_token, refresh_token) = issue_token_pair(&state, &user).await?;

    info!("User logged in: id={}, username={}", user.id, user.username);

    let cookies = auth_cookies(&state, &access_token, &refresh_token);
    Ok((
        cookies,
        ok(
            LoginResponse {
                user,
                access_token,
                refresh_token,
            },
            "User logged in successfully",
        ),
    ))
}

pub async fn logout_user(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
) -> Result<(CookieHeaders, Json<ApiResponse<serde_json::Value>>), ApiError> {
    db_users::set_refresh_token(&state.db_pool, &user.id, None)
        .await
        .map_err(internal_err)?;

    info!("User logged out: id={}", user.id);

    Ok((cleared_cookies(), ok(json!({}), "User logged out")))
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// A verified refresh token must also be the one currently stored for the
/// account. A token that is not the stored one has been rotated out, either
/// by a newer login or by reuse of a stolen token.
fn ensure_refresh_token_current(stored: Option<&str>, incoming: &str) -> Result<(), ApiError> {
    if stored != Some(incoming) {
        return Err(api_err(StatusCode::UNAUTHORIZED, "refresh token is expired"));
    }
    Ok(())
}

pub async fn refresh_access_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> Result<(CookieHeaders, Json<ApiResponse<TokenPair>>), ApiError> {
    let incoming = auth::token_from_headers(&headers, REFRESH_COOKIE)
        .or_else(|| body.and_then(|Json(b)| b.refresh_token))
        .ok_or_else(|| api_err(StatusCode::UNAUTHORIZED, "unauthorized request"))?;

    let claims = auth::decode_refresh_token(&state.config.auth, &incoming)
        .map_err(|_| api_err(StatusCode::UNAUTHORIZED, "invalid refresh token"))?;

    let account = db_users::find_auth_by_id(&state.db_pool, &claims.sub)
        .await
        .map_err(internal_err)?
        .ok_or_else(|| api_err(StatusCode::UNAUTHORIZED, "invalid refresh token"))?;

    ensure_refresh_token_current(account.refresh_token.as_deref(), &incoming)?;

    let user = db_users::find_public_by_id(&state.db_pool, &account.id)
        .await
        .map_err(internal_err)?
        .ok_or_else(|| api_err(StatusCode::UNAUTHORIZED, "invalid refresh token"))?;

    let (access_token, refresh_token) = issue_token_pair(&state, &user).await?;

    let cookies = auth_cookies(&state, &access_token, &refresh_token);
    Ok((
        cookies,
        ok(
            TokenPair {
                access_token,
                refresh_token,
            },
            "Access token refreshed",
        ),
    ))
}

pub async fn get_current_user(
    Extension(user): Extension<UserPublic>,
) -> Json<ApiResponse<UserPublic>> {
    ok(user, "current user fetched successfully")
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<UserPublic>>, ApiError> {
    let user = db_users::find_public_by_id(&state.db_pool, &user_id)
        .await
        .map_err(internal_err)?
        .ok_or_else(|| api_err(StatusCode::NOT_FOUND, "user not found"))?;
    Ok(ok(user, "User found successfully"))
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if body.old_password.is_empty() || body.new_password.is_empty() {
        return Err(api_err(StatusCode::BAD_REQUEST, "all fields are required"));
    }

    let account = db_users::find_auth_by_id(&state.db_pool, &user.id)
        .await
        .map_err(internal_err)?
        .ok_or_else(|| api_err(StatusCode::NOT_FOUND, "user not found"))?;

    let password_ok =
        auth::verify_password(&body.old_password, &account.password_hash).map_err(internal_err)?;
    if !password_ok {
        return Err(api_err(
            StatusCode::BAD_REQUEST,
            "old password is not correct",
        ));
    }

    let new_hash = auth::hash_password(&body.new_password).map_err(internal_err)?;
    db_users::update_password(&state.db_pool, &user.id, &new_hash)
        .await
        .map_err(internal_err)?;

    Ok(ok(json!({}), "password changed successfully"))
}

#[derive(Deserialize)]
pub struct UpdateAccountRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
}

pub async fn update_account_details(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
    Json(body): Json<UpdateAccountRequest>,
) -> Result<Json<ApiResponse<UserPublic>>, ApiError> {
    if let Some(email) = body.email.as_deref() {
        if !is_valid_email(email) {
            return Err(api_err(StatusCode::BAD_REQUEST, "email format is not valid"));
        }
        if db_users::email_taken_by_other(&state.db_pool, &user.id, email)
            .await
            .map_err(internal_err)?
        {
            return Err(api_err(StatusCode::CONFLICT, "email already exists"));
        }
    }

    let updated = db_users::update_account_details(
        &state.db_pool,
        &user.id,
        body.full_name.as_deref(),
        body.email.as_deref(),
    )
    .await
    .map_err(internal_err)?
    .ok_or_else(|| api_err(StatusCode::NOT_FOUND, "user not found"))?;

    Ok(ok(updated, "account details updated successfully"))
}

pub async fn update_user_avatar(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UserPublic>>, ApiError> {
    let Some(file) = read_file_field(&mut multipart, "avatar").await? else {
        return Err(api_err(StatusCode::BAD_REQUEST, "avatar file is required"));
    };
    if file.bytes.is_empty() {
        return Err(api_err(StatusCode::BAD_REQUEST, "avatar file is required"));
    }

    let avatar_url = storage::upload_media(&state, "avatars", file.file_name.as_deref(), file.bytes)
        .await
        .map_err(internal_err)?;

    storage::delete_media(&state, &user.avatar_url).await;

    let updated = db_users::update_avatar(&state.db_pool, &user.id, &avatar_url)
        .await
        .map_err(internal_err)?
        .ok_or_else(|| api_err(StatusCode::NOT_FOUND, "user not found"))?;

    Ok(ok(updated, "User avatar updated successfully"))
}

pub async fn update_user_cover_image(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UserPublic>>, ApiError> {
    let Some(file) = read_file_field(&mut multipart, "coverImage").await? else {
        return Err(api_err(
            StatusCode::BAD_REQUEST,
            "coverImage file is required",
        ));
    };
    if file.bytes.is_empty() {
        return Err(api_err(
            StatusCode::BAD_REQUEST,
            "coverImage file is required",
        ));
    }

    let cover_image_url =
        storage::upload_media(&state, "covers", file.file_name.as_deref(), file.bytes)
            .await
            .map_err(internal_err)?;

    storage::delete_media(&state, &user.cover_image_url).await;

    let updated = db_users::update_cover_image(&state.db_pool, &user.id, &cover_image_url)
        .await
        .map_err(internal_err)?
        .ok_or_else(|| api_err(StatusCode::NOT_FOUND, "user not found"))?;

    Ok(ok(updated, "User cover image updated successfully"))
}

pub async fn get_user_channel_profile(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<ChannelProfile>>, ApiError> {
    if username.trim().is_empty() {
        return Err(api_err(StatusCode::BAD_REQUEST, "username is missing"));
    }

    let profile = db_users::channel_profile(&state.db_pool, &username, &user.id)
        .await
        .map_err(internal_err)?
        .ok_or_else(|| api_err(StatusCode::NOT_FOUND, "channel does not exist"))?;

    Ok(ok(profile, "Channel found successfully"))
}

pub async fn get_watch_history(
    State(state): State<AppState>,
    Extension(user): Extension<UserPublic>,
) -> Result<Json<ApiResponse<Vec<WatchHistoryEntry>>>, ApiError> {
    let history = db_users::watch_history(&state.db_pool, &user.id)
        .await
        .map_err(internal_err)?;
    Ok(ok(history, "watch history fetched successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;

    fn test_auth_config() -> AuthConfig {
        AuthConfig {
            access_token_secret: "access-secret".to_string(),
            refresh_token_secret: "refresh-secret".to_string(),
            access_token_ttl_secs: 3600,
            refresh_token_ttl_secs: 36000,
        }
    }

    #[test]
    fn rotated_out_refresh_token_is_rejected() {
        let cfg = test_auth_config();
        let stored = auth::issue_refresh_token(&cfg, "user-1").unwrap();

        // An earlier token for the same user, still cryptographically valid
        let mut old_cfg = test_auth_config();
        old_cfg.refresh_token_ttl_secs = 7200;
        let rotated_out = auth::issue_refresh_token(&old_cfg, "user-1").unwrap();
        assert!(auth::decode_refresh_token(&cfg, &rotated_out).is_ok());
        assert_ne!(stored, rotated_out);

        assert!(ensure_refresh_token_current(Some(&stored), &stored).is_ok());

        let (status, _) =
            ensure_refresh_token_current(Some(&stored), &rotated_out).unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn refresh_rejected_after_logout() {
        let cfg = test_auth_config();
        let token = auth::issue_refresh_token(&cfg, "user-1").unwrap();

        // Logout clears the stored token; nothing should pass afterwards
        let (status, _) = ensure_refresh_token_current(None, &token).unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
