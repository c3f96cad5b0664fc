use anyhow::{Context, Result, anyhow};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::database;
use crate::handlers::common::{ApiError, api_err, internal_err};
use crate::types::{AppState, UserPublic};

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Claims carried by short-lived access tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub username: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Refresh tokens carry only the user id.
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| anyhow!("malformed password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub fn issue_access_token(auth: &AuthConfig, user: &UserPublic) -> Result<String> {
    let now = Utc::now().timestamp();
    let claims = AccessClaims {
        sub: user.id.clone(),
        username: user.username.clone(),
        email: user.email.clone(),
        iat: now,
        exp: now + auth.access_token_ttl_secs,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.access_token_secret.as_bytes()),
    )
    .context("Failed to sign access token")
}

pub fn issue_refresh_token(auth: &AuthConfig, user_id: &str) -> Result<String> {
    let now = Utc::now().timestamp();
    let claims = RefreshClaims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + auth.refresh_token_ttl_secs,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.refresh_token_secret.as_bytes()),
    )
    .context("Failed to sign refresh token")
}

pub fn decode_access_token(auth: &AuthConfig, token: &str) -> Result<AccessClaims> {
    let data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(auth.access_token_secret.as_bytes()),
        &Validation::default(),
    )
    .context("invalid access token")?;
    Ok(data.claims)
}

pub fn decode_refresh_token(auth: &AuthConfig, token: &str) -> Result<RefreshClaims> {
    let data = decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(auth.refresh_token_secret.as_bytes()),
        &Validation::default(),
    )
    .context("invalid refresh token")?;
    Ok(data.claims)
}

/// Serialize an HttpOnly auth cookie suitable for cross-site frontends.
pub fn auth_cookie(name: &str, value: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=None; Path=/; Max-Age={}",
        name, value, max_age_secs
    )
}

pub fn expired_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; Secure; SameSite=None; Path=/; Max-Age=0", name)
}

/// Pull a named cookie out of a Cookie header value.
pub fn cookie_value<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    for cookie in cookie_header.split(';') {
        let cookie = cookie.trim();
        if let Some(rest) = cookie.strip_prefix(name) {
            if let Some(val) = rest.strip_prefix('=') {
                return Some(val);
            }
        }
    }
    None
}

/// Looks for the token in the named cookie first, then falls back to an
/// Authorization bearer header.
pub fn token_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let cookie_header = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if let Some(token) = cookie_value(cookie_header, cookie_name) {
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.to_string())
}

/// Verifies the access token and injects the authenticated user into
/// request extensions for downstream handlers.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = token_from_headers(req.headers(), ACCESS_COOKIE) else {
        return Err(api_err(StatusCode::UNAUTHORIZED, "unauthorized request"));
    };

    let claims = decode_access_token(&state.config.auth, &token)
        .map_err(|_| api_err(StatusCode::UNAUTHORIZED, "invalid access token"))?;

    let user = database::users::find_public_by_id(&state.db_pool, &claims.sub)
        .await
        .map_err(internal_err)?
        .ok_or_else(|| api_err(StatusCode::UNAUTHORIZED, "invalid access token"))?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
