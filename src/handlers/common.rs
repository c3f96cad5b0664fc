use axum::Json;
use axum::http::StatusCode;
use regex::Regex;
use serde::Serialize;
use serde_json::json;
use std::sync::OnceLock;
use tracing::error;

/// The JSON envelope every endpoint answers with.
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status_code: u16,
    pub data: T,
    pub message: String,
    pub success: bool,
}

pub fn ok<T: Serialize>(data: T, message: impl Into<String>) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        status_code: 200,
        data,
        message: message.into(),
        success: true,
    })
}

pub fn created<T: Serialize>(
    data: T,
    message: impl Into<String>,
) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        StatusCode::CREATED,
        Json(ApiResponse {
            status_code: 201,
            data,
            message: message.into(),
            success: true,
        }),
    )
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub status_code: u16,
    pub message: String,
    pub success: bool,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

pub fn api_err(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            status_code: status.as_u16(),
            message: message.into(),
            success: false,
        }),
    )
}

pub fn internal_err(e: anyhow::Error) -> ApiError {
    error!(error = ?e, "internal error");
    api_err(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
}

pub fn is_valid_email(email: &str) -> bool {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    let re = EMAIL_RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
    re.is_match(email)
}

/// Normalize page/limit query parameters: page >= 1, limit clamped to 1..=100.
pub fn normalize_page(page: Option<u32>, limit: Option<u32>) -> (u32, u32) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(10).clamp(1, 100);
    (page, limit)
}

pub async fn healthcheck() -> Json<ApiResponse<serde_json::Value>> {
    ok(json!({}), "Server running fine")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_shapes() {
        let Json(resp) = ok(json!({"x": 1}), "done");
        assert_eq!(resp.status_code, 200);
        assert!(resp.success);

        let (status, Json(body)) = api_err(StatusCode::NOT_FOUND, "missing");
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.status_code, 404);
        assert!(!body.success);
    }

    #[test]
    fn created_envelope_is_201() {
        let (status, Json(resp)) = created(json!({}), "made");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(resp.status_code, 201);
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.co"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn page_normalization() {
        assert_eq!(normalize_page(None, None), (1, 10));
        assert_eq!(normalize_page(Some(0), Some(0)), (1, 1));
        assert_eq!(normalize_page(Some(3), Some(500)), (3, 100));
        assert_eq!(normalize_page(Some(2), Some(25)), (2, 25));
    }
}
