use anyhow::{Context, Result};
use tracing::{info, warn};
use uuid::Uuid;

use crate::types::AppState;

/// Upload a media object (avatar, cover image, video file, thumbnail) and
/// return its public URL. The key keeps the original file extension so the
/// CDN serves a sensible content type.
pub async fn upload_media(
    state: &AppState,
    folder: &str,
    file_name: Option<&str>,
    bytes: Vec<u8>,
) -> Result<String> {
    let key = object_key(folder, file_name);

    state
        .s3
        .put_object()
        .bucket(&state.config.r2.bucket)
        .key(&key)
        .body(bytes.into())
        .send()
        .await
        .with_context(|| format!("Failed to upload {}", key))?;

    info!("Uploaded media object: {}", key);

    Ok(public_url(&state.config.r2.public_base_url, &key))
}

/// Delete the object behind a previously returned public URL. Failures are
/// logged, not returned; a dangling object never blocks a database update.
pub async fn delete_media(state: &AppState, url: &str) {
    if url.is_empty() {
        return;
    }

    let Some(key) = key_from_url(&state.config.r2.public_base_url, url) else {
        warn!("Not a managed media URL, skipping delete: {}", url);
        return;
    };

    match state
        .s3
        .delete_object()
        .bucket(&state.config.r2.bucket)
        .key(&key)
        .send()
        .await
    {
        Ok(_) => info!("Deleted media object: {}", key),
        Err(e) => warn!("Failed to delete media object {}: {}", key, e),
    }
}

fn object_key(folder: &str, file_name: Option<&str>) -> String {
    let ext = file_name
        .and_then(|n| n.rsplit_once('.'))
        .map(|(_, e)| e.to_ascii_lowercase())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()));

    match ext {
        Some(ext) => format!("{}/{}.{}", folder, Uuid::new_v4(), ext),
        None => format!("{}/{}", folder, Uuid::new_v4()),
    }
}

pub fn public_url(public_base_url: &str, key: &str) -> String {
    format!("{}/{}", public_base_url.trim_end_matches('/'), key)
}

pub fn key_from_url(public_base_url: &str, url: &str) -> Option<String> {
    let base = public_base_url.trim_end_matches('/');
    url.strip_prefix(base)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|key| !key.is_empty())
        .map(|key| key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_key_keeps_extension() {
        let key = object_key("avatars", Some("me.PNG"));
        assert!(key.starts_with("avatars/"));
        assert!(key.ends_with(".png"));
    }

    #[test]
    fn object_key_drops_suspicious_extension() {
        let key = object_key("videos", Some("clip.mp4?x=1"));
        assert!(!key.contains('?'));
        assert!(!key.ends_with(".mp4?x=1"));
    }

    #[test]
    fn object_key_without_filename() {
        let key = object_key("thumbnails", None);
        assert!(key.starts_with("thumbnails/"));
        assert!(!key.contains('.'));
    }

    #[test]
    fn public_url_and_key_roundtrip() {
        let base = "https://media.example.com/";
        let url = public_url(base, "avatars/abc.png");
        assert_eq!(url, "https://media.example.com/avatars/abc.png");
        assert_eq!(key_from_url(base, &url).as_deref(), Some("avatars/abc.png"));
    }

    #[test]
    fn key_from_url_rejects_foreign_hosts() {
        assert_eq!(
            key_from_url("https://media.example.com", "https://evil.example.com/x.png"),
            None
        );
    }
}
