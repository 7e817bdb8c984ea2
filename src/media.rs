use bytes::Bytes;
use tracing::{error, info};
use uuid::Uuid;

use crate::{error::ApiError, storage::StorageClient};

/// Which profile image an upload is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Avatar,
    CoverImage,
}

impl MediaKind {
    /// Multipart field name.
    pub fn field(&self) -> &'static str {
        match self {
            MediaKind::Avatar => "avatar",
            MediaKind::CoverImage => "coverImage",
        }
    }

    /// Column on `users`.
    pub fn column(&self) -> &'static str {
        match self {
            MediaKind::Avatar => "avatar",
            MediaKind::CoverImage => "cover_image",
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            MediaKind::Avatar => "avatars",
            MediaKind::CoverImage => "covers",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Avatar => "Avatar",
            MediaKind::CoverImage => "Cover image",
        }
    }
}

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

/// Store one image and return its public URL.
pub async fn upload_media(
    storage: &dyn StorageClient,
    kind: MediaKind,
    item: UploadItem,
) -> Result<String, ApiError> {
    if item.body.is_empty() {
        return Err(ApiError::Upload(format!("{} file is empty", kind.label())));
    }
    let ext = ext_from_mime(&item.content_type).unwrap_or("bin");
    let key = format!("{}/{}.{}", kind.prefix(), Uuid::new_v4(), ext);
    let size = item.body.len();

    if let Err(e) = storage.put_object(&key, item.body, &item.content_type).await {
        error!(error = ?e, %key, "media upload failed");
        return Err(ApiError::Upload(format!(
            "Error while uploading {}",
            kind.label().to_lowercase()
        )));
    }

    info!(%key, size, "media uploaded");
    Ok(storage.object_url(&key))
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::fake::FakeStorage;

    fn png() -> UploadItem {
        UploadItem {
            body: Bytes::from_static(b"\x89PNG"),
            content_type: "image/png".into(),
        }
    }

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[tokio::test]
    async fn upload_returns_public_url() {
        let storage = FakeStorage::default();
        let url = upload_media(&storage, MediaKind::Avatar, png()).await.unwrap();
        let keys = storage.uploaded();
        assert_eq!(keys.len(), 1);
        assert!(keys[0].starts_with("avatars/") && keys[0].ends_with(".png"));
        assert_eq!(url, format!("https://fake.local/{}", keys[0]));
    }

    #[tokio::test]
    async fn storage_failure_is_upload_error() {
        let storage = FakeStorage::failing();
        let err = upload_media(&storage, MediaKind::CoverImage, png()).await.unwrap_err();
        assert!(matches!(err, ApiError::Upload(_)));
    }

    #[tokio::test]
    async fn empty_file_is_rejected_before_upload() {
        let storage = FakeStorage::default();
        let item = UploadItem {
            body: Bytes::new(),
            content_type: "image/png".into(),
        };
        let err = upload_media(&storage, MediaKind::Avatar, item).await.unwrap_err();
        assert!(matches!(err, ApiError::Upload(_)));
        assert!(storage.uploaded().is_empty());
    }
}
