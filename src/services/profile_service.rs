//! Profile reads and updates, including avatar storage on disk.

use std::path::Path;

use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{ProfileChanges, UserEntity},
    dto::profile::{AvatarResponse, ProfileResponse, UpdateProfileRequest},
    error::ServiceError,
    state::SharedState,
};

/// Public URL prefix under which the upload directory is served.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";
/// Largest accepted avatar payload.
pub const MAX_AVATAR_BYTES: usize = 2 * 1024 * 1024;

/// Image formats accepted as avatars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageKind {
    const ALL: [ImageKind; 4] = [Self::Png, Self::Jpeg, Self::Gif, Self::Webp];

    fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }

    fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(Self::Jpeg),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Identify the format from the file signature.
    fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(Self::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(Self::Webp)
        } else {
            None
        }
    }
}

/// Raw avatar file pulled out of the multipart body.
#[derive(Debug)]
pub struct AvatarUpload {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Accept only image payloads whose declared type and signature agree.
pub fn check_avatar(upload: &AvatarUpload) -> Result<ImageKind, ServiceError> {
    let declared = upload
        .content_type
        .as_deref()
        .and_then(ImageKind::from_mime)
        .ok_or_else(|| {
            ServiceError::InvalidInput("avatar must be a PNG, JPEG, GIF or WebP image".into())
        })?;

    if upload.bytes.is_empty() {
        return Err(ServiceError::InvalidInput("avatar file is empty".into()));
    }
    if upload.bytes.len() > MAX_AVATAR_BYTES {
        return Err(ServiceError::InvalidInput(format!(
            "avatar exceeds {MAX_AVATAR_BYTES} bytes"
        )));
    }

    match ImageKind::sniff(&upload.bytes) {
        Some(actual) if actual == declared => Ok(actual),
        _ => Err(ServiceError::InvalidInput(
            "avatar content does not match an image format".into(),
        )),
    }
}

/// Full profile of the authenticated user.
pub fn me(user: UserEntity) -> ProfileResponse {
    user.into()
}

/// Apply a partial profile update. A gamer tag held by another user is rejected without
/// touching the requester's record.
pub async fn update_profile(
    state: &SharedState,
    user: &UserEntity,
    request: UpdateProfileRequest,
) -> Result<ProfileResponse, ServiceError> {
    request.validate()?;
    let changes = ProfileChanges::from(request);
    if changes.is_empty() {
        return Ok(user.clone().into());
    }

    let store = state.require_store().await?;
    if let Some(Some(username)) = changes.username.as_ref() {
        if let Some(holder) = store.find_user_by_username(username.clone()).await? {
            if holder.id != user.id {
                return Err(ServiceError::InvalidInput("username already taken".into()));
            }
        }
    }

    let updated = store
        .update_profile(user.id, changes)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user `{}` not found", user.id)))?;
    info!(user_id = %updated.id, "profile updated");
    Ok(updated.into())
}

/// Store the avatar as `<avatar_dir>/<user id>.<ext>`, replacing any previous file.
pub async fn replace_avatar(
    state: &SharedState,
    user: &UserEntity,
    upload: AvatarUpload,
) -> Result<AvatarResponse, ServiceError> {
    let kind = check_avatar(&upload)?;
    let store = state.require_store().await?;

    let dir = state.config().avatar_dir();
    let file_name = format!("{}.{}", user.id, kind.extension());
    write_avatar_file(&dir, &file_name, &upload.bytes).await?;
    remove_stale_avatars(&dir, user.id, kind).await;

    let avatar_url = format!("{UPLOADS_URL_PREFIX}/avatars/{file_name}");
    store
        .set_avatar(user.id, avatar_url.clone())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user `{}` not found", user.id)))?;
    info!(user_id = %user.id, %avatar_url, "avatar replaced");

    Ok(AvatarResponse { avatar_url })
}

async fn write_avatar_file(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<(), ServiceError> {
    let io_error = |err: std::io::Error| ServiceError::Internal(format!("avatar write failed: {err}"));
    fs::create_dir_all(dir).await.map_err(io_error)?;

    let final_path = dir.join(file_name);
    let temp_path = dir.join(format!("{file_name}.part"));
    fs::write(&temp_path, bytes).await.map_err(io_error)?;
    fs::rename(&temp_path, &final_path).await.map_err(io_error)?;
    Ok(())
}

/// Delete this user's avatars stored under a different extension.
async fn remove_stale_avatars(dir: &Path, user_id: Uuid, keep: ImageKind) {
    for kind in ImageKind::ALL.into_iter().filter(|kind| *kind != keep) {
        let path = dir.join(format!("{user_id}.{}", kind.extension()));
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!(path = %path.display(), error = %err, "failed to remove stale avatar"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn upload(content_type: &str, bytes: &[u8]) -> AvatarUpload {
        AvatarUpload {
            content_type: Some(content_type.into()),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn accepts_png_with_matching_signature() {
        assert_eq!(check_avatar(&upload("image/png", PNG_HEADER)).unwrap(), ImageKind::Png);
    }

    #[test]
    fn rejects_non_image_mime() {
        assert!(check_avatar(&upload("text/plain", b"hello")).is_err());
        assert!(check_avatar(&upload("application/pdf", b"%PDF-1.7")).is_err());
    }

    #[test]
    fn rejects_spoofed_image_mime() {
        assert!(check_avatar(&upload("image/png", b"#!/bin/sh\necho hi")).is_err());
        assert!(check_avatar(&upload("image/jpeg", PNG_HEADER)).is_err());
    }

    #[test]
    fn rejects_missing_type_and_oversized_payload() {
        let missing = AvatarUpload {
            content_type: None,
            bytes: PNG_HEADER.to_vec(),
        };
        assert!(check_avatar(&missing).is_err());

        let mut big = PNG_HEADER.to_vec();
        big.resize(MAX_AVATAR_BYTES + 1, 0);
        assert!(check_avatar(&upload("image/png", &big)).is_err());
    }

    #[test]
    fn sniffs_webp_and_gif() {
        assert_eq!(ImageKind::sniff(b"RIFF\0\0\0\0WEBPVP8 "), Some(ImageKind::Webp));
        assert_eq!(ImageKind::sniff(b"GIF89a\x01\0"), Some(ImageKind::Gif));
        assert_eq!(ImageKind::sniff(b"RIFF"), None);
    }
}
