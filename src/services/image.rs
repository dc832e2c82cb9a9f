use anyhow::{Context, Result};
use chrono::Datelike;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::info;
use uuid::Uuid;

use crate::config::MediaConfig;

/// Writes uploaded files under a date-partitioned layout inside the media
/// root and hands back the stored path relative to it.
pub struct ImageService {
    media_root: PathBuf,
    placeholder: String,
}

impl ImageService {
    #[must_use]
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            media_root: PathBuf::from(&config.media_root),
            placeholder: config.placeholder_image.clone(),
        }
    }

    #[must_use]
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Store one uploaded file. The stored name is a fresh UUID with an
    /// extension taken from the original filename, falling back to the
    /// declared content type, then to "jpg".
    pub async fn save_upload(
        &self,
        original_name: Option<&str>,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<String> {
        let extension = extension_for(original_name, content_type);

        let today = chrono::Utc::now();
        let relative = format!(
            "images/{:04}/{:02}/{:02}/{}.{}",
            today.year(),
            today.month(),
            today.day(),
            Uuid::new_v4(),
            extension
        );

        let file_path = self.media_root.join(&relative);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        fs::write(&file_path, bytes)
            .await
            .with_context(|| format!("Failed to write image to {}", file_path.display()))?;

        info!(path = %file_path.display(), "Stored uploaded image");

        Ok(relative)
    }

    /// Best-effort removal of a stored file. The database row is the source
    /// of truth; a missing file is not an error. The placeholder and paths
    /// escaping the media root are never touched.
    pub async fn remove_file(&self, relative: &str) {
        if relative == self.placeholder || !is_safe_relative(relative) {
            return;
        }

        let file_path = self.media_root.join(relative);
        if let Err(e) = fs::remove_file(&file_path).await {
            tracing::debug!(path = %file_path.display(), "Could not remove image file: {e}");
        }
    }
}

fn extension_for(original_name: Option<&str>, content_type: Option<&str>) -> String {
    if let Some(name) = original_name
        && let Some(ext) = Path::new(name).extension().and_then(|e| e.to_str())
    {
        return ext.to_ascii_lowercase();
    }

    if let Some(content_type) = content_type
        && let Some(extensions) = mime_guess::get_mime_extensions_str(content_type)
        && let Some(ext) = extensions.first()
    {
        return (*ext).to_string();
    }

    "jpg".to_string()
}

fn is_safe_relative(path: &str) -> bool {
    let path = Path::new(path);
    !path.is_absolute()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_prefers_filename() {
        assert_eq!(
            extension_for(Some("photo.PNG"), Some("image/jpeg")),
            "png"
        );
    }

    #[test]
    fn test_extension_falls_back_to_content_type() {
        assert_eq!(extension_for(Some("photo"), Some("image/png")), "png");
    }

    #[test]
    fn test_extension_default() {
        assert_eq!(extension_for(None, None), "jpg");
    }

    #[test]
    fn test_safe_relative_paths() {
        assert!(is_safe_relative("images/2026/08/05/a.jpg"));
        assert!(!is_safe_relative("/etc/passwd"));
        assert!(!is_safe_relative("../outside.jpg"));
        assert!(!is_safe_relative("images/../../outside.jpg"));
    }
}
