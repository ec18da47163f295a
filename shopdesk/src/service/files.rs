//! Image uploads stored on local disk.

use std::path::{Path, PathBuf};

use crate::{
    error::AppError,
    model::files::{UploadLimitsDto, UploadedFileDto},
    state::AppState,
};

pub const ALLOWED_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg"];

/// Public path prefix uploaded files are served under.
pub const PUBLIC_PREFIX: &str = "/uploads";

const MIB: usize = 1024 * 1024;

/// The lowercased extension of `filename`, including the dot, if it is an allowed image type.
pub fn image_extension(filename: &str) -> Option<String> {
    let extension = Path::new(filename)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    let extension = format!(".{extension}");

    ALLOWED_EXTENSIONS
        .contains(&extension.as_str())
        .then_some(extension)
}

pub struct FileService<'a> {
    upload_dir: &'a Path,
    max_bytes: usize,
}

impl<'a> FileService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            upload_dir: &state.config.upload_dir,
            max_bytes: state.config.max_upload_bytes,
        }
    }

    pub fn too_large(&self) -> AppError {
        AppError::PayloadTooLarge(format!(
            "File too large. Maximum size allowed is {} MB",
            self.max_bytes / MIB
        ))
    }

    pub fn limits(&self) -> UploadLimitsDto {
        UploadLimitsDto {
            max_file_size_bytes: self.max_bytes,
            max_file_size_mb: self.max_bytes / MIB,
            allowed_types: ALLOWED_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
        }
    }

    /// Saves one upload under a fresh name.
    ///
    /// # Arguments
    /// - `original_name` - File name sent by the client; only its extension is kept
    /// - `bytes` - File content
    ///
    /// # Returns
    /// - `Ok(UploadedFileDto)` - Where the file is now served
    /// - `Err(AppError::PayloadTooLarge)` - Larger than the configured maximum
    /// - `Err(AppError::Validation)` - Not an allowed image type
    /// - `Err(AppError::IoErr)` - Could not write to the upload directory
    pub async fn store(&self, original_name: &str, bytes: &[u8]) -> Result<UploadedFileDto, AppError> {
        if bytes.len() > self.max_bytes {
            return Err(self.too_large());
        }

        let extension = image_extension(original_name).ok_or_else(|| {
            AppError::validation(format!(
                "Invalid file type. Allowed types: {}",
                ALLOWED_EXTENSIONS.join(", ")
            ))
        })?;

        tokio::fs::create_dir_all(self.upload_dir).await?;

        let filename = format!("{}{}", uuid::Uuid::new_v4(), extension);
        let path: PathBuf = self.upload_dir.join(&filename);
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!("Stored upload '{}' as {}", original_name, path.display());

        Ok(UploadedFileDto {
            url: format!("{PUBLIC_PREFIX}/{filename}"),
            filename,
            size: bytes.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_only_image_extensions() {
        assert_eq!(image_extension("photo.JPG").as_deref(), Some(".jpg"));
        assert_eq!(image_extension("logo.final.svg").as_deref(), Some(".svg"));
        assert_eq!(image_extension("script.php"), None);
        assert_eq!(image_extension("noextension"), None);
        assert_eq!(image_extension(".png"), None);
    }
}
