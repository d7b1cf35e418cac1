//! Spooling of multipart file fields to the local temp directory.
//!
//! Uploaded files land on disk first and are handed to the media host as
//! paths; the media host removes the temp file after its upload attempt.

use std::path::{Path, PathBuf};

use axum::extract::multipart::Field;
use tracing::debug;
use uuid::Uuid;

use crate::utils::envelope::ApiError;

/// Writes a multipart file field to `temp_dir` under a collision-free name
/// and returns the path.
pub async fn spool_field(field: Field<'_>, temp_dir: &Path) -> Result<PathBuf, ApiError> {
    let original = field
        .file_name()
        .map(sanitize_file_name)
        .unwrap_or_else(|| "upload".to_string());

    let path = temp_dir.join(format!("{}-{}", Uuid::new_v4(), original));

    let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::bad_request(format!("failed to read uploaded file: {}", e)))?;

    if bytes.is_empty() {
        return Err(ApiError::bad_request("uploaded file is empty"));
    }

    tokio::fs::write(&path, &bytes).await.map_err(|e| {
        tracing::error!("failed to spool upload to {}: {}", path.display(), e);
        ApiError::internal("failed to store uploaded file")
    })?;

    debug!("spooled {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}

/// Keeps only a safe subset of the client-supplied file name.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("clip.mp4"), "clip.mp4");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "....etcpasswd");
        assert_eq!(sanitize_file_name("日本"), "upload");
    }
}
