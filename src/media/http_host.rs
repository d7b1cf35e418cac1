use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::{debug, warn};

use super::{MediaAsset, MediaConfig, MediaHost};

/// `MediaHost` implementation speaking HTTP to the hosting service.
pub struct HttpMediaHost {
    config: MediaConfig,
    client: reqwest::Client,
}

impl HttpMediaHost {
    pub fn new(config: MediaConfig) -> Self {
        HttpMediaHost {
            config,
            client: reqwest::Client::new(),
        }
    }

    async fn upload_inner(&self, path: &Path) -> Result<MediaAsset, String> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| format!("failed to read spooled file: {}", e))?;

        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));
        let response = self
            .client
            .post(&self.config.upload_url)
            .header("x-api-key", &self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| format!("media host unreachable: {}", e))?;

        if !response.status().is_success() {
            return Err(format!(
                "media host rejected upload with status {}",
                response.status()
            ));
        }

        response
            .json::<MediaAsset>()
            .await
            .map_err(|e| format!("malformed media host response: {}", e))
    }
}

#[async_trait]
impl MediaHost for HttpMediaHost {
    async fn upload(&self, path: &Path) -> Result<MediaAsset, String> {
        let result = self.upload_inner(path).await;

        // The spooled copy is removed no matter how the upload went.
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!("failed to remove spooled upload {}: {}", path.display(), e);
        }

        if let Ok(asset) = &result {
            debug!("uploaded {} as {}", path.display(), asset.url);
        }
        result
    }

    async fn delete(&self, url: &str) -> Result<(), String> {
        let response = self
            .client
            .post(&self.config.delete_url)
            .header("x-api-key", &self.config.api_key)
            .json(&serde_json::json!({ "url": url }))
            .send()
            .await
            .map_err(|e| format!("media host unreachable: {}", e))?;

        if !response.status().is_success() {
            return Err(format!(
                "media host rejected deletion with status {}",
                response.status()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn host(server: &mockito::ServerGuard, temp_dir: &Path) -> HttpMediaHost {
        HttpMediaHost::new(MediaConfig {
            upload_url: format!("{}/upload", server.url()),
            delete_url: format!("{}/delete", server.url()),
            api_key: "test-key".to_string(),
            temp_dir: temp_dir.to_string_lossy().to_string(),
        })
    }

    fn spooled_file(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("clip.mp4");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"fake video bytes").unwrap();
        path
    }

    #[tokio::test]
    async fn test_upload_parses_asset_and_removes_spool() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload")
            .match_header("x-api-key", "test-key")
            .with_status(200)
            .with_body(r#"{"url": "http://media/clip.mp4", "duration": 12.5}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = spooled_file(dir.path());

        let asset = host(&server, dir.path()).upload(&path).await.unwrap();
        assert_eq!(asset.url, "http://media/clip.mp4");
        assert_eq!(asset.duration, Some(12.5));
        assert!(!path.exists());
        mock.assert_async().await;
    }

    /// The spooled file is removed even when the host rejects the upload.
    #[tokio::test]
    async fn test_failed_upload_still_removes_spool() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/upload")
            .with_status(500)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = spooled_file(dir.path());

        let result = host(&server, dir.path()).upload(&path).await;
        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_delete_posts_asset_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/delete")
            .match_header("x-api-key", "test-key")
            .with_status(200)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        host(&server, dir.path())
            .delete("http://media/clip.mp4")
            .await
            .unwrap();
        mock.assert_async().await;
    }
}
