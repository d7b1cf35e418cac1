//! Remote media hosting. Uploaded files are spooled to a temp directory by
//! the multipart layer, shipped to the media host over HTTP, and the temp
//! copy is removed whether or not the upload succeeded.

pub mod http_host;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

pub use http_host::HttpMediaHost;

/// The config struct for the media host client.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone)]
pub struct MediaConfig {
    /// Endpoint accepting multipart uploads.
    pub upload_url: String,
    /// Endpoint accepting deletion requests by asset URL.
    pub delete_url: String,
    pub api_key: String,
    /// Local spool directory for in-flight uploads.
    pub temp_dir: String,
}

/// A hosted media asset as reported by the media host.
#[derive(Deserialize, Debug, Clone)]
pub struct MediaAsset {
    pub url: String,
    /// Playback duration in seconds; present for video assets.
    pub duration: Option<f64>,
}

/// Abstraction over the media hosting service.
#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Uploads the file at `path` and removes the local copy afterwards,
    /// success or failure.
    async fn upload(&self, path: &Path) -> Result<MediaAsset, String>;
    /// Best-effort removal of a previously uploaded asset.
    async fn delete(&self, url: &str) -> Result<(), String>;
}

/// Creates the media host client from config.
pub fn create_media_host(config: &MediaConfig) -> Arc<dyn MediaHost> {
    info!("Using media host at {}", config.upload_url);
    Arc::new(HttpMediaHost::new(config.clone()))
}
