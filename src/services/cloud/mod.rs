// Cloud services module
// Publishing finished videos somewhere reachable

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use reqwest::{Client, Url};

use crate::config::CloudConfig;
use crate::errors::{AppError, AppResult};

#[async_trait]
pub trait CloudUploader: Send + Sync {
    fn name(&self) -> &str;

    /// Upload the artifact, returning where it can be reached
    async fn upload(&self, artifact: &Path) -> AppResult<String>;
}

fn file_name(artifact: &Path) -> AppResult<String> {
    artifact
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| AppError::Cloud(format!("No file name in {}", artifact.display())))
}

/// Copies into a folder kept in sync by a desktop client
pub struct LocalFolderUploader {
    folder: PathBuf,
}

impl LocalFolderUploader {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }
}

#[async_trait]
impl CloudUploader for LocalFolderUploader {
    fn name(&self) -> &str {
        "local_folder"
    }

    async fn upload(&self, artifact: &Path) -> AppResult<String> {
        tokio::fs::create_dir_all(&self.folder).await?;
        let target = self.folder.join(file_name(artifact)?);
        tokio::fs::copy(artifact, &target).await?;
        let absolute = std::path::absolute(&target)?;
        Ok(format!("file://{}", absolute.display()))
    }
}

/// `PUT <base_url>/<file name>` with an optional bearer token
pub struct HttpUploader {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpUploader {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// `<base_url>/<name>` with the name percent-encoded as one path segment
    fn upload_url(&self, name: &str) -> AppResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| AppError::Cloud(format!("Invalid upload URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Cloud(format!("Upload URL {} cannot take a path", self.base_url)))?
            .pop_if_empty()
            .push(name);
        Ok(url)
    }
}

#[async_trait]
impl CloudUploader for HttpUploader {
    fn name(&self) -> &str {
        "http"
    }

    async fn upload(&self, artifact: &Path) -> AppResult<String> {
        let url = self.upload_url(&file_name(artifact)?)?;
        let body = tokio::fs::read(artifact).await?;

        let mut request = self
            .client
            .put(url.clone())
            .header("Content-Type", "video/mp4")
            .body(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(AppError::Cloud(format!(
                "Upload to {} failed with {}",
                url,
                response.status()
            )));
        }

        Ok(url.to_string())
    }
}

/// Uploaders by provider name
#[derive(Clone, Default)]
pub struct CloudManager {
    providers: HashMap<String, Arc<dyn CloudUploader>>,
}

impl CloudManager {
    pub fn from_config(config: &CloudConfig) -> Self {
        let mut manager = Self::default();
        if let Some(folder) = &config.local_folder {
            manager.register(Arc::new(LocalFolderUploader::new(folder)));
        }
        if let Some(url) = &config.upload_url {
            manager.register(Arc::new(HttpUploader::new(url, config.upload_token.clone())));
        }
        manager
    }

    pub fn register(&mut self, uploader: Arc<dyn CloudUploader>) {
        self.providers.insert(uploader.name().to_string(), uploader);
    }

    pub async fn upload(&self, artifact: &Path, provider: &str) -> AppResult<String> {
        let uploader = self.providers.get(provider).ok_or_else(|| {
            AppError::Cloud(format!("Cloud provider {} is not configured", provider))
        })?;
        let url = uploader.upload(artifact).await?;
        info!("Uploaded {} to {}", artifact.display(), url);
        Ok(url)
    }
}
