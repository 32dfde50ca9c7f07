// Image services module
// Image engines plus the coordinator that always yields an image file

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

pub mod placeholder;
pub mod stable_diffusion;

use crate::config::ImageConfig;
use crate::errors::{AppError, AppResult};
use crate::models::Dimensions;
use crate::utils::common::check_file_exists_and_valid;

/// Engine name that always renders a placeholder
pub const PLACEHOLDER_ENGINE: &str = "placeholder";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub size: Dimensions,
    pub steps: u32,
    pub guidance: f32,
}

/// Trait that all image engines must implement
#[async_trait::async_trait]
pub trait ImageService: Send + Sync {
    fn name(&self) -> &str;

    /// Write an image for `request` to `output`
    async fn generate(&self, request: &ImageRequest, output: &Path) -> AppResult<()>;
}

/// One entry of a batch
#[derive(Debug, Clone)]
pub struct ImageJob {
    pub prompt: String,
    pub output: PathBuf,
}

pub struct ImageGenerator {
    engines: HashMap<String, Arc<dyn ImageService>>,
    negative_prompt: String,
    steps: u32,
    guidance: f32,
}

impl ImageGenerator {
    pub fn new(config: &ImageConfig) -> Self {
        Self {
            engines: HashMap::new(),
            negative_prompt: config.negative_prompt.clone(),
            steps: config.num_inference_steps,
            guidance: config.guidance_scale,
        }
    }

    /// Coordinator with the built-in HTTP engine registered
    pub fn from_config(config: &ImageConfig) -> AppResult<Self> {
        let mut generator = Self::new(config);
        generator.register(Arc::new(stable_diffusion::StableDiffusion::new(
            &config.api_url,
        )?));
        Ok(generator)
    }

    pub fn register(&mut self, service: Arc<dyn ImageService>) {
        self.engines.insert(service.name().to_string(), service);
    }

    /// Produce an image at `output`.
    ///
    /// Retries the engine up to `max_attempts` times, then falls back to a
    /// placeholder. Unknown engines go straight to the placeholder. An `Err`
    /// only comes from failing to write the placeholder itself.
    pub async fn generate_image(
        &self,
        prompt: &str,
        output: &Path,
        engine: &str,
        size: Dimensions,
        max_attempts: u32,
    ) -> AppResult<PathBuf> {
        if engine != PLACEHOLDER_ENGINE {
            match self.engines.get(engine) {
                Some(service) => {
                    if self
                        .try_engine(service.as_ref(), prompt, output, size, max_attempts)
                        .await
                    {
                        return Ok(output.to_path_buf());
                    }
                    warn!("Image engine {} exhausted, using placeholder", engine);
                }
                None => warn!("Unknown image engine {}, using placeholder", engine),
            }
        }

        placeholder::render(prompt, size, output)?;
        Ok(output.to_path_buf())
    }

    async fn try_engine(
        &self,
        service: &dyn ImageService,
        prompt: &str,
        output: &Path,
        size: Dimensions,
        max_attempts: u32,
    ) -> bool {
        let request = ImageRequest {
            prompt: prompt.to_string(),
            negative_prompt: self.negative_prompt.clone(),
            size,
            steps: self.steps,
            guidance: self.guidance,
        };

        let attempts = max_attempts.max(1);
        for attempt in 1..=attempts {
            match service.generate(&request, output).await {
                Ok(()) if check_file_exists_and_valid(output).await => return true,
                Ok(()) => warn!(
                    "Image engine {} wrote nothing (attempt {}/{})",
                    service.name(),
                    attempt,
                    attempts
                ),
                // Ошибки конфигурации повторять бессмысленно
                Err(e @ (AppError::Configuration(_) | AppError::InvalidInput(_))) => {
                    warn!("Image engine {} unusable: {}", service.name(), e);
                    return false;
                }
                Err(e) => warn!(
                    "Image engine {} failed (attempt {}/{}): {}",
                    service.name(),
                    attempt,
                    attempts,
                    e
                ),
            }
        }

        false
    }

    /// Generate every job independently with at most `workers` in flight.
    /// Results keep job order; failed entries are left out.
    pub async fn batch_generate(
        &self,
        jobs: &[ImageJob],
        engine: &str,
        size: Dimensions,
        max_attempts: u32,
        workers: usize,
    ) -> Vec<(usize, PathBuf)> {
        let semaphore = Arc::new(Semaphore::new(workers.max(1)));

        let tasks = jobs.iter().enumerate().map(|(i, job)| {
            let semaphore = semaphore.clone();
            async move {
                let _permit = semaphore.acquire().await.ok()?;
                match self
                    .generate_image(&job.prompt, &job.output, engine, size, max_attempts)
                    .await
                {
                    Ok(path) => Some((i, path)),
                    Err(e) => {
                        warn!("Image {} failed entirely: {}", job.output.display(), e);
                        None
                    }
                }
            }
        });

        let results: Vec<(usize, PathBuf)> = join_all(tasks).await.into_iter().flatten().collect();
        info!("Generated {}/{} images", results.len(), jobs.len());
        results
    }
}
