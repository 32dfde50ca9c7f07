//! Chunk assembly: scene images plus chunk narration into one video file

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};

use super::{Slide, VideoBackend};
use crate::errors::{AppError, AppResult};
use crate::models::Dimensions;
use crate::utils::common::check_file_exists_and_valid;

pub struct ChunkAssembler {
    backend: Arc<dyn VideoBackend>,
    fps: u32,
}

impl ChunkAssembler {
    pub fn new(backend: Arc<dyn VideoBackend>, fps: u32) -> Self {
        Self { backend, fps }
    }

    /// Render one chunk.
    ///
    /// With `durations`, image `i` is shown for `durations[i]`; otherwise the
    /// audio length is shared evenly. A missing image hands its time to a
    /// neighbour so the slideshow still spans the narration.
    pub async fn assemble(
        &self,
        images: &[PathBuf],
        audio: &Path,
        durations: Option<&[f64]>,
        resolution: Dimensions,
        output: &Path,
    ) -> AppResult<PathBuf> {
        if images.is_empty() {
            return Err(AppError::VideoProcessing("Chunk has no images".to_string()));
        }
        if !check_file_exists_and_valid(audio).await {
            return Err(AppError::VideoProcessing(format!(
                "Chunk audio is missing: {}",
                audio.display()
            )));
        }

        let durations = match durations {
            Some(durations) if durations.len() == images.len() => durations.to_vec(),
            Some(durations) => {
                return Err(AppError::InvalidInput(format!(
                    "{} durations for {} images",
                    durations.len(),
                    images.len()
                )));
            }
            None => {
                let total = self.backend.duration(audio).await?;
                vec![total / images.len() as f64; images.len()]
            }
        };

        let mut valid = Vec::with_capacity(images.len());
        for image in images {
            valid.push(check_file_exists_and_valid(image).await);
        }
        let slides = build_slides(images, &durations, &valid);
        if slides.is_empty() {
            return Err(AppError::VideoProcessing("No valid images for chunk".to_string()));
        }
        if slides.len() < images.len() {
            warn!(
                "{} of {} images missing for {}",
                images.len() - slides.len(),
                images.len(),
                output.display()
            );
        }

        debug!("Assembling {} slides into {}", slides.len(), output.display());
        self.backend
            .slideshow(&slides, audio, resolution, self.fps, output)
            .await?;

        if !check_file_exists_and_valid(output).await {
            return Err(AppError::VideoProcessing(format!(
                "Backend produced no chunk at {}",
                output.display()
            )));
        }

        Ok(output.to_path_buf())
    }
}

/// Pair images with durations, folding the time of invalid images into the
/// previous valid slide (or the next one for a leading gap)
fn build_slides(images: &[PathBuf], durations: &[f64], valid: &[bool]) -> Vec<Slide> {
    let mut slides: Vec<Slide> = Vec::new();
    let mut pending = 0.0;

    for ((image, duration), ok) in images.iter().zip(durations).zip(valid) {
        if *ok {
            slides.push(Slide {
                image: image.clone(),
                duration: duration + pending,
            });
            pending = 0.0;
        } else if let Some(last) = slides.last_mut() {
            last.duration += duration;
        } else {
            pending += duration;
        }
    }

    slides
}
