//! Merge and enhancement
//!
//! Chunk videos are merged into a base artifact, then an ordered chain of
//! optional stages runs on it. A failing stage passes its input through.

use std::path::{Path, PathBuf};

use log::{info, warn};

use super::{Caption, VideoBackend};
use crate::errors::{AppError, AppResult};
use crate::models::Dimensions;
use crate::utils::common::{check_file_exists_and_valid, remove_file_quietly};

/// Merge chunk videos in the given order. A single chunk is used as is.
pub async fn merge_chunks(
    backend: &dyn VideoBackend,
    chunks: &[PathBuf],
    output: &Path,
) -> AppResult<PathBuf> {
    match chunks {
        [] => Err(AppError::Pipeline("No video chunks to merge".to_string())),
        [single] => Ok(single.clone()),
        _ => {
            info!("Merging {} chunks into {}", chunks.len(), output.display());
            backend.concatenate(chunks, output).await?;
            if !check_file_exists_and_valid(output).await {
                return Err(AppError::Pipeline(format!(
                    "Merged video missing at {}",
                    output.display()
                )));
            }
            Ok(output.to_path_buf())
        }
    }
}

/// One optional stage of the chain
#[derive(Debug, Clone)]
pub enum Enhancement {
    Subtitles { captions: Vec<Caption>, font_size: u32 },
    Transitions { fade_duration: f64 },
    BackgroundMusic { track: PathBuf, volume: f32 },
    Resize { resolution: Dimensions },
}

impl Enhancement {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Subtitles { .. } => "subtitles",
            Self::Transitions { .. } => "transitions",
            Self::BackgroundMusic { .. } => "background_music",
            Self::Resize { .. } => "resize",
        }
    }

    async fn apply(&self, backend: &dyn VideoBackend, input: &Path, output: &Path) -> AppResult<()> {
        match self {
            Self::Subtitles { captions, font_size } => {
                if captions.is_empty() {
                    return Err(AppError::VideoProcessing("No captions to overlay".to_string()));
                }
                backend.overlay_text(input, captions, *font_size, output).await
            }
            Self::Transitions { fade_duration } => {
                backend.fade(input, *fade_duration, output).await
            }
            Self::BackgroundMusic { track, volume } => {
                backend.mix_audio(input, track, *volume, output).await
            }
            Self::Resize { resolution } => backend.resize(input, *resolution, output).await,
        }
    }

    /// Apply the stage, or hand back `None` (input stays current) on any
    /// failure. A partial output is removed.
    async fn apply_or_passthrough(
        &self,
        backend: &dyn VideoBackend,
        input: &Path,
        output: &Path,
    ) -> Option<PathBuf> {
        match self.apply(backend, input, output).await {
            Ok(()) if check_file_exists_and_valid(output).await => Some(output.to_path_buf()),
            Ok(()) => {
                warn!("Stage {} produced no output, passing video through", self.name());
                remove_file_quietly(output).await;
                None
            }
            Err(e) => {
                warn!("Stage {} failed, passing video through: {}", self.name(), e);
                remove_file_quietly(output).await;
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnhanceOutcome {
    pub output: PathBuf,
    pub applied: Vec<&'static str>,
    pub skipped: Vec<&'static str>,
}

impl EnhanceOutcome {
    /// "applied: a, b; skipped: c", empty when no stage ran
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if !self.applied.is_empty() {
            parts.push(format!("applied: {}", self.applied.join(", ")));
        }
        if !self.skipped.is_empty() {
            parts.push(format!("skipped: {}", self.skipped.join(", ")));
        }
        parts.join("; ")
    }
}

/// Run `stages` in order on `base`, writing intermediates into `work_dir`.
///
/// An intermediate is deleted once a later stage supersedes it. `base` is
/// never deleted here, it is the recovery point for the whole chain.
pub async fn enhance(
    backend: &dyn VideoBackend,
    base: &Path,
    stages: &[Enhancement],
    work_dir: &Path,
) -> EnhanceOutcome {
    let extension = base
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("mp4")
        .to_string();

    let mut current = base.to_path_buf();
    let mut applied = Vec::new();
    let mut skipped = Vec::new();

    for (i, stage) in stages.iter().enumerate() {
        let output = work_dir.join(format!("enhanced_{}_{}.{}", i, stage.name(), extension));
        match stage.apply_or_passthrough(backend, &current, &output).await {
            Some(next) => {
                if current != base {
                    remove_file_quietly(&current).await;
                }
                info!("Applied {}", stage.name());
                current = next;
                applied.push(stage.name());
            }
            None => skipped.push(stage.name()),
        }
    }

    EnhanceOutcome {
        output: current,
        applied,
        skipped,
    }
}
