// Video services module
// Backend abstraction over the video tool plus chunk assembly and enhancement

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod assembler;
pub mod captions;
pub mod enhance;
pub mod ffmpeg;

pub use assembler::ChunkAssembler;
pub use captions::Caption;
pub use enhance::{Enhancement, EnhanceOutcome};
pub use ffmpeg::FfmpegBackend;

use crate::errors::AppResult;
use crate::models::Dimensions;

/// One still image shown for `duration` seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    pub image: PathBuf,
    pub duration: f64,
}

/// Operations the pipeline needs from a video tool. Every artifact is a
/// file path; implementations write to `output` and return when done.
#[async_trait]
pub trait VideoBackend: Send + Sync {
    /// Render slides in order, scaled to `resolution`, with `audio` as the
    /// only audio track
    async fn slideshow(
        &self,
        slides: &[Slide],
        audio: &Path,
        resolution: Dimensions,
        fps: u32,
        output: &Path,
    ) -> AppResult<()>;

    /// Join videos end to end in the given order
    async fn concatenate(&self, inputs: &[PathBuf], output: &Path) -> AppResult<()>;

    /// Burn timed captions in, bottom centre
    async fn overlay_text(
        &self,
        input: &Path,
        captions: &[Caption],
        font_size: u32,
        output: &Path,
    ) -> AppResult<()>;

    /// Fade video and audio in at the start and out at the end
    async fn fade(&self, input: &Path, fade_duration: f64, output: &Path) -> AppResult<()>;

    /// Mix `track` under the existing audio at `volume`, looped or trimmed
    /// to the video length
    async fn mix_audio(
        &self,
        input: &Path,
        track: &Path,
        volume: f32,
        output: &Path,
    ) -> AppResult<()>;

    async fn resize(&self, input: &Path, resolution: Dimensions, output: &Path) -> AppResult<()>;

    /// Media duration, seconds
    async fn duration(&self, media: &Path) -> AppResult<f64>;
}
