//! Per-request generation options
//!
//! A `GenerationOptions` value is built once per request and only ever
//! borrowed by the pipeline afterwards.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::AppConfig;
use crate::errors::AppError;
use crate::models::Dimensions;

/// Quality presets. Each tier fixes both the output resolution and the
/// size of generated (or placeholder) images.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum VideoQuality {
    Low,
    #[default]
    Medium,
    High,
    Ultra,
}

impl VideoQuality {
    pub fn resolution(&self) -> Dimensions {
        match self {
            Self::Low => Dimensions::new(1280, 720),
            Self::Medium => Dimensions::new(1920, 1080),
            Self::High => Dimensions::new(2560, 1440),
            Self::Ultra => Dimensions::new(3840, 2160),
        }
    }

    pub fn image_size(&self) -> Dimensions {
        match self {
            Self::Low => Dimensions::new(768, 432),
            Self::Medium => Dimensions::new(1024, 576),
            Self::High => Dimensions::new(1536, 864),
            Self::Ultra => Dimensions::new(2048, 1152),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Ultra => "ultra",
        }
    }
}

impl fmt::Display for VideoQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoQuality {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "ultra" => Ok(Self::Ultra),
            other => Err(AppError::InvalidInput(format!("Unknown quality tier: {}", other))),
        }
    }
}

/// Export presets for social platforms
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SocialFormat {
    Tiktok,
    YoutubeShorts,
    InstagramReel,
    InstagramStory,
    TwitterVideo,
    LinkedinVideo,
    Square,
    Landscape,
    Portrait,
}

impl SocialFormat {
    pub fn resolution(&self) -> Dimensions {
        match self {
            Self::Tiktok | Self::YoutubeShorts | Self::InstagramReel | Self::InstagramStory => {
                Dimensions::new(1080, 1920)
            }
            Self::Portrait => Dimensions::new(1080, 1920),
            Self::TwitterVideo => Dimensions::new(1280, 720),
            Self::LinkedinVideo | Self::Landscape => Dimensions::new(1920, 1080),
            Self::Square => Dimensions::new(1080, 1080),
        }
    }
}

impl FromStr for SocialFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "tiktok" => Ok(Self::Tiktok),
            "youtube_shorts" => Ok(Self::YoutubeShorts),
            "instagram_reel" => Ok(Self::InstagramReel),
            "instagram_story" => Ok(Self::InstagramStory),
            "twitter_video" => Ok(Self::TwitterVideo),
            "linkedin_video" => Ok(Self::LinkedinVideo),
            "square" => Ok(Self::Square),
            "landscape" => Ok(Self::Landscape),
            "portrait" => Ok(Self::Portrait),
            other => Err(AppError::InvalidInput(format!("Unknown social format: {}", other))),
        }
    }
}

/// Options for a single generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    pub quality: VideoQuality,
    pub generate_images: bool,
    pub add_subtitles: bool,
    pub add_transitions: bool,
    pub add_background_music: bool,
    pub background_music_path: Option<PathBuf>,
    pub voice_engine: String,
    pub image_engine: String,
    /// Upper bound for a chunk, seconds
    pub chunk_duration: f64,
    pub parallel_processing: bool,
    pub max_workers: usize,
    pub use_cache: bool,
    pub save_to_cloud: bool,
    pub cloud_provider: String,
    pub social_format: Option<SocialFormat>,
    /// Write the captions next to the output as an .srt file
    pub export_subtitles: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            quality: VideoQuality::Medium,
            generate_images: true,
            add_subtitles: true,
            add_transitions: true,
            add_background_music: false,
            background_music_path: None,
            voice_engine: "google".to_string(),
            image_engine: "stable_diffusion".to_string(),
            chunk_duration: 300.0,
            parallel_processing: true,
            max_workers: 4,
            use_cache: true,
            save_to_cloud: false,
            cloud_provider: "local_folder".to_string(),
            social_format: None,
            export_subtitles: false,
        }
    }
}

impl GenerationOptions {
    /// Seed options from the loaded configuration
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            voice_engine: config.audio.tts_engine.clone(),
            image_engine: config.images.generation_engine.clone(),
            chunk_duration: config.text.chunk_duration,
            parallel_processing: config.processing.parallel_processing,
            max_workers: config.processing.max_workers,
            use_cache: config.audio.cache_tts,
            ..Self::default()
        }
    }

    /// Effective worker count for the per-chunk stages
    pub fn workers(&self) -> usize {
        if self.parallel_processing {
            self.max_workers.max(1)
        } else {
            1
        }
    }
}
