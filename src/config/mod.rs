// Configuration module
// Centralized management of application configuration

use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

pub mod options; // Per-request generation options

pub use options::{GenerationOptions, SocialFormat, VideoQuality};

/// Full application configuration. Every section falls back to its defaults,
/// so a partial file only overrides the keys it mentions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub project: ProjectConfig,
    pub video: VideoConfig,
    pub audio: AudioConfig,
    pub images: ImageConfig,
    pub text: TextConfig,
    pub subtitles: SubtitleConfig,
    pub transitions: TransitionConfig,
    pub processing: ProcessingConfig,
    pub cloud: CloudConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub output_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            temp_dir: PathBuf::from("./temp"),
            cache_dir: PathBuf::from("./cache"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub fps: u32,
    pub codec: String,
    pub audio_codec: String,
    /// Explicit ffmpeg binary, otherwise looked up on PATH
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            ffmpeg_path: None,
            ffprobe_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub tts_engine: String,
    pub language: String,
    pub rate: f32,
    pub voice: Option<String>,
    pub cache_tts: bool,
    /// Engines tried in this order after the preferred one fails
    pub fallback_engines: Vec<String>,
    /// Максимальный размер кэша в байтах
    pub max_cache_size: Option<u64>,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_voice: String,
    pub background_music_volume: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            tts_engine: "google".to_string(),
            language: "en-US".to_string(),
            rate: 1.0,
            voice: None,
            cache_tts: true,
            fallback_engines: vec!["google".to_string(), "espeak".to_string()],
            max_cache_size: Some(1024 * 1024 * 1024), // 1 GB
            openai_api_key: String::new(),
            openai_model: "tts-1".to_string(),
            openai_voice: "alloy".to_string(),
            background_music_volume: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub generation_engine: String,
    /// Base URL of an AUTOMATIC1111-compatible server
    pub api_url: String,
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
    pub negative_prompt: String,
    pub max_attempts: u32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            generation_engine: "stable_diffusion".to_string(),
            api_url: "http://127.0.0.1:7860".to_string(),
            num_inference_steps: 25,
            guidance_scale: 7.5,
            negative_prompt: "blurry, ugly, deformed, text, watermark".to_string(),
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub words_per_minute: f64,
    pub min_scene_duration: f64,
    pub max_scene_duration: f64,
    /// Default upper bound for a chunk, seconds
    pub chunk_duration: f64,
    /// Split lines into one scene per sentence
    pub split_sentences: bool,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            words_per_minute: 150.0,
            min_scene_duration: 3.0,
            max_scene_duration: 30.0,
            chunk_duration: 300.0,
            split_sentences: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleConfig {
    pub max_chars: usize,
    pub font_size: u32,
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            max_chars: 40,
            font_size: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    pub fade_duration: f64,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self { fade_duration: 1.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub parallel_processing: bool,
    pub max_workers: usize,
    /// Удалять временные файлы после завершения
    pub cleanup_temp: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_processing: true,
            max_workers: 4,
            cleanup_temp: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Folder synced by a desktop client (Google Drive, Dropbox, ...)
    pub local_folder: Option<PathBuf>,
    /// Base URL accepting `PUT <url>/<file name>`
    pub upload_url: Option<String>,
    pub upload_token: Option<String>,
}

impl AppConfig {
    /// Load configuration from a YAML or JSON file, or use defaults when no
    /// path is given. The OpenAI key may also come from `OPENAI_API_KEY`.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    AppError::Configuration(format!(
                        "Failed to read config {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                let config = Self::parse(path, &content)?;
                info!("Loaded configuration from {}", path.display());
                config
            }
            None => Self::default(),
        };

        if config.audio.openai_api_key.is_empty() {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                config.audio.openai_api_key = key;
            }
        }

        let problems = config.validate();
        if !problems.is_empty() {
            return Err(AppError::Configuration(problems.join("; ")));
        }

        Ok(config)
    }

    fn parse(path: &Path, content: &str) -> AppResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(content)?),
            Some("json") => Ok(serde_json::from_str(content)?),
            _ => {
                // Unknown extension: JSON first, YAML second
                match serde_json::from_str(content) {
                    Ok(config) => Ok(config),
                    Err(e) => {
                        warn!("Config {} is not JSON ({}), trying YAML", path.display(), e);
                        Ok(serde_yaml::from_str(content)?)
                    }
                }
            }
        }
    }

    /// Collect every problem instead of stopping at the first one
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.text.words_per_minute <= 0.0 {
            errors.push("text.words_per_minute must be positive".to_string());
        }
        if self.text.min_scene_duration <= 0.0 {
            errors.push("text.min_scene_duration must be positive".to_string());
        }
        if self.text.min_scene_duration > self.text.max_scene_duration {
            errors.push(format!(
                "text.min_scene_duration ({}) exceeds text.max_scene_duration ({})",
                self.text.min_scene_duration, self.text.max_scene_duration
            ));
        }
        if self.text.chunk_duration <= 0.0 {
            errors.push("text.chunk_duration must be positive".to_string());
        }
        if self.video.fps == 0 {
            errors.push("video.fps must be positive".to_string());
        }
        if self.audio.fallback_engines.is_empty() {
            errors.push("audio.fallback_engines must not be empty".to_string());
        }
        if self.processing.max_workers == 0 {
            errors.push("processing.max_workers must be at least 1".to_string());
        }
        if self.subtitles.max_chars == 0 {
            errors.push("subtitles.max_chars must be at least 1".to_string());
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_empty());
        assert_eq!(config.text.words_per_minute, 150.0);
        assert_eq!(config.audio.fallback_engines, vec!["google", "espeak"]);
        assert_eq!(config.images.max_attempts, 3);
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "text:\n  words_per_minute: 120\naudio:\n  tts_engine: espeak\n",
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.text.words_per_minute, 120.0);
        assert_eq!(config.text.min_scene_duration, 3.0);
        assert_eq!(config.audio.tts_engine, "espeak");
        assert_eq!(config.audio.language, "en-US");
        assert_eq!(config.video.fps, 30);
    }

    #[test]
    fn test_json_config() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, r#"{"processing": {"max_workers": 2}}"#).unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.processing.max_workers, 2);
        assert!(config.processing.parallel_processing);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "text:\n  min_scene_duration: 40\n  max_scene_duration: 10\nprocessing:\n  max_workers: 0\n",
        )
        .unwrap();

        match AppConfig::load(Some(&path)) {
            Err(AppError::Configuration(message)) => {
                assert!(message.contains("min_scene_duration"));
                assert!(message.contains("max_workers"));
            }
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let result = AppConfig::load(Some(Path::new("/definitely/not/here.yaml")));
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }
}
