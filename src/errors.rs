// Error handling module
// Contains the crate error type and the result alias used by every service

use thiserror::Error;

/// Ошибки генератора видео
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    #[error("Image generation error: {0}")]
    ImageGeneration(String),

    #[error("Video processing error: {0}")]
    VideoProcessing(String),

    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    #[error("Cloud upload error: {0}")]
    Cloud(String),

    /// Ошибка этапа пайплайна, после которой прогон не может продолжаться
    #[error("{0}")]
    Pipeline(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::Other(err)
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        AppError::Other(err.to_string())
    }
}

// Result type alias for the whole crate
pub type AppResult<T> = Result<T, AppError>;
