//! Local eSpeak synthesis
//!
//! Needs `espeak-ng` or `espeak` on PATH. The output is WAV data; ffmpeg
//! sniffs the container, so the file extension does not matter downstream.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::{SynthesisRequest, TtsService};
use crate::errors::{AppError, AppResult};

/// eSpeak default speaking rate, words per minute
const BASE_WPM: f32 = 175.0;

pub struct EspeakTts;

impl EspeakTts {
    pub fn new() -> Self {
        Self
    }

    fn binary() -> AppResult<PathBuf> {
        which::which("espeak-ng")
            .or_else(|_| which::which("espeak"))
            .map_err(|_| AppError::Synthesis("espeak is not installed".to_string()))
    }
}

impl Default for EspeakTts {
    fn default() -> Self {
        Self::new()
    }
}

fn espeak_voice(language: &str) -> String {
    language.replace('_', "-").to_lowercase()
}

fn words_per_minute(rate: f32) -> u32 {
    (BASE_WPM * rate).clamp(80.0, 450.0).round() as u32
}

#[async_trait]
impl TtsService for EspeakTts {
    fn name(&self) -> &str {
        "espeak"
    }

    async fn synthesize(&self, request: &SynthesisRequest, output: &Path) -> AppResult<()> {
        let binary = Self::binary()?;
        let voice = request
            .voice
            .clone()
            .unwrap_or_else(|| espeak_voice(&request.language));

        let result = Command::new(&binary)
            .arg("-v")
            .arg(&voice)
            .arg("-s")
            .arg(words_per_minute(request.rate).to_string())
            .arg("-w")
            .arg(output)
            .arg("--")
            .arg(&request.text)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !result.status.success() {
            return Err(AppError::Synthesis(format!(
                "espeak exited with {}: {}",
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }

        Ok(())
    }
}
