//! Модуль для интеграции с OpenAI API
//!
//! Генерация речи через `/v1/audio/speech`.

use std::path::Path;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;

use super::text::{concat_segments, split_text};
use super::{SynthesisRequest, TtsService};
use crate::config::AudioConfig;
use crate::errors::{AppError, AppResult};

const ENDPOINT: &str = "https://api.openai.com/v1/audio/speech";
const MAX_CHARS: usize = 4096;

pub struct OpenAiTts {
    client: Client,
    api_key: String,
    model: String,
    voice: String,
}

impl OpenAiTts {
    pub fn new(config: &AudioConfig) -> AppResult<Self> {
        if config.openai_api_key.trim().is_empty() {
            return Err(AppError::Configuration(
                "OpenAI API key is required for TTS generation".to_string(),
            ));
        }

        Ok(Self {
            client: Client::new(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
            voice: config.openai_voice.clone(),
        })
    }
}

#[async_trait]
impl TtsService for OpenAiTts {
    fn name(&self) -> &str {
        "openai"
    }

    async fn synthesize(&self, request: &SynthesisRequest, output: &Path) -> AppResult<()> {
        let voice = request.voice.as_deref().unwrap_or(&self.voice);
        // API принимает скорость в диапазоне 0.25..=4.0
        let speed = request.rate.clamp(0.25, 4.0);
        let mut segments = Vec::new();

        for (i, piece) in split_text(&request.text, MAX_CHARS).iter().enumerate() {
            debug!("Sending TTS request to OpenAI API for segment {}", i);
            let response = self
                .client
                .post(ENDPOINT)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&serde_json::json!({
                    "model": self.model,
                    "input": piece,
                    "voice": voice,
                    "speed": speed,
                    "response_format": "mp3",
                }))
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = match response.text().await {
                    Ok(text) => text,
                    Err(e) => format!("Failed to read error response: {}", e),
                };
                error!("OpenAI TTS failed (status {}): {}", status, error_text);
                return Err(AppError::Synthesis(format!(
                    "OpenAI API error (status {}): {}",
                    status, error_text
                )));
            }

            segments.push(response.bytes().await?);
        }

        concat_segments(segments, output).await
    }
}
