//! Google Translate TTS
//!
//! Uses the public translate_tts endpoint. Requests are limited to about
//! 200 characters, so longer text is synthesized sentence group by
//! sentence group and the MP3 segments are joined.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;

use super::text::{concat_segments, split_text};
use super::{SynthesisRequest, TtsService};
use crate::errors::{AppError, AppResult};

const ENDPOINT: &str = "https://translate.google.com/translate_tts";
const MAX_CHARS: usize = 200;

pub struct GoogleTts {
    client: Client,
}

impl GoogleTts {
    pub fn new() -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0")
            .build()?;
        Ok(Self { client })
    }
}

/// "en-US" -> "en"; the endpoint only knows primary language tags
fn language_tag(language: &str) -> &str {
    language.split(['-', '_']).next().unwrap_or(language)
}

#[async_trait]
impl TtsService for GoogleTts {
    fn name(&self) -> &str {
        "google"
    }

    async fn synthesize(&self, request: &SynthesisRequest, output: &Path) -> AppResult<()> {
        let pieces = split_text(&request.text, MAX_CHARS);
        let total = pieces.len().to_string();
        let speed = request.rate.to_string();
        let mut segments = Vec::with_capacity(pieces.len());

        for (idx, piece) in pieces.iter().enumerate() {
            let idx_param = idx.to_string();
            debug!("Google TTS segment {}/{} ({} chars)", idx + 1, pieces.len(), piece.len());
            let response = self
                .client
                .get(ENDPOINT)
                .query(&[
                    ("ie", "UTF-8"),
                    ("client", "tw-ob"),
                    ("tl", language_tag(&request.language)),
                    ("q", piece.as_str()),
                    ("ttsspeed", speed.as_str()),
                    ("total", total.as_str()),
                    ("idx", idx_param.as_str()),
                ])
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(AppError::Synthesis(format!(
                    "Google TTS returned {} for segment {}",
                    response.status(),
                    idx
                )));
            }

            segments.push(response.bytes().await?);
        }

        concat_segments(segments, output).await
    }
}
