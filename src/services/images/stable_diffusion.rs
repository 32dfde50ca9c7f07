//! Stable Diffusion via an AUTOMATIC1111-compatible HTTP API

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use log::debug;
use reqwest::Client;
use serde::Deserialize;

use super::{ImageRequest, ImageService};
use crate::errors::{AppError, AppResult};

const PROMPT_SUFFIX: &str = ", high quality, detailed, professional";

#[derive(Debug, Deserialize)]
struct Txt2ImgResponse {
    #[serde(default)]
    images: Vec<String>,
}

pub struct StableDiffusion {
    client: Client,
    api_url: String,
}

impl StableDiffusion {
    pub fn new(api_url: &str) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }
}

pub fn enhance_prompt(prompt: &str) -> String {
    format!("{}{}", prompt.trim(), PROMPT_SUFFIX)
}

fn decode_first_image(response: Txt2ImgResponse) -> AppResult<Vec<u8>> {
    let encoded = response
        .images
        .into_iter()
        .next()
        .ok_or_else(|| AppError::ImageGeneration("Response contained no images".to_string()))?;
    // Некоторые серверы отдают data URL
    let encoded = encoded
        .split_once("base64,")
        .map(|(_, data)| data.to_string())
        .unwrap_or(encoded);

    base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| AppError::ImageGeneration(format!("Invalid base64 image: {}", e)))
}

#[async_trait]
impl ImageService for StableDiffusion {
    fn name(&self) -> &str {
        "stable_diffusion"
    }

    async fn generate(&self, request: &ImageRequest, output: &Path) -> AppResult<()> {
        let url = format!("{}/sdapi/v1/txt2img", self.api_url);
        debug!("txt2img {} ({})", request.prompt, request.size);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "prompt": enhance_prompt(&request.prompt),
                "negative_prompt": request.negative_prompt,
                "steps": request.steps,
                "cfg_scale": request.guidance,
                "width": request.size.width,
                "height": request.size.height,
                "batch_size": 1,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::ImageGeneration(format!(
                "Stable Diffusion API returned {}",
                response.status()
            )));
        }

        let body: Txt2ImgResponse = response.json().await?;
        let bytes = decode_first_image(body)?;

        // Перекодируем под расширение выходного файла
        let img = image::load_from_memory(&bytes)?;
        img.save(output)?;

        Ok(())
    }
}
