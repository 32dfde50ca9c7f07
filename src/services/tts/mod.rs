// TTS services module
// Speech synthesis engines and the coordinator that picks between them

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};

pub mod cache;
pub mod espeak;
pub mod google;
pub mod openai;
pub mod text;

pub use cache::{cache_key, TtsCache};

use crate::config::AudioConfig;
use crate::errors::{AppError, AppResult};
use crate::utils::common::check_file_exists_and_valid;

/// Inputs of one synthesis call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub text: String,
    pub language: String,
    pub rate: f32,
    pub voice: Option<String>,
}

/// Trait that all TTS services must implement
#[async_trait::async_trait]
pub trait TtsService: Send + Sync {
    /// Name the engine is registered under
    fn name(&self) -> &str;

    /// Write the synthesized speech for `request` to `output`
    async fn synthesize(&self, request: &SynthesisRequest, output: &Path) -> AppResult<()>;
}

/// Engines available by configuration name
#[derive(Clone, Default)]
pub struct TtsRegistry {
    engines: HashMap<String, Arc<dyn TtsService>>,
}

impl TtsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the built-in engines. OpenAI is only available with an API key.
    pub fn from_config(config: &AudioConfig) -> AppResult<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(google::GoogleTts::new()?));
        registry.register(Arc::new(espeak::EspeakTts::new()));

        match openai::OpenAiTts::new(config) {
            Ok(service) => registry.register(Arc::new(service)),
            Err(_) => info!("OpenAI TTS disabled: no API key configured"),
        }

        Ok(registry)
    }

    pub fn register(&mut self, service: Arc<dyn TtsService>) {
        self.engines.insert(service.name().to_string(), service);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TtsService>> {
        self.engines.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.engines.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Which engine produced the audio and whether it came from the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisOutcome {
    pub engine: String,
    pub cached: bool,
}

/// Coordinates cache lookups and engine fallback
pub struct TtsGenerator {
    registry: TtsRegistry,
    cache: Option<TtsCache>,
    default_engine: String,
    fallback_engines: Vec<String>,
    language: String,
    rate: f32,
    voice: Option<String>,
}

impl TtsGenerator {
    pub fn new(registry: TtsRegistry, config: &AudioConfig, cache: Option<TtsCache>) -> Self {
        Self {
            registry,
            cache,
            default_engine: config.tts_engine.clone(),
            fallback_engines: config.fallback_engines.clone(),
            language: config.language.clone(),
            rate: config.rate,
            voice: config.voice.clone(),
        }
    }

    pub fn cache(&self) -> Option<&TtsCache> {
        self.cache.as_ref()
    }

    /// Preferred engine first, then the fallbacks in configured order
    pub fn engine_order(&self, preferred: &str) -> Vec<String> {
        let mut order = vec![preferred.to_string()];
        for engine in &self.fallback_engines {
            if !order.contains(engine) {
                order.push(engine.clone());
            }
        }
        order
    }

    /// Synthesize `text` into `output`.
    ///
    /// Blank text is rejected before any engine is touched. An `Err` means
    /// no engine could produce audio.
    pub async fn generate_speech(
        &self,
        text: &str,
        output: &Path,
        engine: Option<&str>,
        use_cache: bool,
    ) -> AppResult<SynthesisOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::InvalidInput(
                "Empty text for speech synthesis".to_string(),
            ));
        }

        let preferred = engine.unwrap_or(&self.default_engine);
        let cache = if use_cache { self.cache.as_ref() } else { None };

        if let Some(cache) = cache {
            let key = cache_key(text, preferred, &self.language, self.rate);
            if let Some(hit) = cache.get(&key) {
                tokio::fs::copy(&hit, output).await?;
                info!("Using cached audio for {} ({})", output.display(), preferred);
                return Ok(SynthesisOutcome {
                    engine: preferred.to_string(),
                    cached: true,
                });
            }
        }

        let request = SynthesisRequest {
            text: text.to_string(),
            language: self.language.clone(),
            rate: self.rate,
            voice: self.voice.clone(),
        };

        let mut failures = Vec::new();
        for name in self.engine_order(preferred) {
            let Some(service) = self.registry.get(&name) else {
                warn!("TTS engine {} is not available", name);
                failures.push(format!("{}: not available", name));
                continue;
            };

            match service.synthesize(&request, output).await {
                Ok(()) if check_file_exists_and_valid(output).await => {
                    if name != preferred {
                        warn!("Fell back to TTS engine {} (preferred {})", name, preferred);
                    }
                    if let Some(cache) = cache {
                        // Кэшируем под фактическим движком
                        let key = cache_key(text, &name, &self.language, self.rate);
                        if let Err(e) = cache.put(&key, output) {
                            warn!("Failed to cache audio from {}: {}", name, e);
                        }
                    }
                    return Ok(SynthesisOutcome {
                        engine: name,
                        cached: false,
                    });
                }
                Ok(()) => {
                    warn!("TTS engine {} produced no audio", name);
                    failures.push(format!("{}: empty output", name));
                }
                Err(e) => {
                    warn!("TTS engine {} failed: {}", name, e);
                    failures.push(format!("{}: {}", name, e));
                }
            }
        }

        Err(AppError::Synthesis(format!(
            "All TTS engines failed ({})",
            failures.join("; ")
        )))
    }
}
