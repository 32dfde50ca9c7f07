//! Orchestrator
//!
//! Drives one run through segment, synthesize, images, assemble, merge,
//! enhance and upload. Any stage error ends the run with a failed
//! [`GenerationResult`]; nothing is raised to the caller.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use futures::future::join_all;
use log::{error, info, warn};
use tokio::sync::Semaphore;

use crate::config::{AppConfig, GenerationOptions};
use crate::errors::{AppError, AppResult};
use crate::models::{Chunk, GenerationResult, Scene, Statistics};
use crate::services::cloud::CloudManager;
use crate::services::images::{ImageGenerator, ImageJob, PLACEHOLDER_ENGINE};
use crate::services::script::ScriptProcessor;
use crate::services::tts::{TtsCache, TtsGenerator, TtsRegistry};
use crate::services::video::captions::{build_captions, write_srt};
use crate::services::video::enhance::{enhance, merge_chunks};
use crate::services::video::{ChunkAssembler, Enhancement, FfmpegBackend, VideoBackend};
use crate::utils::common::sanitize_filename;
use crate::utils::temp::ScratchDir;

/// A chunk that made it through assembly
struct AssembledChunk {
    index: usize,
    video: PathBuf,
}

pub struct VideoGenerator {
    config: AppConfig,
    script: ScriptProcessor,
    tts: TtsGenerator,
    images: ImageGenerator,
    backend: Arc<dyn VideoBackend>,
    assembler: ChunkAssembler,
    cloud: CloudManager,
    stats: Mutex<Statistics>,
}

impl VideoGenerator {
    /// Generator with the built-in engines and the ffmpeg backend
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let tts = TtsRegistry::from_config(&config.audio)?;
        let images = ImageGenerator::from_config(&config.images)?;
        let backend: Arc<dyn VideoBackend> = Arc::new(FfmpegBackend::new(&config.video)?);
        let cloud = CloudManager::from_config(&config.cloud);

        Self::with_backends(config, tts, images, backend, cloud)
    }

    pub fn with_backends(
        config: AppConfig,
        tts: TtsRegistry,
        images: ImageGenerator,
        backend: Arc<dyn VideoBackend>,
        cloud: CloudManager,
    ) -> AppResult<Self> {
        let problems = config.validate();
        if !problems.is_empty() {
            return Err(AppError::Configuration(problems.join("; ")));
        }

        let cache = TtsCache::new(
            config.project.cache_dir.join("tts"),
            config.audio.max_cache_size,
        )?;
        info!(
            "TTS engines: {} (cache at {})",
            tts.names().join(", "),
            cache.dir().display()
        );

        Ok(Self {
            script: ScriptProcessor::new(&config.text),
            tts: TtsGenerator::new(tts, &config.audio, Some(cache)),
            images,
            assembler: ChunkAssembler::new(backend.clone(), config.video.fps),
            backend,
            cloud,
            stats: Mutex::new(Statistics::default()),
            config,
        })
    }

    fn stats_guard(&self) -> MutexGuard<'_, Statistics> {
        // Статистика остаётся валидной даже после паники в другом потоке
        match self.stats.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn statistics(&self) -> Statistics {
        self.stats_guard().clone()
    }

    pub fn reset_statistics(&self) {
        *self.stats_guard() = Statistics::default();
    }

    /// Remove every cached narration file
    pub fn clear_cache(&self) -> AppResult<usize> {
        match self.tts.cache() {
            Some(cache) => cache.clear(),
            None => Ok(0),
        }
    }

    /// Render `script` into `output`
    pub async fn generate_from_script(
        &self,
        script: &str,
        output: &Path,
        options: &GenerationOptions,
    ) -> GenerationResult {
        let started = Instant::now();
        let mut chunks_total = 0;

        let result = match self.run(script, output, options, &mut chunks_total).await {
            Ok(mut result) => {
                result.generation_time = started.elapsed().as_secs_f64();
                info!(
                    "Video ready at {} ({:.1}s, {}/{} chunks) in {:.1}s",
                    output.display(),
                    result.duration.unwrap_or(0.0),
                    result.chunks_processed,
                    result.chunks_total,
                    result.generation_time
                );
                result
            }
            Err(e) => {
                error!("Video generation failed: {}", e);
                GenerationResult::failure(
                    e.to_string(),
                    started.elapsed().as_secs_f64(),
                    chunks_total,
                )
            }
        };

        self.stats_guard().record(&result);
        result
    }

    async fn run(
        &self,
        script: &str,
        output: &Path,
        options: &GenerationOptions,
        chunks_total: &mut usize,
    ) -> AppResult<GenerationResult> {
        if options.chunk_duration <= 0.0 {
            return Err(AppError::InvalidInput(
                "chunk_duration must be positive".to_string(),
            ));
        }

        info!("Stage: segment");
        let chunks = self.script.segment(script, options.chunk_duration);
        *chunks_total = chunks.len();
        if chunks.is_empty() {
            return Err(AppError::Pipeline(
                "Script contains no scenes, nothing to render".to_string(),
            ));
        }

        // Удаляется при выходе из функции на любом пути
        let scratch = ScratchDir::new(
            &self.config.project.temp_dir,
            self.config.processing.cleanup_temp,
        )?;
        let workers = options.workers();

        info!("Stage: synthesize audio ({} chunks)", chunks.len());
        let audio = self.synthesize_chunks(&chunks, &scratch, options, workers).await;
        if audio.iter().all(Option::is_none) {
            return Err(AppError::Pipeline(
                "Speech synthesis failed for every chunk".to_string(),
            ));
        }

        info!("Stage: images");
        let images = self
            .generate_images(&chunks, &audio, &scratch, options, workers)
            .await;

        info!("Stage: assemble chunks");
        let assembled = self
            .assemble_chunks(&chunks, &audio, &images, &scratch, options, workers)
            .await;
        if assembled.is_empty() {
            return Err(AppError::Pipeline(
                "No video chunk could be assembled".to_string(),
            ));
        }
        if assembled.len() < chunks.len() {
            warn!(
                "Continuing with {} of {} chunks",
                assembled.len(),
                chunks.len()
            );
        }

        info!("Stage: merge");
        let videos: Vec<PathBuf> = assembled.iter().map(|c| c.video.clone()).collect();
        let merged = merge_chunks(self.backend.as_ref(), &videos, &scratch.file("merged.mp4")).await?;

        info!("Stage: enhance");
        let scenes: Vec<Scene> = assembled
            .iter()
            .flat_map(|c| chunks[c.index].scenes.iter().cloned())
            .collect();
        let captions = build_captions(&scenes, self.config.subtitles.max_chars);
        let stages = self.enhancement_stages(options, &captions);
        let enhanced = enhance(self.backend.as_ref(), &merged, &stages, scratch.path()).await;

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::copy(&enhanced.output, output).await?;

        if options.export_subtitles {
            let srt = output.with_extension("srt");
            match write_srt(&captions, &srt).await {
                Ok(()) => info!("Subtitles written to {}", srt.display()),
                Err(e) => warn!("Failed to write subtitles {}: {}", srt.display(), e),
            }
        }

        let cloud_url = if options.save_to_cloud {
            info!("Stage: cloud upload ({})", options.cloud_provider);
            match self.cloud.upload(output, &options.cloud_provider).await {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!("Cloud upload failed: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let duration: f64 = assembled
            .iter()
            .map(|c| chunks[c.index].total_duration)
            .sum();

        let mut message = format!(
            "Video generated from {} of {} chunks",
            assembled.len(),
            chunks.len()
        );
        let stages_summary = enhanced.summary();
        if !stages_summary.is_empty() {
            message.push_str(&format!(" ({})", stages_summary));
        }

        Ok(GenerationResult {
            success: true,
            output_path: Some(output.to_path_buf()),
            duration: Some(duration),
            generation_time: 0.0,
            chunks_processed: assembled.len(),
            chunks_total: chunks.len(),
            cloud_url,
            error: None,
            message,
        })
    }

    /// Narration per chunk, in chunk order; `None` where every engine failed
    async fn synthesize_chunks(
        &self,
        chunks: &[Chunk],
        scratch: &ScratchDir,
        options: &GenerationOptions,
        workers: usize,
    ) -> Vec<Option<PathBuf>> {
        let semaphore = Arc::new(Semaphore::new(workers));

        let tasks = chunks.iter().enumerate().map(|(i, chunk)| {
            let semaphore = semaphore.clone();
            let path = scratch.file(&format!("audio_chunk_{}.mp3", i));
            async move {
                let _permit = semaphore.acquire().await.ok()?;
                match self
                    .tts
                    .generate_speech(
                        &chunk.text(),
                        &path,
                        Some(options.voice_engine.as_str()),
                        options.use_cache,
                    )
                    .await
                {
                    Ok(outcome) => {
                        info!(
                            "Audio for chunk {} from {}{}",
                            i,
                            outcome.engine,
                            if outcome.cached { " (cached)" } else { "" }
                        );
                        Some(path)
                    }
                    Err(e) => {
                        warn!("No audio for chunk {}: {}", i, e);
                        None
                    }
                }
            }
        });

        join_all(tasks).await
    }

    /// Planned image paths per chunk. Chunks without audio get none.
    async fn generate_images(
        &self,
        chunks: &[Chunk],
        audio: &[Option<PathBuf>],
        scratch: &ScratchDir,
        options: &GenerationOptions,
        workers: usize,
    ) -> Vec<Vec<PathBuf>> {
        let engine = if options.generate_images {
            options.image_engine.as_str()
        } else {
            PLACEHOLDER_ENGINE
        };
        let size = options.quality.image_size();

        let mut planned = Vec::with_capacity(chunks.len());
        let mut jobs = Vec::new();
        for (c, chunk) in chunks.iter().enumerate() {
            if audio[c].is_none() {
                planned.push(Vec::new());
                continue;
            }
            let mut paths = Vec::with_capacity(chunk.scenes.len());
            for (s, scene) in chunk.scenes.iter().enumerate() {
                let output = scratch.file(&format!("image_{}_{}.png", c, s));
                jobs.push(ImageJob {
                    prompt: scene.image_prompt.clone(),
                    output: output.clone(),
                });
                paths.push(output);
            }
            planned.push(paths);
        }

        self.images
            .batch_generate(
                &jobs,
                engine,
                size,
                self.config.images.max_attempts,
                workers,
            )
            .await;

        planned
    }

    async fn assemble_chunks(
        &self,
        chunks: &[Chunk],
        audio: &[Option<PathBuf>],
        images: &[Vec<PathBuf>],
        scratch: &ScratchDir,
        options: &GenerationOptions,
        workers: usize,
    ) -> Vec<AssembledChunk> {
        let semaphore = Arc::new(Semaphore::new(workers));
        let resolution = options.quality.resolution();

        let tasks = chunks.iter().enumerate().map(|(i, chunk)| {
            let semaphore = semaphore.clone();
            let output = scratch.file(&format!("video_chunk_{}.mp4", i));
            async move {
                let audio = audio[i].as_ref()?;
                let _permit = semaphore.acquire().await.ok()?;
                let durations = chunk.durations();
                match self
                    .assembler
                    .assemble(&images[i], audio, Some(durations.as_slice()), resolution, &output)
                    .await
                {
                    Ok(video) => Some(AssembledChunk { index: i, video }),
                    Err(e) => {
                        warn!("Skipping chunk {}: {}", i, e);
                        None
                    }
                }
            }
        });

        join_all(tasks).await.into_iter().flatten().collect()
    }

    fn enhancement_stages(
        &self,
        options: &GenerationOptions,
        captions: &[crate::services::video::Caption],
    ) -> Vec<Enhancement> {
        let mut stages = Vec::new();

        if options.add_subtitles {
            stages.push(Enhancement::Subtitles {
                captions: captions.to_vec(),
                font_size: self.config.subtitles.font_size,
            });
        }
        if options.add_transitions {
            stages.push(Enhancement::Transitions {
                fade_duration: self.config.transitions.fade_duration,
            });
        }
        if options.add_background_music {
            match &options.background_music_path {
                Some(track) => stages.push(Enhancement::BackgroundMusic {
                    track: track.clone(),
                    volume: self.config.audio.background_music_volume,
                }),
                None => warn!("Background music requested without a track, skipping"),
            }
        }
        if let Some(format) = options.social_format {
            stages.push(Enhancement::Resize {
                resolution: format.resolution(),
            });
        }

        stages
    }

    /// Render several named scripts one after another into
    /// `<output_dir>/<name>.mp4`
    pub async fn batch_generate(
        &self,
        scripts: &BTreeMap<String, String>,
        output_dir: &Path,
        options: &GenerationOptions,
    ) -> BTreeMap<String, GenerationResult> {
        let mut results = BTreeMap::new();

        for (name, script) in scripts {
            let output = output_dir.join(format!("{}.mp4", sanitize_filename(name)));
            info!("Batch item {} -> {}", name, output.display());
            let result = self.generate_from_script(script, &output, options).await;
            results.insert(name.clone(), result);
        }

        let succeeded = results.values().filter(|r| r.success).count();
        info!("Batch finished: {}/{} videos", succeeded, results.len());
        results
    }
}
