// Domain models module
// Contains core data structures used throughout the pipeline

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Width and height in pixels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Одна сцена сценария: текст, оценка длительности и промпт для картинки
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scene {
    pub text: String,
    /// Estimated spoken duration, seconds
    pub duration: f64,
    pub image_prompt: String,
}

/// Ordered, non-empty group of scenes rendered into one video chunk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub scenes: Vec<Scene>,
    pub total_duration: f64,
}

impl Chunk {
    pub fn new() -> Self {
        Self {
            scenes: Vec::new(),
            total_duration: 0.0,
        }
    }

    pub fn push(&mut self, scene: Scene) {
        self.total_duration += scene.duration;
        self.scenes.push(scene);
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Narration text for the whole chunk
    pub fn text(&self) -> String {
        self.scenes
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn durations(&self) -> Vec<f64> {
        self.scenes.iter().map(|s| s.duration).collect()
    }
}

impl Default for Chunk {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one orchestration run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub success: bool,
    pub output_path: Option<PathBuf>,
    /// Narrated duration of the chunks that made it into the video, seconds
    pub duration: Option<f64>,
    /// Wall-clock time of the run, seconds
    pub generation_time: f64,
    pub chunks_processed: usize,
    /// Chunks produced by the segmenter
    pub chunks_total: usize,
    pub cloud_url: Option<String>,
    pub error: Option<String>,
    pub message: String,
}

impl GenerationResult {
    pub fn failure(error: impl Into<String>, generation_time: f64, chunks_total: usize) -> Self {
        let error = error.into();
        Self {
            success: false,
            output_path: None,
            duration: None,
            generation_time,
            chunks_processed: 0,
            chunks_total,
            cloud_url: None,
            message: format!("Video generation failed: {}", error),
            error: Some(error),
        }
    }

    /// True when some chunks were dropped along the way
    pub fn is_degraded(&self) -> bool {
        self.success && self.chunks_processed < self.chunks_total
    }
}

/// Running aggregate over every run of one generator
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Statistics {
    pub total_runs: u64,
    pub total_videos: u64,
    pub failed_runs: u64,
    pub total_duration: f64,
    pub average_generation_time: f64,
    pub success_rate: f64,
    pub last_run_at: Option<DateTime<Utc>>,
}

impl Statistics {
    pub fn record(&mut self, result: &GenerationResult) {
        self.total_runs += 1;
        if result.success {
            self.total_videos += 1;
            self.total_duration += result.duration.unwrap_or(0.0);
        } else {
            self.failed_runs += 1;
        }

        let runs = self.total_runs as f64;
        self.average_generation_time =
            (self.average_generation_time * (runs - 1.0) + result.generation_time) / runs;
        self.success_rate = self.total_videos as f64 / runs;
        self.last_run_at = Some(Utc::now());
    }
}

/// Summary of a script before any rendering
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScriptStatistics {
    pub word_count: usize,
    pub estimated_duration: f64,
    pub num_chunks: usize,
    pub num_scenes: usize,
    pub avg_scene_duration: f64,
}
