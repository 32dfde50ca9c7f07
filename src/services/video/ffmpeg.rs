//! FFmpeg-backed implementation of [`VideoBackend`]

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::debug;

use super::captions::format_srt;
use super::{Caption, Slide, VideoBackend};
use crate::config::VideoConfig;
use crate::errors::{AppError, AppResult};
use crate::models::Dimensions;
use crate::utils::common::remove_file_quietly;
use crate::utils::ffmpeg::{locate_tool, probe_duration, run_ffmpeg};

pub struct FfmpegBackend {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    codec: String,
    audio_codec: String,
}

impl FfmpegBackend {
    pub fn new(config: &VideoConfig) -> AppResult<Self> {
        let ffmpeg = locate_tool("ffmpeg", config.ffmpeg_path.as_deref())?;
        let ffprobe = locate_tool("ffprobe", config.ffprobe_path.as_deref())?;
        debug!("Using {} and {}", ffmpeg.display(), ffprobe.display());

        Ok(Self {
            ffmpeg,
            ffprobe,
            codec: config.codec.clone(),
            audio_codec: config.audio_codec.clone(),
        })
    }

    fn video_codec_args(&self) -> Vec<String> {
        args(&[
            "-c:v",
            self.codec.as_str(),
            "-pix_fmt",
            "yuv420p",
            "-c:a",
            self.audio_codec.as_str(),
            "-movflags",
            "+faststart",
        ])
    }
}

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Scale into the frame keeping aspect ratio, pad the rest
fn fit_filter(resolution: Dimensions) -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1",
        w = resolution.width,
        h = resolution.height
    )
}

/// Escape a path for use inside a filtergraph option value
fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', "\\'")
}

/// Line for the concat demuxer list
fn concat_entry(path: &Path) -> String {
    format!("file '{}'", path.to_string_lossy().replace('\'', "'\\''"))
}

pub fn slideshow_filter(count: usize, resolution: Dimensions, fps: u32) -> String {
    let mut filter = String::new();
    for i in 0..count {
        filter.push_str(&format!(
            "[{i}:v]{},fps={fps},format=yuv420p[v{i}];",
            fit_filter(resolution)
        ));
    }
    for i in 0..count {
        filter.push_str(&format!("[v{i}]"));
    }
    filter.push_str(&format!("concat=n={count}:v=1:a=0[outv]"));
    filter
}

#[async_trait]
impl VideoBackend for FfmpegBackend {
    async fn slideshow(
        &self,
        slides: &[Slide],
        audio: &Path,
        resolution: Dimensions,
        fps: u32,
        output: &Path,
    ) -> AppResult<()> {
        if slides.is_empty() {
            return Err(AppError::VideoProcessing("Slideshow needs at least one image".to_string()));
        }

        let mut cmd = Vec::new();
        for slide in slides {
            cmd.extend(args(&["-loop", "1", "-t"]));
            cmd.push(format!("{:.3}", slide.duration));
            cmd.push("-i".to_string());
            cmd.push(path_arg(&slide.image));
        }
        cmd.push("-i".to_string());
        cmd.push(path_arg(audio));

        cmd.push("-filter_complex".to_string());
        cmd.push(slideshow_filter(slides.len(), resolution, fps));
        cmd.extend(args(&["-map", "[outv]", "-map"]));
        cmd.push(format!("{}:a", slides.len()));
        cmd.extend(self.video_codec_args());
        cmd.push(path_arg(output));

        run_ffmpeg(&self.ffmpeg, &cmd).await
    }

    async fn concatenate(&self, inputs: &[PathBuf], output: &Path) -> AppResult<()> {
        if inputs.is_empty() {
            return Err(AppError::VideoProcessing("Nothing to concatenate".to_string()));
        }

        // Создаем файл со списком для concat demuxer
        let list_path = output.with_extension("concat.txt");
        let mut list = String::new();
        for input in inputs {
            let absolute = std::path::absolute(input)?;
            list.push_str(&concat_entry(&absolute));
            list.push('\n');
        }
        tokio::fs::write(&list_path, list).await?;

        let mut cmd = args(&["-f", "concat", "-safe", "0", "-i"]);
        cmd.push(path_arg(&list_path));
        cmd.extend(args(&["-c", "copy"]));
        cmd.push(path_arg(output));

        let result = run_ffmpeg(&self.ffmpeg, &cmd).await;
        remove_file_quietly(&list_path).await;
        result
    }

    async fn overlay_text(
        &self,
        input: &Path,
        captions: &[Caption],
        font_size: u32,
        output: &Path,
    ) -> AppResult<()> {
        let srt_path = output.with_extension("srt");
        tokio::fs::write(&srt_path, format_srt(captions)).await?;

        let filter = format!(
            "subtitles=filename='{}':force_style='Alignment=2,FontSize={},Outline=2,MarginV=30'",
            escape_filter_path(&srt_path),
            font_size
        );
        let mut cmd = vec!["-i".to_string(), path_arg(input), "-vf".to_string(), filter];
        cmd.extend(args(&["-c:v", self.codec.as_str(), "-pix_fmt", "yuv420p", "-c:a", "copy"]));
        cmd.push(path_arg(output));

        let result = run_ffmpeg(&self.ffmpeg, &cmd).await;
        remove_file_quietly(&srt_path).await;
        result
    }

    async fn fade(&self, input: &Path, fade_duration: f64, output: &Path) -> AppResult<()> {
        let total = self.duration(input).await?;
        let fade = fade_duration.min(total / 2.0).max(0.0);
        let out_start = (total - fade).max(0.0);

        let video_filter = format!(
            "fade=t=in:st=0:d={fade:.3},fade=t=out:st={out_start:.3}:d={fade:.3}"
        );
        let audio_filter = format!(
            "afade=t=in:st=0:d={fade:.3},afade=t=out:st={out_start:.3}:d={fade:.3}"
        );

        let mut cmd = vec![
            "-i".to_string(),
            path_arg(input),
            "-vf".to_string(),
            video_filter,
            "-af".to_string(),
            audio_filter,
        ];
        cmd.extend(self.video_codec_args());
        cmd.push(path_arg(output));

        run_ffmpeg(&self.ffmpeg, &cmd).await
    }

    async fn mix_audio(
        &self,
        input: &Path,
        track: &Path,
        volume: f32,
        output: &Path,
    ) -> AppResult<()> {
        if !track.exists() {
            return Err(AppError::InvalidInput(format!(
                "Background music not found: {}",
                track.display()
            )));
        }

        // Музыка зациклена, amix обрезает её по длине основной дорожки
        let filter = format!(
            "[1:a]volume={volume:.3}[bg];[0:a][bg]amix=inputs=2:duration=first:dropout_transition=0[aout]"
        );
        let mut cmd = vec!["-i".to_string(), path_arg(input)];
        cmd.extend(args(&["-stream_loop", "-1", "-i"]));
        cmd.push(path_arg(track));
        cmd.push("-filter_complex".to_string());
        cmd.push(filter);
        cmd.extend(args(&["-map", "0:v", "-map", "[aout]", "-c:v", "copy", "-c:a"]));
        cmd.push(self.audio_codec.clone());
        cmd.push(path_arg(output));

        run_ffmpeg(&self.ffmpeg, &cmd).await
    }

    async fn resize(&self, input: &Path, resolution: Dimensions, output: &Path) -> AppResult<()> {
        let mut cmd = vec![
            "-i".to_string(),
            path_arg(input),
            "-vf".to_string(),
            fit_filter(resolution),
        ];
        cmd.extend(args(&["-c:v", self.codec.as_str(), "-pix_fmt", "yuv420p", "-c:a", "copy"]));
        cmd.push(path_arg(output));

        run_ffmpeg(&self.ffmpeg, &cmd).await
    }

    async fn duration(&self, media: &Path) -> AppResult<f64> {
        probe_duration(&self.ffprobe, media).await
    }
}
