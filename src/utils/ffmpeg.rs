//! Модуль для работы с FFmpeg
//!
//! Поиск бинарников и запуск ffmpeg / ffprobe с разбором ошибок.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use log::debug;
use tokio::process::Command;

use crate::errors::{AppError, AppResult};

/// Resolve a tool: the configured path wins, otherwise search PATH
pub fn locate_tool(name: &str, configured: Option<&Path>) -> AppResult<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(AppError::Configuration(format!(
            "{} not found at configured path {}",
            name,
            path.display()
        )));
    }

    which::which(name)
        .map_err(|e| AppError::Configuration(format!("{} not found in PATH: {}", name, e)))
}

/// Run ffmpeg with `-y` prepended. A non-zero exit becomes an error
/// carrying the tail of stderr.
pub async fn run_ffmpeg(ffmpeg: &Path, args: &[String]) -> AppResult<()> {
    debug!("ffmpeg {}", args.join(" "));

    let output = Command::new(ffmpeg)
        .arg("-y")
        .arg("-hide_banner")
        .args(["-loglevel", "error"])
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await?;

    if !output.status.success() {
        return Err(AppError::Ffmpeg(format!(
            "ffmpeg exited with {}: {}",
            output.status,
            stderr_tail(&output.stderr)
        )));
    }

    Ok(())
}

/// Запуск ffprobe, возвращает stdout
pub async fn run_ffprobe(ffprobe: &Path, args: &[String]) -> AppResult<String> {
    let output = Command::new(ffprobe)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await?;

    if !output.status.success() {
        return Err(AppError::Ffmpeg(format!(
            "ffprobe exited with {}: {}",
            output.status,
            stderr_tail(&output.stderr)
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Container duration in seconds
pub async fn probe_duration(ffprobe: &Path, media: &Path) -> AppResult<f64> {
    let args = vec![
        "-v".to_string(),
        "error".to_string(),
        "-show_entries".to_string(),
        "format=duration".to_string(),
        "-of".to_string(),
        "default=noprint_wrappers=1:nokey=1".to_string(),
        media.to_string_lossy().to_string(),
    ];
    let stdout = run_ffprobe(ffprobe, &args).await?;
    parse_duration(&stdout).ok_or_else(|| {
        AppError::Ffmpeg(format!(
            "Could not read duration of {}: {:?}",
            media.display(),
            stdout.trim()
        ))
    })
}

fn parse_duration(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .find_map(|line| line.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(5);
    lines[start..].join(" | ")
}
