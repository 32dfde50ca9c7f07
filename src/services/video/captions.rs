//! Caption timing and SRT output

use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::AppResult;
use crate::models::Scene;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub text: String,
    /// Seconds from the start of the video
    pub start: f64,
    pub end: f64,
}

/// Break text into fragments of at most `max_chars` characters at word
/// boundaries. Never yields an empty fragment.
pub fn split_for_subtitles(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut fragments = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        for piece in chars.chunks(max_chars) {
            let piece: String = piece.iter().collect();
            if current.is_empty() {
                current = piece;
            } else if current.chars().count() + 1 + piece.chars().count() <= max_chars {
                current.push(' ');
                current.push_str(&piece);
            } else {
                fragments.push(std::mem::replace(&mut current, piece));
            }
        }
    }

    if !current.is_empty() {
        fragments.push(current);
    }

    fragments
}

/// Timeline of captions for scenes played back to back. Each scene's
/// duration is shared evenly between its fragments.
pub fn build_captions(scenes: &[Scene], max_chars: usize) -> Vec<Caption> {
    let mut captions = Vec::new();
    let mut offset = 0.0;

    for scene in scenes {
        let fragments = split_for_subtitles(&scene.text, max_chars);
        if !fragments.is_empty() {
            let step = scene.duration / fragments.len() as f64;
            for (i, text) in fragments.into_iter().enumerate() {
                let start = offset + step * i as f64;
                captions.push(Caption {
                    text,
                    start,
                    end: start + step,
                });
            }
        }
        offset += scene.duration;
    }

    captions
}

/// `HH:MM:SS,mmm`
fn srt_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    format!(
        "{:02}:{:02}:{:02},{:03}",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60,
        ms
    )
}

pub fn format_srt(captions: &[Caption]) -> String {
    let mut out = String::new();
    for (i, caption) in captions.iter().enumerate() {
        let _ = writeln!(out, "{}", i + 1);
        let _ = writeln!(
            out,
            "{} --> {}",
            srt_timestamp(caption.start),
            srt_timestamp(caption.end)
        );
        let _ = writeln!(out, "{}", caption.text);
        out.push('\n');
    }
    out
}

pub async fn write_srt(captions: &[Caption], path: &Path) -> AppResult<()> {
    tokio::fs::write(path, format_srt(captions)).await?;
    Ok(())
}
