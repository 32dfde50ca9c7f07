//! Text preparation for engines with request-length limits

use std::path::Path;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;

use crate::errors::{AppError, AppResult};
use crate::services::script::split_sentences;

/// Split text into pieces of at most `max_chars` characters, cutting at
/// sentence boundaries. A sentence longer than the limit is cut at word
/// boundaries, and a single overlong word is cut hard.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return Vec::new();
    }
    if text.chars().count() <= max_chars {
        return vec![text];
    }

    let mut pieces = Vec::new();
    let mut current = String::new();

    for sentence in split_sentences(&text) {
        for part in fit_sentence(&sentence, max_chars) {
            let joined_len = current.chars().count() + 1 + part.chars().count();
            if current.is_empty() {
                current = part;
            } else if joined_len <= max_chars {
                current.push(' ');
                current.push_str(&part);
            } else {
                pieces.push(std::mem::replace(&mut current, part));
            }
        }
    }

    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
}

fn fit_sentence(sentence: &str, max_chars: usize) -> Vec<String> {
    if sentence.chars().count() <= max_chars {
        return vec![sentence.to_string()];
    }

    let mut parts = Vec::new();
    let mut current = String::new();

    for word in sentence.split_whitespace() {
        let word_len = word.chars().count();
        if word_len > max_chars {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                parts.push(piece.iter().collect());
            }
            continue;
        }

        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word_len <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            parts.push(std::mem::replace(&mut current, word.to_string()));
        }
    }

    if !current.is_empty() {
        parts.push(current);
    }

    parts
}

/// Write the audio segments one after another into `output`.
/// MP3 frames are self-delimiting, so byte concatenation plays in order.
pub async fn concat_segments(segments: Vec<Bytes>, output: &Path) -> AppResult<()> {
    if segments.is_empty() {
        return Err(AppError::Synthesis("No audio segments to write".to_string()));
    }

    let mut file = tokio::fs::File::create(output).await?;
    for segment in segments {
        file.write_all(&segment).await?;
    }
    file.flush().await?;

    Ok(())
}
