//! Script segmentation
//!
//! Turns raw script text into timed scenes and groups them into
//! duration-bounded chunks. Pure and deterministic: no I/O, no clock.

use std::collections::HashSet;

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::TextConfig;
use crate::models::{Chunk, Scene, ScriptStatistics};

/// Anything outside word characters, whitespace and common punctuation
static DISALLOWED_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[^\w\s.,!?;:'"-]"#).expect("valid regex"));

static HORIZONTAL_WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\S\n]+").expect("valid regex"));

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "a", "an", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
        "do", "does", "did", "will", "would", "could", "should", "may", "might", "must", "shall",
        "can", "need", "dare", "ought", "used", "to", "of", "in", "for", "on", "with", "at", "by",
        "from", "as", "into", "through", "during", "before", "after", "above", "below", "between",
        "under", "again", "further", "then", "once",
    ]
    .into_iter()
    .collect()
});

const MAX_PROMPT_WORDS: usize = 10;
const PROMPT_FALLBACK_CHARS: usize = 50;

/// Segments scripts using the timing parameters from the `text` config section
#[derive(Debug, Clone)]
pub struct ScriptProcessor {
    words_per_minute: f64,
    min_scene_duration: f64,
    max_scene_duration: f64,
    split_sentences: bool,
}

impl ScriptProcessor {
    pub fn new(config: &TextConfig) -> Self {
        // clamp требует min <= max
        let (min, max) = (config.min_scene_duration, config.max_scene_duration);
        Self {
            words_per_minute: config.words_per_minute,
            min_scene_duration: min.min(max),
            max_scene_duration: max.max(min),
            split_sentences: config.split_sentences,
        }
    }

    /// Parse script text into ordered chunks of scenes.
    ///
    /// An empty result means there is nothing to render.
    pub fn segment(&self, script_text: &str, max_chunk_duration: f64) -> Vec<Chunk> {
        let cleaned = clean_script(script_text);
        let paragraphs = split_paragraphs(&cleaned);
        let scenes = self.create_scenes(&paragraphs);
        let chunks = create_chunks(scenes, max_chunk_duration);

        info!(
            "Parsed script into {} chunks with {} scenes",
            chunks.len(),
            chunks.iter().map(|c| c.scenes.len()).sum::<usize>()
        );

        chunks
    }

    fn create_scenes(&self, paragraphs: &[String]) -> Vec<Scene> {
        let mut scenes = Vec::new();

        for paragraph in paragraphs {
            let units = if self.split_sentences {
                split_sentences(paragraph)
            } else {
                vec![paragraph.clone()]
            };

            for text in units {
                let duration = self.scene_duration(&text);
                let image_prompt = image_prompt(&text);
                debug!("Scene ({:.1}s): {}", duration, image_prompt);
                scenes.push(Scene {
                    text,
                    duration,
                    image_prompt,
                });
            }
        }

        scenes
    }

    /// Estimated spoken duration, clamped to the configured scene bounds
    pub fn scene_duration(&self, text: &str) -> f64 {
        let words = word_count(text) as f64;
        let duration = words / self.words_per_minute * 60.0;
        duration.clamp(self.min_scene_duration, self.max_scene_duration)
    }

    /// Unclamped estimate for the whole script
    pub fn estimate_total_duration(&self, script_text: &str) -> f64 {
        word_count(script_text) as f64 / self.words_per_minute * 60.0
    }

    pub fn statistics(&self, script_text: &str, max_chunk_duration: f64) -> ScriptStatistics {
        let chunks = self.segment(script_text, max_chunk_duration);
        let num_scenes: usize = chunks.iter().map(|c| c.scenes.len()).sum();
        let scene_total: f64 = chunks.iter().map(|c| c.total_duration).sum();

        ScriptStatistics {
            word_count: word_count(script_text),
            estimated_duration: self.estimate_total_duration(script_text),
            num_chunks: chunks.len(),
            num_scenes,
            avg_scene_duration: if num_scenes > 0 {
                scene_total / num_scenes as f64
            } else {
                0.0
            },
        }
    }
}

/// Whitespace-token count
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Collapse runs of spaces and tabs and drop characters that tend to break
/// downstream encoders. Line breaks survive, they separate paragraphs.
fn clean_script(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let text = DISALLOWED_CHARS.replace_all(&text, "");
    let text = HORIZONTAL_WHITESPACE.replace_all(&text, " ");
    text.trim().to_string()
}

/// Blank lines and single line breaks both end a paragraph
fn split_paragraphs(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split after `.`, `!` or `?` when followed by whitespace or the end
/// Cut after `.`, `!` or `?` followed by whitespace, so "3.14" and "..." stay whole
pub(crate) fn split_sentences(paragraph: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = paragraph.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        let terminal = matches!(c, '.' | '!' | '?');
        let boundary = match chars.peek() {
            Some(next) => next.is_whitespace(),
            None => true,
        };
        // "Wait!?" stays one sentence
        let next_is_terminal = matches!(chars.peek(), Some('.' | '!' | '?'));

        if terminal && boundary && !next_is_terminal {
            let sentence = current.trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            current.clear();
        }
    }

    let rest = current.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }

    sentences
}

/// First content words of the text, stop words removed
pub fn image_prompt(text: &str) -> String {
    let words: Vec<&str> = text
        .split_whitespace()
        .filter(|word| {
            let bare = word
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            !bare.is_empty() && !STOP_WORDS.contains(bare.as_str())
        })
        .take(MAX_PROMPT_WORDS)
        .collect();

    if words.is_empty() {
        text.chars().take(PROMPT_FALLBACK_CHARS).collect()
    } else {
        words.join(" ")
    }
}

/// Greedy packing in script order. A scene longer than the bound on its
/// own still gets a chunk of its own.
fn create_chunks(scenes: Vec<Scene>, max_duration: f64) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current = Chunk::new();

    for scene in scenes {
        if !current.is_empty() && current.total_duration + scene.duration > max_duration {
            chunks.push(std::mem::take(&mut current));
        }
        current.push(scene);
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor() -> ScriptProcessor {
        ScriptProcessor::new(&TextConfig::default())
    }

    #[test]
    fn test_two_sentences_one_chunk() {
        let chunks = processor().segment("Hello world. This is a test.", 300.0);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].scenes.len(), 2);
        assert_eq!(chunks[0].scenes[0].text, "Hello world.");
        assert_eq!(chunks[0].scenes[1].text, "This is a test.");
        // Both scenes are short enough to be clamped up to the minimum
        assert_eq!(chunks[0].scenes[0].duration, 3.0);
        assert_eq!(chunks[0].total_duration, 6.0);
    }

    #[test]
    fn test_inverted_scene_bounds_are_ordered() {
        let config = TextConfig {
            min_scene_duration: 10.0,
            max_scene_duration: 2.0,
            ..TextConfig::default()
        };
        let processor = ScriptProcessor::new(&config);

        assert_eq!(processor.scene_duration("Hi."), 2.0);
        assert_eq!(processor.scene_duration(&"word ".repeat(200)), 10.0);
        assert_eq!(processor.segment("Short one. Another.", 300.0).len(), 1);
    }

    #[test]
    fn test_paragraph_mode_keeps_lines_whole() {
        let config = TextConfig {
            split_sentences: false,
            ..TextConfig::default()
        };
        let chunks = ScriptProcessor::new(&config).segment("One. Two.\n\nThree.\nFour.", 300.0);

        let texts: Vec<&str> = chunks[0].scenes.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["One. Two.", "Three.", "Four."]);
    }

    #[test]
    fn test_durations_are_clamped() {
        let long = vec!["word"; 200].join(" ");
        let chunks = processor().segment(&format!("Hi\n{}", long), 300.0);
        let scenes = &chunks[0].scenes;

        assert_eq!(scenes[0].duration, 3.0);
        assert_eq!(scenes[1].duration, 30.0);
        for scene in scenes {
            assert!(scene.duration >= 3.0 && scene.duration <= 30.0);
        }
    }

    #[test]
    fn test_duration_from_word_count() {
        // 25 words at 150 wpm is exactly ten seconds
        let text = vec!["word"; 25].join(" ");
        assert_eq!(processor().scene_duration(&text), 10.0);
    }

    #[test]
    fn test_chunks_respect_bound() {
        let script = (0..12)
            .map(|i| format!("{} {}", vec!["word"; 25].join(" "), i))
            .collect::<Vec<_>>()
            .join("\n");
        let chunks = processor().segment(&script, 35.0);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            let sum: f64 = chunk.scenes.iter().map(|s| s.duration).sum();
            assert!((chunk.total_duration - sum).abs() < 1e-9);
            assert!(chunk.total_duration <= 35.0 || chunk.scenes.len() == 1);
        }
        let scenes: usize = chunks.iter().map(|c| c.scenes.len()).sum();
        assert_eq!(scenes, 12);
    }

    #[test]
    fn test_oversized_scene_gets_own_chunk() {
        let long = vec!["word"; 100].join(" ");
        let script = format!("Short line\n{}\nAnother short line", long);
        let chunks = processor().segment(&script, 10.0);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].scenes.len(), 1);
        assert_eq!(chunks[1].total_duration, 30.0);
    }

    #[test]
    fn test_order_is_preserved() {
        let script = "Alpha one.\nBravo two.\nCharlie three.\nDelta four.";
        let chunks = processor().segment(script, 6.0);
        let texts: Vec<String> = chunks
            .iter()
            .flat_map(|c| c.scenes.iter().map(|s| s.text.clone()))
            .collect();

        assert_eq!(texts, vec!["Alpha one.", "Bravo two.", "Charlie three.", "Delta four."]);
    }

    #[test]
    fn test_segmentation_is_deterministic() {
        let script = "The quick brown fox.\n\nJumps over the lazy dog! Again?\nYes.";
        assert_eq!(processor().segment(script, 5.0), processor().segment(script, 5.0));
    }

    #[test]
    fn test_empty_script_yields_no_chunks() {
        assert!(processor().segment("", 300.0).is_empty());
        assert!(processor().segment("  \n\n\t \n", 300.0).is_empty());
        assert!(processor().segment("@@@ ### $$$", 300.0).is_empty());
    }

    #[test]
    fn test_clean_script_strips_symbols() {
        assert_eq!(clean_script("Hello   @world\t#1!"), "Hello world 1!");
        assert_eq!(clean_script("line one\r\nline   two"), "line one\nline two");
    }

    #[test]
    fn test_split_sentences() {
        assert_eq!(
            split_sentences("Is it? Yes! It is 3.14 wide. Done"),
            vec!["Is it?", "Yes!", "It is 3.14 wide.", "Done"]
        );
        assert_eq!(split_sentences("Wait!? Really..."), vec!["Wait!?", "Really..."]);
    }

    #[test]
    fn test_image_prompt_skips_stop_words() {
        assert_eq!(image_prompt("The cat is on the mat."), "cat mat.");
        let long = "alpha bravo charlie delta echo foxtrot golf hotel india juliet kilo lima";
        assert_eq!(image_prompt(long).split_whitespace().count(), 10);
    }

    #[test]
    fn test_image_prompt_fallback() {
        let text = "The is a an of to in for on with at by from as into the of the of the of the";
        let prompt = image_prompt(text);
        assert_eq!(prompt, text.chars().take(50).collect::<String>());
    }

    #[test]
    fn test_statistics() {
        let stats = processor().statistics("Hello world. This is a test.", 300.0);
        assert_eq!(stats.word_count, 6);
        assert_eq!(stats.num_chunks, 1);
        assert_eq!(stats.num_scenes, 2);
        assert_eq!(stats.avg_scene_duration, 3.0);
        assert!((stats.estimated_duration - 2.4).abs() < 1e-9);
    }
}
