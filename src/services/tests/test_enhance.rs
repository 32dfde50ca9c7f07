use std::path::{Path, PathBuf};

use tokio_test::{assert_err, assert_ok};

use super::fakes::{read, FakeVideo};
use crate::errors::AppError;
use crate::models::Dimensions;
use crate::services::video::enhance::{enhance, merge_chunks};
use crate::services::video::{Caption, Enhancement};

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn subtitles() -> Enhancement {
    Enhancement::Subtitles {
        captions: vec![Caption {
            text: "Hello".to_string(),
            start: 0.0,
            end: 1.0,
        }],
        font_size: 24,
    }
}

#[tokio::test]
async fn test_merge_preserves_chunk_order() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FakeVideo::default();
    let chunks = vec![
        write(dir.path(), "video_chunk_0.mp4", "A"),
        write(dir.path(), "video_chunk_1.mp4", "B"),
        write(dir.path(), "video_chunk_2.mp4", "C"),
    ];

    let merged = assert_ok!(merge_chunks(&backend, &chunks, &dir.path().join("merged.mp4")).await);
    assert_eq!(read(&merged), "ABC");
}

#[tokio::test]
async fn test_single_chunk_is_used_directly() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FakeVideo::default();
    let chunk = write(dir.path(), "video_chunk_0.mp4", "only");

    let merged = assert_ok!(
        merge_chunks(&backend, &[chunk.clone()], &dir.path().join("merged.mp4")).await
    );
    assert_eq!(merged, chunk);
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_merge_failures_are_errors() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FakeVideo::default();
    let result = merge_chunks(&backend, &[], &dir.path().join("merged.mp4")).await;
    assert!(matches!(assert_err!(result), AppError::Pipeline(_)));

    let backend = FakeVideo {
        fail_concatenate: true,
        ..FakeVideo::default()
    };
    let chunks = vec![
        write(dir.path(), "a.mp4", "A"),
        write(dir.path(), "b.mp4", "B"),
    ];
    assert_err!(merge_chunks(&backend, &chunks, &dir.path().join("merged.mp4")).await);
}

#[tokio::test]
async fn test_failed_stage_passes_input_through() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FakeVideo {
        fail_overlay: true,
        ..FakeVideo::default()
    };
    let base = write(dir.path(), "merged.mp4", "base");
    let stages = vec![subtitles(), Enhancement::Transitions { fade_duration: 1.0 }];

    let outcome = enhance(&backend, &base, &stages, dir.path()).await;

    assert_eq!(read(&outcome.output), "fade(1.0)\nbase");
    assert_eq!(outcome.applied, vec!["transitions"]);
    assert_eq!(outcome.skipped, vec!["subtitles"]);
    // Partial output of the failed stage is gone, the base is kept
    assert!(!dir.path().join("enhanced_0_subtitles.mp4").exists());
    assert!(base.exists());
}

#[tokio::test]
async fn test_all_stages_failing_returns_base() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FakeVideo {
        fail_overlay: true,
        ..FakeVideo::default()
    };
    let base = write(dir.path(), "merged.mp4", "base");
    let stages = vec![
        subtitles(),
        Enhancement::BackgroundMusic {
            track: dir.path().join("no-such-track.mp3"),
            volume: 0.3,
        },
    ];

    let outcome = enhance(&backend, &base, &stages, dir.path()).await;
    assert_eq!(outcome.output, base);
    assert!(outcome.applied.is_empty());
    assert_eq!(read(&base), "base");
}

#[tokio::test]
async fn test_superseded_intermediates_are_removed() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FakeVideo::default();
    let base = write(dir.path(), "merged.mp4", "base");
    let track = write(dir.path(), "music.mp3", "1234");
    let stages = vec![
        subtitles(),
        Enhancement::Transitions { fade_duration: 0.5 },
        Enhancement::BackgroundMusic { track, volume: 0.3 },
        Enhancement::Resize {
            resolution: Dimensions::new(1080, 1920),
        },
    ];

    let outcome = enhance(&backend, &base, &stages, dir.path()).await;

    assert_eq!(
        read(&outcome.output),
        "resize(1080x1920)\nmusic(4b,0.3)\nfade(0.5)\nsubtitles(1)\nbase"
    );
    assert_eq!(
        backend.calls(),
        vec!["overlay_text", "fade", "mix_audio", "resize"]
    );
    assert!(!dir.path().join("enhanced_0_subtitles.mp4").exists());
    assert!(!dir.path().join("enhanced_1_transitions.mp4").exists());
    assert!(!dir.path().join("enhanced_2_background_music.mp4").exists());
    assert!(outcome.output.ends_with("enhanced_3_resize.mp4"));
    assert!(base.exists());
}

#[tokio::test]
async fn test_subtitles_without_captions_pass_through() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FakeVideo::default();
    let base = write(dir.path(), "merged.mp4", "base");
    let stages = vec![Enhancement::Subtitles {
        captions: Vec::new(),
        font_size: 24,
    }];

    let outcome = enhance(&backend, &base, &stages, dir.path()).await;
    assert_eq!(outcome.output, base);
    assert!(backend.calls().is_empty());
}
