use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use super::fakes::{read, test_config, FakeImages, FakeTts, FakeVideo};
use crate::config::{AppConfig, GenerationOptions, SocialFormat, VideoQuality};
use crate::errors::AppError;
use crate::services::cloud::CloudManager;
use crate::services::generator::VideoGenerator;
use crate::services::images::ImageGenerator;
use crate::services::tts::TtsRegistry;
use crate::services::video::VideoBackend;

struct Harness {
    dir: TempDir,
    generator: VideoGenerator,
    video: Arc<FakeVideo>,
    images: Arc<FakeImages>,
}

fn harness_with(video: FakeVideo, tts_fails: bool, configure: impl FnOnce(&mut AppConfig)) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    configure(&mut config);

    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = TtsRegistry::new();
    registry.register(FakeTts::new("primary", tts_fails, &log));
    registry.register(FakeTts::new("backup", tts_fails, &log));

    let images = FakeImages::new(0);
    let mut image_generator = ImageGenerator::new(&config.images);
    image_generator.register(images.clone());

    let video = Arc::new(video);
    let backend: Arc<dyn VideoBackend> = video.clone();
    let cloud = CloudManager::from_config(&config.cloud);

    let generator =
        VideoGenerator::with_backends(config, registry, image_generator, backend, cloud).unwrap();

    Harness {
        dir,
        generator,
        video,
        images,
    }
}

fn harness(video: FakeVideo, tts_fails: bool) -> Harness {
    harness_with(video, tts_fails, |_| {})
}

fn options() -> GenerationOptions {
    GenerationOptions {
        quality: VideoQuality::Low,
        voice_engine: "primary".to_string(),
        image_engine: "fake".to_string(),
        add_subtitles: false,
        add_transitions: false,
        ..GenerationOptions::default()
    }
}

fn scratch_is_empty(dir: &Path) -> bool {
    match std::fs::read_dir(dir.join("temp")) {
        Ok(entries) => entries.count() == 0,
        Err(_) => true,
    }
}

#[tokio::test]
async fn test_two_sentences_render_as_one_chunk() {
    let h = harness(FakeVideo::default(), false);
    let output = h.dir.path().join("output").join("hello.mp4");

    let result = h
        .generator
        .generate_from_script("Hello world. This is a test.", &output, &options())
        .await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.chunks_processed, 1);
    assert_eq!(result.chunks_total, 1);
    assert_eq!(result.output_path.as_deref(), Some(output.as_path()));
    assert_eq!(result.duration, Some(6.0));
    assert!(result.error.is_none());

    let manifest = read(&output);
    assert!(manifest.contains("primary:Hello world. This is a test."));
    assert!(manifest.contains("image:Hello world.,image:This test."));
    assert!(manifest.contains("|3.0,3.0|1280x720"));
    assert!(scratch_is_empty(h.dir.path()));
}

#[tokio::test]
async fn test_all_synthesis_engines_failing_fails_the_run() {
    let h = harness(FakeVideo::default(), true);
    let output = h.dir.path().join("output").join("silent.mp4");

    let result = h
        .generator
        .generate_from_script("Hello world. This is a test.", &output, &options())
        .await;

    assert!(!result.success);
    assert!(!result.error.as_deref().unwrap_or("").is_empty());
    assert!(result.output_path.is_none());
    assert!(!output.exists());
    assert!(h.video.calls().is_empty());
    assert_eq!(h.images.calls(), 0);
    assert!(scratch_is_empty(h.dir.path()));
}

#[tokio::test]
async fn test_failed_chunk_is_skipped_and_order_kept() {
    let h = harness(
        FakeVideo {
            fail_slideshow_marker: Some("Bravo".to_string()),
            ..FakeVideo::default()
        },
        false,
    );
    let output = h.dir.path().join("output").join("three.mp4");
    let options = GenerationOptions {
        chunk_duration: 5.0,
        ..options()
    };

    let result = h
        .generator
        .generate_from_script("Alpha scene.\nBravo scene.\nCharlie scene.", &output, &options)
        .await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.chunks_total, 3);
    assert_eq!(result.chunks_processed, 2);
    assert!(result.is_degraded());
    assert_eq!(result.duration, Some(6.0));

    let manifest = read(&output);
    let alpha = manifest.find("Alpha").unwrap();
    let charlie = manifest.find("Charlie").unwrap();
    assert!(alpha < charlie);
    assert!(!manifest.contains("Bravo"));
    assert_eq!(manifest.lines().count(), 2);
}

#[tokio::test]
async fn test_chunks_finishing_out_of_order_keep_script_order() {
    let h = harness(
        FakeVideo {
            slideshow_delays: vec![("Alpha".to_string(), 200), ("Bravo".to_string(), 100)],
            ..FakeVideo::default()
        },
        false,
    );
    let output = h.dir.path().join("output").join("ordered.mp4");
    let options = GenerationOptions {
        chunk_duration: 5.0,
        max_workers: 3,
        ..options()
    };

    let result = h
        .generator
        .generate_from_script("Alpha scene.\nBravo scene.\nCharlie scene.", &output, &options)
        .await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.chunks_processed, 3);

    // Последний чанк завершился первым
    let finished = h.video.finished();
    assert_eq!(finished.len(), 3);
    assert!(finished[0].contains("Charlie"));
    assert!(finished[2].contains("Alpha"));

    let manifest = read(&output);
    let alpha = manifest.find("Alpha").unwrap();
    let bravo = manifest.find("Bravo").unwrap();
    let charlie = manifest.find("Charlie").unwrap();
    assert!(alpha < bravo && bravo < charlie);
}

#[tokio::test]
async fn test_inverted_scene_bounds_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.text.min_scene_duration = 10.0;
    config.text.max_scene_duration = 2.0;

    let backend: Arc<dyn VideoBackend> = Arc::new(FakeVideo::default());
    let cloud = CloudManager::from_config(&config.cloud);
    let images = ImageGenerator::new(&config.images);

    let result =
        VideoGenerator::with_backends(config, TtsRegistry::new(), images, backend, cloud);

    match result {
        Err(AppError::Configuration(message)) => {
            assert!(message.contains("min_scene_duration"), "{}", message)
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("inverted scene bounds were accepted"),
    }
}

#[tokio::test]
async fn test_subtitle_failure_keeps_merged_video() {
    let h = harness(
        FakeVideo {
            fail_overlay: true,
            ..FakeVideo::default()
        },
        false,
    );
    let script = "Hello world. This is a test.";
    let plain = h.dir.path().join("output").join("plain.mp4");
    let subtitled = h.dir.path().join("output").join("subtitled.mp4");

    let result = h.generator.generate_from_script(script, &plain, &options()).await;
    assert!(result.success);

    let with_subtitles = GenerationOptions {
        add_subtitles: true,
        ..options()
    };
    let result = h
        .generator
        .generate_from_script(script, &subtitled, &with_subtitles)
        .await;
    assert!(result.success);
    assert!(h.video.calls().contains(&"overlay_text".to_string()));
    assert!(result.message.contains("skipped: subtitles"), "{}", result.message);

    let plain_hash = md5::compute(std::fs::read(&plain).unwrap());
    let subtitled_hash = md5::compute(std::fs::read(&subtitled).unwrap());
    assert_eq!(plain_hash, subtitled_hash);

    // Later stages still run on top of the passthrough
    let faded = h.dir.path().join("output").join("faded.mp4");
    let with_fades = GenerationOptions {
        add_subtitles: true,
        add_transitions: true,
        ..options()
    };
    let result = h.generator.generate_from_script(script, &faded, &with_fades).await;
    assert!(result.success);
    assert!(result.message.contains("applied: transitions; skipped: subtitles"), "{}", result.message);
    assert_eq!(read(&faded), format!("fade(1.0)\n{}", read(&plain)));
}

#[tokio::test]
async fn test_empty_script_is_nothing_to_render() {
    let h = harness(FakeVideo::default(), false);
    let output = h.dir.path().join("output").join("empty.mp4");

    let result = h.generator.generate_from_script("  \n\n ", &output, &options()).await;

    assert!(!result.success);
    assert_eq!(result.chunks_total, 0);
    assert!(result.error.unwrap().contains("nothing to render"));
}

#[tokio::test]
async fn test_without_image_generation_uses_placeholders() {
    let h = harness(FakeVideo::default(), false);
    let output = h.dir.path().join("output").join("placeholders.mp4");
    let options = GenerationOptions {
        generate_images: false,
        ..options()
    };

    let result = h
        .generator
        .generate_from_script("Hello world. This is a test.", &output, &options)
        .await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(h.images.calls(), 0);
    assert!(read(&output).contains("|png,png|"));
}

#[tokio::test]
async fn test_enhancements_run_in_order() {
    let h = harness(FakeVideo::default(), false);
    let track = h.dir.path().join("music.mp3");
    std::fs::write(&track, b"music").unwrap();
    let output = h.dir.path().join("output").join("full.mp4");
    let options = GenerationOptions {
        add_subtitles: true,
        add_transitions: true,
        add_background_music: true,
        background_music_path: Some(track),
        social_format: Some(SocialFormat::Square),
        export_subtitles: true,
        ..options()
    };

    let result = h
        .generator
        .generate_from_script("Hello world. This is a test.", &output, &options)
        .await;
    assert!(result.success, "{:?}", result.error);

    let manifest = read(&output);
    assert!(manifest.starts_with("resize(1080x1080)\nmusic(5b,0.3)\nfade(1.0)\nsubtitles(2)\nchunk["));

    let srt = read(&output.with_extension("srt"));
    assert!(srt.contains("00:00:00,000 --> 00:00:03,000\nHello world."));
    assert!(srt.contains("00:00:03,000 --> 00:00:06,000\nThis is a test."));
}

#[tokio::test]
async fn test_cloud_upload_failure_does_not_fail_run() {
    let h = harness_with(FakeVideo::default(), false, |config| {
        config.cloud.local_folder = Some(config.project.output_dir.join("synced"));
    });
    let output = h.dir.path().join("output").join("cloud.mp4");

    let uploaded = GenerationOptions {
        save_to_cloud: true,
        ..options()
    };
    let result = h
        .generator
        .generate_from_script("Hello world.", &output, &uploaded)
        .await;
    assert!(result.success);
    assert!(result.cloud_url.unwrap().starts_with("file://"));

    let unconfigured = GenerationOptions {
        save_to_cloud: true,
        cloud_provider: "http".to_string(),
        ..options()
    };
    let result = h
        .generator
        .generate_from_script("Hello world.", &output, &unconfigured)
        .await;
    assert!(result.success);
    assert!(result.cloud_url.is_none());
}

#[tokio::test]
async fn test_statistics_track_runs() {
    let h = harness(FakeVideo::default(), false);
    let output = h.dir.path().join("output").join("stats.mp4");

    h.generator
        .generate_from_script("Hello world.", &output, &options())
        .await;
    h.generator.generate_from_script("", &output, &options()).await;

    let stats = h.generator.statistics();
    assert_eq!(stats.total_runs, 2);
    assert_eq!(stats.total_videos, 1);
    assert_eq!(stats.failed_runs, 1);
    assert_eq!(stats.total_duration, 3.0);
    assert_eq!(stats.success_rate, 0.5);

    h.generator.reset_statistics();
    assert_eq!(h.generator.statistics().total_runs, 0);
}

#[tokio::test]
async fn test_batch_generate_names_outputs() {
    let h = harness(FakeVideo::default(), false);
    let out_dir = h.dir.path().join("batch");
    let mut scripts = BTreeMap::new();
    scripts.insert("First Video".to_string(), "Hello world.".to_string());
    scripts.insert("Broken".to_string(), String::new());

    let results = h.generator.batch_generate(&scripts, &out_dir, &options()).await;

    assert_eq!(results.len(), 2);
    assert!(results["First Video"].success);
    assert!(out_dir.join("first_video.mp4").exists());
    assert!(!results["Broken"].success);
}

#[tokio::test]
async fn test_cached_audio_reused_across_runs() {
    let h = harness(FakeVideo::default(), false);
    let first = h.dir.path().join("output").join("a.mp4");
    let second = h.dir.path().join("output").join("b.mp4");

    h.generator.generate_from_script("Hello world.", &first, &options()).await;
    h.generator.generate_from_script("Hello world.", &second, &options()).await;

    assert_eq!(read(&first), read(&second));
    assert_eq!(h.generator.clear_cache().unwrap(), 1);
}
