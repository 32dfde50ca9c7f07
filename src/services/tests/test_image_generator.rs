use std::sync::Arc;

use tokio_test::assert_ok;

use super::fakes::{read, FakeImages};
use crate::config::ImageConfig;
use crate::models::Dimensions;
use crate::services::images::{ImageGenerator, ImageJob, PLACEHOLDER_ENGINE};

fn generator(fake: &Arc<FakeImages>) -> ImageGenerator {
    let mut generator = ImageGenerator::new(&ImageConfig::default());
    generator.register(fake.clone());
    generator
}

#[tokio::test]
async fn test_unknown_engine_yields_placeholder_of_requested_size() {
    let dir = tempfile::tempdir().unwrap();
    let generator = ImageGenerator::new(&ImageConfig::default());
    let output = dir.path().join("scene.png");

    let path = assert_ok!(
        generator
            .generate_image("mountain lake", &output, "dall-e-9", Dimensions::new(768, 432), 3)
            .await
    );

    let img = image::open(&path).unwrap();
    assert_eq!((img.width(), img.height()), (768, 432));
}

#[tokio::test]
async fn test_retries_then_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let fake = FakeImages::new(2);
    let generator = generator(&fake);
    let output = dir.path().join("scene.png");

    assert_ok!(
        generator
            .generate_image("red barn", &output, "fake", Dimensions::new(64, 36), 3)
            .await
    );
    assert_eq!(fake.calls(), 3);
    assert_eq!(read(&output), "image:red barn");
}

#[tokio::test]
async fn test_exhausted_attempts_fall_back_to_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let fake = FakeImages::new(10);
    let generator = generator(&fake);
    let output = dir.path().join("scene.png");

    assert_ok!(
        generator
            .generate_image("red barn", &output, "fake", Dimensions::new(64, 36), 2)
            .await
    );
    assert_eq!(fake.calls(), 2);
    let img = image::open(&output).unwrap();
    assert_eq!((img.width(), img.height()), (64, 36));
}

#[tokio::test]
async fn test_placeholder_engine_skips_backends() {
    let dir = tempfile::tempdir().unwrap();
    let fake = FakeImages::new(0);
    let generator = generator(&fake);
    let output = dir.path().join("scene.png");

    assert_ok!(
        generator
            .generate_image("anything", &output, PLACEHOLDER_ENGINE, Dimensions::new(32, 18), 3)
            .await
    );
    assert_eq!(fake.calls(), 0);
    assert!(image::open(&output).is_ok());
}

#[tokio::test]
async fn test_batch_keeps_order_and_omits_failures() {
    let dir = tempfile::tempdir().unwrap();
    let fake = FakeImages::new(0);
    let generator = generator(&fake);

    let jobs = vec![
        ImageJob {
            prompt: "first".to_string(),
            output: dir.path().join("a.png"),
        },
        ImageJob {
            prompt: "unwritable".to_string(),
            output: dir.path().join("missing-dir").join("b.png"),
        },
        ImageJob {
            prompt: "third".to_string(),
            output: dir.path().join("c.png"),
        },
    ];

    let results = generator
        .batch_generate(&jobs, "fake", Dimensions::new(32, 18), 1, 2)
        .await;

    let indexes: Vec<usize> = results.iter().map(|(i, _)| *i).collect();
    assert_eq!(indexes, vec![0, 2]);
    assert_eq!(read(&results[1].1), "image:third");
}
