//! Integration tests for the image pipeline, run through the batch runner.
//!
//! Fixtures are synthetic PNGs built in memory with the `image` crate, so
//! every assertion is exact: stage composition is verified by decoding the
//! produced artifact and checking its dimensions and pixels.

use std::sync::Arc;

use image::{DynamicImage, Rgba, RgbaImage};

use filebatch::{
    AspectMode, AspectRatio, BatchRunner, ImagePipeline, InputFile, MemorySink, OutputFormat,
    PipelineOptions, RunnerConfig, TaskStatus, TrimOptions,
};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn encode_png(img: RgbaImage) -> Vec<u8> {
    let mut buf = std::io::Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

fn solid_png(width: u32, height: u32, pixel: [u8; 4]) -> Vec<u8> {
    encode_png(RgbaImage::from_pixel(width, height, Rgba(pixel)))
}

/// A white 20x20 canvas with a 10x5 red block centered at (5, 8).
fn bordered_png() -> Vec<u8> {
    let mut img = RgbaImage::from_pixel(20, 20, Rgba([255, 255, 255, 255]));
    for y in 8..13 {
        for x in 5..15 {
            img.put_pixel(x, y, Rgba([255, 0, 0, 255]));
        }
    }
    encode_png(img)
}

fn runner_with_sink(sink: Arc<MemorySink>) -> BatchRunner {
    BatchRunner::new(
        RunnerConfig::builder()
            .max_concurrency(2)
            .sink(sink)
            .build()
            .unwrap(),
    )
}

// ── Stage composition ────────────────────────────────────────────────────────

#[tokio::test]
async fn trim_pad_and_padding_compose_in_order() {
    let mut r = BatchRunner::new(RunnerConfig::default());
    r.add_files([InputFile::new("shot.png", bordered_png())]);

    // trim -> 10x5 content box, pad to 1:1 -> 10x10, padding 2 -> 14x14.
    let pipeline = ImagePipeline::new(PipelineOptions {
        format: OutputFormat::Png,
        trim: Some(TrimOptions::default()),
        aspect: AspectMode::Pad(AspectRatio::Square),
        padding: 2,
        ..Default::default()
    });

    let report = r.run(&pipeline).await.unwrap();
    assert_eq!(report.succeeded, 1);

    let decoded = image::load_from_memory(&r.outputs()[0].data).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (14, 14));
    assert_eq!(r.outputs()[0].filename, "shot.png");
    assert_eq!(r.outputs()[0].mime, "image/png");
}

#[tokio::test]
async fn crop_then_resize_hits_target_dimensions() {
    let mut r = BatchRunner::new(RunnerConfig::default());
    r.add_files([InputFile::new("wide.png", solid_png(200, 100, [9, 9, 9, 255]))]);

    // crop to 1:1 -> 100x100, resize to width 40 -> 40x40.
    let pipeline = ImagePipeline::new(PipelineOptions {
        format: OutputFormat::Png,
        aspect: AspectMode::Crop(AspectRatio::Square),
        target_width: 40,
        ..Default::default()
    });

    r.run(&pipeline).await.unwrap();

    let decoded = image::load_from_memory(&r.outputs()[0].data).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (40, 40));
}

#[tokio::test]
async fn flatten_resolves_transparency_before_jpeg() {
    // Content sits in a different 8x8 JPEG block than the checked corner,
    // so compression ringing cannot bleed into the assertion.
    let mut img = RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 0]));
    img.put_pixel(12, 12, Rgba([0, 0, 200, 255]));

    let mut r = BatchRunner::new(RunnerConfig::default());
    r.add_files([InputFile::new("logo.png", encode_png(img))]);

    let pipeline = ImagePipeline::new(PipelineOptions {
        format: OutputFormat::Jpeg,
        flatten: true,
        background: [255, 255, 255],
        ..Default::default()
    });

    r.run(&pipeline).await.unwrap();

    assert_eq!(r.outputs()[0].filename, "logo.jpeg");
    let decoded = image::load_from_memory(&r.outputs()[0].data)
        .unwrap()
        .to_rgba8();
    // The transparent corner took the white background (JPEG is lossy,
    // so allow a few units of drift).
    let Rgba([red, g, b, _]) = *decoded.get_pixel(0, 0);
    assert!(red > 250 && g > 250 && b > 250, "got ({red}, {g}, {b})");
}

#[tokio::test]
async fn webp_output_carries_format_metadata() {
    let mut r = BatchRunner::new(RunnerConfig::default());
    r.add_files([InputFile::new("pic.png", solid_png(8, 8, [40, 80, 120, 255]))]);

    let pipeline = ImagePipeline::new(PipelineOptions {
        format: OutputFormat::WebP,
        ..Default::default()
    });

    r.run(&pipeline).await.unwrap();

    let out = &r.outputs()[0];
    assert_eq!(out.filename, "pic.webp");
    assert_eq!(out.mime, "image/webp");
    assert_eq!(&out.data[0..4], b"RIFF");
    assert_eq!(&out.data[8..12], b"WEBP");
}

// ── Failure isolation with real decode errors ────────────────────────────────

#[tokio::test]
async fn corrupt_input_fails_alone() {
    let mut r = BatchRunner::new(RunnerConfig::default());
    r.add_files([
        InputFile::new("ok1.png", solid_png(4, 4, [1, 2, 3, 255])),
        InputFile::new("junk.png", vec![0xde, 0xad, 0xbe, 0xef]),
        InputFile::new("ok2.png", solid_png(4, 4, [4, 5, 6, 255])),
    ]);

    let pipeline = ImagePipeline::new(PipelineOptions {
        format: OutputFormat::Png,
        ..Default::default()
    });

    let report = r.run(&pipeline).await.unwrap();

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].source_index, 1);
    assert!(report.failures[0].message.contains("junk.png"));

    let snap = r.get_progress();
    assert_eq!(snap.tasks[1].status, TaskStatus::Error);
    assert_eq!(snap.tasks[0].status, TaskStatus::Success);
    assert_eq!(snap.tasks[2].status, TaskStatus::Success);
}

// ── Runner + pipeline + export end to end ────────────────────────────────────

#[tokio::test]
async fn batch_converts_and_zips() {
    let sink = Arc::new(MemorySink::new());
    let mut r = runner_with_sink(Arc::clone(&sink));
    r.add_files([
        InputFile::new("one.png", solid_png(4, 4, [10, 10, 10, 255])),
        InputFile::new("two.png", solid_png(6, 6, [20, 20, 20, 255])),
    ]);

    let pipeline = ImagePipeline::new(PipelineOptions {
        format: OutputFormat::Jpeg,
        quality: 0.8,
        ..Default::default()
    });

    let report = r.run(&pipeline).await.unwrap();
    assert_eq!(report.succeeded, 2);

    r.download_all_zip("converted.zip").unwrap();

    let bytes = sink.payload("converted.zip").expect("archive delivered");
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    assert_eq!(archive.len(), 2);
    let mut names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["one.jpeg", "two.jpeg"]);
}
