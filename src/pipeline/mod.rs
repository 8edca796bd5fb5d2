//! The image-processing pipeline: a fixed sequence of optional stages.
//!
//! Each submodule implements one transformation step as pure functions.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations without touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! decode ──▶ flatten ──▶ trim ──▶ aspect ──▶ pad ──▶ resize ──▶ encode
//! (bytes)    (bg fill)   (crop)   (pad/crop) (style) (downscale) (bytes)
//! ```
//!
//! 1. [`load`]   — decode the input bytes, enforcing the pixel ceiling
//!    before any expensive work
//! 2. [`clean`]  — composite transparency over a background color, then
//!    trim uniform margins around the content
//! 3. [`aspect`] — pad or center-crop to a target aspect ratio, add
//!    uniform padding, downscale to a target width
//! 4. [`encode`] — serialise to the output format, honouring the
//!    format's quality policy
//!
//! Ordering is significant and fixed: flatten must precede trim (the trim
//! heuristic keys on the composited background), and aspect/padding
//! operate on the trimmed content box. [`ImagePipeline`] applies only the
//! enabled stages, in that order, threading one working [`DynamicImage`]
//! through — stages take the current image and return a new one, so
//! nothing is shared between concurrently processed files.
//!
//! The composer checks the task's cancellation token before every stage;
//! a set flag aborts with [`TaskError::Cancelled`], which the runner
//! treats as a normal non-retryable failure.

pub mod aspect;
pub mod clean;
pub mod encode;
pub mod load;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::context::TaskContext;
use crate::error::TaskError;
use crate::filename;
use crate::input::InputFile;
use crate::output::OutputFile;
use crate::processor::FileProcessor;

pub use aspect::{AspectMode, AspectRatio};
pub use clean::TrimOptions;
pub use encode::OutputFormat;

/// Which stages run, and with what parameters.
///
/// Plain options struct: tools assemble one per run and hand it to
/// [`ImagePipeline`]. Disabled stages are skipped entirely.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Output format. Default: JPEG.
    pub format: OutputFormat,
    /// Encoding quality, 0.0–1.0. Only meaningful for lossy formats; PNG
    /// (and this crate's lossless WebP encoder) ignore it. Default: 0.9.
    pub quality: f32,
    /// Composite transparency over `background`. Default: off.
    pub flatten: bool,
    /// Background color for flatten/pad stages. Default: white.
    pub background: [u8; 3],
    /// Trim uniform margins around the content. `None` disables the stage.
    pub trim: Option<TrimOptions>,
    /// Pad or crop to a target aspect ratio. Default: keep original.
    pub aspect: AspectMode,
    /// Uniform padding in pixels added around the image. Default: 0.
    pub padding: u32,
    /// Downscale to this width (height follows proportionally). `0`
    /// disables the stage; a target at or above the current width is
    /// ignored — upscaling is never performed.
    pub target_width: u32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: 0.9,
            flatten: false,
            background: [255, 255, 255],
            trim: None,
            aspect: AspectMode::Original,
            padding: 0,
            target_width: 0,
        }
    }
}

/// The per-file image pipeline, pluggable into
/// [`crate::runner::BatchRunner::run`].
///
/// Decoding and pixel work are CPU-bound, so each invocation runs on the
/// blocking thread pool; the cancellation token crosses over with it and
/// is checked between stages.
#[derive(Debug, Clone, Default)]
pub struct ImagePipeline {
    options: PipelineOptions,
}

impl ImagePipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }
}

#[async_trait]
impl FileProcessor for ImagePipeline {
    async fn process(
        &self,
        file: Arc<InputFile>,
        ctx: TaskContext,
    ) -> Result<Vec<OutputFile>, TaskError> {
        let options = self.options.clone();
        tokio::task::spawn_blocking(move || run_stages(&file, &ctx, &options))
            .await
            .map_err(|e| TaskError::StageFailed {
                stage: "pipeline".to_string(),
                detail: format!("worker panicked: {e}"),
            })?
    }
}

/// Apply the enabled stages in fixed order.
fn run_stages(
    file: &InputFile,
    ctx: &TaskContext,
    options: &PipelineOptions,
) -> Result<Vec<OutputFile>, TaskError> {
    ctx.check_cancelled()?;
    ctx.set_message("decoding");
    let mut img = load::decode(&file.name, &file.data)?;
    ctx.set_progress(20);

    if options.flatten {
        ctx.check_cancelled()?;
        img = clean::flatten_background(&img, options.background);
        ctx.set_progress(35);
    }

    if let Some(ref trim) = options.trim {
        ctx.check_cancelled()?;
        img = clean::trim_margins(&img, trim);
        ctx.set_progress(50);
    }

    match options.aspect {
        AspectMode::Original => {}
        AspectMode::Pad(ratio) => {
            ctx.check_cancelled()?;
            img = aspect::pad_to_aspect(&img, ratio, options.background);
            ctx.set_progress(60);
        }
        AspectMode::Crop(ratio) => {
            ctx.check_cancelled()?;
            img = aspect::crop_to_aspect(&img, ratio);
            ctx.set_progress(60);
        }
    }

    if options.padding > 0 {
        ctx.check_cancelled()?;
        img = aspect::add_padding(&img, options.padding, options.background);
        ctx.set_progress(70);
    }

    if options.target_width > 0 {
        ctx.check_cancelled()?;
        img = aspect::resize_to_width(&img, options.target_width);
        ctx.set_progress(80);
    }

    ctx.check_cancelled()?;
    ctx.set_message("encoding");
    let data = encode::encode_image(&img, options.format, options.quality, &file.name)?;
    ctx.set_progress(95);

    let out_name = filename::derive_output_name(&file.name, options.format.extension());
    debug!(
        "{}: {}x{} -> {} ({} bytes)",
        file.name,
        img.width(),
        img.height(),
        out_name,
        data.len()
    );

    Ok(vec![OutputFile::new(
        data,
        out_name,
        options.format.mime(),
    )])
}
