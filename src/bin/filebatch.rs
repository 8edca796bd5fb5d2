//! CLI binary for filebatch.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineOptions` + `RunnerConfig` and prints results.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use filebatch::{
    filename::format_bytes, AspectMode, AspectRatio, BatchProgressCallback, BatchRunner, FsSink,
    ImagePipeline, InputFile, OutputFormat, PipelineOptions, RunnerConfig, TaskState, TaskStatus,
    TrimOptions,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: renders a live progress bar and per-file
/// log lines using [indicatif]. Works correctly when files complete
/// out-of-order (concurrent mode) because every line is keyed by the
/// task's own index.
struct CliProgressCallback {
    /// The single progress bar anchored at the bottom of the terminal.
    bar: ProgressBar,
    /// Input file names, indexed like the runner's tasks.
    names: Vec<String>,
}

impl CliProgressCallback {
    fn new(names: Vec<String>) -> Arc<Self> {
        let bar = ProgressBar::new(names.len() as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(std::time::Duration::from_millis(80));

        Arc::new(Self { bar, names })
    }

    fn name(&self, index: usize) -> &str {
        self.names.get(index).map(String::as_str).unwrap_or("?")
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_task_state(&self, index: usize, state: &TaskState) {
        match state.status {
            TaskStatus::Running => {
                self.bar.set_message(self.name(index).to_string());
            }
            TaskStatus::Success => {
                self.bar
                    .println(format!("  {} {}", green("✓"), self.name(index)));
                self.bar.inc(1);
            }
            TaskStatus::Error => {
                // Truncate very long error messages to keep output tidy.
                let msg = if state.message.len() > 80 {
                    format!("{}\u{2026}", &state.message[..79])
                } else {
                    state.message.clone()
                };
                self.bar.println(format!(
                    "  {} {}  {}",
                    red("✗"),
                    self.name(index),
                    red(&msg)
                ));
                self.bar.inc(1);
            }
            TaskStatus::Queued => {}
        }
    }

    fn on_run_complete(
        &self,
        outputs: &[filebatch::OutputFile],
        failures: &[filebatch::TaskFailure],
        cancelled: bool,
    ) {
        self.bar.finish_and_clear();

        if cancelled {
            eprintln!("{} run cancelled", cyan("⚠"));
        } else if failures.is_empty() {
            eprintln!(
                "{} {} file(s) converted successfully",
                green("✔"),
                bold(&outputs.len().to_string())
            );
        } else {
            eprintln!(
                "{} {} output(s)  ({} failed)",
                if outputs.is_empty() { red("✘") } else { cyan("⚠") },
                bold(&outputs.len().to_string()),
                red(&failures.len().to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a folder of images to JPEG (into ./converted/)
  filebatch photos/*.png -o converted

  # WebP at width 1200, trimming margins and flattening transparency
  filebatch scans/*.png --format webp --width 1200 --trim --flatten -o web

  # Square product shots on a white canvas, bundled into one archive
  filebatch shots/*.jpg --pad 1:1 --background ffffff --zip products.zip

  # Center-crop to 16:9, four files at a time
  filebatch frames/*.png --crop 16:9 --concurrency 4 -o wide

  # Machine-readable run report
  filebatch inputs/*.png --json -o out > report.json

ASPECT RATIOS:
  1:1    square (storefront tiles)
  4:5    portrait (social feeds)
  16:9   landscape (covers, headers)

FORMATS:
  jpeg   lossy; --quality 0.0-1.0 applies (default 0.9)
  png    lossless; quality ignored
  webp   lossless; quality ignored

Press Ctrl-C during a run to cancel: queued files stop dispatching and
in-flight files stop at their next stage boundary.
"#;

/// Convert batches of images concurrently: format, resize, trim, pad.
#[derive(Parser, Debug)]
#[command(
    name = "filebatch",
    version,
    about = "Convert batches of images concurrently: format, resize, trim, pad",
    long_about = "Process many image files at once with bounded parallelism. Each file runs \
through a fixed pipeline (decode, flatten, trim, aspect, pad, resize, encode); one file's \
failure never aborts the batch, and Ctrl-C cancels cooperatively.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input image files.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory.
    #[arg(short, long, env = "FILEBATCH_OUT", default_value = ".")]
    out: PathBuf,

    /// Output format: jpeg, png, webp.
    #[arg(short, long, env = "FILEBATCH_FORMAT", default_value = "jpeg")]
    format: OutputFormat,

    /// Encoding quality, 0.0-1.0 (lossy formats only).
    #[arg(short, long, env = "FILEBATCH_QUALITY", default_value_t = 0.9)]
    quality: f32,

    /// Downscale to this width, height follows proportionally (never upscales).
    #[arg(short, long, env = "FILEBATCH_WIDTH", default_value_t = 0)]
    width: u32,

    /// Trim uniform margins around the content.
    #[arg(long, env = "FILEBATCH_TRIM")]
    trim: bool,

    /// Trim tolerance: summed RGB difference that counts as content (0-765).
    #[arg(long, env = "FILEBATCH_TRIM_TOLERANCE", default_value_t = 15)]
    trim_tolerance: u32,

    /// Composite transparency over the background colour.
    #[arg(long, env = "FILEBATCH_FLATTEN")]
    flatten: bool,

    /// Background colour for flatten/pad stages, as RRGGBB hex.
    #[arg(long, env = "FILEBATCH_BACKGROUND", default_value = "ffffff",
          value_parser = parse_hex_color)]
    background: [u8; 3],

    /// Pad to an aspect ratio (1:1, 4:5, 16:9), content centered.
    #[arg(long, value_name = "RATIO", conflicts_with = "crop")]
    pad: Option<AspectRatio>,

    /// Center-crop to an aspect ratio (1:1, 4:5, 16:9).
    #[arg(long, value_name = "RATIO")]
    crop: Option<AspectRatio>,

    /// Uniform padding in pixels added around the image.
    #[arg(long, env = "FILEBATCH_PADDING", default_value_t = 0)]
    padding: u32,

    /// Number of files processed concurrently.
    #[arg(short, long, env = "FILEBATCH_CONCURRENCY", default_value_t = 2)]
    concurrency: usize,

    /// Bundle all outputs into one ZIP archive with this name.
    #[arg(long, value_name = "NAME")]
    zip: Option<String>,

    /// Print the run report as JSON on stdout.
    #[arg(long, env = "FILEBATCH_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "FILEBATCH_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FILEBATCH_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(long, env = "FILEBATCH_QUIET")]
    quiet: bool,
}

fn parse_hex_color(s: &str) -> Result<[u8; 3], String> {
    let hex = s.trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("invalid colour '{s}' (expected RRGGBB hex)"));
    }
    let value = u32::from_str_radix(hex, 16).map_err(|e| e.to_string())?;
    Ok([(value >> 16) as u8, (value >> 8) as u8, value as u8])
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if !(0.0..=1.0).contains(&cli.quality) {
        bail!("--quality must be between 0.0 and 1.0 (got {})", cli.quality);
    }

    // ── Load inputs ──────────────────────────────────────────────────────
    let mut files = Vec::with_capacity(cli.inputs.len());
    for path in &cli.inputs {
        let file = InputFile::from_path(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        files.push(file);
    }
    let names: Vec<String> = files.iter().map(|f| f.name.clone()).collect();

    // ── Build pipeline + runner ──────────────────────────────────────────
    let options = PipelineOptions {
        format: cli.format,
        quality: cli.quality,
        flatten: cli.flatten,
        background: cli.background,
        trim: cli.trim.then(|| TrimOptions {
            tolerance: cli.trim_tolerance,
            ..Default::default()
        }),
        aspect: match (cli.pad, cli.crop) {
            (Some(ratio), _) => AspectMode::Pad(ratio),
            (_, Some(ratio)) => AspectMode::Crop(ratio),
            _ => AspectMode::Original,
        },
        padding: cli.padding,
        target_width: cli.width,
    };
    let pipeline = ImagePipeline::new(options);

    let mut builder = RunnerConfig::builder()
        .max_concurrency(cli.concurrency)
        .sink(Arc::new(FsSink::new(&cli.out)));
    if show_progress {
        builder = builder.progress_callback(CliProgressCallback::new(names));
    }
    let config = builder.build().context("invalid configuration")?;

    let mut runner = BatchRunner::new(config);
    runner.add_files(files);

    // Ctrl-C cancels cooperatively: queued files stop dispatching,
    // in-flight files stop at their next stage boundary.
    let token = runner.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n{} cancelling\u{2026}", cyan("⚠"));
            token.cancel();
        }
    });

    // ── Run ──────────────────────────────────────────────────────────────
    let report = runner.run(&pipeline).await.context("run failed")?;

    // ── Export ───────────────────────────────────────────────────────────
    let output_count = runner.outputs().len();
    if output_count > 0 {
        if let Some(ref zip_name) = cli.zip {
            runner
                .download_all_zip(zip_name)
                .with_context(|| format!("failed to write {zip_name}"))?;
        } else {
            for index in 0..output_count {
                runner
                    .download_single(index)
                    .context("failed to write output")?;
            }
        }
    }

    // ── Summary ──────────────────────────────────────────────────────────
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialise report")?
        );
    } else if !cli.quiet {
        let total_bytes: u64 = runner.outputs().iter().map(|o| o.data.len() as u64).sum();
        eprintln!(
            "{}  {}/{} files  {}  {}ms  →  {}",
            if report.failed == 0 && !report.cancelled {
                green("✔")
            } else {
                cyan("⚠")
            },
            report.succeeded,
            report.total,
            dim(&format_bytes(total_bytes)),
            report.duration_ms,
            bold(&cli.out.display().to_string()),
        );
        for failure in &report.failures {
            eprintln!(
                "   {} [{}] {}",
                red("✗"),
                failure.source_index,
                failure.message
            );
        }
    }

    if report.cancelled {
        bail!("run cancelled");
    }
    if report.succeeded == 0 && report.failed > 0 {
        bail!("all {} file(s) failed", report.failed);
    }

    Ok(())
}
