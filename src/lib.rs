//! # filebatch
//!
//! Concurrent, cancellable batch file conversion with a composable image
//! pipeline.
//!
//! ## Why this crate?
//!
//! Converting a folder of files one at a time wastes the wall-clock gaps
//! every per-file conversion has (decode, encode, I/O), but naive
//! "spawn everything" parallelism blows memory the moment a few large
//! images decode at once. This crate sits between the two: a
//! [`BatchRunner`] dispatches files with *bounded* parallelism, isolates
//! each file's failure from its siblings, aggregates per-file progress
//! into one snapshot, and supports cooperative cancellation mid-run —
//! the execution contract that every batch tool ends up reinventing.
//!
//! ## Pipeline Overview
//!
//! ```text
//! files
//!  │
//!  ├─ 1. Enqueue   add_files assigns contiguous task indices, all Queued
//!  ├─ 2. Dispatch  up to max_concurrency processor calls in flight;
//!  │               as one settles the next queued file starts
//!  ├─ 3. Process   per-file pipeline (decode → flatten → trim → aspect
//!  │               → pad → resize → encode), cancel-checked between stages
//!  ├─ 4. Collect   outputs accumulate in completion order; one failure
//!  │               never aborts the run
//!  └─ 5. Export    single download, or all outputs bundled into one ZIP
//! ```
//!
//! The in-repo [`pipeline::ImagePipeline`] covers image conversion and
//! cleanup; anything else (PDF splitting, transcoding, OCR) plugs into the
//! same runner through the [`FileProcessor`] / [`BatchProcessor`] seams.
//!
//! ## Quick Start
//!
//! ```rust
//! use filebatch::{processor_fn, BatchRunner, InputFile, OutputFile, RunnerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut runner = BatchRunner::new(RunnerConfig::builder().max_concurrency(4).build()?);
//!     runner.add_files([
//!         InputFile::new("a.txt", b"alpha".to_vec()),
//!         InputFile::new("b.txt", b"bravo".to_vec()),
//!     ]);
//!
//!     let upper = processor_fn(|file, ctx| async move {
//!         ctx.check_cancelled()?;
//!         let text = String::from_utf8_lossy(&file.data).to_uppercase();
//!         Ok(vec![OutputFile::new(
//!             text.into_bytes(),
//!             format!("upper-{}", file.name),
//!             "text/plain",
//!         )])
//!     });
//!
//!     let report = runner.run(&upper).await?;
//!     assert_eq!(report.succeeded, 2);
//!     assert_eq!(runner.outputs().len(), 2);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `filebatch` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! filebatch = { version = "0.3", default-features = false }
//! ```
//!
//! ## Semantics worth knowing
//!
//! * **Output order** is completion order, not input order — sort by
//!   [`OutputFile::source_index`] if input order matters.
//! * **Cancellation** is cooperative: a stage that never checks its
//!   [`CancelToken`] runs to completion before the wrapping check fires.
//! * **Batch-mode progress** ([`BatchRunner::run_batch`]) is one 0–100
//!   scalar linearly distributed across the per-task bars for display; it
//!   is not a true per-file measure.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod context;
pub mod error;
pub mod export;
pub mod filename;
pub mod input;
pub mod output;
pub mod pipeline;
pub mod platform;
pub mod processor;
pub mod progress;
pub mod runner;
pub mod task;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{RunnerConfig, RunnerConfigBuilder};
pub use context::{BatchContext, CancelToken, TaskContext};
pub use error::{BatchError, TaskError, TaskFailure};
pub use input::InputFile;
pub use output::{OutputFile, RunReport};
pub use pipeline::{
    AspectMode, AspectRatio, ImagePipeline, OutputFormat, PipelineOptions, TrimOptions,
};
pub use platform::{FsSink, MemorySink, NotifyKind, PlatformSink};
pub use processor::{batch_processor_fn, processor_fn, BatchProcessor, FileProcessor};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use runner::BatchRunner;
pub use task::{ProgressSnapshot, TaskState, TaskStatus};
