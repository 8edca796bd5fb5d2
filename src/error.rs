//! Error types for the filebatch library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`BatchError`] — **Fatal**: the run cannot proceed at all (a run is
//!   already active, no files were selected, an export precondition is
//!   violated). Returned as `Err(BatchError)` from the runner's entry
//!   points and reported synchronously, never swallowed.
//!
//! * [`TaskError`] — **Non-fatal**: a single file's processing failed
//!   (decode glitch, oversized input, cancellation) but all other files
//!   are fine. Recorded as a [`TaskFailure`] in the run's error list so
//!   callers can inspect partial success rather than losing the whole
//!   batch to one bad file.
//!
//! The separation lets callers decide their own tolerance: abort on the
//! first failure, log and continue, or collect everything for a post-run
//! report.

use thiserror::Error;

/// All fatal errors returned by the filebatch library.
///
/// Per-file failures use [`TaskError`] and are recorded as
/// [`TaskFailure`] entries rather than propagated here.
#[derive(Debug, Error)]
pub enum BatchError {
    // ── Run preconditions ────────────────────────────────────────────────
    /// A run is already in progress on this runner.
    #[error("a run is already in progress; wait for completion or cancel it first")]
    AlreadyRunning,

    /// `run`/`run_batch` was called with an empty file list.
    #[error("no files selected; add files before running")]
    NoFilesSelected,

    // ── Export preconditions ─────────────────────────────────────────────
    /// `download_single` was called with an index that has no output.
    #[error("no output at index {index} (outputs: {count})")]
    OutputNotFound { index: usize, count: usize },

    /// `download_all_zip` was called before any outputs were produced.
    #[error("no outputs to download; run a batch first")]
    NoOutputs,

    /// Building the ZIP archive failed.
    #[error("ZIP creation failed: {source}")]
    ZipCreationFailed {
        #[source]
        source: crate::export::ExportError,
    },

    /// The platform sink could not deliver an artifact.
    #[error("failed to deliver '{filename}': {source}")]
    DownloadFailed {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A non-fatal error for a single task (one input file).
///
/// Stored as a [`TaskFailure`] when a file fails. The overall run
/// continues; sibling tasks are unaffected.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    /// The input bytes could not be decoded as an image.
    #[error("failed to decode '{name}': {detail}")]
    DecodeFailed { name: String, detail: String },

    /// The image exceeds the pixel ceiling; checked before expensive work.
    #[error("image too large: {actual} pixels ({width}x{height}), maximum is {max} pixels")]
    PixelLimitExceeded {
        width: u32,
        height: u32,
        actual: u64,
        max: u64,
    },

    /// Encoding the processed image to the output format failed.
    #[error("failed to encode '{name}' as {format}: {detail}")]
    EncodeFailed {
        name: String,
        format: String,
        detail: String,
    },

    /// A pipeline stage failed for this file.
    #[error("{stage} failed: {detail}")]
    StageFailed { stage: String, detail: String },

    /// A processor-defined failure with no more specific classification.
    ///
    /// External processors (a PDF splitter, a remote transcoder) raise
    /// this with whatever message their own error surface produced.
    #[error("{0}")]
    Other(String),

    /// The task observed the cancellation flag at a stage boundary.
    ///
    /// Distinct from genuine failure: the runner marks the task errored
    /// with a cancellation message and sets `cancelled` on the run report.
    #[error("cancelled")]
    Cancelled,
}

impl TaskError {
    /// Whether this error is a cooperative-cancellation signal rather
    /// than a genuine processing failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskError::Cancelled)
    }
}

/// One failed task: the input's index and a human-readable message.
///
/// Accumulated by the runner during a run, never silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TaskFailure {
    /// Index of the input file that failed.
    pub source_index: usize,
    /// Human-readable description, suitable for per-file status display.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_limit_display_names_both_counts() {
        let e = TaskError::PixelLimitExceeded {
            width: 10_000,
            height: 9_000,
            actual: 90_000_000,
            max: 80_000_000,
        };
        let msg = e.to_string();
        assert!(msg.contains("90000000"), "got: {msg}");
        assert!(msg.contains("80000000"), "got: {msg}");
    }

    #[test]
    fn output_not_found_display() {
        let e = BatchError::OutputNotFound { index: 7, count: 3 };
        assert!(e.to_string().contains("index 7"));
    }

    #[test]
    fn cancelled_is_cancelled() {
        assert!(TaskError::Cancelled.is_cancelled());
        assert!(!TaskError::StageFailed {
            stage: "trim".into(),
            detail: "x".into()
        }
        .is_cancelled());
    }
}
