//! Produced artifacts and the end-of-run report.
//!
//! Outputs are owned by the runner for the lifetime of a run: processors
//! return them, the runner tags them with the producing task's index and
//! accumulates them until `clear_files`/`reset_run_state`. Accumulation is
//! in **completion order**, not input order — with concurrency 2, file B
//! can finish before file A and its artifacts then come first. Callers
//! that need input order can sort by `source_index`.

use serde::Serialize;

use crate::error::TaskFailure;

/// One produced artifact: payload, destination filename, and MIME type.
///
/// Filenames must already be sanitized and collision-safe when the
/// processor returns them — the runner does not deduplicate (see
/// [`crate::filename::ensure_unique`]).
#[derive(Debug, Clone)]
pub struct OutputFile {
    /// Binary payload.
    pub data: Vec<u8>,
    /// Destination filename, sanitized and collision-safe.
    pub filename: String,
    /// MIME type, e.g. `image/jpeg`.
    pub mime: String,
    /// Index of the task that produced this output. One task may yield
    /// zero, one, or many outputs (a splitter yields N from 1).
    pub source_index: usize,
}

impl OutputFile {
    /// Construct an output with `source_index = 0`; the runner overwrites
    /// the index when it collects the output from a task.
    pub fn new(data: Vec<u8>, filename: impl Into<String>, mime: impl Into<String>) -> Self {
        Self {
            data,
            filename: filename.into(),
            mime: mime.into(),
            source_index: 0,
        }
    }
}

/// Summary of a completed (or cancelled) run, returned by
/// [`crate::runner::BatchRunner::run`] and passed to the completion
/// callback.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Number of input files in the run.
    pub total: usize,
    /// Tasks that reached `Success`.
    pub succeeded: usize,
    /// Tasks that reached `Error` (including cancelled tasks).
    pub failed: usize,
    /// Number of outputs collected.
    pub outputs: usize,
    /// Whether the run was cancelled before all tasks settled.
    pub cancelled: bool,
    /// One entry per failed task, in failure order.
    pub failures: Vec<TaskFailure>,
    /// Wall-clock duration of the run in milliseconds.
    pub duration_ms: u64,
}
