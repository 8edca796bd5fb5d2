//! The batch runner: concurrent, cancellable per-file execution with
//! progress aggregation and artifact collection.
//!
//! ## Execution model
//!
//! `run` dispatches files to a [`FileProcessor`] with bounded parallelism:
//! a queue of pending indices feeds a [`FuturesUnordered`] set topped up
//! to `max_concurrency`. When any in-flight task settles, the next queued
//! file starts — a fast file never waits for a slow sibling (work-stealing
//! bounded parallelism, not fixed waves). `run_batch` instead hands the
//! whole file set to one [`BatchProcessor`] call, for algorithms that
//! naturally span all inputs (merge-to-one, contact sheets).
//!
//! ## Failure isolation
//!
//! One file's failure never aborts the run: the task is marked errored, a
//! [`TaskFailure`] is recorded, and siblings continue. Only call-time
//! precondition violations (`AlreadyRunning`, `NoFilesSelected`) and
//! export errors surface as [`BatchError`].
//!
//! ## Cancellation
//!
//! Cooperative: [`BatchRunner::cancel`] (or a cloned
//! [`CancelToken`](crate::context::CancelToken)) stops new dispatches and
//! lets in-flight processors observe the flag at their next stage
//! boundary. The runner then drains the in-flight set and completes with
//! `cancelled = true`. Nothing is forcibly aborted — a stage that never
//! checks the token runs to completion and occupies its slot until then.
//!
//! The task-state table is the one structure shared with concurrently
//! executing futures, so it lives behind a mutex (see
//! [`crate::context`]); outputs and errors are only ever touched from the
//! runner's own settle points.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info, warn};

use crate::config::RunnerConfig;
use crate::context::{BatchContext, CancelToken, TaskContext, TaskTable};
use crate::error::{BatchError, TaskError, TaskFailure};
use crate::export;
use crate::input::InputFile;
use crate::output::{OutputFile, RunReport};
use crate::platform::{FsSink, NotifyKind, PlatformSink};
use crate::processor::{BatchProcessor, FileProcessor};
use crate::progress::{NoopProgressCallback, ProgressCallback};
use crate::task::{ProgressSnapshot, TaskState};

/// Orchestrates concurrent per-file processing over an owned file set.
///
/// # Example
/// ```rust,no_run
/// use filebatch::{processor_fn, BatchRunner, InputFile, OutputFile, RunnerConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut runner = BatchRunner::new(RunnerConfig::default());
/// runner.add_files([InputFile::new("a.bin", vec![1, 2, 3])]);
///
/// let processor = processor_fn(|file, ctx| async move {
///     ctx.check_cancelled()?;
///     Ok(vec![OutputFile::new(
///         file.data.clone(),
///         format!("copy-{}", file.name),
///         "application/octet-stream",
///     )])
/// });
///
/// let report = runner.run(&processor).await?;
/// println!("{} succeeded, {} failed", report.succeeded, report.failed);
/// runner.download_all_zip("outputs.zip")?;
/// # Ok(())
/// # }
/// ```
pub struct BatchRunner {
    max_concurrency: usize,
    files: Vec<Arc<InputFile>>,
    tasks: TaskTable,
    outputs: Vec<OutputFile>,
    errors: Vec<TaskFailure>,
    cancel: CancelToken,
    is_running: bool,
    callback: ProgressCallback,
    sink: Arc<dyn PlatformSink>,
}

impl BatchRunner {
    /// Create a runner from a configuration.
    ///
    /// Missing pieces get defaults: a no-op progress callback and a
    /// filesystem sink writing into the current directory.
    pub fn new(config: RunnerConfig) -> Self {
        let callback: ProgressCallback = config
            .progress_callback
            .unwrap_or_else(|| Arc::new(NoopProgressCallback));
        let sink: Arc<dyn PlatformSink> = config
            .sink
            .unwrap_or_else(|| Arc::new(FsSink::new(".")));
        Self {
            max_concurrency: config.max_concurrency.max(1),
            files: Vec::new(),
            tasks: TaskTable::new(Arc::clone(&callback)),
            outputs: Vec::new(),
            errors: Vec::new(),
            cancel: CancelToken::new(),
            is_running: false,
            callback,
            sink,
        }
    }

    // ── File-set management ──────────────────────────────────────────────

    /// Append files, assigning sequential indices continuing from the
    /// current length. Each new file starts `Queued`.
    ///
    /// Count/size/type validation is the caller's responsibility — the
    /// runner assumes pre-validated input.
    pub fn add_files(&mut self, files: impl IntoIterator<Item = InputFile>) {
        let added: Vec<Arc<InputFile>> = files.into_iter().map(Arc::new).collect();
        let count = added.len();
        self.files.extend(added);
        self.tasks.append(count);
        debug!("added {} file(s), total {}", count, self.files.len());
    }

    /// Remove the file at `index`; remaining indices are re-derived to
    /// stay contiguous (0..N-1). Out-of-range indices are ignored.
    ///
    /// Task state follows the surviving files: the state recorded for a
    /// file before removal stays with that file at its new index, and the
    /// removed file's state is dropped. Outputs and errors accumulated by
    /// a finished run are intentionally left as-is (their `source_index`
    /// values still refer to the pre-removal file list); they are cleared
    /// by the next run, [`Self::reset_run_state`], or
    /// [`Self::clear_files`].
    pub fn remove_file(&mut self, index: usize) {
        if index >= self.files.len() {
            warn!("remove_file: index {index} out of range ({})", self.files.len());
            return;
        }
        self.files.remove(index);
        self.tasks.remove(index);
    }

    /// Drop every file, task state, output, and error record.
    pub fn clear_files(&mut self) {
        self.files.clear();
        self.outputs.clear();
        self.errors.clear();
        self.tasks.clear();
    }

    /// Keep the file list but reinitialise every task to `Queued` and
    /// clear outputs/errors — used when processing options change but
    /// files should be kept. Also recovers a runner whose previous `run`
    /// future was dropped mid-flight (which leaves the running flag set).
    pub fn reset_run_state(&mut self) {
        self.is_running = false;
        self.outputs.clear();
        self.errors.clear();
        self.tasks.reset(self.files.len());
    }

    // ── Execution ────────────────────────────────────────────────────────

    /// Process every file through `processor`, at most `max_concurrency`
    /// invocations in flight.
    ///
    /// # Errors
    /// `AlreadyRunning` if a run is active, `NoFilesSelected` if the file
    /// list is empty. Per-file failures do **not** error the run; they are
    /// reported in the returned [`RunReport`].
    pub async fn run(&mut self, processor: &dyn FileProcessor) -> Result<RunReport, BatchError> {
        self.begin_run()?;
        let started = Instant::now();

        let mut queue: VecDeque<usize> = (0..self.files.len()).collect();
        let mut in_flight = FuturesUnordered::new();

        while !queue.is_empty() || !in_flight.is_empty() {
            if self.cancel.is_cancelled() {
                debug!(
                    "cancellation observed; draining {} in-flight task(s)",
                    in_flight.len()
                );
                while let Some((index, result)) = in_flight.next().await {
                    self.settle(index, result);
                }
                break;
            }

            // Top up to the concurrency bound from the queue.
            while in_flight.len() < self.max_concurrency {
                let Some(index) = queue.pop_front() else { break };
                self.tasks.set(index, TaskState::running());
                let file = Arc::clone(&self.files[index]);
                let ctx = TaskContext::new(index, self.cancel.clone(), self.tasks.clone());
                in_flight.push(async move { (index, processor.process(file, ctx).await) });
            }

            // Wait for one task to settle before looping.
            if let Some((index, result)) = in_flight.next().await {
                self.settle(index, result);
            }
        }

        Ok(self.finish_run(started))
    }

    /// Process the entire file set through one `processor` call.
    ///
    /// Progress is a single 0–100 scalar, linearly distributed across the
    /// per-task progress bars for display only. On success every task is
    /// marked `Success` and outputs get positional `source_index`es; on
    /// failure every task is marked errored with the processor's message.
    pub async fn run_batch(
        &mut self,
        processor: &dyn BatchProcessor,
    ) -> Result<RunReport, BatchError> {
        self.begin_run()?;
        let started = Instant::now();

        let ctx = BatchContext::new(self.cancel.clone(), self.tasks.clone());
        match processor.process(self.files.clone(), ctx).await {
            Ok(outputs) => {
                if self.cancel.is_cancelled() {
                    self.tasks.fail_all("cancelled");
                } else {
                    for (i, mut output) in outputs.into_iter().enumerate() {
                        output.source_index = i;
                        self.outputs.push(output);
                    }
                    self.tasks.succeed_all();
                }
            }
            Err(err) => {
                let message = err.to_string();
                warn!("batch processor failed: {message}");
                self.errors.push(TaskFailure {
                    source_index: 0,
                    message: message.clone(),
                });
                self.tasks.fail_all(&message);
            }
        }

        Ok(self.finish_run(started))
    }

    /// Request cancellation of the active run. Cooperative: no new tasks
    /// are dispatched and in-flight processors observe the flag at their
    /// next check. Mid-run callers hold a [`Self::cancel_token`] clone.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A clone of the run's cancellation token, for cancelling from
    /// another task or thread while `run` is being awaited.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    // ── Inspection ───────────────────────────────────────────────────────

    /// Pure snapshot of aggregate and per-task progress. No side effects.
    pub fn get_progress(&self) -> ProgressSnapshot {
        self.tasks.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Outputs collected by the last run, in completion order.
    pub fn outputs(&self) -> &[OutputFile] {
        &self.outputs
    }

    /// Failures recorded by the last run.
    pub fn failures(&self) -> &[TaskFailure] {
        &self.errors
    }

    // ── Export ───────────────────────────────────────────────────────────

    /// Deliver one output through the platform sink.
    ///
    /// # Errors
    /// `OutputNotFound` if `output_index` has no output.
    pub fn download_single(&self, output_index: usize) -> Result<(), BatchError> {
        let output =
            self.outputs
                .get(output_index)
                .ok_or_else(|| BatchError::OutputNotFound {
                    index: output_index,
                    count: self.outputs.len(),
                })?;
        self.sink
            .download(&output.data, &output.filename)
            .map_err(|source| BatchError::DownloadFailed {
                filename: output.filename.clone(),
                source,
            })
    }

    /// Bundle every output into a ZIP archive (entries in output order)
    /// and deliver it through the platform sink.
    ///
    /// # Errors
    /// `NoOutputs` if there is nothing to bundle; `ZipCreationFailed`
    /// wrapping the underlying error if archiving fails.
    pub fn download_all_zip(&self, zip_name: &str) -> Result<(), BatchError> {
        if self.outputs.is_empty() {
            return Err(BatchError::NoOutputs);
        }

        let bytes = export::build_zip(&self.outputs)
            .map_err(|source| BatchError::ZipCreationFailed { source })?;
        self.sink
            .download(&bytes, zip_name)
            .map_err(|source| BatchError::DownloadFailed {
                filename: zip_name.to_string(),
                source,
            })?;
        self.sink.notify(
            &format!("bundled {} file(s) into {zip_name}", self.outputs.len()),
            NotifyKind::Success,
        );
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────────────

    fn begin_run(&mut self) -> Result<(), BatchError> {
        if self.is_running {
            return Err(BatchError::AlreadyRunning);
        }
        if self.files.is_empty() {
            return Err(BatchError::NoFilesSelected);
        }
        self.is_running = true;
        self.cancel.reset();
        self.outputs.clear();
        self.errors.clear();
        self.tasks.reset(self.files.len());
        info!(
            "starting run: {} file(s), concurrency {}",
            self.files.len(),
            self.max_concurrency
        );
        Ok(())
    }

    /// Apply one settled task's result. Runs only from the run loop's
    /// settle points, so outputs/errors need no locking.
    fn settle(&mut self, index: usize, result: Result<Vec<OutputFile>, TaskError>) {
        match result {
            Ok(outputs) => {
                if self.cancel.is_cancelled() {
                    // Settled after cancellation: outputs are discarded
                    // and the task reports the cancellation instead.
                    self.tasks.set(index, TaskState::error("cancelled"));
                    return;
                }
                debug!("task {index}: {} output(s)", outputs.len());
                for mut output in outputs {
                    output.source_index = index;
                    self.outputs.push(output);
                }
                self.tasks.set(index, TaskState::success());
            }
            Err(err) => {
                let message = err.to_string();
                if !err.is_cancelled() {
                    warn!("task {index} failed: {message}");
                }
                self.errors.push(TaskFailure {
                    source_index: index,
                    message: message.clone(),
                });
                self.tasks.set(index, TaskState::error(message));
            }
        }
    }

    fn finish_run(&mut self, started: Instant) -> RunReport {
        self.is_running = false;
        let cancelled = self.cancel.is_cancelled();
        let snapshot = self.tasks.snapshot();
        let report = RunReport {
            total: snapshot.total,
            succeeded: snapshot.completed,
            failed: snapshot.errors,
            outputs: self.outputs.len(),
            cancelled,
            failures: self.errors.clone(),
            duration_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            "run finished: {}/{} succeeded, {} failed, {} output(s){} in {}ms",
            report.succeeded,
            report.total,
            report.failed,
            report.outputs,
            if cancelled { " (cancelled)" } else { "" },
            report.duration_ms
        );

        self.callback
            .on_run_complete(&self.outputs, &self.errors, cancelled);

        let (message, kind) = if cancelled {
            ("run cancelled".to_string(), NotifyKind::Info)
        } else if report.failed > 0 {
            (
                format!("{} of {} files failed", report.failed, report.total),
                NotifyKind::Error,
            )
        } else {
            (
                format!("processed {} file(s)", report.total),
                NotifyKind::Success,
            )
        };
        self.sink.notify(&message, kind);

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;

    fn file(name: &str) -> InputFile {
        InputFile::new(name, vec![0u8; 4])
    }

    fn runner() -> BatchRunner {
        BatchRunner::new(RunnerConfig::default())
    }

    #[tokio::test]
    async fn run_rejects_empty_file_list() {
        let mut r = runner();
        let p = crate::processor::processor_fn(|_, _| async { Ok(vec![]) });
        let err = r.run(&p).await.unwrap_err();
        assert!(matches!(err, BatchError::NoFilesSelected));
    }

    #[test]
    fn add_files_assigns_contiguous_queued_tasks() {
        let mut r = runner();
        r.add_files([file("a"), file("b")]);
        r.add_files([file("c")]);
        let snap = r.get_progress();
        assert_eq!(snap.total, 3);
        assert_eq!(snap.queued, 3);
        assert!(snap.tasks.iter().all(|t| t.status == TaskStatus::Queued));
    }

    #[test]
    fn remove_file_reindexes() {
        let mut r = runner();
        r.add_files([file("a"), file("b"), file("c")]);
        r.remove_file(1);
        assert_eq!(r.file_count(), 2);
        assert_eq!(r.get_progress().total, 2);
        // Out of range is a no-op.
        r.remove_file(10);
        assert_eq!(r.file_count(), 2);
    }

    #[test]
    fn download_single_rejects_bad_index() {
        let r = runner();
        let err = r.download_single(0).unwrap_err();
        assert!(matches!(err, BatchError::OutputNotFound { index: 0, .. }));
    }

    #[test]
    fn download_all_zip_rejects_empty_outputs() {
        let r = runner();
        assert!(matches!(
            r.download_all_zip("out.zip").unwrap_err(),
            BatchError::NoOutputs
        ));
    }

    #[test]
    fn clear_files_empties_everything() {
        let mut r = runner();
        r.add_files([file("a")]);
        r.clear_files();
        assert_eq!(r.file_count(), 0);
        assert_eq!(r.get_progress().total, 0);
        assert!(r.outputs().is_empty());
        assert!(r.failures().is_empty());
    }
}
