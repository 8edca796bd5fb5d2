//! Progress-callback trait for batch run events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::RunnerConfigBuilder::progress_callback`] to receive
//! real-time events as the runner dispatches and settles tasks.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers
//! can forward events to a channel, a WebSocket, a database record, or a
//! terminal progress bar — without the library knowing anything about how
//! the host application communicates. The trait is `Send + Sync` because
//! batch processors may report progress from concurrently executing
//! futures.
//!
//! # Example
//!
//! ```rust
//! use filebatch::{BatchProgressCallback, ProgressSnapshot};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingCallback {
//!     events: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_progress(&self, snapshot: &ProgressSnapshot) {
//!         self.events.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} done", snapshot.completed, snapshot.total);
//!     }
//! }
//! ```

use std::sync::Arc;

use crate::error::TaskFailure;
use crate::output::OutputFile;
use crate::task::{ProgressSnapshot, TaskState};

/// Called by the runner as task states change.
///
/// All methods have default no-op implementations so callers only
/// override what they care about.
///
/// # Thread safety
///
/// `on_progress` and `on_task_state` may be called from concurrently
/// executing task futures (progress updates mid-stage). Implementations
/// must protect shared mutable state with appropriate synchronisation.
pub trait BatchProgressCallback: Send + Sync {
    /// Called after every task-state change with a full aggregate
    /// snapshot. Callers can rebuild their entire display from it.
    fn on_progress(&self, snapshot: &ProgressSnapshot) {
        let _ = snapshot;
    }

    /// Called when a single task's state changes.
    fn on_task_state(&self, index: usize, state: &TaskState) {
        let _ = (index, state);
    }

    /// Called once when the run ends — all tasks settled or cancellation
    /// drained the in-flight set.
    ///
    /// # Arguments
    /// * `outputs`   — every artifact collected this run, completion order
    /// * `failures`  — one entry per failed task
    /// * `cancelled` — whether the run was cancelled
    fn on_run_complete(&self, outputs: &[OutputFile], failures: &[TaskFailure], cancelled: bool) {
        let _ = (outputs, failures, cancelled);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in
/// [`crate::config::RunnerConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        progress_events: AtomicUsize,
        task_events: AtomicUsize,
        completes: AtomicUsize,
    }

    impl BatchProgressCallback for TrackingCallback {
        fn on_progress(&self, _snapshot: &ProgressSnapshot) {
            self.progress_events.fetch_add(1, Ordering::SeqCst);
        }

        fn on_task_state(&self, _index: usize, _state: &TaskState) {
            self.task_events.fetch_add(1, Ordering::SeqCst);
        }

        fn on_run_complete(
            &self,
            _outputs: &[OutputFile],
            _failures: &[TaskFailure],
            _cancelled: bool,
        ) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_progress(&ProgressSnapshot::empty());
        cb.on_task_state(0, &TaskState::queued());
        cb.on_run_complete(&[], &[], false);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let cb = TrackingCallback {
            progress_events: AtomicUsize::new(0),
            task_events: AtomicUsize::new(0),
            completes: AtomicUsize::new(0),
        };

        let state = TaskState {
            status: TaskStatus::Running,
            message: String::new(),
            progress: 40,
        };
        cb.on_task_state(0, &state);
        cb.on_progress(&ProgressSnapshot::from_tasks(&[state]));
        cb.on_run_complete(&[], &[], true);

        assert_eq!(cb.progress_events.load(Ordering::SeqCst), 1);
        assert_eq!(cb.task_events.load(Ordering::SeqCst), 1);
        assert_eq!(cb.completes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_progress(&ProgressSnapshot::empty());
    }
}
