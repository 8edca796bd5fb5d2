//! Cancellation tokens and the per-invocation contexts handed to
//! processors.
//!
//! ## Cooperative cancellation
//!
//! Cancellation is best-effort and cooperative: [`CancelToken::cancel`]
//! flips a shared flag, the runner stops dispatching queued tasks, and
//! processors observe the flag at stage boundaries via
//! [`TaskContext::check_cancelled`]. Nothing is forcibly aborted — a stage
//! that never checks the token runs to completion and its wrapping check
//! fires afterwards. There is no timeout escalation; a stuck stage
//! occupies its concurrency slot until it returns.
//!
//! The token is a value object shared by reference (an `Arc`'d atomic), so
//! every clone observes a `cancel()` from any other clone immediately —
//! there is no point-in-time snapshot to go stale mid-run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::TaskError;
use crate::progress::ProgressCallback;
use crate::task::{ProgressSnapshot, TaskState};

/// Cooperative cancellation flag, cheap to clone and share.
///
/// All clones observe the same underlying state. `cancel()` is idempotent.
#[derive(Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// A fresh, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. All clones observe it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether `cancel()` has been called on this token or any clone.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Clear the flag so the token can be reused for the next run.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Release);
    }

    /// Stage-boundary check: `Err(TaskError::Cancelled)` once cancelled.
    pub fn err_if_cancelled(&self) -> Result<(), TaskError> {
        if self.is_cancelled() {
            Err(TaskError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Shared handle to the runner's task-state table.
///
/// The table is the one structure mutated from concurrent task futures
/// (progress updates) as well as from the runner's settle points, so it is
/// mutex-guarded. The progress callback is always invoked *after* the lock
/// is released — user callbacks must never run under the table lock.
#[derive(Clone)]
pub(crate) struct TaskTable {
    states: Arc<Mutex<Vec<TaskState>>>,
    callback: ProgressCallback,
}

impl TaskTable {
    pub(crate) fn new(callback: ProgressCallback) -> Self {
        Self {
            states: Arc::new(Mutex::new(Vec::new())),
            callback,
        }
    }

    /// Replace the whole table with `count` queued tasks.
    pub(crate) fn reset(&self, count: usize) {
        {
            let mut states = self.states.lock().unwrap();
            *states = vec![TaskState::queued(); count];
        }
        self.callback.on_progress(&self.snapshot());
    }

    /// Append `count` queued tasks (files added to an existing set).
    pub(crate) fn append(&self, count: usize) {
        {
            let mut states = self.states.lock().unwrap();
            states.extend(std::iter::repeat_with(TaskState::queued).take(count));
        }
        self.callback.on_progress(&self.snapshot());
    }

    /// Remove the task at `index`, shifting later tasks down so indices
    /// stay contiguous. Out-of-range indices are ignored.
    pub(crate) fn remove(&self, index: usize) {
        {
            let mut states = self.states.lock().unwrap();
            if index < states.len() {
                states.remove(index);
            }
        }
        self.callback.on_progress(&self.snapshot());
    }

    pub(crate) fn clear(&self) {
        self.states.lock().unwrap().clear();
        self.callback.on_progress(&self.snapshot());
    }

    /// Set one task's state and fire the callbacks.
    pub(crate) fn set(&self, index: usize, state: TaskState) {
        {
            let mut states = self.states.lock().unwrap();
            if index >= states.len() {
                return;
            }
            states[index] = state.clone();
        }
        self.callback.on_task_state(index, &state);
        self.callback.on_progress(&self.snapshot());
    }

    /// Patch one task's message/progress without touching its status.
    pub(crate) fn patch(&self, index: usize, message: Option<&str>, progress: Option<u8>) {
        let updated = {
            let mut states = self.states.lock().unwrap();
            match states.get_mut(index) {
                Some(state) => {
                    if let Some(m) = message {
                        state.message = m.to_string();
                    }
                    if let Some(p) = progress {
                        state.progress = p.min(100);
                    }
                    Some(state.clone())
                }
                None => None,
            }
        };
        if let Some(state) = updated {
            self.callback.on_task_state(index, &state);
            self.callback.on_progress(&self.snapshot());
        }
    }

    /// Distribute a single 0–100 scalar linearly across all tasks for
    /// display: task `i` of `n` shows `floor(scalar / n * (i + 1))`,
    /// capped at 100. A display approximation only — it does not reflect
    /// true per-file completion.
    pub(crate) fn distribute(&self, scalar: u8) {
        {
            let mut states = self.states.lock().unwrap();
            let total = states.len();
            if total == 0 {
                return;
            }
            let per_file = f64::from(scalar.min(100)) / total as f64;
            for (i, state) in states.iter_mut().enumerate() {
                state.progress = (per_file * (i + 1) as f64).floor().min(100.0) as u8;
            }
        }
        self.callback.on_progress(&self.snapshot());
    }

    /// Mark every non-terminal task errored with `message`.
    pub(crate) fn fail_all(&self, message: &str) {
        {
            let mut states = self.states.lock().unwrap();
            for state in states.iter_mut() {
                *state = TaskState::error(message);
            }
        }
        self.callback.on_progress(&self.snapshot());
    }

    pub(crate) fn succeed_all(&self) {
        {
            let mut states = self.states.lock().unwrap();
            for state in states.iter_mut() {
                *state = TaskState::success();
            }
        }
        self.callback.on_progress(&self.snapshot());
    }

    pub(crate) fn snapshot(&self) -> ProgressSnapshot {
        let states = self.states.lock().unwrap();
        ProgressSnapshot::from_tasks(&states)
    }
}

/// Context handed to a per-file processor invocation.
///
/// Ephemeral: one instance per dispatch, carrying the task's index, the
/// run's cancellation token, and setters for the task's own status text
/// and progress bar.
#[derive(Clone)]
pub struct TaskContext {
    index: usize,
    cancel: CancelToken,
    table: TaskTable,
}

impl TaskContext {
    pub(crate) fn new(index: usize, cancel: CancelToken, table: TaskTable) -> Self {
        Self {
            index,
            cancel,
            table,
        }
    }

    /// Stable index of the file this task is processing.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The run's cancellation token.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stage-boundary check; processors call this between stages.
    pub fn check_cancelled(&self) -> Result<(), TaskError> {
        self.cancel.err_if_cancelled()
    }

    /// Update this task's status message.
    pub fn set_message(&self, message: &str) {
        self.table.patch(self.index, Some(message), None);
    }

    /// Update this task's progress (0–100).
    pub fn set_progress(&self, progress: u8) {
        self.table.patch(self.index, None, Some(progress));
    }
}

/// Context handed to a batch processor, which consumes all files at once.
///
/// Unlike [`TaskContext`] there is no single task index; the processor
/// reports either per-task patches or one overall scalar.
#[derive(Clone)]
pub struct BatchContext {
    cancel: CancelToken,
    table: TaskTable,
}

impl BatchContext {
    pub(crate) fn new(cancel: CancelToken, table: TaskTable) -> Self {
        Self { cancel, table }
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn check_cancelled(&self) -> Result<(), TaskError> {
        self.cancel.err_if_cancelled()
    }

    /// Replace one task's displayed state.
    pub fn set_task_state(&self, index: usize, state: TaskState) {
        self.table.set(index, state);
    }

    /// Report overall batch progress as one 0–100 scalar.
    ///
    /// The scalar is linearly distributed across the per-task progress
    /// bars for display (task `i` of `n` shows `scalar / n * (i + 1)`,
    /// floored and capped at 100). This is an approximation — it does not
    /// reflect true per-file completion.
    pub fn set_progress(&self, progress: u8) {
        self.table.distribute(progress);
    }
}
