//! Per-task state tracking and progress aggregation.
//!
//! Every input file has exactly one [`TaskState`] at all times, keyed by
//! its position in the file list. States move through a small machine:
//!
//! ```text
//! Queued ──▶ Running ──▶ Success
//!                  └───▶ Error     (terminal, set exactly once per run)
//! ```
//!
//! [`ProgressSnapshot`] is the pure read model: a point-in-time count of
//! tasks in each status plus an overall 0–100 percentage. It has no
//! side effects and is cheap enough to compute on every state change, so
//! callers can rebuild their entire display from each snapshot instead of
//! diffing incremental events.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting to be dispatched.
    Queued,
    /// Dispatched; its processor future is in flight.
    Running,
    /// Processor resolved; outputs collected.
    Success,
    /// Processor failed or was cancelled.
    Error,
}

/// Mutable per-task state: status, display message, and 0–100 progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskState {
    pub status: TaskStatus,
    /// Human-readable status text ("processing...", an error message, ...).
    pub message: String,
    /// 0–100. In batch mode this is a display approximation, not a true
    /// per-file measure.
    pub progress: u8,
}

impl TaskState {
    /// A fresh task, not yet dispatched.
    pub fn queued() -> Self {
        Self {
            status: TaskStatus::Queued,
            message: String::new(),
            progress: 0,
        }
    }

    pub fn running() -> Self {
        Self {
            status: TaskStatus::Running,
            message: "processing...".to_string(),
            progress: 0,
        }
    }

    pub fn success() -> Self {
        Self {
            status: TaskStatus::Success,
            message: "done".to_string(),
            progress: 100,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Error,
            message: message.into(),
            progress: 0,
        }
    }
}

impl Default for TaskState {
    fn default() -> Self {
        Self::queued()
    }
}

/// Point-in-time aggregate of all task states.
///
/// `progress` is `completed / total` rounded to a whole percentage; errored
/// tasks do not count as completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub total: usize,
    pub completed: usize,
    pub running: usize,
    pub queued: usize,
    pub errors: usize,
    /// Overall progress, 0–100.
    pub progress: u8,
    /// Per-task states in index order.
    pub tasks: Vec<TaskState>,
}

impl ProgressSnapshot {
    /// Aggregate a snapshot from the per-task states.
    pub fn from_tasks(tasks: &[TaskState]) -> Self {
        let total = tasks.len();
        let mut completed = 0;
        let mut running = 0;
        let mut queued = 0;
        let mut errors = 0;

        for state in tasks {
            match state.status {
                TaskStatus::Success => completed += 1,
                TaskStatus::Running => running += 1,
                TaskStatus::Queued => queued += 1,
                TaskStatus::Error => errors += 1,
            }
        }

        let progress = if total == 0 {
            0
        } else {
            ((completed as f64 / total as f64) * 100.0).round() as u8
        };

        Self {
            total,
            completed,
            running,
            queued,
            errors,
            progress,
            tasks: tasks.to_vec(),
        }
    }

    /// An empty snapshot (no files selected).
    pub fn empty() -> Self {
        Self::from_tasks(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_counts_by_status() {
        let tasks = vec![
            TaskState::success(),
            TaskState::running(),
            TaskState::queued(),
            TaskState::error("boom"),
        ];
        let snap = ProgressSnapshot::from_tasks(&tasks);
        assert_eq!(snap.total, 4);
        assert_eq!(snap.completed, 1);
        assert_eq!(snap.running, 1);
        assert_eq!(snap.queued, 1);
        assert_eq!(snap.errors, 1);
        assert_eq!(snap.progress, 25);
    }

    #[test]
    fn empty_snapshot_is_zeroed() {
        let snap = ProgressSnapshot::empty();
        assert_eq!(snap.total, 0);
        assert_eq!(snap.progress, 0);
        assert!(snap.tasks.is_empty());
    }

    #[test]
    fn errored_tasks_do_not_count_as_completed() {
        let tasks = vec![TaskState::error("x"), TaskState::error("y")];
        let snap = ProgressSnapshot::from_tasks(&tasks);
        assert_eq!(snap.completed, 0);
        assert_eq!(snap.progress, 0);
    }
}
