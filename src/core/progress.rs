use serde::{Deserialize, Serialize};

/// Progress message type
#[derive(Debug, Deserialize, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ProgressType {
    /// An item finished and more remain
    Progress,
    /// The last item finished
    Complete,
    /// An item failed and more remain
    Error,
}

/// Cumulative progress of a batch, emitted after every item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// Progress type (progress, complete, error)
    pub progress_type: ProgressType,
    /// Number of completed items
    pub completed_tasks: usize,
    /// Total number of items
    pub total_tasks: usize,
    /// Fraction complete in `0.0..=1.0`, monotonically non-decreasing within a batch
    pub fraction: f64,
    /// Current status message
    pub status: String,
    /// Label of the item that just finished
    #[serde(default)]
    pub task_id: Option<String>,
    /// Error message if the item failed
    #[serde(default)]
    pub error: Option<String>,
}

impl Progress {
    /// Create a progress event for the `completed_tasks`-th finished item.
    pub fn new(completed_tasks: usize, total_tasks: usize, status: &str) -> Self {
        let fraction = if total_tasks > 0 {
            (completed_tasks as f64 / total_tasks as f64).min(1.0)
        } else {
            1.0
        };

        let progress_type = if completed_tasks >= total_tasks {
            ProgressType::Complete
        } else {
            ProgressType::Progress
        };

        Self {
            progress_type,
            completed_tasks,
            total_tasks,
            fraction,
            status: status.to_string(),
            task_id: None,
            error: None,
        }
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    /// Attach an item error. Marks the event as `Error` unless the batch is complete.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        if self.progress_type != ProgressType::Complete {
            self.progress_type = ProgressType::Error;
        }
        self.error = Some(error.into());
        self
    }

    /// Progress percentage (0-100)
    pub fn percentage(&self) -> f64 {
        self.fraction * 100.0
    }
}
