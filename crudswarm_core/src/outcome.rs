//! Outcome records and the shared sink they are appended to.

use std::time::Duration;

use parking_lot::Mutex;

/// Result of one completed task or hook execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub user_id: usize,
    pub task: String,
    pub duration: Duration,
    pub success: bool,
    pub status_code: Option<u16>,
    pub error: Option<String>,
}

impl Outcome {
    pub fn success(
        user_id: usize,
        task: impl Into<String>,
        duration: Duration,
        status_code: Option<u16>,
    ) -> Self {
        Self {
            user_id,
            task: task.into(),
            duration,
            success: true,
            status_code,
            error: None,
        }
    }

    pub fn failure(
        user_id: usize,
        task: impl Into<String>,
        duration: Duration,
        status_code: Option<u16>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            task: task.into(),
            duration,
            success: false,
            status_code,
            error: Some(error.into()),
        }
    }
}

/// The one resource shared by every virtual user.
///
/// Called concurrently from all users, so implementations must synchronise
/// internally. Skipped tasks are never reported here.
pub trait OutcomeSink: Send + Sync {
    fn record(&self, outcome: Outcome);

    fn user_started(&self, _user_id: usize) {}

    fn user_stopped(&self, _user_id: usize) {}
}

/// Keeps every outcome in memory, in arrival order.
#[derive(Debug, Default)]
pub struct OutcomeLog {
    outcomes: Mutex<Vec<Outcome>>,
}

impl OutcomeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.outcomes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<Outcome> {
        self.outcomes.lock().clone()
    }

    /// Outcomes recorded for `task`
    pub fn count_task(&self, task: &str) -> usize {
        self.outcomes
            .lock()
            .iter()
            .filter(|outcome| outcome.task == task)
            .count()
    }

    pub fn failures(&self) -> usize {
        self.outcomes
            .lock()
            .iter()
            .filter(|outcome| !outcome.success)
            .count()
    }
}

impl OutcomeSink for OutcomeLog {
    fn record(&self, outcome: Outcome) {
        self.outcomes.lock().push(outcome);
    }
}
