//! Metric types

use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskMetrics {
    pub executed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub status_codes: BTreeMap<u16, usize>,
    pub last_error: Option<String>,
}

impl TaskMetrics {
    pub fn success_rate(&self) -> f64 {
        if self.executed == 0 {
            return 0.0;
        }
        self.succeeded as f64 / self.executed as f64 * 100.0
    }

    fn merge(&mut self, other: &TaskMetrics) {
        self.executed += other.executed;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        for (status, count) in &other.status_codes {
            *self.status_codes.entry(*status).or_default() += count;
        }
        if other.last_error.is_some() {
            self.last_error.clone_from(&other.last_error);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserMetrics {
    pub spawned: usize,
    pub active: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SystemMetrics {
    pub cpu_usage: f32,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
}

#[derive(Debug, Clone, Default)]
pub struct TestMetrics {
    /// Keyed by task name; hooks appear as `on_start` / `on_stop`
    pub tasks: BTreeMap<String, TaskMetrics>,
    pub users: UserMetrics,
    pub system: SystemMetrics,
}

impl TestMetrics {
    pub fn totals(&self) -> TaskMetrics {
        self.tasks
            .values()
            .fold(TaskMetrics::default(), |mut totals, task| {
                totals.merge(task);
                totals
            })
    }

    pub fn task(&self, name: &str) -> Option<&TaskMetrics> {
        self.tasks.get(name)
    }
}
