//! Metrics collector - thread-safe outcome aggregation with latency tracking

use super::types::{TaskMetrics, TestMetrics};
use chrono::{DateTime, Utc};
use crudswarm_core::{Outcome, OutcomeSink};
use hdrhistogram::Histogram;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

#[derive(Clone)]
pub struct MetricsCollector {
    metrics: Arc<RwLock<TestMetrics>>,
    task_latencies: Arc<RwLock<BTreeMap<String, Histogram<u64>>>>,
    total_latencies: Arc<RwLock<Histogram<u64>>>,
    system: Arc<RwLock<System>>,
    start_time: Instant,
    started_at: DateTime<Utc>,
}

// 3 significant digits of precision
fn new_histogram() -> Histogram<u64> {
    Histogram::new(3).expect("3 significant figures is a valid histogram precision")
}

impl MetricsCollector {
    pub fn new() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::new()
                .with_cpu(CpuRefreshKind::everything())
                .with_memory(MemoryRefreshKind::everything()),
        );

        Self {
            metrics: Arc::new(RwLock::new(TestMetrics::default())),
            task_latencies: Arc::new(RwLock::new(BTreeMap::new())),
            total_latencies: Arc::new(RwLock::new(new_histogram())),
            system: Arc::new(RwLock::new(system)),
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }

    pub fn task_succeeded(&self, task: &str, status: Option<u16>, duration_ms: u64) {
        let mut metrics = self.metrics.write();
        let entry = metrics.tasks.entry(task.to_string()).or_default();
        entry.executed += 1;
        entry.succeeded += 1;
        if let Some(status) = status {
            *entry.status_codes.entry(status).or_default() += 1;
        }
        drop(metrics);

        self.record_latency(task, duration_ms);
    }

    pub fn task_failed(&self, task: &str, status: Option<u16>, duration_ms: u64, error: &str) {
        let mut metrics = self.metrics.write();
        let entry = metrics.tasks.entry(task.to_string()).or_default();
        entry.executed += 1;
        entry.failed += 1;
        if let Some(status) = status {
            *entry.status_codes.entry(status).or_default() += 1;
        }
        entry.last_error = Some(error.to_string());
        drop(metrics);

        // Still record latency for failed requests
        self.record_latency(task, duration_ms);
    }

    fn record_latency(&self, task: &str, duration_ms: u64) {
        let mut latencies = self.task_latencies.write();
        let _ = latencies
            .entry(task.to_string())
            .or_insert_with(new_histogram)
            .record(duration_ms);
        drop(latencies);

        let _ = self.total_latencies.write().record(duration_ms);
    }

    /// Update system metrics (CPU, memory)
    pub fn update_system_metrics(&self) {
        let mut system = self.system.write();
        system.refresh_cpu_all();
        system.refresh_memory();

        let mut metrics = self.metrics.write();
        metrics.system.cpu_usage = system.global_cpu_usage();
        metrics.system.memory_used_mb = system.used_memory() / 1024 / 1024;
        metrics.system.memory_total_mb = system.total_memory() / 1024 / 1024;
    }

    pub fn get_snapshot(&self) -> TestMetrics {
        self.metrics.read().clone()
    }

    pub fn get_task_counts(&self, task: &str) -> TaskMetrics {
        self.metrics.read().task(task).cloned().unwrap_or_default()
    }

    /// Latency across every task
    pub fn get_latency_percentiles(&self) -> LatencyStats {
        LatencyStats::from_histogram(&self.total_latencies.read())
    }

    pub fn get_task_latency_percentiles(&self) -> BTreeMap<String, LatencyStats> {
        self.task_latencies
            .read()
            .iter()
            .map(|(task, hist)| (task.clone(), LatencyStats::from_histogram(hist)))
            .collect()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn elapsed_seconds_f64(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl OutcomeSink for MetricsCollector {
    fn record(&self, outcome: Outcome) {
        let duration_ms = outcome.duration.as_millis() as u64;
        if outcome.success {
            self.task_succeeded(&outcome.task, outcome.status_code, duration_ms);
        } else {
            let error = outcome.error.as_deref().unwrap_or("unknown error");
            self.task_failed(&outcome.task, outcome.status_code, duration_ms, error);
        }
    }

    fn user_started(&self, _user_id: usize) {
        let mut metrics = self.metrics.write();
        metrics.users.spawned += 1;
        metrics.users.active += 1;
    }

    fn user_stopped(&self, _user_id: usize) {
        let mut metrics = self.metrics.write();
        metrics.users.active = metrics.users.active.saturating_sub(1);
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LatencyStats {
    pub min: u64,
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub max: u64,
    pub mean: f64,
    pub count: u64,
}

impl LatencyStats {
    fn from_histogram(hist: &Histogram<u64>) -> Self {
        if hist.is_empty() {
            return LatencyStats::default();
        }
        LatencyStats {
            min: hist.min(),
            p50: hist.value_at_quantile(0.50),
            p95: hist.value_at_quantile(0.95),
            p99: hist.value_at_quantile(0.99),
            max: hist.max(),
            mean: hist.mean(),
            count: hist.len(),
        }
    }
}
