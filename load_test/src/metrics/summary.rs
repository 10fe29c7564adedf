//! Serialisable end-of-run summary

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use crudswarm_core::RunReport;
use serde::Serialize;
use uuid::Uuid;

use super::collector::{LatencyStats, MetricsCollector};
use super::types::{TaskMetrics, UserMetrics};

#[derive(Debug, Clone, Serialize)]
pub struct TaskSummary {
    #[serde(flatten)]
    pub counts: TaskMetrics,
    pub latency_ms: Option<LatencyStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub scenario: String,
    pub host: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub report: RunReport,
    pub users: UserMetrics,
    pub totals: TaskMetrics,
    pub latency_ms: LatencyStats,
    pub tasks: BTreeMap<String, TaskSummary>,
}

impl RunSummary {
    pub fn from_collector(
        run_id: Uuid,
        scenario: &str,
        host: &str,
        collector: &MetricsCollector,
        report: RunReport,
    ) -> Self {
        let metrics = collector.get_snapshot();
        let mut latencies = collector.get_task_latency_percentiles();
        let tasks = metrics
            .tasks
            .iter()
            .map(|(name, counts)| {
                let summary = TaskSummary {
                    counts: counts.clone(),
                    latency_ms: latencies.remove(name),
                };
                (name.clone(), summary)
            })
            .collect();

        Self {
            run_id,
            scenario: scenario.to_string(),
            host: host.to_string(),
            started_at: collector.started_at(),
            finished_at: Utc::now(),
            duration_secs: collector.elapsed_seconds_f64(),
            report,
            users: metrics.users.clone(),
            totals: metrics.totals(),
            latency_ms: collector.get_latency_percentiles(),
            tasks,
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("creating report file {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .with_context(|| format!("writing report to {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_written_as_json() {
        let collector = MetricsCollector::new();
        collector.task_succeeded("list_users", Some(200), 4);
        collector.task_failed("get_user", Some(404), 2, "unexpected status 404");

        let report = RunReport {
            users_spawned: 1,
            executed: 2,
            succeeded: 1,
            failed: 1,
            skipped: 0,
            panicked: 0,
        };
        let run_id = Uuid::new_v4();
        let summary = RunSummary::from_collector(
            run_id,
            "users",
            "http://localhost:8080",
            &collector,
            report,
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        summary.write_json(&path).unwrap();

        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written["run_id"], run_id.to_string());
        assert_eq!(written["scenario"], "users");
        assert_eq!(written["report"]["failed"], 1);
        assert_eq!(written["totals"]["executed"], 2);
        assert_eq!(written["tasks"]["get_user"]["failed"], 1);
        assert_eq!(written["tasks"]["get_user"]["status_codes"]["404"], 1);
        assert_eq!(written["tasks"]["list_users"]["latency_ms"]["count"], 1);
    }

    #[test]
    fn test_write_json_reports_bad_path() {
        let collector = MetricsCollector::new();
        let summary = RunSummary::from_collector(
            Uuid::new_v4(),
            "todos",
            "http://localhost:8080",
            &collector,
            RunReport::default(),
        );
        let dir = tempfile::tempdir().unwrap();
        let err = summary
            .write_json(&dir.path().join("missing").join("summary.json"))
            .unwrap_err();
        assert!(err.to_string().contains("creating report file"));
    }
}
