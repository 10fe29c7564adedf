// Scenarios module
// One user type per CRUD API, plus the shared run loop around the scheduler

pub mod todos_api;
pub mod users_api;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use anyhow::{Context, Result};
use crudswarm_core::{start_run, ThinkTime, UserType};

use crate::cli::RunArgs;
use crate::config::build_run_config;
use crate::metrics::reporter;
use crate::metrics::{MetricsCollector, RunSummary};

/// Run `user_type` to completion: until the run time elapses or Ctrl+C.
pub async fn run<S>(
    scenario: &str,
    args: &RunArgs,
    mut user_type: UserType<S>,
    think_time: ThinkTime,
) -> Result<RunSummary>
where
    S: Send + 'static,
{
    for (task, weight) in &args.weights {
        user_type.set_weight(task, *weight)?;
    }

    let config = build_run_config(args, think_time);
    let host = config.host.clone();

    // Setup metrics collector
    let collector = MetricsCollector::new();
    let handle = start_run(config, user_type, Arc::new(collector.clone()))
        .context("invalid run configuration")?;
    let run_id = handle.run_id();

    // Start periodic metrics reporter
    let live_view = (args.report_interval > 0).then(|| {
        tokio::spawn(reporter::start_periodic_reporter(
            collector.clone(),
            args.report_interval,
        ))
    });

    let stopper = handle.stopper();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl+C received, stopping virtual users");
            stopper.stop();
        }
    });

    let report = handle.wait().await?;

    interrupt.abort();
    if let Some(live_view) = live_view {
        live_view.abort();
    }

    collector.update_system_metrics();
    reporter::print_final_report(&collector, &report);

    let summary = RunSummary::from_collector(run_id, scenario, &host, &collector, report);
    if let Some(path) = &args.report_json {
        summary.write_json(path)?;
        tracing::info!(path = %path.display(), "Wrote run summary");
    }

    Ok(summary)
}
