//! Console reporter for metrics with real-time updates

use super::collector::MetricsCollector;
use crudswarm_core::RunReport;
use std::io::{self, Write};
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Start periodic metrics reporting (every N seconds)
pub async fn start_periodic_reporter(collector: MetricsCollector, interval_secs: u64) {
    let mut ticker = interval(Duration::from_secs(interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick fires immediately; nothing worth showing yet
    ticker.tick().await;

    loop {
        ticker.tick().await;

        // Update system metrics before printing
        collector.update_system_metrics();

        print_live_metrics(&collector);
    }
}

fn throughput(count: usize, elapsed: f64) -> f64 {
    if elapsed > 0.0 {
        count as f64 / elapsed
    } else {
        0.0
    }
}

/// Print live metrics (clears screen and updates in place)
pub fn print_live_metrics(collector: &MetricsCollector) {
    // Clear screen and move cursor to top
    print!("\x1B[2J\x1B[1;1H");

    let metrics = collector.get_snapshot();
    let elapsed = collector.elapsed_seconds();
    let totals = metrics.totals();
    let latency = collector.get_latency_percentiles();

    println!("╔════════════════════════════════════════════════════════════════╗");
    println!("║              CRUD Swarm Load Test - Live Metrics               ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    println!(
        "\n⏱️  Elapsed Time: {:02}:{:02}:{:02}",
        elapsed / 3600,
        (elapsed % 3600) / 60,
        elapsed % 60
    );

    println!("\n┌─ USERS ─────────────────────────────────────────────────────┐");
    println!(
        "│  Spawned:      {:>8}    Active:     {:>8}              │",
        metrics.users.spawned, metrics.users.active
    );
    println!("└─────────────────────────────────────────────────────────────┘");

    println!("\n┌─ REQUESTS ──────────────────────────────────────────────────┐");
    println!(
        "│  Executed:     {:>8}    Failed:     {:>8}              │",
        totals.executed, totals.failed
    );
    if totals.executed > 0 {
        println!(
            "│  Success Rate: {:>7.2}%    Throughput: {:>7.2}/sec        │",
            totals.success_rate(),
            throughput(totals.executed, collector.elapsed_seconds_f64())
        );
    }
    println!("└─────────────────────────────────────────────────────────────┘");

    if latency.count > 0 {
        println!("\n┌─ LATENCY (ms) ──────────────────────────────────────────────┐");
        println!(
            "│  Min: {:>6}  P50: {:>6}  P95: {:>6}  P99: {:>6}  Max: {:>6}│",
            latency.min, latency.p50, latency.p95, latency.p99, latency.max
        );
        println!(
            "│  Mean: {:>8.2} ms    Count: {:>10}                    │",
            latency.mean, latency.count
        );
        println!("└─────────────────────────────────────────────────────────────┘");
    }

    if !metrics.tasks.is_empty() {
        println!("\n┌─ TASKS ─────────────────────────────────────────────────────┐");
        for (name, task) in &metrics.tasks {
            println!(
                "│  {:<20} {:>8} ok {:>8} failed              │",
                name, task.succeeded, task.failed
            );
        }
        println!("└─────────────────────────────────────────────────────────────┘");
    }

    println!("\n┌─ SYSTEM ────────────────────────────────────────────────────┐");
    println!(
        "│  CPU Usage:    {:>6.1}%    Memory: {:>6} / {:>6} MB       │",
        metrics.system.cpu_usage, metrics.system.memory_used_mb, metrics.system.memory_total_mb
    );
    println!("└─────────────────────────────────────────────────────────────┘");

    println!("\n  [Press Ctrl+C to stop test]");

    let _ = io::stdout().flush();
}

/// Print final summary report
pub fn print_final_report(collector: &MetricsCollector, report: &RunReport) {
    let metrics = collector.get_snapshot();
    let elapsed = collector.elapsed_seconds_f64();
    let totals = metrics.totals();
    let latency = collector.get_latency_percentiles();
    let task_latency = collector.get_task_latency_percentiles();

    println!("\n╔════════════════════════════════════════════════════════════════╗");
    println!("║                    FINAL TEST REPORT                           ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    println!("\n👥 USERS");
    println!("   Spawned:              {:>10}", report.users_spawned);
    if report.panicked > 0 {
        println!("   Ended by panic:       {:>10}", report.panicked);
    }
    let setup = collector.get_task_counts("on_start");
    if setup.failed > 0 {
        println!("   Failed on_start:      {:>10}", setup.failed);
    }

    println!("\n📊 REQUESTS");
    println!("   Total Executed:       {:>10}", totals.executed);
    println!("   Total Succeeded:      {:>10}", totals.succeeded);
    println!("   Total Failed:         {:>10}", totals.failed);
    println!("   Skipped:              {:>10}", report.skipped);
    println!(
        "   Throughput:           {:>10.2} requests/sec",
        throughput(totals.executed, elapsed)
    );
    if totals.executed > 0 {
        println!("   Success Rate:         {:>10.2}%", totals.success_rate());
    }

    if latency.count > 0 {
        println!("\n📈 LATENCY");
        println!("   Min:                  {:>10} ms", latency.min);
        println!("   P50 (Median):         {:>10} ms", latency.p50);
        println!("   P95:                  {:>10} ms", latency.p95);
        println!("   P99:                  {:>10} ms", latency.p99);
        println!("   Max:                  {:>10} ms", latency.max);
        println!("   Mean:                 {:>10.2} ms", latency.mean);
    }

    if !metrics.tasks.is_empty() {
        println!("\n⚙️  TASKS");
        println!(
            "   {:<20} {:>8} {:>8} {:>8} {:>8}",
            "name", "ok", "failed", "p50 ms", "p95 ms"
        );
        for (name, task) in &metrics.tasks {
            let (p50, p95) = task_latency
                .get(name)
                .map(|stats| (stats.p50, stats.p95))
                .unwrap_or_default();
            println!(
                "   {:<20} {:>8} {:>8} {:>8} {:>8}",
                name, task.succeeded, task.failed, p50, p95
            );
            if let Some(error) = &task.last_error {
                println!("      last error: {}", error);
            }
        }
    }

    println!("\n⏱️  Test Duration: {:.2} seconds", elapsed);
    println!("════════════════════════════════════════════════════════════════\n");
}
