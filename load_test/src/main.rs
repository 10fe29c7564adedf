use anyhow::Result;
use clap::Parser;

mod cli;
mod config;
mod metrics;
mod scenarios;
mod utils;

use cli::{Cli, Scenario};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if cli.run.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!("CRUD Swarm Load Test Starting...");
    tracing::info!("Host: {}", cli.run.host);
    tracing::info!("Profile: {}", cli.run.profile);

    let summary = match &cli.scenario {
        Scenario::Users => {
            tracing::info!("Running Users scenario");
            scenarios::users_api::run(&cli.run).await?
        }
        Scenario::Todos(args) => {
            tracing::info!("Running Todos scenario");
            tracing::info!("  Initial Todos: {}", args.initial_todos);
            scenarios::todos_api::run(&cli.run, args).await?
        }
    };

    tracing::info!(
        run_id = %summary.run_id,
        scenario = cli.scenario.name(),
        executed = summary.totals.executed,
        failed = summary.totals.failed,
        "Load test complete"
    );

    Ok(())
}
