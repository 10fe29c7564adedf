use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// CRUD API load testing tool
#[derive(Parser, Debug)]
#[command(name = "load-test")]
#[command(about = "Spawns virtual users that exercise a JSON CRUD API")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,

    #[command(subcommand)]
    pub scenario: Scenario,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Scenario {
    /// Create, list, read, update and delete users on /users
    Users,

    /// Seed a few todos per user, then exercise /todos
    Todos(TodosArgs),
}

impl Scenario {
    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Users => "users",
            Scenario::Todos(_) => "todos",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct TodosArgs {
    /// Todos each user creates before its task loop
    #[arg(long, default_value = "3")]
    pub initial_todos: usize,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Base URL of the API under test
    #[arg(
        long,
        global = true,
        default_value = "http://localhost:8080",
        env = "TARGET_HOST"
    )]
    pub host: String,

    /// Run profile: smoke, baseline, stress
    #[arg(
        long,
        global = true,
        default_value = "baseline",
        env = "LOAD_PROFILE",
        value_parser = ["smoke", "baseline", "stress"]
    )]
    pub profile: String,

    /// Number of virtual users (overrides the profile)
    #[arg(short, long, global = true, env = "LOAD_USERS")]
    pub users: Option<usize>,

    /// Users spawned per second (overrides the profile)
    #[arg(short = 'r', long, global = true, env = "LOAD_SPAWN_RATE")]
    pub spawn_rate: Option<f64>,

    /// Run time in seconds, 0 runs until Ctrl+C (overrides the profile)
    #[arg(long, global = true, env = "LOAD_RUN_TIME")]
    pub run_time: Option<u64>,

    /// Minimum think time between tasks in milliseconds
    #[arg(long, global = true)]
    pub min_wait: Option<u64>,

    /// Maximum think time between tasks in milliseconds
    #[arg(long, global = true)]
    pub max_wait: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value = "10")]
    pub request_timeout: u64,

    /// Seed for every user's random number generator
    #[arg(long, global = true, env = "LOAD_SEED")]
    pub seed: Option<u64>,

    /// Override a task weight, e.g. --weight list_users=10 (repeatable)
    #[arg(long = "weight", global = true, value_name = "NAME=N", value_parser = parse_weight)]
    pub weights: Vec<(String, u32)>,

    /// Live metrics interval in seconds, 0 disables the live view
    #[arg(long, global = true, default_value = "5")]
    pub report_interval: u64,

    /// Write the final summary as JSON to this path
    #[arg(long, global = true)]
    pub report_json: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

fn parse_weight(raw: &str) -> Result<(String, u32), String> {
    let (name, weight) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=N, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing task name in '{raw}'"));
    }
    let weight = weight
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid weight in '{raw}': {e}"))?;
    Ok((name.to_string(), weight))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_weight() {
        assert_eq!(parse_weight("list_users=10"), Ok(("list_users".to_string(), 10)));
        assert_eq!(parse_weight(" get_user = 0 "), Ok(("get_user".to_string(), 0)));
        assert!(parse_weight("list_users").is_err());
        assert!(parse_weight("=3").is_err());
        assert!(parse_weight("list_users=-1").is_err());
    }

    #[test]
    fn test_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "load-test",
            "--profile",
            "smoke",
            "todos",
            "--initial-todos",
            "5",
            "-u",
            "4",
            "--weight",
            "create_todo=7",
        ])
        .unwrap();

        assert_eq!(cli.run.profile, "smoke");
        assert_eq!(cli.run.users, Some(4));
        assert_eq!(cli.run.weights, vec![("create_todo".to_string(), 7)]);
        match cli.scenario {
            Scenario::Todos(args) => assert_eq!(args.initial_todos, 5),
            other => panic!("unexpected scenario {other:?}"),
        }
    }

    #[test]
    fn test_unknown_profile_rejected() {
        assert!(Cli::try_parse_from(["load-test", "--profile", "huge", "users"]).is_err());
    }
}
