use std::time::Duration;

use crudswarm_core::{RunConfig, ThinkTime};

use crate::cli::RunArgs;

/// Load shape of a named profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunProfile {
    pub users: usize,
    pub spawn_rate: f64,
    pub run_time: Duration,
}

/// Get run profile by name
pub fn get_run_profile(profile: &str) -> RunProfile {
    match profile {
        "smoke" => smoke_profile(),
        "baseline" => baseline_profile(),
        "stress" => stress_profile(),
        _ => {
            tracing::warn!(profile, "Unknown profile, using 'baseline' profile");
            baseline_profile()
        }
    }
}

/// Smoke profile for checking a deployment responds at all
///
/// - 1 user
/// - 1 user/sec spawn rate
/// - 30 seconds
pub fn smoke_profile() -> RunProfile {
    RunProfile {
        users: 1,
        spawn_rate: 1.0,
        run_time: Duration::from_secs(30),
    }
}

/// Baseline profile for comparing builds under steady, light load
///
/// - 10 users
/// - 2 users/sec spawn rate
/// - 5 minutes
pub fn baseline_profile() -> RunProfile {
    RunProfile {
        users: 10,
        spawn_rate: 2.0,
        run_time: Duration::from_secs(300),
    }
}

/// Stress profile for finding the point where the API degrades
///
/// - 200 users
/// - 20 users/sec spawn rate
/// - 15 minutes
pub fn stress_profile() -> RunProfile {
    RunProfile {
        users: 200,
        spawn_rate: 20.0,
        run_time: Duration::from_secs(900),
    }
}

/// Resolve the profile and apply explicit flags on top of it.
///
/// `think_time` is the scenario's default; `--min-wait`/`--max-wait`
/// replace either bound. Validation is left to `start_run`.
pub fn build_run_config(args: &RunArgs, think_time: ThinkTime) -> RunConfig {
    let profile = get_run_profile(&args.profile);

    let run_time = match args.run_time {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => Some(profile.run_time),
    };

    let think_time = ThinkTime::between(
        args.min_wait
            .map(Duration::from_millis)
            .unwrap_or(think_time.min),
        args.max_wait
            .map(Duration::from_millis)
            .unwrap_or(think_time.max),
    );

    RunConfig {
        host: args.host.clone(),
        users: args.users.unwrap_or(profile.users),
        spawn_rate: args.spawn_rate.unwrap_or(profile.spawn_rate),
        run_time,
        think_time,
        request_timeout: Duration::from_secs(args.request_timeout),
        seed: args.seed,
    }
}
