use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use clap::Parser;
use crudswarm_core::{ApiClient, Session};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use wiremock::{Request, Respond, ResponseTemplate};

use crate::cli::{Cli, RunArgs};

/// Echoes the posted entity back with a fresh numeric id, like the real APIs
#[derive(Default)]
pub struct CreatedEntity {
    next: AtomicU64,
}

impl Respond for CreatedEntity {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let id = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        let mut body: Value = serde_json::from_slice(&request.body).unwrap_or_else(|_| json!({}));
        if let Some(entity) = body.as_object_mut() {
            entity.insert("id".to_string(), json!(id));
        }
        ResponseTemplate::new(201).set_body_json(body)
    }
}

pub fn session<S>(host: &str, state: S) -> Session<S> {
    let client = ApiClient::new(host, Duration::from_secs(2)).unwrap();
    Session::new(0, state, StdRng::seed_from_u64(42), client)
}

/// A short, quiet run against `host`
pub fn run_args(host: &str, users: usize, scenario: &str) -> RunArgs {
    let users = users.to_string();
    let argv = [
        "load-test",
        "--host",
        host,
        "--users",
        users.as_str(),
        "--spawn-rate",
        "50",
        "--run-time",
        "1",
        "--min-wait",
        "5",
        "--max-wait",
        "20",
        "--seed",
        "7",
        "--report-interval",
        "0",
        scenario,
    ];
    Cli::try_parse_from(argv).unwrap().run
}
