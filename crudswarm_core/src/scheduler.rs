//! Virtual user scheduler.
//!
//! [`start_run`] validates the configuration, then a driver task spawns
//! users at the configured rate. Each user runs on its own Tokio task:
//!
//! ```text
//! Spawning (on_start) -> Running { select -> think -> execute -> record } -> Stopping (on_stop) -> Terminated
//! ```
//!
//! Stopping is cooperative. A stop wakes users out of think time and the
//! spawner out of its ramp-up pause, but a task that is already executing
//! always runs to completion; its requests are bounded by the request timeout.
//!
//! Task executions are admitted through a stop gate: once [`stop_run`]
//! returns, no user starts another task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::RunConfig;
use crate::error::{ConfigError, LifecycleError, RunError};
use crate::http::ApiClient;
use crate::lifecycle::{PhaseCounts, UserBoard, UserPhase};
use crate::outcome::{Outcome, OutcomeSink};
use crate::selector::WeightedSelector;
use crate::task::{TaskFuture, TaskStatus};
use crate::user::{Session, UserType};

const ON_START: &str = "on_start";
const ON_STOP: &str = "on_stop";

/// Totals for a finished run. Hooks are not counted here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub users_spawned: usize,
    /// Task executions started, skipped ones included
    pub executed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
    /// Users whose task panicked
    pub panicked: usize,
}

impl RunReport {
    fn absorb(&mut self, user: &UserReport) {
        self.executed += user.succeeded + user.failed + user.skipped;
        self.succeeded += user.succeeded;
        self.failed += user.failed;
        self.skipped += user.skipped;
    }
}

#[derive(Debug, Default)]
struct UserReport {
    succeeded: u64,
    failed: u64,
    skipped: u64,
}

enum Execution {
    Succeeded,
    Failed,
    Skipped,
}

/// Stop flag plus the admission counter it guards.
struct StopGate {
    stopped: RwLock<bool>,
    signal: watch::Sender<bool>,
    admitted: AtomicU64,
}

impl StopGate {
    fn new() -> Self {
        let (signal, _) = watch::channel(false);
        Self {
            stopped: RwLock::new(false),
            signal,
            admitted: AtomicU64::new(0),
        }
    }

    /// Returns false if the run was already stopped.
    fn stop(&self) -> bool {
        let mut stopped = self.stopped.write();
        if *stopped {
            return false;
        }
        *stopped = true;
        self.signal.send_replace(true);
        true
    }

    fn is_stopped(&self) -> bool {
        *self.stopped.read()
    }

    /// Admit one task execution unless the run is stopped.
    fn try_admit(&self) -> bool {
        let stopped = self.stopped.read();
        if *stopped {
            return false;
        }
        self.admitted.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn admitted(&self) -> u64 {
        self.admitted.load(Ordering::SeqCst)
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.signal.subscribe()
    }
}

/// Read-only for every user, except the sink and the gate which synchronise internally.
struct RunShared<S> {
    config: RunConfig,
    user_type: UserType<S>,
    selector: WeightedSelector,
    client: ApiClient,
    sink: Arc<dyn OutcomeSink>,
    gate: Arc<StopGate>,
    board: Arc<UserBoard>,
}

/// Cloneable stop signal for a run, usable while the [`RunHandle`] is being awaited.
#[derive(Clone)]
pub struct RunStopper {
    run_id: Uuid,
    gate: Arc<StopGate>,
}

impl RunStopper {
    /// Signal every user to finish its current task and terminate.
    ///
    /// Idempotent; returns whether this call issued the stop.
    pub fn stop(&self) -> bool {
        let issued = self.gate.stop();
        if issued {
            info!(run_id = %self.run_id, "stop requested");
        }
        issued
    }

    pub fn is_stopped(&self) -> bool {
        self.gate.is_stopped()
    }
}

/// Handle to a run in progress.
///
/// Dropping the handle does not stop the run.
pub struct RunHandle {
    stopper: RunStopper,
    board: Arc<UserBoard>,
    driver: JoinHandle<RunReport>,
}

impl RunHandle {
    pub fn run_id(&self) -> Uuid {
        self.stopper.run_id
    }

    /// See [`RunStopper::stop`].
    pub fn stop(&self) -> bool {
        self.stopper.stop()
    }

    pub fn stopper(&self) -> RunStopper {
        self.stopper.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopper.is_stopped()
    }

    /// Task executions admitted so far. Frozen once `stop` has returned.
    pub fn tasks_started(&self) -> u64 {
        self.stopper.gate.admitted()
    }

    pub fn phase_counts(&self) -> PhaseCounts {
        self.board.counts()
    }

    /// True once every spawned user has terminated
    pub fn is_finished(&self) -> bool {
        self.driver.is_finished()
    }

    /// Wait for every user to terminate.
    ///
    /// Without a run time limit this only returns after `stop`.
    pub async fn wait(self) -> Result<RunReport, RunError> {
        Ok(self.driver.await?)
    }

    pub async fn stop_and_wait(self) -> Result<RunReport, RunError> {
        self.stop();
        self.wait().await
    }
}

/// Validate `config` and `user_type`, then start spawning users.
///
/// Must be called from within a Tokio runtime. On error nothing has been spawned.
pub fn start_run<S>(
    config: RunConfig,
    user_type: UserType<S>,
    sink: Arc<dyn OutcomeSink>,
) -> Result<RunHandle, ConfigError>
where
    S: Send + 'static,
{
    config.validate()?;
    let selector = user_type.selector()?;
    let client = ApiClient::new(&config.host, config.request_timeout)?;

    let run_id = Uuid::new_v4();
    info!(
        %run_id,
        user_type = user_type.name(),
        users = config.users,
        spawn_rate = config.spawn_rate,
        host = %config.host,
        "starting run"
    );

    let gate = Arc::new(StopGate::new());
    let board = Arc::new(UserBoard::new());

    if let Some(limit) = config.run_time {
        let gate = Arc::clone(&gate);
        tokio::spawn(async move {
            let mut stop_rx = gate.subscribe();
            if !pause(limit, &mut stop_rx).await && gate.stop() {
                info!(%run_id, ?limit, "run time elapsed, stopping");
            }
        });
    }

    let shared = Arc::new(RunShared {
        config,
        user_type,
        selector,
        client,
        sink,
        gate: Arc::clone(&gate),
        board: Arc::clone(&board),
    });
    let driver = tokio::spawn(drive(shared));

    Ok(RunHandle {
        stopper: RunStopper { run_id, gate },
        board,
        driver,
    })
}

/// Same as [`RunHandle::stop`].
pub fn stop_run(handle: &RunHandle) {
    handle.stop();
}

/// Spawn users at the configured rate, then collect them.
async fn drive<S>(shared: Arc<RunShared<S>>) -> RunReport
where
    S: Send + 'static,
{
    let mut users = JoinSet::new();
    let mut stop_rx = shared.gate.subscribe();
    let interval = shared.config.spawn_interval();
    let target = shared.config.users;

    for spawned in 0..target {
        if shared.gate.is_stopped() {
            break;
        }
        let user_id = shared.board.register();
        debug!(user_id, "spawning virtual user");
        users.spawn(run_user(user_id, Arc::clone(&shared)));

        if spawned + 1 < target && pause(interval, &mut stop_rx).await {
            break;
        }
    }

    let mut report = RunReport {
        users_spawned: shared.board.counts().total(),
        ..RunReport::default()
    };
    info!(users = report.users_spawned, target, "spawning finished");

    while let Some(joined) = users.join_next().await {
        match joined {
            Ok(user) => report.absorb(&user),
            Err(e) => {
                error!(error = %e, "virtual user task failed");
                report.panicked += 1;
            }
        }
    }

    info!(
        executed = report.executed,
        failed = report.failed,
        skipped = report.skipped,
        "all virtual users terminated"
    );
    report
}

async fn run_user<S>(user_id: usize, shared: Arc<RunShared<S>>) -> UserReport
where
    S: Send + 'static,
{
    let _guard = TerminationGuard {
        user_id,
        board: Arc::clone(&shared.board),
        sink: Arc::clone(&shared.sink),
    };
    shared.sink.user_started(user_id);

    let rng = match shared.config.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(user_id as u64)),
        None => StdRng::from_entropy(),
    };
    let mut session = Session::new(
        user_id,
        shared.user_type.new_state(),
        rng,
        shared.client.clone(),
    );
    let mut stop_rx = shared.gate.subscribe();
    let mut report = UserReport::default();

    if let Some(hook) = shared.user_type.on_start_hook() {
        execute(&*shared.sink, user_id, ON_START, (**hook)(&mut session)).await;
    }

    if !shared.gate.is_stopped() {
        advance(&shared.board, user_id, UserPhase::Running);

        loop {
            let index = shared.selector.pick(&mut session.rng);
            let think = shared.config.think_time.sample(&mut session.rng);
            if pause(think, &mut stop_rx).await || !shared.gate.try_admit() {
                break;
            }

            let task = &shared.user_type.tasks()[index];
            match execute(&*shared.sink, user_id, task.name(), task.run(&mut session)).await {
                Execution::Succeeded => report.succeeded += 1,
                Execution::Failed => report.failed += 1,
                Execution::Skipped => report.skipped += 1,
            }
        }
    }

    advance(&shared.board, user_id, UserPhase::Stopping);
    if let Some(hook) = shared.user_type.on_stop_hook() {
        execute(&*shared.sink, user_id, ON_STOP, (**hook)(&mut session)).await;
    }
    advance(&shared.board, user_id, UserPhase::Terminated);

    report
}

/// Run one task or hook and report its outcome. Never fails the user.
async fn execute(
    sink: &dyn OutcomeSink,
    user_id: usize,
    name: &str,
    action: TaskFuture<'_>,
) -> Execution {
    let started = Instant::now();
    let result = action.await;
    let elapsed = started.elapsed();

    match result {
        Ok(TaskStatus::Skipped) => {
            debug!(user_id, task = name, "precondition unmet, skipped");
            Execution::Skipped
        }
        Ok(TaskStatus::Done(status)) => {
            sink.record(Outcome::success(user_id, name, elapsed, status));
            Execution::Succeeded
        }
        Err(failure) => {
            warn!(user_id, task = name, error = %failure, "task failed");
            sink.record(Outcome::failure(
                user_id,
                name,
                elapsed,
                failure.status_code(),
                failure.to_string(),
            ));
            Execution::Failed
        }
    }
}

fn advance(board: &UserBoard, user_id: usize, next: UserPhase) {
    if let Err(e) = board.transition(user_id, next) {
        debug!(user_id, error = %e, "ignoring lifecycle transition");
    }
}

/// Sleep for `duration` unless the run stops first. Returns true when stopped.
async fn pause(duration: Duration, stop_rx: &mut watch::Receiver<bool>) -> bool {
    let stopped = *stop_rx.borrow();
    if stopped {
        return true;
    }
    if duration.is_zero() {
        tokio::task::yield_now().await;
        let stopped = *stop_rx.borrow();
        return stopped;
    }

    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = wait_for_stop(stop_rx) => true,
    }
}

async fn wait_for_stop(stop_rx: &mut watch::Receiver<bool>) {
    loop {
        let stopped = *stop_rx.borrow_and_update();
        // A closed channel means the gate is gone, which only happens at shutdown
        if stopped || stop_rx.changed().await.is_err() {
            return;
        }
    }
}

/// Marks the user terminated however its task ends, panics included.
struct TerminationGuard {
    user_id: usize,
    board: Arc<UserBoard>,
    sink: Arc<dyn OutcomeSink>,
}

impl Drop for TerminationGuard {
    fn drop(&mut self) {
        match self.board.terminate(self.user_id) {
            Ok(()) => warn!(user_id = self.user_id, "virtual user ended without clean shutdown"),
            // Normal exit already reached Terminated
            Err(LifecycleError::AlreadyTerminated { .. }) => {}
            Err(e) => debug!(user_id = self.user_id, error = %e, "ignoring cleanup error"),
        }
        self.sink.user_stopped(self.user_id);
    }
}
