//! Task definitions: a name, a selection weight and an async action.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::RequestFailure;
use crate::user::Session;

/// How a task finished when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// The task ran; carries the response status when it made a request
    Done(Option<u16>),
    /// Precondition unmet (e.g. nothing tracked yet). Not recorded, not a failure.
    Skipped,
}

pub type TaskResult = Result<TaskStatus, RequestFailure>;

pub type TaskFuture<'a> = BoxFuture<'a, TaskResult>;

/// Action run against a user's own session.
///
/// The session is borrowed mutably for the whole action, so one user's
/// actions never overlap and nothing else can touch its state meanwhile.
pub type TaskFn<S> = Arc<dyn for<'a> Fn(&'a mut Session<S>) -> TaskFuture<'a> + Send + Sync>;

pub struct Task<S> {
    name: String,
    weight: u32,
    action: TaskFn<S>,
}

impl<S> Task<S> {
    pub fn new<F>(name: impl Into<String>, weight: u32, action: F) -> Self
    where
        F: for<'a> Fn(&'a mut Session<S>) -> TaskFuture<'a> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            weight,
            action: Arc::new(action),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn set_weight(&mut self, weight: u32) {
        self.weight = weight;
    }

    pub fn run<'a>(&self, session: &'a mut Session<S>) -> TaskFuture<'a> {
        (self.action)(session)
    }
}

impl<S> Clone for Task<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            weight: self.weight,
            action: Arc::clone(&self.action),
        }
    }
}

impl<S> fmt::Debug for Task<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("weight", &self.weight)
            .finish_non_exhaustive()
    }
}
