//! Error types for the virtual user scheduler.
//!
//! Only [`ConfigError`] ever stops a run, and only before it starts.
//! [`RequestFailure`] is recorded as a failed outcome and the user keeps going.
//! [`LifecycleError`] stays inside the scheduler.

use std::time::Duration;
use thiserror::Error;

use crate::lifecycle::UserPhase;

/// Invalid run configuration, surfaced by `start_run` before any user is spawned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The run asked for zero virtual users
    #[error("user count must be greater than zero")]
    NoUsers,

    /// Spawn rate is not a positive, finite number, or too small to space spawns
    #[error("spawn rate must be a positive number of users per second, got {0}")]
    InvalidSpawnRate(f64),

    /// Think-time lower bound is above the upper bound, or the upper bound is out of range
    #[error("invalid think time range {min:?}..={max:?}")]
    InvalidThinkTime { min: Duration, max: Duration },

    /// A run time limit of zero was requested
    #[error("run time must be greater than zero when set")]
    InvalidRunTime,

    /// Request timeout of zero
    #[error("request timeout must be greater than zero")]
    InvalidRequestTimeout,

    /// Target host is not an absolute http(s) URL
    #[error("invalid target host '{host}': {reason}")]
    InvalidHost { host: String, reason: String },

    /// The user type has no tasks registered
    #[error("user type '{user_type}' has no tasks")]
    EmptyTaskSet { user_type: String },

    /// Every task of the user type has weight zero
    #[error("every task of user type '{user_type}' has weight zero")]
    AllWeightsZero { user_type: String },

    /// A weight override named a task the user type does not have
    #[error("user type '{user_type}' has no task named '{task}'")]
    UnknownTask { user_type: String, task: String },

    /// The HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// A task's request did not succeed.
///
/// Recorded as a failed outcome; never terminates the virtual user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestFailure {
    /// The server answered with a non-2xx status
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The request did not complete within the configured timeout
    #[error("request timed out")]
    Timeout,

    /// Connection, protocol or body decoding error
    #[error("transport error: {0}")]
    Transport(String),
}

impl RequestFailure {
    /// Status code of the response, if one was received
    pub fn status_code(&self) -> Option<u16> {
        match self {
            RequestFailure::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RequestFailure {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            RequestFailure::Timeout
        } else {
            RequestFailure::Transport(error.to_string())
        }
    }
}

/// Invalid virtual user phase change.
///
/// Handled inside the scheduler. `AlreadyTerminated` in particular is the
/// expected result of cleaning up a user that already finished, and is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("virtual user {user_id} is already terminated")]
    AlreadyTerminated { user_id: usize },

    #[error("virtual user {user_id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        user_id: usize,
        from: UserPhase,
        to: UserPhase,
    },

    #[error("virtual user {0} is not registered")]
    UnknownUser(usize),
}

/// Failure while waiting for a run to finish.
#[derive(Debug, Error)]
pub enum RunError {
    /// The task driving the run panicked or was aborted
    #[error("run driver failed: {0}")]
    Driver(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_failure_status_code() {
        let failure = RequestFailure::UnexpectedStatus {
            status: 404,
            body: "User not found".to_string(),
        };
        assert_eq!(failure.status_code(), Some(404));
        assert_eq!(RequestFailure::Timeout.status_code(), None);
        assert_eq!(
            RequestFailure::Transport("connection refused".to_string()).status_code(),
            None
        );
    }

    #[test]
    fn test_config_error_messages_name_the_user_type() {
        let err = ConfigError::AllWeightsZero {
            user_type: "APIUser".to_string(),
        };
        assert_eq!(err.to_string(), "every task of user type 'APIUser' has weight zero");
    }
}
