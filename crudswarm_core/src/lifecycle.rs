//! Virtual user lifecycle: `Spawning -> Running -> Stopping -> Terminated`.

use parking_lot::RwLock;
use tracing::debug;

use crate::error::LifecycleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserPhase {
    /// Created, `on_start` not finished yet
    Spawning,
    /// Looping over tasks
    Running,
    /// Stop observed; finishing the current iteration and `on_stop`
    Stopping,
    Terminated,
}

impl UserPhase {
    /// Once `Running`, a user always passes through `Stopping`. The one
    /// exception is a panicking task: cleanup then forces the user straight
    /// to `Terminated` through [`UserBoard::terminate`].
    pub fn can_transition_to(self, next: UserPhase) -> bool {
        matches!(
            (self, next),
            (UserPhase::Spawning, UserPhase::Running)
                | (UserPhase::Spawning, UserPhase::Stopping)
                | (UserPhase::Running, UserPhase::Stopping)
                | (UserPhase::Stopping, UserPhase::Terminated)
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseCounts {
    pub spawning: usize,
    pub running: usize,
    pub stopping: usize,
    pub terminated: usize,
}

impl PhaseCounts {
    /// Users not yet terminated
    pub fn active(&self) -> usize {
        self.spawning + self.running + self.stopping
    }

    pub fn total(&self) -> usize {
        self.active() + self.terminated
    }
}

/// Phase of every user in a run, indexed by user id.
///
/// Only phases live here; user state itself is never shared.
#[derive(Debug, Default)]
pub struct UserBoard {
    phases: RwLock<Vec<UserPhase>>,
}

impl UserBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user in `Spawning` and return its id.
    pub fn register(&self) -> usize {
        let mut phases = self.phases.write();
        phases.push(UserPhase::Spawning);
        phases.len() - 1
    }

    pub fn phase(&self, user_id: usize) -> Option<UserPhase> {
        self.phases.read().get(user_id).copied()
    }

    pub fn transition(&self, user_id: usize, next: UserPhase) -> Result<(), LifecycleError> {
        let mut phases = self.phases.write();
        let current = phases
            .get_mut(user_id)
            .ok_or(LifecycleError::UnknownUser(user_id))?;

        if *current == UserPhase::Terminated {
            return Err(LifecycleError::AlreadyTerminated { user_id });
        }
        if !current.can_transition_to(next) {
            return Err(LifecycleError::InvalidTransition {
                user_id,
                from: *current,
                to: next,
            });
        }

        debug!(user_id, from = ?current, to = ?next, "user phase change");
        *current = next;
        Ok(())
    }

    /// Force a user to `Terminated` from any live phase.
    ///
    /// Used when a user's task died without running its own shutdown.
    pub fn terminate(&self, user_id: usize) -> Result<(), LifecycleError> {
        let mut phases = self.phases.write();
        let current = phases
            .get_mut(user_id)
            .ok_or(LifecycleError::UnknownUser(user_id))?;

        if *current == UserPhase::Terminated {
            return Err(LifecycleError::AlreadyTerminated { user_id });
        }
        debug!(user_id, from = ?current, "user forced to terminated");
        *current = UserPhase::Terminated;
        Ok(())
    }

    pub fn counts(&self) -> PhaseCounts {
        self.phases
            .read()
            .iter()
            .fold(PhaseCounts::default(), |mut counts, phase| {
                match phase {
                    UserPhase::Spawning => counts.spawning += 1,
                    UserPhase::Running => counts.running += 1,
                    UserPhase::Stopping => counts.stopping += 1,
                    UserPhase::Terminated => counts.terminated += 1,
                }
                counts
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_lifecycle() {
        let board = UserBoard::new();
        let user = board.register();

        assert_eq!(board.phase(user), Some(UserPhase::Spawning));
        board.transition(user, UserPhase::Running).expect("spawning -> running");
        board.transition(user, UserPhase::Stopping).expect("running -> stopping");
        board.transition(user, UserPhase::Terminated).expect("stopping -> terminated");
        assert_eq!(board.phase(user), Some(UserPhase::Terminated));
    }

    #[test]
    fn test_running_cannot_skip_stopping() {
        let board = UserBoard::new();
        let user = board.register();
        board.transition(user, UserPhase::Running).expect("spawning -> running");

        assert_eq!(
            board.transition(user, UserPhase::Terminated),
            Err(LifecycleError::InvalidTransition {
                user_id: user,
                from: UserPhase::Running,
                to: UserPhase::Terminated,
            })
        );
    }

    #[test]
    fn test_terminating_twice_reports_already_terminated() {
        let board = UserBoard::new();
        let user = board.register();

        board.terminate(user).expect("first terminate");
        assert_eq!(
            board.terminate(user),
            Err(LifecycleError::AlreadyTerminated { user_id: user })
        );
        assert_eq!(
            board.transition(user, UserPhase::Running),
            Err(LifecycleError::AlreadyTerminated { user_id: user })
        );
    }

    #[test]
    fn test_unknown_user() {
        let board = UserBoard::new();
        assert_eq!(board.terminate(7), Err(LifecycleError::UnknownUser(7)));
    }

    #[test]
    fn test_counts() {
        let board = UserBoard::new();
        let a = board.register();
        let b = board.register();
        let _c = board.register();
        board.transition(a, UserPhase::Running).expect("running");
        board.terminate(b).expect("terminated");

        let counts = board.counts();
        assert_eq!(
            counts,
            PhaseCounts {
                spawning: 1,
                running: 1,
                stopping: 0,
                terminated: 1,
            }
        );
        assert_eq!(counts.active(), 2);
        assert_eq!(counts.total(), 3);
    }
}
