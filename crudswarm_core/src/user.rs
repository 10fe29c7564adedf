//! User types and per-user sessions.
//!
//! A [`UserType`] is the declarative description shared by every user of a
//! run: its tasks, weights and hooks. A [`Session`] is one virtual user's
//! private world: its state, its RNG and its HTTP client.
//!
//! Sessions are owned by exactly one scheduler task and are never shared,
//! so user state needs no locking. Keep it that way: anything put in `S`
//! must belong to that user alone.

use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::ConfigError;
use crate::http::ApiClient;
use crate::selector::WeightedSelector;
use crate::task::{Task, TaskFn, TaskFuture};

/// One virtual user's execution context.
pub struct Session<S> {
    pub user_id: usize,
    pub state: S,
    pub rng: StdRng,
    pub client: ApiClient,
}

impl<S> Session<S> {
    pub fn new(user_id: usize, state: S, rng: StdRng, client: ApiClient) -> Self {
        Self {
            user_id,
            state,
            rng,
            client,
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Builder for a kind of virtual user.
pub struct UserType<S> {
    name: String,
    new_state: Arc<dyn Fn() -> S + Send + Sync>,
    tasks: Vec<Task<S>>,
    on_start: Option<TaskFn<S>>,
    on_stop: Option<TaskFn<S>>,
}

impl<S> UserType<S> {
    /// `new_state` builds a fresh private state for every spawned user.
    pub fn new<F>(name: impl Into<String>, new_state: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            new_state: Arc::new(new_state),
            tasks: Vec::new(),
            on_start: None,
            on_stop: None,
        }
    }

    /// Register a task. Registration order is the selector's draw order.
    pub fn task(mut self, task: Task<S>) -> Self {
        self.tasks.push(task);
        self
    }

    /// Runs once per user before its first task.
    pub fn on_start<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a mut Session<S>) -> TaskFuture<'a> + Send + Sync + 'static,
    {
        self.on_start = Some(Arc::new(hook));
        self
    }

    /// Runs once per user after its loop ends.
    pub fn on_stop<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a mut Session<S>) -> TaskFuture<'a> + Send + Sync + 'static,
    {
        self.on_stop = Some(Arc::new(hook));
        self
    }

    /// Override the weight of a registered task.
    pub fn set_weight(&mut self, task: &str, weight: u32) -> Result<(), ConfigError> {
        let found = self
            .tasks
            .iter_mut()
            .find(|candidate| candidate.name() == task)
            .ok_or_else(|| ConfigError::UnknownTask {
                user_type: self.name.clone(),
                task: task.to_string(),
            })?;
        found.set_weight(weight);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tasks(&self) -> &[Task<S>] {
        &self.tasks
    }

    /// Build the cumulative-weight table for this user type.
    pub fn selector(&self) -> Result<WeightedSelector, ConfigError> {
        if self.tasks.is_empty() {
            return Err(ConfigError::EmptyTaskSet {
                user_type: self.name.clone(),
            });
        }
        WeightedSelector::new(self.tasks.iter().map(Task::weight)).ok_or_else(|| {
            ConfigError::AllWeightsZero {
                user_type: self.name.clone(),
            }
        })
    }

    pub(crate) fn new_state(&self) -> S {
        (self.new_state)()
    }

    pub(crate) fn on_start_hook(&self) -> Option<&TaskFn<S>> {
        self.on_start.as_ref()
    }

    pub(crate) fn on_stop_hook(&self) -> Option<&TaskFn<S>> {
        self.on_stop.as_ref()
    }
}

impl<S> fmt::Debug for UserType<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserType")
            .field("name", &self.name)
            .field("tasks", &self.tasks)
            .field("on_start", &self.on_start.is_some())
            .field("on_stop", &self.on_stop.is_some())
            .finish()
    }
}

/// Identifiers of entities a user created and has not deleted yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedIds {
    ids: Vec<String>,
}

impl TrackedIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, id: impl Into<String>) {
        self.ids.push(id.into());
    }

    /// A random tracked id, left in place
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        self.ids.choose(rng).map(String::as_str)
    }

    /// Remove and return a random tracked id
    pub fn take_random<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<String> {
        if self.ids.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..self.ids.len());
        Some(self.ids.swap_remove(index))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|tracked| tracked == id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;
    use rand::SeedableRng;

    fn noop(_session: &mut Session<()>) -> TaskFuture<'_> {
        Box::pin(async { Ok(TaskStatus::Done(None)) })
    }

    #[test]
    fn test_tracked_ids_round_trip_removes_once() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut ids = TrackedIds::new();
        ids.track("a");
        ids.track("b");
        ids.track("c");

        let mut removed = Vec::new();
        while let Some(id) = ids.take_random(&mut rng) {
            assert!(!ids.contains(&id));
            removed.push(id);
        }
        removed.sort();

        assert_eq!(removed, vec!["a", "b", "c"]);
        assert!(ids.is_empty());
        assert_eq!(ids.take_random(&mut rng), None);
    }

    #[test]
    fn test_pick_leaves_id_tracked() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut ids = TrackedIds::new();
        assert_eq!(ids.pick(&mut rng), None);

        ids.track("64b7f0c2a1");
        assert_eq!(ids.pick(&mut rng), Some("64b7f0c2a1"));
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn test_empty_user_type_rejected() {
        let user_type = UserType::new("Empty", || ());
        assert_eq!(
            user_type.selector(),
            Err(ConfigError::EmptyTaskSet {
                user_type: "Empty".to_string()
            })
        );
    }

    #[test]
    fn test_all_zero_weights_rejected() {
        let user_type = UserType::new("Idle", || ())
            .task(Task::new("a", 0, noop))
            .task(Task::new("b", 0, noop));
        assert_eq!(
            user_type.selector(),
            Err(ConfigError::AllWeightsZero {
                user_type: "Idle".to_string()
            })
        );
    }

    #[test]
    fn test_weight_override() {
        let mut user_type = UserType::new("Tuned", || ())
            .task(Task::new("list", 5, noop))
            .task(Task::new("create", 3, noop));

        user_type.set_weight("list", 0).expect("task exists");
        assert_eq!(user_type.tasks()[0].weight(), 0);
        assert_eq!(user_type.selector().expect("create still weighted").total_weight(), 3);

        assert_eq!(
            user_type.set_weight("missing", 1),
            Err(ConfigError::UnknownTask {
                user_type: "Tuned".to_string(),
                task: "missing".to_string()
            })
        );
    }
}
