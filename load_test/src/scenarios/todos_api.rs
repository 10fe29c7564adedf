//! Todos scenario - each user seeds a few todos, then works on its own list

use anyhow::Result;
use crudswarm_core::{
    RequestFailure, Session, Task, TaskFuture, TaskStatus, ThinkTime, TrackedIds, UserType,
};
use rand::Rng;
use serde::Serialize;

use crate::cli::{RunArgs, TodosArgs};
use crate::metrics::RunSummary;

#[derive(Debug, Serialize)]
pub struct TodoPayload {
    pub title: String,
    pub done: bool,
}

/// Per-user state: the todos this user created and still owns
#[derive(Debug, Default)]
pub struct TodoList {
    pub ids: TrackedIds,
    pub initial_todos: usize,
}

pub fn user_type(initial_todos: usize) -> UserType<TodoList> {
    UserType::new("TodoUser", move || TodoList {
        ids: TrackedIds::new(),
        initial_todos,
    })
    .on_start(seed_todos)
    .task(Task::new("get_all_todos", 3, get_all_todos))
    .task(Task::new("create_todo", 2, create_todo))
    .task(Task::new("get_specific_todo", 2, get_specific_todo))
    .task(Task::new("update_todo", 1, update_todo))
    .task(Task::new("delete_todo", 1, delete_todo))
}

pub async fn run(args: &RunArgs, todos: &TodosArgs) -> Result<RunSummary> {
    tracing::info!(initial_todos = todos.initial_todos, "Starting todos scenario");
    super::run(
        "todos",
        args,
        user_type(todos.initial_todos),
        ThinkTime::default(),
    )
    .await
}

/// POST `/todos` and track the id when the API answers 201
async fn post_todo(
    session: &mut Session<TodoList>,
    todo: &TodoPayload,
) -> Result<u16, RequestFailure> {
    let response = session.client.post_json("/todos", todo).await?;
    if response.status == 201 {
        if let Some(id) = response.entity_id() {
            session.state.ids.track(id);
        }
    }
    Ok(response.status)
}

// A failed seed does not stop the others; the first failure becomes the hook's outcome
fn seed_todos(session: &mut Session<TodoList>) -> TaskFuture<'_> {
    Box::pin(async move {
        let mut last_status = None;
        let mut first_failure = None;

        for i in 0..session.state.initial_todos {
            let todo = TodoPayload {
                title: format!("Initial todo {i}"),
                done: false,
            };
            match post_todo(session, &todo).await {
                Ok(status) => last_status = Some(status),
                Err(err) => {
                    tracing::warn!(
                        user_id = session.user_id,
                        seed = i,
                        error = %err,
                        "Seeding todo failed"
                    );
                    first_failure.get_or_insert(err);
                }
            }
        }

        tracing::debug!(
            user_id = session.user_id,
            seeded = session.state.ids.len(),
            "Seeded todos"
        );
        match first_failure {
            Some(err) => Err(err),
            None => Ok(TaskStatus::Done(last_status)),
        }
    })
}

fn get_all_todos(session: &mut Session<TodoList>) -> TaskFuture<'_> {
    Box::pin(async move {
        let response = session.client.get("/todos").await?;
        Ok(TaskStatus::Done(Some(response.status)))
    })
}

fn create_todo(session: &mut Session<TodoList>) -> TaskFuture<'_> {
    Box::pin(async move {
        let todo = TodoPayload {
            title: format!("Todo {}", session.rng.gen_range(1..=1000)),
            done: session.rng.gen(),
        };
        let status = post_todo(session, &todo).await?;
        Ok(TaskStatus::Done(Some(status)))
    })
}

fn get_specific_todo(session: &mut Session<TodoList>) -> TaskFuture<'_> {
    Box::pin(async move {
        let Some(id) = session.state.ids.pick(&mut session.rng).map(str::to_owned) else {
            return Ok(TaskStatus::Skipped);
        };
        let response = session.client.get(&format!("/todos/{id}")).await?;
        Ok(TaskStatus::Done(Some(response.status)))
    })
}

fn update_todo(session: &mut Session<TodoList>) -> TaskFuture<'_> {
    Box::pin(async move {
        let Some(id) = session.state.ids.pick(&mut session.rng).map(str::to_owned) else {
            return Ok(TaskStatus::Skipped);
        };
        let todo = TodoPayload {
            title: format!("Updated todo {}", session.rng.gen_range(1..=1000)),
            done: session.rng.gen(),
        };
        let response = session
            .client
            .put_json(&format!("/todos/{id}"), &todo)
            .await?;
        Ok(TaskStatus::Done(Some(response.status)))
    })
}

fn delete_todo(session: &mut Session<TodoList>) -> TaskFuture<'_> {
    Box::pin(async move {
        let Some(id) = session.state.ids.take_random(&mut session.rng) else {
            return Ok(TaskStatus::Skipped);
        };
        let response = session.client.delete(&format!("/todos/{id}")).await?;
        Ok(TaskStatus::Done(Some(response.status)))
    })
}
