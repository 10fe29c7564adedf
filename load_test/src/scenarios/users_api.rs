//! Users scenario - CRUD traffic against `/users`

use anyhow::Result;
use crudswarm_core::{Session, Task, TaskFuture, TaskStatus, ThinkTime, TrackedIds, UserType};
use rand::Rng;
use serde::Serialize;

use crate::cli::RunArgs;
use crate::metrics::RunSummary;
use crate::utils::{random_email, random_name};

#[derive(Debug, Serialize)]
pub struct UserPayload {
    pub name: String,
    pub email: String,
}

impl UserPayload {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let name = random_name(rng, 8);
        let email = random_email(&name);
        Self { name, email }
    }
}

pub fn user_type() -> UserType<TrackedIds> {
    UserType::new("APIUser", TrackedIds::new)
        .task(Task::new("create_user", 3, create_user))
        .task(Task::new("list_users", 5, list_users))
        .task(Task::new("get_user", 4, get_user))
        .task(Task::new("update_user", 2, update_user))
        .task(Task::new("delete_user", 1, delete_user))
}

pub async fn run(args: &RunArgs) -> Result<RunSummary> {
    tracing::info!("Starting users scenario");
    super::run("users", args, user_type(), ThinkTime::default()).await
}

fn create_user(session: &mut Session<TrackedIds>) -> TaskFuture<'_> {
    Box::pin(async move {
        let user = UserPayload::random(&mut session.rng);
        let response = session.client.post_json("/users", &user).await?;
        if response.status == 201 {
            if let Some(id) = response.entity_id() {
                tracing::debug!(user_id = session.user_id, %id, "Created user");
                session.state.track(id);
            }
        }
        Ok(TaskStatus::Done(Some(response.status)))
    })
}

fn list_users(session: &mut Session<TrackedIds>) -> TaskFuture<'_> {
    Box::pin(async move {
        let response = session.client.get("/users").await?;
        Ok(TaskStatus::Done(Some(response.status)))
    })
}

fn get_user(session: &mut Session<TrackedIds>) -> TaskFuture<'_> {
    Box::pin(async move {
        let Some(id) = session.state.pick(&mut session.rng).map(str::to_owned) else {
            return Ok(TaskStatus::Skipped);
        };
        let response = session.client.get(&format!("/users/{id}")).await?;
        Ok(TaskStatus::Done(Some(response.status)))
    })
}

fn update_user(session: &mut Session<TrackedIds>) -> TaskFuture<'_> {
    Box::pin(async move {
        let Some(id) = session.state.pick(&mut session.rng).map(str::to_owned) else {
            return Ok(TaskStatus::Skipped);
        };
        let user = UserPayload::random(&mut session.rng);
        let response = session
            .client
            .put_json(&format!("/users/{id}"), &user)
            .await?;
        Ok(TaskStatus::Done(Some(response.status)))
    })
}

// The id is forgotten before the request goes out, so a failed delete is never retried
fn delete_user(session: &mut Session<TrackedIds>) -> TaskFuture<'_> {
    Box::pin(async move {
        let Some(id) = session.state.take_random(&mut session.rng) else {
            return Ok(TaskStatus::Skipped);
        };
        let response = session.client.delete(&format!("/users/{id}")).await?;
        tracing::debug!(user_id = session.user_id, %id, "Deleted user");
        Ok(TaskStatus::Done(Some(response.status)))
    })
}
