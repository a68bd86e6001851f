use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{CreateTaskRequest, DeletedEnvelope, TaskEnvelope, TaskListEnvelope, UpdateTaskRequest},
    services::{self, parse_task_id},
};
use crate::{auth::extractors::AuthUser, error::AppError, state::AppState};

pub fn todo_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/:id", get(get_task).put(update_task).delete(delete_task))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list_tasks(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<TaskListEnvelope>, AppError> {
    let tasks = services::list_tasks(&state, user.id).await?;
    Ok(Json(TaskListEnvelope {
        success: true,
        message: "Fetch tasks successfully",
        count: tasks.len(),
        data: tasks,
    }))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn create_task(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskEnvelope>), AppError> {
    let Json(payload) = payload?;
    let task = services::create_task(&state, user.id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(TaskEnvelope {
            success: true,
            message: Some("Task created successfully"),
            data: task,
        }),
    ))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<TaskEnvelope>, AppError> {
    let id = parse_task_id(&id)?;
    let task = services::get_task(&state, id, user.id).await?;
    Ok(Json(TaskEnvelope {
        success: true,
        message: None,
        data: task,
    }))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn update_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<Json<TaskEnvelope>, AppError> {
    let id = parse_task_id(&id)?;
    let Json(payload) = payload?;
    let task = services::update_task(&state, id, user.id, payload).await?;
    Ok(Json(TaskEnvelope {
        success: true,
        message: Some("Task updated successfully"),
        data: task,
    }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DeletedEnvelope>, AppError> {
    let id = parse_task_id(&id)?;
    let deleted = services::delete_task(&state, id, user.id).await?;
    Ok(Json(DeletedEnvelope {
        success: true,
        message: "Task deleted successfully",
        data: deleted,
    }))
}
