use tracing::info;
use uuid::Uuid;

use super::{
    dto::{CreateTaskRequest, Patch, UpdateTaskRequest},
    repo_types::{DeletedTask, NewTask, Task, TaskChanges},
};
use crate::{error::AppError, state::AppState};

fn not_found() -> AppError {
    AppError::NotFound("Task not found".into())
}

pub(crate) fn parse_task_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::validation("Invalid ID"))
}

pub async fn create_task(
    st: &AppState,
    owner_id: Uuid,
    req: CreateTaskRequest,
) -> Result<Task, AppError> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(AppError::validation("Title is required"));
    }

    let task = st
        .tasks
        .create(NewTask {
            id: Uuid::new_v4(),
            owner_id,
            title: title.to_string(),
            completed: req.completed,
        })
        .await?;
    info!(task_id = %task.id, %owner_id, "task created");
    Ok(task)
}

pub async fn list_tasks(st: &AppState, owner_id: Uuid) -> Result<Vec<Task>, AppError> {
    Ok(st.tasks.list_by_owner(owner_id).await?)
}

pub async fn get_task(st: &AppState, id: Uuid, owner_id: Uuid) -> Result<Task, AppError> {
    st.tasks.find(id, owner_id).await?.ok_or_else(not_found)
}

/// Turns a request patch into concrete changes.
fn resolve_changes(req: UpdateTaskRequest) -> Result<TaskChanges, AppError> {
    if req.title.is_missing() && req.completed.is_missing() {
        return Err(AppError::validation("No valid fields to update"));
    }

    let title = match req.title {
        Patch::Missing => None,
        Patch::Null => return Err(AppError::validation("Title cannot be empty")),
        Patch::Value(t) => {
            let t = t.trim();
            if t.is_empty() {
                return Err(AppError::validation("Title cannot be empty"));
            }
            Some(t.to_string())
        }
    };
    let completed = match req.completed {
        Patch::Missing => None,
        Patch::Null => return Err(AppError::validation("Completed must be a boolean")),
        Patch::Value(c) => Some(c),
    };

    Ok(TaskChanges { title, completed })
}

/// Ownership is checked before the patch is validated, so a foreign task id
/// reports `NotFound` even when the body is also bad.
pub async fn update_task(
    st: &AppState,
    id: Uuid,
    owner_id: Uuid,
    req: UpdateTaskRequest,
) -> Result<Task, AppError> {
    if st.tasks.find(id, owner_id).await?.is_none() {
        return Err(not_found());
    }
    let changes = resolve_changes(req)?;

    // the row may have been deleted since the lookup
    let task = st
        .tasks
        .update(id, owner_id, changes)
        .await?
        .ok_or_else(not_found)?;
    info!(task_id = %task.id, %owner_id, "task updated");
    Ok(task)
}

pub async fn delete_task(st: &AppState, id: Uuid, owner_id: Uuid) -> Result<DeletedTask, AppError> {
    let deleted = st.tasks.delete(id, owner_id).await?.ok_or_else(not_found)?;
    info!(task_id = %deleted.id, %owner_id, "task deleted");
    Ok(deleted)
}
