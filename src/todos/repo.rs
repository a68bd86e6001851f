use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{DeletedTask, NewTask, Task, TaskChanges};

/// Task persistence. Every lookup and write is keyed by `(id, owner_id)`, so a
/// task owned by someone else looks exactly like a missing one.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create(&self, task: NewTask) -> anyhow::Result<Task>;
    /// Newest first.
    async fn list_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Task>>;
    async fn find(&self, id: Uuid, owner_id: Uuid) -> anyhow::Result<Option<Task>>;
    /// Applies `changes` and refreshes `updated_at`.
    async fn update(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: TaskChanges,
    ) -> anyhow::Result<Option<Task>>;
    async fn delete(&self, id: Uuid, owner_id: Uuid) -> anyhow::Result<Option<DeletedTask>>;
}

#[derive(Clone)]
pub struct PgTaskStore {
    db: PgPool,
}

impl PgTaskStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn create(&self, task: NewTask) -> anyhow::Result<Task> {
        let row = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO todos (id, owner_id, title, completed)
            VALUES ($1, $2, $3, $4)
            RETURNING id, owner_id, title, completed, created_at, updated_at
            "#,
        )
        .bind(task.id)
        .bind(task.owner_id)
        .bind(&task.title)
        .bind(task.completed)
        .fetch_one(&self.db)
        .await
        .context("insert task")?;
        Ok(row)
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, owner_id, title, completed, created_at, updated_at
              FROM todos
             WHERE owner_id = $1
             ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.db)
        .await
        .context("list tasks by owner")?;
        Ok(rows)
    }

    async fn find(&self, id: Uuid, owner_id: Uuid) -> anyhow::Result<Option<Task>> {
        let row = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, owner_id, title, completed, created_at, updated_at
              FROM todos
             WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await
        .context("find task")?;
        Ok(row)
    }

    async fn update(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: TaskChanges,
    ) -> anyhow::Result<Option<Task>> {
        let row = sqlx::query_as::<_, Task>(
            r#"
            UPDATE todos
               SET title      = COALESCE($3, title),
                   completed  = COALESCE($4, completed),
                   updated_at = now()
             WHERE id = $1 AND owner_id = $2
            RETURNING id, owner_id, title, completed, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(changes.title)
        .bind(changes.completed)
        .fetch_optional(&self.db)
        .await
        .context("update task")?;
        Ok(row)
    }

    async fn delete(&self, id: Uuid, owner_id: Uuid) -> anyhow::Result<Option<DeletedTask>> {
        let row = sqlx::query_as::<_, DeletedTask>(
            r#"
            DELETE FROM todos
             WHERE id = $1 AND owner_id = $2
            RETURNING id, title
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await
        .context("delete task")?;
        Ok(row)
    }
}

#[cfg(test)]
pub mod memory {
    use std::sync::Mutex;

    use time::OffsetDateTime;

    use super::*;

    /// Keeps rows in insertion order.
    #[derive(Default)]
    pub struct MemoryTaskStore {
        rows: Mutex<Vec<Task>>,
    }

    #[async_trait]
    impl TaskStore for MemoryTaskStore {
        async fn create(&self, task: NewTask) -> anyhow::Result<Task> {
            let now = OffsetDateTime::now_utc();
            let row = Task {
                id: task.id,
                owner_id: task.owner_id,
                title: task.title,
                completed: task.completed,
                created_at: now,
                updated_at: now,
            };
            self.rows.lock().unwrap().push(row.clone());
            Ok(row)
        }

        async fn list_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Task>> {
            let rows = self.rows.lock().unwrap();
            let mut out: Vec<Task> = rows
                .iter()
                .rev()
                .filter(|t| t.owner_id == owner_id)
                .cloned()
                .collect();
            // stable, so equal timestamps keep newest-inserted first
            out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(out)
        }

        async fn find(&self, id: Uuid, owner_id: Uuid) -> anyhow::Result<Option<Task>> {
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .find(|t| t.id == id && t.owner_id == owner_id)
                .cloned())
        }

        async fn update(
            &self,
            id: Uuid,
            owner_id: Uuid,
            changes: TaskChanges,
        ) -> anyhow::Result<Option<Task>> {
            let mut rows = self.rows.lock().unwrap();
            let Some(row) = rows
                .iter_mut()
                .find(|t| t.id == id && t.owner_id == owner_id)
            else {
                return Ok(None);
            };
            if let Some(title) = changes.title {
                row.title = title;
            }
            if let Some(completed) = changes.completed {
                row.completed = completed;
            }
            row.updated_at = OffsetDateTime::now_utc();
            Ok(Some(row.clone()))
        }

        async fn delete(&self, id: Uuid, owner_id: Uuid) -> anyhow::Result<Option<DeletedTask>> {
            let mut rows = self.rows.lock().unwrap();
            let Some(pos) = rows
                .iter()
                .position(|t| t.id == id && t.owner_id == owner_id)
            else {
                return Ok(None);
            };
            let row = rows.remove(pos);
            Ok(Some(DeletedTask {
                id: row.id,
                title: row.title,
            }))
        }
    }
}
