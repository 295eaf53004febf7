//! Task repository
//!
//! Tasks and their checklist items. A task and its initial checklist are
//! inserted in one transaction.

use crate::db::query::{fetch_page, Filter, Filters, SortField, SortSpec};
use crate::db::DynDatabasePool;
use crate::models::{ChecklistItem, ListParams, PagedResult, Task, TaskFilter, TaskPriority, TaskStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

pub const TASK_SORT_FIELDS: &[SortSpec] = &[
    ("created_at", "created_at"),
    ("updated_at", "updated_at"),
    ("title", "title"),
    ("due_date", "due_date"),
    ("status", "status"),
    (
        "priority",
        "CASE priority WHEN 'low' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END",
    ),
];

const SEARCH_COLUMNS: &[&str] = &["title", "description"];

#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Insert the task together with its checklist
    async fn create(&self, task: &Task) -> Result<Task>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Task>>;

    async fn update(&self, task: &Task) -> Result<Task>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn list(&self, filter: &TaskFilter, sort: &[SortField], params: &ListParams) -> Result<PagedResult<Task>>;

    async fn add_item(&self, item: &ChecklistItem) -> Result<ChecklistItem>;

    async fn get_item(&self, task_id: i64, item_id: i64) -> Result<Option<ChecklistItem>>;

    async fn update_item(&self, item: &ChecklistItem) -> Result<ChecklistItem>;

    async fn delete_item(&self, task_id: i64, item_id: i64) -> Result<bool>;
}

pub struct SqlxTaskRepository {
    pool: DynDatabasePool,
}

impl SqlxTaskRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TaskRepository> {
        Arc::new(Self::new(pool))
    }

    async fn checklist_for(&self, task_id: i64) -> Result<Vec<ChecklistItem>> {
        let rows = sqlx::query(
            "SELECT id, task_id, text, done, created_at FROM task_checklist_items \
             WHERE task_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(task_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to load checklist")?;

        Ok(rows.iter().map(row_to_item).collect())
    }
}

#[async_trait]
impl TaskRepository for SqlxTaskRepository {
    async fn create(&self, task: &Task) -> Result<Task> {
        let now = Utc::now();
        let mut tx = self.pool.sqlite().begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO tasks (user_id, title, description, priority, status, due_date,
                               created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(task.user_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.priority.as_str())
        .bind(task.status.as_str())
        .bind(task.due_date)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to create task")?;
        let task_id = result.last_insert_rowid();

        let mut checklist = Vec::with_capacity(task.checklist.len());
        for item in &task.checklist {
            let result = sqlx::query(
                "INSERT INTO task_checklist_items (task_id, text, done, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(task_id)
            .bind(&item.text)
            .bind(item.done)
            .bind(now)
            .execute(&mut *tx)
            .await
            .context("Failed to create checklist item")?;

            checklist.push(ChecklistItem {
                id: result.last_insert_rowid(),
                task_id,
                text: item.text.clone(),
                done: item.done,
                created_at: now,
            });
        }

        tx.commit().await?;

        Ok(Task {
            id: task_id,
            checklist,
            created_at: now,
            updated_at: now,
            ..task.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Task>> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get task by ID")?;

        match row {
            Some(row) => {
                let mut task = row_to_task(&row)?;
                task.checklist = self.checklist_for(id).await?;
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }

    async fn update(&self, task: &Task) -> Result<Task> {
        sqlx::query(
            r#"
            UPDATE tasks
            SET title = ?, description = ?, priority = ?, status = ?, due_date = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.priority.as_str())
        .bind(task.status.as_str())
        .bind(task.due_date)
        .bind(Utc::now())
        .bind(task.id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update task")?;

        self.get_by_id(task.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Task not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete task")?;
        Ok(())
    }

    async fn list(&self, filter: &TaskFilter, sort: &[SortField], params: &ListParams) -> Result<PagedResult<Task>> {
        let mut filters = Filters::new();
        filters.search(SEARCH_COLUMNS, filter.search.as_deref());
        if let Some(user_id) = filter.user_id {
            filters.push(Filter::integer("user_id", user_id));
        }
        if let Some(status) = filter.status {
            filters.push(Filter::text("status", status.as_str()));
        }
        if let Some(priority) = filter.priority {
            filters.push(Filter::text("priority", priority.as_str()));
        }

        let (rows, total) = fetch_page(self.pool.sqlite(), "tasks", filters.as_slice(), sort, params).await?;

        let mut tasks = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut task = row_to_task(row)?;
            task.checklist = self.checklist_for(task.id).await?;
            tasks.push(task);
        }

        Ok(PagedResult::new(tasks, total, params))
    }

    async fn add_item(&self, item: &ChecklistItem) -> Result<ChecklistItem> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO task_checklist_items (task_id, text, done, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(item.task_id)
        .bind(&item.text)
        .bind(item.done)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to add checklist item")?;

        Ok(ChecklistItem {
            id: result.last_insert_rowid(),
            created_at: now,
            ..item.clone()
        })
    }

    async fn get_item(&self, task_id: i64, item_id: i64) -> Result<Option<ChecklistItem>> {
        let row = sqlx::query(
            "SELECT id, task_id, text, done, created_at FROM task_checklist_items WHERE id = ? AND task_id = ?",
        )
        .bind(item_id)
        .bind(task_id)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get checklist item")?;

        Ok(row.as_ref().map(row_to_item))
    }

    async fn update_item(&self, item: &ChecklistItem) -> Result<ChecklistItem> {
        sqlx::query("UPDATE task_checklist_items SET text = ?, done = ? WHERE id = ? AND task_id = ?")
            .bind(&item.text)
            .bind(item.done)
            .bind(item.id)
            .bind(item.task_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to update checklist item")?;

        self.get_item(item.task_id, item.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Checklist item not found after update"))
    }

    async fn delete_item(&self, task_id: i64, item_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM task_checklist_items WHERE id = ? AND task_id = ?")
            .bind(item_id)
            .bind(task_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete checklist item")?;
        Ok(result.rows_affected() > 0)
    }
}

fn row_to_task(row: &SqliteRow) -> Result<Task> {
    let priority: String = row.get("priority");
    let priority =
        TaskPriority::parse(&priority).with_context(|| format!("Invalid task priority in database: {}", priority))?;
    let status: String = row.get("status");
    let status = TaskStatus::parse(&status).with_context(|| format!("Invalid task status in database: {}", status))?;

    Ok(Task {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        description: row.get("description"),
        priority,
        status,
        due_date: row.get("due_date"),
        checklist: Vec::new(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_item(row: &SqliteRow) -> ChecklistItem {
    ChecklistItem {
        id: row.get("id"),
        task_id: row.get("task_id"),
        text: row.get("text"),
        done: row.get("done"),
        created_at: row.get("created_at"),
    }
}
