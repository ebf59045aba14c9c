//! SQLite-backed task repository.
//!
//! Every operation takes the owner id explicitly and filters on it in SQL,
//! so rows belonging to other users are invisible: "does not exist" and
//! "exists but is not yours" are indistinguishable by construction.
//!
//! Mutations run inside a transaction; a failure rolls the whole change
//! back, including the `updated_at` refresh.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::task::{NewTask, Task, TaskPatch, TaskPriority, TaskStatus};

/// Storage-level failure. Surfaces to the client as a generic 500.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Per-user aggregate counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct TaskStats {
    pub total: i64,
    pub todo: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub overdue: i64,
}

/// Pagination metadata echoed back to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Pagination {
    pub page: u64,
    /// Total page count: ceil(total / per_page).
    pub pages: u64,
    pub per_page: u64,
    pub total: u64,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tasks (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    title       TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    status      TEXT NOT NULL,
    priority    TEXT NOT NULL,
    due_date    TEXT,
    owner_id    INTEGER NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_tasks_owner ON tasks(owner_id);
";

/// Task repository over a single SQLite connection.
pub struct TaskStore {
    conn: Mutex<Connection>,
}

impl TaskStore {
    /// Open (and bootstrap) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database, used by tests.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Connectivity probe for the readiness endpoint.
    pub fn ping(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    /// Insert a new task owned by `owner_id` and return the stored row.
    pub fn create(&self, owner_id: i64, new: &NewTask) -> Result<Task, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let now = encode_time(Utc::now());
        tx.execute(
            "INSERT INTO tasks (title, description, status, priority, due_date, owner_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                new.title,
                new.description,
                new.status.as_str(),
                new.priority.as_str(),
                new.due_date.map(encode_time),
                owner_id,
                now,
                now,
            ],
        )?;
        let id = tx.last_insert_rowid();
        let task = fetch(&tx, id, owner_id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        tx.commit()?;
        Ok(task)
    }

    /// Fetch a task by id, scoped to `owner_id`.
    pub fn get(&self, id: i64, owner_id: i64) -> Result<Option<Task>, StoreError> {
        let conn = self.conn.lock().unwrap();
        fetch(&conn, id, owner_id)
    }

    /// Apply a patch to an owned task, refreshing `updated_at`.
    ///
    /// Returns `None` when the task is absent or not owned by `owner_id`.
    pub fn update(
        &self,
        id: i64,
        owner_id: i64,
        patch: &TaskPatch,
    ) -> Result<Option<Task>, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let Some(mut task) = fetch(&tx, id, owner_id)? else {
            return Ok(None);
        };

        if let Some(title) = &patch.title {
            task.title = title.clone();
        }
        if let Some(description) = &patch.description {
            task.description = description.clone();
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = due_date;
        }
        task.updated_at = Utc::now();

        tx.execute(
            "UPDATE tasks
             SET title = ?1, description = ?2, status = ?3, priority = ?4, due_date = ?5, updated_at = ?6
             WHERE id = ?7 AND owner_id = ?8",
            params![
                task.title,
                task.description,
                task.status.as_str(),
                task.priority.as_str(),
                task.due_date.map(encode_time),
                encode_time(task.updated_at),
                id,
                owner_id,
            ],
        )?;
        tx.commit()?;
        Ok(Some(task))
    }

    /// Delete an owned task. Returns false when nothing was removed, so a
    /// repeated delete reports not-found rather than success.
    pub fn delete(&self, id: i64, owner_id: i64) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "DELETE FROM tasks WHERE id = ?1 AND owner_id = ?2",
            params![id, owner_id],
        )?;
        Ok(affected > 0)
    }

    /// List the owner's tasks, optionally filtered by exact status match.
    ///
    /// Rows are ordered by id ascending so page boundaries are stable.
    /// `page` and `per_page` are 1-based; values below 1 are clamped to 1.
    /// A page past the end yields an empty list with correct metadata.
    pub fn list(
        &self,
        owner_id: i64,
        status: Option<&str>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<Task>, Pagination), StoreError> {
        let page = page.max(1);
        let per_page = per_page.max(1);
        // Both values come straight from the query string; saturate so an
        // absurd page can neither overflow nor turn into a negative OFFSET
        // (which SQLite reads as 0).
        let limit = per_page.min(i64::MAX as u64) as i64;
        let offset = (page - 1)
            .saturating_mul(per_page)
            .min(i64::MAX as u64) as i64;

        let conn = self.conn.lock().unwrap();
        let (total, tasks) = match status {
            Some(status) => {
                let total: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM tasks WHERE owner_id = ?1 AND status = ?2",
                    params![owner_id, status],
                    |row| row.get(0),
                )?;
                let mut stmt = conn.prepare(
                    "SELECT * FROM tasks WHERE owner_id = ?1 AND status = ?2
                     ORDER BY id ASC LIMIT ?3 OFFSET ?4",
                )?;
                let tasks = stmt
                    .query_map(params![owner_id, status, limit, offset], row_to_task)?
                    .collect::<Result<Vec<_>, _>>()?;
                (total, tasks)
            }
            None => {
                let total: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM tasks WHERE owner_id = ?1",
                    params![owner_id],
                    |row| row.get(0),
                )?;
                let mut stmt = conn.prepare(
                    "SELECT * FROM tasks WHERE owner_id = ?1
                     ORDER BY id ASC LIMIT ?2 OFFSET ?3",
                )?;
                let tasks = stmt
                    .query_map(params![owner_id, limit, offset], row_to_task)?
                    .collect::<Result<Vec<_>, _>>()?;
                (total, tasks)
            }
        };

        let total = total as u64;
        Ok((
            tasks,
            Pagination {
                page,
                pages: total.div_ceil(per_page),
                per_page,
                total,
            },
        ))
    }

    /// Aggregate counts for the owner's tasks.
    ///
    /// A task is overdue when its due date is in the past and it is not
    /// completed.
    pub fn stats(&self, owner_id: i64) -> Result<TaskStats, StoreError> {
        let conn = self.conn.lock().unwrap();
        let by_status = |status: &str| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM tasks WHERE owner_id = ?1 AND status = ?2",
                params![owner_id, status],
                |row| row.get(0),
            )
        };

        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE owner_id = ?1",
            params![owner_id],
            |row| row.get(0),
        )?;
        let todo = by_status("todo")?;
        let in_progress = by_status("in_progress")?;
        let completed = by_status("completed")?;
        let overdue: i64 = conn.query_row(
            "SELECT COUNT(*) FROM tasks
             WHERE owner_id = ?1 AND due_date IS NOT NULL AND due_date < ?2
               AND status != 'completed'",
            params![owner_id, encode_time(Utc::now())],
            |row| row.get(0),
        )?;

        Ok(TaskStats {
            total,
            todo,
            in_progress,
            completed,
            overdue,
        })
    }
}

fn fetch(conn: &Connection, id: i64, owner_id: i64) -> Result<Option<Task>, StoreError> {
    let task = conn
        .query_row(
            "SELECT * FROM tasks WHERE id = ?1 AND owner_id = ?2",
            params![id, owner_id],
            row_to_task,
        )
        .optional()?;
    Ok(task)
}

fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    let status: String = row.get("status")?;
    let priority: String = row.get("priority")?;
    let due_date: Option<String> = row.get("due_date")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Task {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        status: TaskStatus::parse(&status).unwrap_or_default(),
        priority: TaskPriority::parse(&priority).unwrap_or_default(),
        due_date: due_date.map(decode_time).transpose()?,
        owner_id: row.get("owner_id")?,
        created_at: decode_time(created_at)?,
        updated_at: decode_time(updated_at)?,
    })
}

/// Fixed-width UTC timestamps so that textual comparison in SQL matches
/// chronological order.
fn encode_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_time(s: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}
