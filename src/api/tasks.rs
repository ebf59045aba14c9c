//! Task CRUD endpoints.
//!
//! Each handler walks the same stages: the auth middleware has already
//! established the caller, the payload is validated, then a single
//! owner-scoped repository call runs. Any stage short-circuits into an
//! [`ApiError`] response.

use std::sync::Arc;

use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::auth::AuthUser;
use super::routes::AppState;
use crate::error::ApiError;
use crate::store::{Pagination, TaskStats};
use crate::task::Task;
use crate::validate;

/// Task routes, nested under `/api/v1/tasks`.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/stats", get(get_stats))
        .route("/:id", get(get_task).put(update_task).delete(delete_task))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    page: Option<String>,
    per_page: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Serialize)]
struct ListResponse {
    tasks: Vec<Task>,
    pagination: Pagination,
}

#[derive(Debug, Serialize)]
struct TaskResponse {
    message: String,
    task: Task,
}

#[derive(Debug, Serialize)]
struct TaskBody {
    task: Task,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    stats: TaskStats,
}

/// GET /api/v1/tasks - list the caller's tasks.
async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    // Unparseable paging values fall back to the defaults rather than
    // erroring.
    let page = query.page.and_then(|p| p.parse().ok()).unwrap_or(1);
    let per_page = query.per_page.and_then(|p| p.parse().ok()).unwrap_or(10);

    let (tasks, pagination) =
        state
            .store
            .list(user.id, query.status.as_deref(), page, per_page)?;
    Ok(Json(ListResponse { tasks, pagination }))
}

/// POST /api/v1/tasks - create a task owned by the caller.
async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<TaskResponse>), ApiError> {
    let payload = validate::payload_from_value(body)?;
    let new_task = validate::validate_create(payload)?;

    let task = state.store.create(user.id, &new_task)?;
    tracing::info!("Task created: {} by user {}", task.id, user.id);

    Ok((
        StatusCode::CREATED,
        Json(TaskResponse {
            message: "Task created successfully".to_string(),
            task,
        }),
    ))
}

/// GET /api/v1/tasks/:id - fetch one owned task.
async fn get_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<TaskBody>, ApiError> {
    let task = state.store.get(id, user.id)?.ok_or(ApiError::NotFound)?;
    Ok(Json(TaskBody { task }))
}

/// PUT /api/v1/tasks/:id - partial update of an owned task.
async fn update_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<TaskResponse>, ApiError> {
    // Absence reported before validation, so a bad payload against a
    // missing task still yields 404.
    state.store.get(id, user.id)?.ok_or(ApiError::NotFound)?;

    let payload = validate::payload_from_value(body)?;
    let patch = validate::validate_update(payload)?;

    let task = state
        .store
        .update(id, user.id, &patch)?
        .ok_or(ApiError::NotFound)?;
    tracing::info!("Task updated: {} by user {}", task.id, user.id);

    Ok(Json(TaskResponse {
        message: "Task updated successfully".to_string(),
        task,
    }))
}

/// DELETE /api/v1/tasks/:id - remove an owned task.
async fn delete_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.store.get(id, user.id)?.ok_or(ApiError::NotFound)?;

    if !state.store.delete(id, user.id)? {
        return Err(ApiError::NotFound);
    }
    tracing::info!("Task deleted: {} by user {}", id, user.id);

    Ok(Json(MessageResponse {
        message: "Task deleted successfully".to_string(),
    }))
}

/// GET /api/v1/tasks/stats - aggregate counts for the caller.
async fn get_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.store.stats(user.id)?;
    Ok(Json(StatsResponse { stats }))
}
