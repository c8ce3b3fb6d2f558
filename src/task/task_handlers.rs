use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{error::Result, extract::AppJson, state::AppState};
use super::{
    task_dto::{
        BulkDeleteRequest, BulkDeleteResponse, BulkStatusRequest, BulkStatusResponse,
        CreateTaskRequest, TaskQuery, TaskStatsResponse, UpdateTaskRequest,
    },
    task_models::Task,
};

/// List tasks, newest first
#[utoipa::path(
    get,
    path = "/api/tasks",
    params(TaskQuery),
    responses(
        (status = 200, description = "List of tasks", body = Vec<Task>)
    ),
    tag = "tasks"
)]
pub async fn get_tasks(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
) -> Result<Json<Vec<Task>>> {
    let tasks = state.task_service.list_tasks(query).await?;
    Ok(Json(tasks))
}

/// Create a new task
#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 400, description = "Validation error")
    ),
    tag = "tasks"
)]
pub async fn create_task(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateTaskRequest>,
) -> Result<impl IntoResponse> {
    let task = state.task_service.create_task(payload).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// Get a single task by ID
#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    params(
        ("id" = i64, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task found", body = Task),
        (status = 404, description = "Task not found")
    ),
    tag = "tasks"
)]
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
) -> Result<Json<Task>> {
    let task = state.task_service.get_task(task_id).await?;
    Ok(Json(task))
}

/// Update a task. Fields missing from the body are left unchanged.
#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    params(
        ("id" = i64, Path, description = "Task ID")
    ),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated", body = Task),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Task not found")
    ),
    tag = "tasks"
)]
pub async fn update_task(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
    AppJson(payload): AppJson<UpdateTaskRequest>,
) -> Result<Json<Task>> {
    let task = state.task_service.update_task(task_id, payload).await?;
    Ok(Json(task))
}

/// Delete a task
#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    params(
        ("id" = i64, Path, description = "Task ID")
    ),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 404, description = "Task not found")
    ),
    tag = "tasks"
)]
pub async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
) -> Result<StatusCode> {
    state.task_service.delete_task(task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Flip a task between pending and completed
#[utoipa::path(
    patch,
    path = "/api/tasks/{id}/toggle",
    params(
        ("id" = i64, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Status toggled", body = Task),
        (status = 404, description = "Task not found")
    ),
    tag = "tasks"
)]
pub async fn toggle_task_status(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
) -> Result<Json<Task>> {
    let task = state.task_service.toggle_status(task_id).await?;
    Ok(Json(task))
}

/// Aggregate task statistics
#[utoipa::path(
    get,
    path = "/api/tasks/stats",
    responses(
        (status = 200, description = "Task statistics", body = TaskStatsResponse)
    ),
    tag = "tasks"
)]
pub async fn get_task_stats(State(state): State<AppState>) -> Result<Json<TaskStatsResponse>> {
    let stats = state.task_service.stats().await?;
    Ok(Json(stats))
}

/// Delete several tasks at once. Unknown IDs are ignored.
#[utoipa::path(
    delete,
    path = "/api/tasks/bulk",
    request_body = BulkDeleteRequest,
    responses(
        (status = 200, description = "Tasks deleted", body = BulkDeleteResponse),
        (status = 400, description = "No task IDs provided")
    ),
    tag = "tasks"
)]
pub async fn bulk_delete_tasks(
    State(state): State<AppState>,
    AppJson(payload): AppJson<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>> {
    let response = state.task_service.bulk_delete(payload).await?;
    Ok(Json(response))
}

/// Set the status of several tasks at once
#[utoipa::path(
    patch,
    path = "/api/tasks/bulk/status",
    request_body = BulkStatusRequest,
    responses(
        (status = 200, description = "Statuses updated", body = BulkStatusResponse),
        (status = 400, description = "Missing task IDs or invalid status")
    ),
    tag = "tasks"
)]
pub async fn bulk_update_status(
    State(state): State<AppState>,
    AppJson(payload): AppJson<BulkStatusRequest>,
) -> Result<Json<BulkStatusResponse>> {
    let response = state.task_service.bulk_update_status(payload).await?;
    Ok(Json(response))
}
