use chrono::{Local, Utc};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::task::task_dto::{
    BulkDeleteRequest, BulkDeleteResponse, BulkStatusRequest, BulkStatusResponse,
    CreateTaskRequest, TaskQuery, TaskStatsResponse, UpdateTaskRequest,
};
use crate::task::task_models::Task;
use crate::task::task_repository::{TaskFilter, TaskRepository};

/// Service layer for task business logic. Requests are validated here before
/// the repository is touched.
#[derive(Clone)]
pub struct TaskService {
    repo: Arc<dyn TaskRepository>,
}

fn not_found() -> AppError {
    AppError::NotFound("Task not found".into())
}

impl TaskService {
    pub fn new(repo: Arc<dyn TaskRepository>) -> Self {
        Self { repo }
    }

    pub async fn list_tasks(&self, query: TaskQuery) -> Result<Vec<Task>> {
        let filter = TaskFilter::from(query);
        tracing::debug!(?filter, "Listing tasks");
        self.repo.find_all(filter).await
    }

    pub async fn get_task(&self, task_id: i64) -> Result<Task> {
        self.repo.find_by_id(task_id).await?.ok_or_else(not_found)
    }

    pub async fn create_task(&self, payload: CreateTaskRequest) -> Result<Task> {
        let new_task = payload.into_new_task()?;
        let task = self.repo.create(new_task, Utc::now()).await?;

        tracing::info!(task_id = task.id, "Created task");
        Ok(task)
    }

    pub async fn update_task(&self, task_id: i64, payload: UpdateTaskRequest) -> Result<Task> {
        let changes = payload.into_changes()?;
        let task = self
            .repo
            .update(task_id, changes, Utc::now())
            .await?
            .ok_or_else(not_found)?;

        tracing::info!(task_id, "Updated task");
        Ok(task)
    }

    pub async fn delete_task(&self, task_id: i64) -> Result<()> {
        if self.repo.delete(task_id).await? == 0 {
            return Err(not_found());
        }

        tracing::info!(task_id, "Deleted task");
        Ok(())
    }

    pub async fn toggle_status(&self, task_id: i64) -> Result<Task> {
        let task = self
            .repo
            .toggle_status(task_id, Utc::now())
            .await?
            .ok_or_else(not_found)?;

        tracing::info!(task_id, status = %task.status, "Toggled task status");
        Ok(task)
    }

    pub async fn stats(&self) -> Result<TaskStatsResponse> {
        let today = Local::now().date_naive();
        let counts = self.repo.counts(today).await?;
        Ok(counts.into())
    }

    pub async fn bulk_delete(&self, payload: BulkDeleteRequest) -> Result<BulkDeleteResponse> {
        let ids = payload.into_ids()?;
        let requested = ids.len();
        let deleted_count = self.repo.delete_many(ids).await?;

        tracing::info!(requested, deleted_count, "Bulk deleted tasks");
        Ok(BulkDeleteResponse { deleted_count })
    }

    pub async fn bulk_update_status(&self, payload: BulkStatusRequest) -> Result<BulkStatusResponse> {
        let (ids, status) = payload.into_parts()?;
        let requested = ids.len();
        let updated_count = self.repo.update_status_many(ids, status, Utc::now()).await?;

        tracing::info!(requested, updated_count, %status, "Bulk updated task status");
        Ok(BulkStatusResponse { updated_count })
    }
}
