use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, Result};
use super::task_models::{NewTask, TaskCategory, TaskChanges, TaskPriority, TaskStatus};
use super::task_repository::{TaskCounts, TaskFilter};

pub const INVALID_DUE_DATE: &str = "Invalid due_date format. Use YYYY-MM-DD";
pub const INVALID_STATUS: &str = "Invalid status. Must be pending or completed";
pub const NO_TASK_IDS: &str = "No task IDs provided";
pub const BULK_STATUS_REQUIRED: &str = "task_ids and status are required";

/// Query parameter value meaning "do not filter on this field".
const ALL: &str = "all";

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TaskQuery {
    /// Exact status, or `all`
    pub status: Option<String>,
    /// Exact priority, or `all`
    pub priority: Option<String>,
    /// Exact category, or `all`
    pub category: Option<String>,
    /// Case-insensitive substring of title or description
    pub search: Option<String>,
}

impl From<TaskQuery> for TaskFilter {
    fn from(query: TaskQuery) -> Self {
        let exact = |value: Option<String>| value.filter(|v| !v.is_empty() && v != ALL);

        Self {
            status: exact(query.status),
            priority: exact(query.priority),
            category: exact(query.category),
            search: query.search.filter(|s| !s.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTaskRequest {
    #[validate(
        required(message = "title is required"),
        length(min = 1, max = 500, message = "title must be 1 to 500 characters")
    )]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 50))]
    pub priority: Option<String>,
    pub status: Option<String>,
    #[validate(length(max = 50))]
    pub category: Option<String>,
    /// `YYYY-MM-DD`
    pub due_date: Option<String>,
}

impl CreateTaskRequest {
    pub fn into_new_task(self) -> Result<NewTask> {
        self.validate()?;

        let due_date = match self.due_date.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(parse_due_date(raw)?),
        };
        let status = match self.status.as_deref() {
            None => TaskStatus::Pending,
            Some(raw) => parse_status(raw)?,
        };

        Ok(NewTask {
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            priority: self
                .priority
                .unwrap_or_else(|| TaskPriority::Medium.to_string()),
            status,
            category: self
                .category
                .unwrap_or_else(|| TaskCategory::Personal.to_string()),
            due_date,
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 500, message = "title must be 1 to 500 characters"))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 50))]
    pub priority: Option<String>,
    pub status: Option<String>,
    #[validate(length(max = 50))]
    pub category: Option<String>,
    /// Absent leaves the date alone; `null` or `""` clears it.
    #[serde(default, deserialize_with = "deserialize_present")]
    #[schema(value_type = Option<String>)]
    pub due_date: Option<Option<String>>,
}

impl UpdateTaskRequest {
    pub fn into_changes(self) -> Result<TaskChanges> {
        self.validate()?;

        let due_date = match self.due_date {
            None => None,
            Some(None) => Some(None),
            Some(Some(raw)) if raw.is_empty() => Some(None),
            Some(Some(raw)) => Some(Some(parse_due_date(&raw)?)),
        };
        let status = self.status.as_deref().map(parse_status).transpose()?;

        Ok(TaskChanges {
            title: self.title,
            description: self.description,
            priority: self.priority,
            status,
            category: self.category,
            due_date,
        })
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct BulkDeleteRequest {
    pub task_ids: Option<Vec<i64>>,
}

impl BulkDeleteRequest {
    pub fn into_ids(self) -> Result<Vec<i64>> {
        match self.task_ids {
            Some(ids) if !ids.is_empty() => Ok(ids),
            _ => Err(AppError::Validation(NO_TASK_IDS.to_string())),
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct BulkStatusRequest {
    pub task_ids: Option<Vec<i64>>,
    pub status: Option<String>,
}

impl BulkStatusRequest {
    pub fn into_parts(self) -> Result<(Vec<i64>, TaskStatus)> {
        let (ids, status) = match (self.task_ids, self.status) {
            (Some(ids), Some(status)) if !ids.is_empty() && !status.is_empty() => (ids, status),
            _ => return Err(AppError::Validation(BULK_STATUS_REQUIRED.to_string())),
        };

        Ok((ids, parse_status(&status)?))
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BulkDeleteResponse {
    pub deleted_count: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BulkStatusResponse {
    pub updated_count: u64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct PriorityBreakdown {
    pub high: i64,
    pub medium: i64,
    pub low: i64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct CategoryBreakdown {
    pub work: i64,
    pub personal: i64,
    pub shopping: i64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct TaskStatsResponse {
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
    pub overdue: i64,
    /// Percentage of completed tasks, one decimal place
    pub completion_rate: f64,
    pub priority_breakdown: PriorityBreakdown,
    pub category_breakdown: CategoryBreakdown,
}

impl From<TaskCounts> for TaskStatsResponse {
    fn from(counts: TaskCounts) -> Self {
        Self {
            total: counts.total,
            completed: counts.completed,
            pending: counts.pending,
            overdue: counts.overdue,
            completion_rate: completion_rate(counts.completed, counts.total),
            priority_breakdown: PriorityBreakdown {
                high: counts.high_priority,
                medium: counts.medium_priority,
                low: counts.low_priority,
            },
            category_breakdown: CategoryBreakdown {
                work: counts.work,
                personal: counts.personal,
                shopping: counts.shopping,
            },
        }
    }
}

pub fn completion_rate(completed: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let percent = completed as f64 / total as f64 * 100.0;
    (percent * 10.0).round() / 10.0
}

pub fn parse_due_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(INVALID_DUE_DATE.to_string()))
}

fn parse_status(raw: &str) -> Result<TaskStatus> {
    raw.parse()
        .map_err(|_| AppError::Validation(INVALID_STATUS.to_string()))
}

// Distinguishes an explicit `null` (Some(None)) from a missing key (None).
fn deserialize_present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
