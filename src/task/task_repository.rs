use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::Result;
use super::task_models::{NewTask, Task, TaskCategory, TaskChanges, TaskPriority, TaskStatus};

/// Optional predicates for listing tasks. Every `Some` field must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    /// Case-insensitive substring of the title or the description.
    pub search: Option<String>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        let exact = |wanted: &Option<String>, actual: &str| {
            wanted.as_deref().map_or(true, |w| w == actual)
        };

        exact(&self.status, &task.status)
            && exact(&self.priority, &task.priority)
            && exact(&self.category, &task.category)
            && self.search.as_deref().map_or(true, |term| {
                let term = term.to_lowercase();
                task.title.to_lowercase().contains(&term)
                    || task.description.to_lowercase().contains(&term)
            })
    }
}

/// Raw aggregate counts behind the statistics endpoint.
#[derive(Debug, Clone, Default, PartialEq, FromRow)]
pub struct TaskCounts {
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
    pub overdue: i64,
    pub high_priority: i64,
    pub medium_priority: i64,
    pub low_priority: i64,
    pub work: i64,
    pub personal: i64,
    pub shopping: i64,
}

impl TaskCounts {
    pub fn tally<'a>(tasks: impl IntoIterator<Item = &'a Task>, today: NaiveDate) -> Self {
        let mut counts = Self::default();
        for task in tasks {
            counts.total += 1;
            if task.is_completed() {
                counts.completed += 1;
            }
            if task.is_pending() {
                counts.pending += 1;
            }
            if task.is_overdue(today) {
                counts.overdue += 1;
            }
            match task.priority.as_str() {
                p if p == TaskPriority::High.as_str() => counts.high_priority += 1,
                p if p == TaskPriority::Medium.as_str() => counts.medium_priority += 1,
                p if p == TaskPriority::Low.as_str() => counts.low_priority += 1,
                _ => {}
            }
            match task.category.as_str() {
                c if c == TaskCategory::Work.as_str() => counts.work += 1,
                c if c == TaskCategory::Personal.as_str() => counts.personal += 1,
                c if c == TaskCategory::Shopping.as_str() => counts.shopping += 1,
                _ => {}
            }
        }
        counts
    }
}

/// Storage seam for tasks. Every method is a single atomic store operation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Matching tasks, newest first.
    async fn find_all(&self, filter: TaskFilter) -> Result<Vec<Task>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Task>>;

    /// Inserts with `created_at == updated_at == now`.
    async fn create(&self, task: NewTask, now: DateTime<Utc>) -> Result<Task>;

    async fn update(&self, id: i64, changes: TaskChanges, now: DateTime<Utc>) -> Result<Option<Task>>;

    /// Returns the number of rows removed (0 or 1).
    async fn delete(&self, id: i64) -> Result<u64>;

    async fn toggle_status(&self, id: i64, now: DateTime<Utc>) -> Result<Option<Task>>;

    async fn counts(&self, today: NaiveDate) -> Result<TaskCounts>;

    async fn delete_many(&self, ids: Vec<i64>) -> Result<u64>;

    async fn update_status_many(
        &self,
        ids: Vec<i64>,
        status: TaskStatus,
        now: DateTime<Utc>,
    ) -> Result<u64>;
}

#[derive(Clone)]
pub struct PgTaskRepository {
    pool: PgPool,
}

impl PgTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Escapes LIKE wildcards so the term is matched literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl TaskRepository for PgTaskRepository {
    async fn find_all(&self, filter: TaskFilter) -> Result<Vec<Task>> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM tasks WHERE TRUE");

        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }

        if let Some(priority) = filter.priority {
            query.push(" AND priority = ").push_bind(priority);
        }

        if let Some(category) = filter.category {
            query.push(" AND category = ").push_bind(category);
        }

        if let Some(search) = filter.search {
            let pattern = format!("%{}%", escape_like(&search));
            query
                .push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        query.push(" ORDER BY created_at DESC, id DESC");

        let tasks = query.build_query_as::<Task>().fetch_all(&self.pool).await?;
        Ok(tasks)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Task>> {
        let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    async fn create(&self, task: NewTask, now: DateTime<Utc>) -> Result<Task> {
        let task = sqlx::query_as::<_, Task>(
            "INSERT INTO tasks (title, description, priority, status, category, due_date, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
             RETURNING *"
        )
        .bind(task.title)
        .bind(task.description)
        .bind(task.priority)
        .bind(task.status)
        .bind(task.category)
        .bind(task.due_date)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(task)
    }

    async fn update(&self, id: i64, changes: TaskChanges, now: DateTime<Utc>) -> Result<Option<Task>> {
        let due_date_set = changes.due_date.is_some();
        let due_date = changes.due_date.flatten();

        let task = sqlx::query_as::<_, Task>(
            "UPDATE tasks SET
                title = COALESCE($1, title),
                description = COALESCE($2, description),
                priority = COALESCE($3, priority),
                status = COALESCE($4, status),
                category = COALESCE($5, category),
                due_date = CASE WHEN $6 THEN $7 ELSE due_date END,
                updated_at = $8
             WHERE id = $9
             RETURNING *"
        )
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.priority)
        .bind(changes.status)
        .bind(changes.category)
        .bind(due_date_set)
        .bind(due_date)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    async fn delete(&self, id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn toggle_status(&self, id: i64, now: DateTime<Utc>) -> Result<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(
            "UPDATE tasks SET
                status = CASE WHEN status = $1 THEN $2 ELSE $1 END,
                updated_at = $3
             WHERE id = $4
             RETURNING *"
        )
        .bind(TaskStatus::Pending)
        .bind(TaskStatus::Completed)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    async fn counts(&self, today: NaiveDate) -> Result<TaskCounts> {
        let counts = sqlx::query_as::<_, TaskCounts>(
            "SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'pending' AND due_date < $1) AS overdue,
                COUNT(*) FILTER (WHERE priority = 'high') AS high_priority,
                COUNT(*) FILTER (WHERE priority = 'medium') AS medium_priority,
                COUNT(*) FILTER (WHERE priority = 'low') AS low_priority,
                COUNT(*) FILTER (WHERE category = 'work') AS work,
                COUNT(*) FILTER (WHERE category = 'personal') AS personal,
                COUNT(*) FILTER (WHERE category = 'shopping') AS shopping
             FROM tasks"
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }

    async fn delete_many(&self, ids: Vec<i64>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn update_status_many(
        &self,
        ids: Vec<i64>,
        status: TaskStatus,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query("UPDATE tasks SET status = $1, updated_at = $2 WHERE id = ANY($3)")
            .bind(status)
            .bind(now)
            .bind(ids)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[derive(Debug, Default)]
struct InMemoryState {
    tasks: BTreeMap<i64, Task>,
    last_id: i64,
}

/// Process-local store used by tests and for running without a database.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTaskRepository {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn find_all(&self, filter: TaskFilter) -> Result<Vec<Task>> {
        let state = self.state.read().await;

        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect();

        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(tasks)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Task>> {
        let state = self.state.read().await;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn create(&self, task: NewTask, now: DateTime<Utc>) -> Result<Task> {
        let mut state = self.state.write().await;
        state.last_id += 1;

        let task = Task {
            id: state.last_id,
            title: task.title,
            description: task.description,
            priority: task.priority,
            status: task.status.to_string(),
            category: task.category,
            due_date: task.due_date,
            created_at: now,
            updated_at: now,
        };
        state.tasks.insert(task.id, task.clone());

        Ok(task)
    }

    async fn update(&self, id: i64, changes: TaskChanges, now: DateTime<Utc>) -> Result<Option<Task>> {
        let mut state = self.state.write().await;

        Ok(state.tasks.get_mut(&id).map(|task| {
            changes.apply_to(task);
            task.updated_at = now;
            task.clone()
        }))
    }

    async fn delete(&self, id: i64) -> Result<u64> {
        let mut state = self.state.write().await;
        Ok(u64::from(state.tasks.remove(&id).is_some()))
    }

    async fn toggle_status(&self, id: i64, now: DateTime<Utc>) -> Result<Option<Task>> {
        let mut state = self.state.write().await;

        Ok(state.tasks.get_mut(&id).map(|task| {
            task.status = TaskStatus::toggled_from(&task.status).to_string();
            task.updated_at = now;
            task.clone()
        }))
    }

    async fn counts(&self, today: NaiveDate) -> Result<TaskCounts> {
        let state = self.state.read().await;
        Ok(TaskCounts::tally(state.tasks.values(), today))
    }

    async fn delete_many(&self, ids: Vec<i64>) -> Result<u64> {
        let mut state = self.state.write().await;

        let mut deleted = 0;
        for id in ids {
            if state.tasks.remove(&id).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn update_status_many(
        &self,
        ids: Vec<i64>,
        status: TaskStatus,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let mut state = self.state.write().await;

        let mut updated = 0;
        for task in state.tasks.values_mut().filter(|task| ids.contains(&task.id)) {
            task.status = status.to_string();
            task.updated_at = now;
            updated += 1;
        }
        Ok(updated)
    }
}
