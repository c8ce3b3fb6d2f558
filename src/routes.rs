use crate::{
    state::AppState,
    task::{
        task_dto::*,
        task_handlers,
        task_models::{TaskCategory, TaskPriority, TaskStatus},
        task_routes, Task,
    },
};
use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        task_handlers::get_tasks,
        task_handlers::create_task,
        task_handlers::get_task,
        task_handlers::update_task,
        task_handlers::delete_task,
        task_handlers::toggle_task_status,
        task_handlers::get_task_stats,
        task_handlers::bulk_delete_tasks,
        task_handlers::bulk_update_status,
    ),
    components(
        schemas(
            Task,
            TaskStatus,
            TaskPriority,
            TaskCategory,
            CreateTaskRequest,
            UpdateTaskRequest,
            BulkDeleteRequest,
            BulkDeleteResponse,
            BulkStatusRequest,
            BulkStatusResponse,
            TaskStatsResponse,
            PriorityBreakdown,
            CategoryBreakdown,
        )
    ),
    tags(
        (name = "tasks", description = "Task management endpoints")
    )
)]
struct ApiDoc;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new().nest("/tasks", task_routes());

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use chrono::{DateTime, Utc};
    use serde_json::{json, Value};
    use tower::ServiceExt; // For oneshot()

    fn app() -> Router {
        create_router(AppState::in_memory())
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn create(app: &Router, body: Value) -> Value {
        let (status, task) = send(app, "POST", "/api/tasks", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        task
    }

    fn timestamp(value: &Value) -> DateTime<Utc> {
        serde_json::from_value(value.clone()).unwrap()
    }

    async fn count_tasks(app: &Router) -> usize {
        let (_, tasks) = send(app, "GET", "/api/tasks", None).await;
        tasks.as_array().map(Vec::len).unwrap_or_default()
    }

    #[tokio::test]
    async fn test_create_task_returns_201_with_defaults() {
        let app = app();

        let task = create(&app, json!({ "title": "Write report", "due_date": "2024-12-31" })).await;

        assert_eq!(task["id"], 1);
        assert_eq!(task["title"], "Write report");
        assert_eq!(task["description"], "");
        assert_eq!(task["priority"], "medium");
        assert_eq!(task["status"], "pending");
        assert_eq!(task["category"], "personal");
        assert_eq!(task["due_date"], "2024-12-31");
        assert_eq!(task["created_at"], task["updated_at"]);
    }

    #[tokio::test]
    async fn test_create_task_with_bad_due_date_persists_nothing() {
        let app = app();

        let (status, body) = send(
            &app,
            "POST",
            "/api/tasks",
            Some(json!({ "title": "t", "due_date": "2024-13-40" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], INVALID_DUE_DATE);
        assert_eq!(count_tasks(&app).await, 0);
    }

    #[tokio::test]
    async fn test_create_task_without_title_is_bad_request() {
        let app = app();

        let (status, body) = send(&app, "POST", "/api/tasks", Some(json!({ "priority": "high" }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("title"));
        assert_eq!(count_tasks(&app).await, 0);
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let app = app();

        let request = Request::builder()
            .method("POST")
            .uri("/api/tasks")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_task_is_not_found() {
        let app = app();
        create(&app, json!({ "title": "keep me" })).await;

        for (method, uri, body) in [
            ("GET", "/api/tasks/42", None),
            ("PUT", "/api/tasks/42", Some(json!({ "title": "x" }))),
            ("DELETE", "/api/tasks/42", None),
            ("PATCH", "/api/tasks/42/toggle", None),
        ] {
            let (status, body) = send(&app, method, uri, body).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{} {}", method, uri);
            assert_eq!(body["error"], "Task not found");
        }

        assert_eq!(count_tasks(&app).await, 1);
    }

    #[tokio::test]
    async fn test_update_is_partial_and_clears_due_date() {
        let app = app();
        let task = create(
            &app,
            json!({ "title": "Old", "description": "keep", "category": "work", "due_date": "2024-01-01" }),
        )
        .await;

        let (status, updated) = send(
            &app,
            "PUT",
            "/api/tasks/1",
            Some(json!({ "title": "New", "priority": "urgent", "due_date": "" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["title"], "New");
        assert_eq!(updated["priority"], "urgent");
        assert_eq!(updated["description"], "keep");
        assert_eq!(updated["category"], "work");
        assert!(updated["due_date"].is_null());
        assert_eq!(updated["created_at"], task["created_at"]);
        assert!(timestamp(&updated["updated_at"]) >= timestamp(&task["updated_at"]));

        let (status, body) = send(&app, "PUT", "/api/tasks/1", Some(json!({ "due_date": "soon" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], INVALID_DUE_DATE);
    }

    #[tokio::test]
    async fn test_delete_task_returns_204() {
        let app = app();
        create(&app, json!({ "title": "gone soon" })).await;

        let (status, body) = send(&app, "DELETE", "/api/tasks/1", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_null());

        let (status, _) = send(&app, "GET", "/api/tasks/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_toggle_twice_restores_status() {
        let app = app();
        let task = create(&app, json!({ "title": "flip" })).await;

        let (_, once) = send(&app, "PATCH", "/api/tasks/1/toggle", None).await;
        assert_eq!(once["status"], "completed");
        assert_eq!(once["created_at"], task["created_at"]);
        assert!(timestamp(&once["updated_at"]) >= timestamp(&task["updated_at"]));

        let (status, twice) = send(&app, "PATCH", "/api/tasks/1/toggle", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(twice["status"], "pending");
        assert!(timestamp(&twice["updated_at"]) >= timestamp(&once["updated_at"]));
    }

    #[tokio::test]
    async fn test_list_filters_and_search() {
        let app = app();
        create(&app, json!({ "title": "Buy Milk", "category": "shopping", "priority": "low" })).await;
        create(&app, json!({ "title": "Ship release", "description": "tag the MILESTONE", "category": "work" })).await;
        create(&app, json!({ "title": "Gym", "status": "completed" })).await;

        let (_, all) = send(&app, "GET", "/api/tasks?status=all", None).await;
        let (_, unfiltered) = send(&app, "GET", "/api/tasks", None).await;
        assert_eq!(all, unfiltered);
        assert_eq!(all[0]["title"], "Gym");

        let (_, completed) = send(&app, "GET", "/api/tasks?status=completed", None).await;
        assert_eq!(completed.as_array().unwrap().len(), 1);

        let (_, milk) = send(&app, "GET", "/api/tasks?search=mil", None).await;
        assert_eq!(milk.as_array().unwrap().len(), 2);

        let (_, milk_work) = send(&app, "GET", "/api/tasks?search=mil&category=work&priority=all", None).await;
        let milk_work = milk_work.as_array().unwrap();
        assert_eq!(milk_work.len(), 1);
        assert_eq!(milk_work[0]["title"], "Ship release");
    }

    #[tokio::test]
    async fn test_stats() {
        let app = app();

        let (status, empty) = send(&app, "GET", "/api/tasks/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(empty["total"], 0);
        assert_eq!(empty["completion_rate"], 0.0);

        create(&app, json!({ "title": "late", "priority": "high", "category": "work", "due_date": "2000-01-01" })).await;
        create(&app, json!({ "title": "done late", "status": "completed", "due_date": "2000-01-01" })).await;
        create(&app, json!({ "title": "future", "priority": "low", "category": "shopping", "due_date": "2999-12-31" })).await;
        create(&app, json!({ "title": "odd", "priority": "urgent", "category": "travel" })).await;

        let (_, stats) = send(&app, "GET", "/api/tasks/stats", None).await;
        assert_eq!(stats["total"], 4);
        assert_eq!(stats["completed"], 1);
        assert_eq!(stats["pending"], 3);
        assert_eq!(stats["overdue"], 1);
        assert_eq!(stats["completion_rate"], 25.0);
        assert_eq!(stats["priority_breakdown"], json!({ "high": 1, "medium": 1, "low": 1 }));
        assert_eq!(stats["category_breakdown"], json!({ "work": 1, "personal": 1, "shopping": 1 }));
    }

    #[tokio::test]
    async fn test_bulk_delete() {
        let app = app();
        for title in ["a", "b", "c"] {
            create(&app, json!({ "title": title })).await;
        }

        let (status, body) = send(&app, "DELETE", "/api/tasks/bulk", Some(json!({ "task_ids": [] }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], NO_TASK_IDS);

        let (status, body) = send(
            &app,
            "DELETE",
            "/api/tasks/bulk",
            Some(json!({ "task_ids": [1, 2, 999] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "deleted_count": 2 }));

        for id in [1, 2] {
            let (status, _) = send(&app, "GET", &format!("/api/tasks/{}", id), None).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
        }
        assert_eq!(count_tasks(&app).await, 1);
    }

    #[tokio::test]
    async fn test_bulk_status_update() {
        let app = app();
        for title in ["a", "b"] {
            create(&app, json!({ "title": title })).await;
        }

        let (status, body) = send(
            &app,
            "PATCH",
            "/api/tasks/bulk/status",
            Some(json!({ "task_ids": [1, 2], "status": "invalid" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], INVALID_STATUS);

        let (_, pending) = send(&app, "GET", "/api/tasks?status=pending", None).await;
        assert_eq!(pending.as_array().unwrap().len(), 2);

        let (status, body) = send(
            &app,
            "PATCH",
            "/api/tasks/bulk/status",
            Some(json!({ "task_ids": [1] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], BULK_STATUS_REQUIRED);

        let (status, body) = send(
            &app,
            "PATCH",
            "/api/tasks/bulk/status",
            Some(json!({ "task_ids": [1, 2, 3], "status": "completed" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "updated_count": 2 }));

        let (_, tasks) = send(&app, "GET", "/api/tasks?status=completed", None).await;
        let tasks = tasks.as_array().unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0]["updated_at"], tasks[1]["updated_at"]);
    }

    #[tokio::test]
    async fn test_openapi_document_is_served() {
        let app = app();

        let (status, doc) = send(&app, "GET", "/api-docs/openapi.json", None).await;

        assert_eq!(status, StatusCode::OK);
        assert!(doc["paths"]["/api/tasks/bulk/status"].is_object());
    }
}
