use axum::{
    routing::{delete, get, patch},
    Router,
};

use crate::state::AppState;
use super::task_handlers;

pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(task_handlers::get_tasks).post(task_handlers::create_task),
        )
        .route("/stats", get(task_handlers::get_task_stats))
        .route("/bulk", delete(task_handlers::bulk_delete_tasks))
        .route("/bulk/status", patch(task_handlers::bulk_update_status))
        .route(
            "/:id",
            get(task_handlers::get_task)
                .put(task_handlers::update_task)
                .delete(task_handlers::delete_task),
        )
        .route("/:id/toggle", patch(task_handlers::toggle_task_status))
}
