//! Training trigger handlers
//!
//! Replies are plain text with status 200, including launch failures.

use axum::{
    extract::{Path, State},
    http::StatusCode,
};

use super::AppState;
use crate::train::{TaskId, TrainMode};

/// Run or queue training (`GET /train`)
pub(crate) async fn train_handler(State(state): State<AppState>) -> String {
    state.trainer().trigger().await.message()
}

/// Status of a background training task (`GET /train/:id`)
///
/// Ids that are not numbers are answered like unknown ones.
pub(crate) async fn train_status_handler(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> (StatusCode, String) {
    let trainer = state.trainer();
    if trainer.mode() == TrainMode::Blocking {
        return (
            StatusCode::NOT_FOUND,
            "Training tasks are only tracked in background mode.".to_string(),
        );
    }

    let Ok(id) = raw_id.parse::<u64>().map(TaskId) else {
        return (
            StatusCode::NOT_FOUND,
            format!("Unknown training task {raw_id}."),
        );
    };
    match trainer.status(id) {
        Some(task_state) => (StatusCode::OK, format!("Task {id}: {task_state}")),
        None => (StatusCode::NOT_FOUND, format!("Unknown training task {id}.")),
    }
}
