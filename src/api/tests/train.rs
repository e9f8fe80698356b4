//! API Tests: GET /train and task status

use axum::http::StatusCode;
use tower::util::ServiceExt;

use crate::{
    api::test_helpers::{app_with_trainer, body_text, create_test_app, get_request},
    train::{TrainCommand, TrainingTrigger, TRAINING_SUCCESS_MESSAGE},
};

#[cfg(unix)]
fn shell(script: &str) -> TrainCommand {
    TrainCommand::new("sh", vec!["-c".to_string(), script.to_string()])
}

#[cfg(unix)]
#[tokio::test]
async fn test_train_success_message_ignores_exit_code() {
    let app = app_with_trainer(TrainingTrigger::blocking(shell("exit 1")));

    let response = app.oneshot(get_request("/train")).await.expect("test");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, TRAINING_SUCCESS_MESSAGE);
}

#[tokio::test]
async fn test_train_launch_failure_is_plain_text_200() {
    let trainer = TrainingTrigger::blocking(TrainCommand::new(
        "sommelier-no-such-training-binary",
        vec![],
    ));
    let response = app_with_trainer(trainer)
        .oneshot(get_request("/train"))
        .await
        .expect("test");

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .expect("test")
        .to_str()
        .expect("test")
        .to_string();
    assert!(content_type.starts_with("text/plain"));
    assert!(body_text(response).await.starts_with("Training Failed: "));
}

#[tokio::test]
async fn test_train_status_unavailable_in_blocking_mode() {
    let response = create_test_app()
        .oneshot(get_request("/train/1"))
        .await
        .expect("test");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_train_status_non_numeric_id_is_unknown() {
    let trainer = TrainingTrigger::background(TrainCommand::default());
    let response = app_with_trainer(trainer)
        .oneshot(get_request("/train/latest"))
        .await
        .expect("test");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, "Unknown training task latest.");
}

#[cfg(unix)]
#[tokio::test]
async fn test_background_train_submits_and_reports() {
    let app = app_with_trainer(TrainingTrigger::background(shell("exit 0")));

    let response = app
        .clone()
        .oneshot(get_request("/train"))
        .await
        .expect("test");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.starts_with("Training Submitted! Task 1 queued."));

    let mut last = String::new();
    for _ in 0..200 {
        let response = app
            .clone()
            .oneshot(get_request("/train/1"))
            .await
            .expect("test");
        assert_eq!(response.status(), StatusCode::OK);
        last = body_text(response).await;
        if last.contains("finished") {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
    }
    assert_eq!(last, "Task 1: finished (exit code 0)");

    let response = app.oneshot(get_request("/train/42")).await.expect("test");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
