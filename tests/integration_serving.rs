//! End-to-end serving tests through the public router
//!
//! Drives `create_router` in-process with a model artifact on disk, the way
//! `sommelier serve --model` runs it.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use sommelier::{
    api::{create_router, AppState},
    config::{PipelineSource, ServerConfig},
    features::{FEATURE_NAMES, NUM_FEATURES},
    pipeline::ArtifactPipeline,
    templates::{TemplateRenderer, PREDICTION_ERROR_MESSAGE},
    train::{TrainCommand, TrainingTrigger},
};
use tower::util::ServiceExt;

fn write_artifact(dir: &std::path::Path) -> std::path::PathBuf {
    let mut coefficients = vec![0.0; NUM_FEATURES];
    coefficients[NUM_FEATURES - 1] = 0.25; // alcohol
    let artifact = serde_json::json!({
        "feature_names": FEATURE_NAMES,
        "coefficients": coefficients,
        "intercept": 3.0,
    });
    let path = dir.join("model.json");
    std::fs::write(&path, artifact.to_string()).expect("write artifact");
    path
}

fn predict(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf-8")
}

#[tokio::test]
async fn test_artifact_prediction_end_to_end() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = ServerConfig {
        pipeline: PipelineSource::Artifact(write_artifact(dir.path())),
        ..ServerConfig::default()
    };
    let app = create_router(AppState::from_config(&config).expect("state"));

    let response = app.oneshot(predict("alcohol=10")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    // 3.0 + 0.25 * 10
    assert!(text(response).await.contains(">5.5</p>"));
}

#[tokio::test]
async fn test_retrained_artifact_used_without_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("model.json");
    let app = create_router(AppState::new(
        TemplateRenderer::embedded().expect("templates"),
        Arc::new(ArtifactPipeline::new(path.clone())),
        TrainingTrigger::blocking(TrainCommand::default()),
    ));

    // No artifact yet: generic error page
    let response = app
        .clone()
        .oneshot(predict("alcohol=10"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(text(response).await.contains(PREDICTION_ERROR_MESSAGE));

    write_artifact(dir.path());
    let response = app.oneshot(predict("alcohol=10")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_corrupt_artifact_is_500() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("model.json");
    std::fs::write(&path, r#"{"feature_names": [], "coefficients": [], "intercept": 0}"#)
        .expect("write");

    let config = ServerConfig {
        pipeline: PipelineSource::Artifact(path),
        ..ServerConfig::default()
    };
    let app = create_router(AppState::from_config(&config).expect("state"));
    let response = app.oneshot(predict("")).await.expect("response");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[cfg(unix)]
#[tokio::test]
async fn test_train_runs_configured_command() {
    let dir = tempfile::tempdir().expect("tempdir");
    let marker = dir.path().join("trained");
    let config = ServerConfig {
        train_command: TrainCommand::new(
            "sh",
            vec!["-c".to_string(), format!("touch {}", marker.display())],
        ),
        ..ServerConfig::default()
    };
    let app = create_router(AppState::from_config(&config).expect("state"));

    let request = Request::builder()
        .uri("/train")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        text(response).await,
        "Training Successful! Check server logs for output from main.py."
    );
    assert!(marker.exists(), "blocking mode returns after the process exits");
}
