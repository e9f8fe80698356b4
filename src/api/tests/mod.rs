//! API Tests
//!
//! Part organization:
//! - pages: form pages and routing
//! - predict: POST /predict success and failure paths
//! - train: GET /train and task status

mod train;

use super::*;

#[test]
fn test_app_state_demo() {
    let state = AppState::demo().expect("test");
    assert_eq!(state.pipeline().name(), "constant");
    assert!(state.renderer().overrides().is_none());
    assert_eq!(state.trainer().command(), &TrainCommand::default());
}

#[test]
fn test_app_state_debug_names_pipeline() {
    let state = AppState::demo().expect("test");
    let debug = format!("{state:?}");
    assert!(debug.contains("constant"));
}

#[tokio::test]
async fn test_app_state_from_config_demo_source() {
    let config = ServerConfig {
        pipeline: PipelineSource::Demo(Prediction::Label("fine".to_string())),
        ..ServerConfig::default()
    };
    let state = AppState::from_config(&config).expect("test");
    assert_eq!(state.pipeline().name(), "constant");
}

#[tokio::test]
async fn test_app_state_from_config_artifact_source() {
    let config = ServerConfig::default();
    let state = AppState::from_config(&config).expect("test");
    assert_eq!(state.pipeline().name(), "artifact");
}

#[tokio::test]
async fn test_app_state_from_config_rejects_bad_host() {
    let config = ServerConfig {
        host: "nowhere at all".to_string(),
        ..ServerConfig::default()
    };
    assert!(AppState::from_config(&config).is_err());
}

#[tokio::test]
async fn test_app_state_from_config_missing_templates_dir() {
    let dir = tempfile::tempdir().expect("test");
    let config = ServerConfig {
        templates_dir: Some(dir.path().join("missing")),
        ..ServerConfig::default()
    };
    let err = AppState::from_config(&config).unwrap_err();
    assert!(err.to_string().contains("Template directory not found"));
}
