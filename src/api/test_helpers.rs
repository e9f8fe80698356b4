//! Test helper functions for api tests

use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
    Router,
};

use super::*;
use crate::{features::FeatureMatrix, pipeline::PipelineError};

/// Create a test application with demo state
pub fn create_test_app() -> Router {
    create_router(AppState::demo().expect("test"))
}

/// Demo app with a custom pipeline
pub fn app_with_pipeline(pipeline: Arc<dyn PredictionPipeline>) -> Router {
    let state = AppState::new(
        TemplateRenderer::embedded().expect("test"),
        pipeline,
        TrainingTrigger::blocking(TrainCommand::default()),
    );
    create_router(state)
}

/// Demo app with a custom trainer
pub fn app_with_trainer(trainer: TrainingTrigger) -> Router {
    let state = AppState::new(
        TemplateRenderer::embedded().expect("test"),
        Arc::new(ConstantPipeline::new(DEMO_PREDICTION)),
        trainer,
    );
    create_router(state)
}

/// Pipeline double that records each input row
pub struct RecordingPipeline {
    answer: std::result::Result<Prediction, String>,
    calls: Mutex<Vec<Vec<f64>>>,
}

impl RecordingPipeline {
    /// Always answer `prediction`
    pub fn returning(prediction: Prediction) -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(prediction),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Always fail with `reason`
    pub fn failing(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Err(reason.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Rows seen so far
    pub fn calls(&self) -> Vec<Vec<f64>> {
        self.calls.lock().expect("test").clone()
    }
}

impl PredictionPipeline for RecordingPipeline {
    fn predict(&self, input: &FeatureMatrix) -> std::result::Result<Prediction, PipelineError> {
        self.calls.lock().expect("test").push(input.as_slice().to_vec());
        self.answer.clone().map_err(PipelineError::Custom)
    }
}

/// Form-encoded POST /predict
pub fn predict_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("test")
}

/// Multipart POST /predict with one text part per field
pub fn multipart_predict_request(fields: &[(&str, &str)]) -> Request<Body> {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!("--{MULTIPART_BOUNDARY}--\r\n"));

    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("test")
}

const MULTIPART_BOUNDARY: &str = "sommelier-boundary";

/// GET request to `uri`
pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("test")
}

/// Collect a response body as UTF-8
pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("test");
    String::from_utf8(bytes.to_vec()).expect("test")
}

/// Form body with every field set to `value`
pub fn uniform_form(value: &str) -> String {
    crate::features::FEATURE_NAMES
        .iter()
        .map(|name| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}
