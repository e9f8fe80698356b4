//! HTTP API for wine quality prediction
//!
//! Serves the input form, the training trigger, and single-row predictions
//! using axum.
//!
//! ## Endpoints
//!
//! - `GET /` - Input form
//! - `GET /predict` - Input form
//! - `POST /predict` - Urlencoded or multipart measurements → results page (500 error page on failure)
//! - `GET /train` - Run or queue training, plain-text reply
//! - `GET /train/:id` - Status of a queued training task (background mode)
//!
//! ## Example
//!
//! ```rust,ignore
//! use sommelier::api::{create_router, AppState};
//!
//! let state = AppState::demo()?;
//! let app = create_router(state);
//! axum::serve(listener, app).await?;
//! ```

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};

use crate::{
    config::{PipelineSource, ServerConfig},
    error::Result,
    pipeline::{ArtifactPipeline, ConstantPipeline, Prediction, PredictionPipeline},
    templates::{Page, TemplateRenderer},
    train::{TrainCommand, TrainingTrigger},
};

mod predict_handlers;
mod train_handlers;

pub use predict_handlers::{run_prediction, PredictError};

use predict_handlers::{home_handler, predict_form_handler, predict_handler};
use train_handlers::{train_handler, train_status_handler};

/// Value the demo pipeline answers with
pub const DEMO_PREDICTION: Prediction = Prediction::Class(5);

/// Application state shared across handlers
///
/// Built once at startup and cloned into every request; all fields are
/// immutable behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Page renderer
    renderer: Arc<TemplateRenderer>,
    /// Prediction pipeline, called once per POST /predict
    pipeline: Arc<dyn PredictionPipeline>,
    /// Training launcher for GET /train
    trainer: Arc<TrainingTrigger>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("renderer", &self.renderer)
            .field("pipeline", &self.pipeline.name())
            .field("trainer", &self.trainer)
            .finish()
    }
}

impl AppState {
    /// Create application state from its parts
    #[must_use]
    pub fn new(
        renderer: TemplateRenderer,
        pipeline: Arc<dyn PredictionPipeline>,
        trainer: TrainingTrigger,
    ) -> Self {
        Self {
            renderer: Arc::new(renderer),
            pipeline,
            trainer: Arc::new(trainer),
        }
    }

    /// Demo state: built-in pages, constant pipeline, blocking default trainer
    ///
    /// # Errors
    ///
    /// Returns error if the built-in templates fail to parse.
    pub fn demo() -> Result<Self> {
        Ok(Self::new(
            TemplateRenderer::embedded()?,
            Arc::new(ConstantPipeline::new(DEMO_PREDICTION)),
            TrainingTrigger::blocking(TrainCommand::default()),
        ))
    }

    /// Build state from a validated configuration
    ///
    /// Background training spawns its worker here, so this must run inside
    /// a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or template overrides
    /// cannot be loaded.
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        config.validate()?;

        let renderer = match &config.templates_dir {
            Some(dir) => TemplateRenderer::with_overrides(dir)?,
            None => TemplateRenderer::embedded()?,
        };

        let pipeline: Arc<dyn PredictionPipeline> = match &config.pipeline {
            PipelineSource::Demo(prediction) => Arc::new(ConstantPipeline::new(prediction.clone())),
            PipelineSource::Artifact(path) => {
                if !path.is_file() {
                    tracing::warn!(
                        path = %path.display(),
                        "model artifact not found yet; predictions fail until training writes it"
                    );
                }
                Arc::new(ArtifactPipeline::new(path.clone()))
            },
        };

        let trainer = TrainingTrigger::with_mode(config.train_command.clone(), config.train_mode);
        Ok(Self::new(renderer, pipeline, trainer))
    }

    /// Page renderer
    #[must_use]
    pub fn renderer(&self) -> &TemplateRenderer {
        &self.renderer
    }

    /// Prediction pipeline
    #[must_use]
    pub fn pipeline(&self) -> &Arc<dyn PredictionPipeline> {
        &self.pipeline
    }

    /// Training trigger
    #[must_use]
    pub fn trainer(&self) -> &TrainingTrigger {
        &self.trainer
    }
}

/// Create the axum router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home_handler))
        .route("/predict", get(predict_form_handler).post(predict_handler))
        .route("/train", get(train_handler))
        .route("/train/:id", get(train_status_handler))
        .with_state(state)
}

/// Render `page` with `status`; a rendering failure becomes a plain 500
fn render_page<P: Page>(renderer: &TemplateRenderer, page: &P, status: StatusCode) -> Response {
    match renderer.render(page) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!(template = P::TEMPLATE, error = %e, "template rendering failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        },
    }
}

#[cfg(test)]
pub(crate) mod test_helpers;

#[cfg(test)]
mod tests;
