//! Form and prediction handlers
//!
//! `POST /predict` runs received → parsed → predicted → rendered. Any failure
//! short-circuits to the generic error page with status 500; the detailed
//! cause only goes to the log.
//!
//! The body may be `application/x-www-form-urlencoded` or
//! `multipart/form-data`; both end up as the same field map.

use std::{collections::HashMap, hash::BuildHasher, sync::Arc};

use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::{header, StatusCode},
    response::Response,
    Form,
};
use thiserror::Error;

use super::{render_page, AppState};
use crate::{
    features::{FeatureError, FeatureVector},
    pipeline::{PipelineError, Prediction, PredictionPipeline},
    templates::{ErrorPage, IndexPage, ResultsPage},
};

/// Why a prediction request failed
#[derive(Debug, Error)]
pub enum PredictError {
    /// Form could not be read or a field was not numeric
    #[error("Invalid input: {0}")]
    Parse(#[from] FeatureError),

    /// Pipeline rejected the input or failed internally
    #[error("Pipeline failure: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Assemble the feature vector from `form` and run `pipeline` on it
///
/// # Errors
///
/// `PredictError::Parse` for a non-numeric field, `PredictError::Pipeline`
/// if the pipeline fails.
pub fn run_prediction<S: BuildHasher>(
    pipeline: &dyn PredictionPipeline,
    form: &HashMap<String, String, S>,
) -> Result<Prediction, PredictError> {
    let vector = FeatureVector::from_form(form)?;
    Ok(pipeline.predict(&vector.to_matrix())?)
}

/// Home page (`GET /`)
pub(crate) async fn home_handler(State(state): State<AppState>) -> Response {
    render_page(state.renderer(), &IndexPage::default(), StatusCode::OK)
}

/// Input form (`GET /predict`)
pub(crate) async fn predict_form_handler(State(state): State<AppState>) -> Response {
    render_page(state.renderer(), &IndexPage::default(), StatusCode::OK)
}

/// Prediction submission (`POST /predict`)
pub(crate) async fn predict_handler(
    State(state): State<AppState>,
    request: Request,
) -> Response {
    let outcome = match read_form(request, &state).await {
        Ok(fields) => predict_off_thread(Arc::clone(state.pipeline()), fields).await,
        Err(e) => Err(e.into()),
    };

    match outcome {
        Ok(prediction) => {
            tracing::info!(%prediction, "prediction served");
            render_page(state.renderer(), &ResultsPage { prediction }, StatusCode::OK)
        },
        Err(e) => {
            tracing::error!(error = %e, "prediction failed");
            render_page(
                state.renderer(),
                &ErrorPage::prediction_failed(),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        },
    }
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| {
            value
                .trim_start()
                .to_ascii_lowercase()
                .starts_with("multipart/form-data")
        })
}

/// Collect the submitted fields, urlencoded or multipart
///
/// Later values win for repeated names. Multipart parts without a name are
/// skipped.
async fn read_form(
    request: Request,
    state: &AppState,
) -> Result<HashMap<String, String>, FeatureError> {
    if !is_multipart(&request) {
        let Form(fields) = Form::<HashMap<String, String>>::from_request(request, state)
            .await
            .map_err(|rejection| FeatureError::MalformedForm(rejection.body_text()))?;
        return Ok(fields);
    }

    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|rejection| FeatureError::MalformedForm(rejection.body_text()))?;
    let mut fields = HashMap::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| FeatureError::MalformedForm(e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        let value = field
            .text()
            .await
            .map_err(|e| FeatureError::MalformedForm(e.body_text()))?;
        fields.insert(name, value);
    }
    Ok(fields)
}

/// Run the pipeline on the blocking pool
async fn predict_off_thread(
    pipeline: Arc<dyn PredictionPipeline>,
    fields: HashMap<String, String>,
) -> Result<Prediction, PredictError> {
    tokio::task::spawn_blocking(move || run_prediction(pipeline.as_ref(), &fields))
        .await
        .unwrap_or_else(|e| {
            Err(PipelineError::Custom(format!("prediction task aborted: {e}")).into())
        })
}
