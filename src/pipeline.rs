//! Prediction pipeline boundary
//!
//! A pipeline takes a single-row, 11-column [`FeatureMatrix`] and returns an
//! opaque [`Prediction`]. Handlers call it once per request and never cache
//! or pool it; any caching of model weights belongs to the implementation.
//!
//! Two implementations ship with the crate:
//!
//! - [`ConstantPipeline`] answers every request with the same value (demo
//!   mode, tests).
//! - [`ArtifactPipeline`] re-reads a JSON model artifact from disk on every
//!   call, standardises the row, and evaluates a linear model.
//!
//! ## Artifact Format
//!
//! ```json
//! {
//!   "feature_names": ["fixed_acidity", "...", "alcohol"],
//!   "scaler": { "mean": [ ...11 ], "scale": [ ...11 ] },
//!   "coefficients": [ ...11 ],
//!   "intercept": 5.63
//! }
//! ```

use std::{
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::{FeatureMatrix, FEATURE_NAMES, NUM_FEATURES};

/// Error type for pipeline calls
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Model artifact could not be read
    #[error("Failed to read model artifact {path}: {source}")]
    ArtifactIo {
        /// Artifact location
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Model artifact is not valid JSON for the expected schema
    #[error("Failed to decode model artifact {path}: {source}")]
    ArtifactDecode {
        /// Artifact location
        path: PathBuf,
        /// Underlying decode error
        #[source]
        source: serde_json::Error,
    },

    /// Model artifact decoded but is internally inconsistent
    #[error("Invalid model artifact: {0}")]
    InvalidArtifact(String),

    /// Input matrix does not have the shape the model expects
    #[error("Input shape mismatch: expected {expected:?}, got {actual:?}")]
    InputShape {
        /// Expected `(rows, cols)`
        expected: (usize, usize),
        /// Received `(rows, cols)`
        actual: (usize, usize),
    },

    /// Model produced NaN or infinity
    #[error("Model produced a non-finite prediction: {0}")]
    NonFinite(f64),

    /// Failure reported by a custom pipeline
    #[error("{0}")]
    Custom(String),
}

/// Value returned by a pipeline
///
/// Serialized untagged so templates see the bare number or string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Prediction {
    /// Integer class (e.g. a quality grade)
    Class(i64),
    /// Continuous score
    Score(f64),
    /// Categorical label
    Label(String),
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(class) => write!(f, "{class}"),
            Self::Score(score) => write!(f, "{score}"),
            Self::Label(label) => f.write_str(label),
        }
    }
}

/// Anything that can turn a feature matrix into a prediction
pub trait PredictionPipeline: Send + Sync {
    /// Run inference on a single-row matrix
    ///
    /// # Errors
    ///
    /// Implementations fail for malformed input or internal model errors.
    fn predict(&self, input: &FeatureMatrix) -> Result<Prediction, PipelineError>;

    /// Short name used in log events
    fn name(&self) -> &str {
        "pipeline"
    }
}

fn expect_single_row(input: &FeatureMatrix) -> Result<&[f64], PipelineError> {
    let expected = (1, NUM_FEATURES);
    if input.shape() != expected {
        return Err(PipelineError::InputShape {
            expected,
            actual: input.shape(),
        });
    }
    input.row(0).ok_or(PipelineError::InputShape {
        expected,
        actual: input.shape(),
    })
}

/// Pipeline that returns the same prediction for every valid input
#[derive(Debug, Clone)]
pub struct ConstantPipeline {
    prediction: Prediction,
}

impl ConstantPipeline {
    /// Always answer with `prediction`
    #[must_use]
    pub fn new(prediction: Prediction) -> Self {
        Self { prediction }
    }
}

impl PredictionPipeline for ConstantPipeline {
    fn predict(&self, input: &FeatureMatrix) -> Result<Prediction, PipelineError> {
        expect_single_row(input)?;
        Ok(self.prediction.clone())
    }

    fn name(&self) -> &str {
        "constant"
    }
}

/// Per-feature standardisation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Column means
    pub mean: Vec<f64>,
    /// Column standard deviations
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// `(x - mean) / scale`; a zero scale leaves the centred value unscaled
    #[must_use]
    pub fn transform(&self, value: f64, column: usize) -> f64 {
        let scale = self.scale[column];
        let centred = value - self.mean[column];
        if scale == 0.0 {
            centred
        } else {
            centred / scale
        }
    }
}

/// Linear model serialized by the training script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Column names; must equal [`FEATURE_NAMES`]
    pub feature_names: Vec<String>,
    /// Optional standardisation applied before the linear model
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
    /// One weight per feature
    pub coefficients: Vec<f64>,
    /// Bias term
    pub intercept: f64,
}

impl ModelArtifact {
    /// Read and validate an artifact file
    ///
    /// # Errors
    ///
    /// Returns `ArtifactIo`, `ArtifactDecode`, or `InvalidArtifact`.
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let bytes = std::fs::read(path).map_err(|source| PipelineError::ArtifactIo {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact: Self =
            serde_json::from_slice(&bytes).map_err(|source| PipelineError::ArtifactDecode {
                path: path.to_path_buf(),
                source,
            })?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Check the artifact matches the fixed feature layout
    ///
    /// # Errors
    ///
    /// Returns `InvalidArtifact` describing the first inconsistency found.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.feature_names.len() != NUM_FEATURES
            || self
                .feature_names
                .iter()
                .zip(FEATURE_NAMES)
                .any(|(have, want)| have != want)
        {
            return Err(PipelineError::InvalidArtifact(format!(
                "feature_names must be {FEATURE_NAMES:?}, got {:?}",
                self.feature_names
            )));
        }
        if self.coefficients.len() != NUM_FEATURES {
            return Err(PipelineError::InvalidArtifact(format!(
                "expected {NUM_FEATURES} coefficients, got {}",
                self.coefficients.len()
            )));
        }
        if let Some(scaler) = &self.scaler {
            if scaler.mean.len() != NUM_FEATURES || scaler.scale.len() != NUM_FEATURES {
                return Err(PipelineError::InvalidArtifact(format!(
                    "scaler needs {NUM_FEATURES} means and scales, got {} and {}",
                    scaler.mean.len(),
                    scaler.scale.len()
                )));
            }
        }
        Ok(())
    }

    /// Evaluate the model on one row (caller guarantees the row length)
    #[must_use]
    pub fn evaluate(&self, row: &[f64]) -> f64 {
        row.iter()
            .zip(&self.coefficients)
            .enumerate()
            .map(|(column, (&value, &weight))| {
                let x = match &self.scaler {
                    Some(scaler) => scaler.transform(value, column),
                    None => value,
                };
                x * weight
            })
            .sum::<f64>()
            + self.intercept
    }
}

/// Pipeline backed by a model artifact on disk
///
/// The artifact is loaded fresh for every prediction, so retraining takes
/// effect on the next request without a restart.
#[derive(Debug, Clone)]
pub struct ArtifactPipeline {
    path: PathBuf,
}

impl ArtifactPipeline {
    /// Default location written by the training script
    pub const DEFAULT_PATH: &'static str = "artifacts/model_trainer/model.json";

    /// Use the artifact at `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Artifact location
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PredictionPipeline for ArtifactPipeline {
    fn predict(&self, input: &FeatureMatrix) -> Result<Prediction, PipelineError> {
        let row = expect_single_row(input)?;
        let artifact = ModelArtifact::from_path(&self.path)?;
        let value = artifact.evaluate(row);
        if !value.is_finite() {
            return Err(PipelineError::NonFinite(value));
        }
        Ok(Prediction::Score(value))
    }

    fn name(&self) -> &str {
        "artifact"
    }
}
