//! # Sommelier
//!
//! Wine quality prediction front-end: an input form, a training trigger, and
//! single-row inference over HTTP.
//!
//! ## Request Flow
//!
//! ```text
//! POST /predict ─► features::FeatureVector ─► pipeline::PredictionPipeline ─► templates::ResultsPage
//!        │ any failure                                                          (200)
//!        └──────────────────────────────────────────────────────────────► templates::ErrorPage (500)
//!
//! GET /train ─► train::TrainingTrigger ─► plain text
//! ```
//!
//! ## Example
//!
//! ```rust
//! use sommelier::features::{FeatureVector, NUM_FEATURES};
//! use sommelier::pipeline::{ConstantPipeline, Prediction, PredictionPipeline};
//!
//! let vector = FeatureVector::new([0.0; NUM_FEATURES]);
//! let pipeline = ConstantPipeline::new(Prediction::Class(5));
//!
//! let prediction = pipeline.predict(&vector.to_matrix()).unwrap();
//! assert_eq!(prediction, Prediction::Class(5));
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
// Clippy allows (MUST come after deny/warn to override them)
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)] // Not all methods need #[must_use]
#![allow(clippy::doc_markdown)] // Allow technical terms without backticks
#![allow(clippy::uninlined_format_args)] // Prefer explicit format args
#![allow(clippy::missing_panics_doc)] // Allow missing Panics doc sections
#![allow(clippy::float_cmp)] // Exact float comparisons in tests

pub mod api;
/// Server configuration assembled from CLI flags and environment
pub mod config;
pub mod error;
/// Form → fixed-order feature vector
pub mod features;
/// Prediction pipeline trait and implementations
pub mod pipeline;
/// HTML pages rendered with minijinja
pub mod templates;
/// External training process launcher
pub mod train;

// Re-exports for convenience
pub use error::{Result, SommelierError};
pub use features::{FeatureVector, FEATURE_NAMES};
pub use pipeline::{Prediction, PredictionPipeline};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
