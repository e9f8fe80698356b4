//! HTML page rendering
//!
//! Three pages are served: the input form, the results page, and the error
//! page. Each has a typed context implementing [`Page`], so a handler cannot
//! render `results.html` without a `prediction`.
//!
//! The pages are compiled into the binary. A directory may override any of
//! them by providing a file with the same name; overrides are read once when
//! the renderer is built.

use std::path::{Path, PathBuf};

use minijinja::Environment;
use serde::Serialize;
use thiserror::Error;

use crate::pipeline::Prediction;

/// Maximum nesting depth allowed while rendering
pub const MAX_RECURSION_DEPTH: usize = 32;

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");
const RESULTS_TEMPLATE: &str = include_str!("../templates/results.html");
const ERROR_TEMPLATE: &str = include_str!("../templates/error.html");

/// Generic message shown whenever a prediction request fails
pub const PREDICTION_ERROR_MESSAGE: &str =
    "An error occurred during prediction. Please check inputs.";

/// Error type for template setup and rendering
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template failed to parse or render
    #[error("Template error: {0}")]
    Render(#[from] minijinja::Error),

    /// Override directory is missing or not a directory
    #[error("Template directory not found: {0}")]
    MissingDirectory(PathBuf),

    /// Override file exists but could not be read
    #[error("Failed to read template {path}: {source}")]
    Io {
        /// Override file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// A renderable page: its template name plus a serializable context
pub trait Page: Serialize {
    /// Template file name
    const TEMPLATE: &'static str;
}

/// Input form (no dynamic context)
#[derive(Debug, Default, Serialize)]
pub struct IndexPage {}

impl Page for IndexPage {
    const TEMPLATE: &'static str = "index.html";
}

/// Prediction result
#[derive(Debug, Serialize)]
pub struct ResultsPage {
    /// Value returned by the pipeline, rendered as-is
    pub prediction: Prediction,
}

impl Page for ResultsPage {
    const TEMPLATE: &'static str = "results.html";
}

/// Failure page
#[derive(Debug, Serialize)]
pub struct ErrorPage {
    /// User-facing message; never contains internal error detail
    pub error_message: String,
}

impl ErrorPage {
    /// The generic prediction failure page
    #[must_use]
    pub fn prediction_failed() -> Self {
        Self {
            error_message: PREDICTION_ERROR_MESSAGE.to_string(),
        }
    }
}

impl Page for ErrorPage {
    const TEMPLATE: &'static str = "error.html";
}

const PAGES: [(&str, &str); 3] = [
    (IndexPage::TEMPLATE, INDEX_TEMPLATE),
    (ResultsPage::TEMPLATE, RESULTS_TEMPLATE),
    (ErrorPage::TEMPLATE, ERROR_TEMPLATE),
];

/// minijinja environment holding the three pages
pub struct TemplateRenderer {
    env: Environment<'static>,
    overrides: Option<PathBuf>,
}

impl std::fmt::Debug for TemplateRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRenderer")
            .field("overrides", &self.overrides)
            .finish_non_exhaustive()
    }
}

impl TemplateRenderer {
    /// Renderer using only the built-in pages
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::Render` if a built-in page fails to parse.
    pub fn embedded() -> Result<Self, TemplateError> {
        let mut env = Environment::new();
        env.set_recursion_limit(MAX_RECURSION_DEPTH);
        for (name, source) in PAGES {
            env.add_template(name, source)?;
        }
        Ok(Self {
            env,
            overrides: None,
        })
    }

    /// Renderer whose pages may be replaced by files in `dir`
    ///
    /// Pages without a matching file keep the built-in version.
    ///
    /// # Errors
    ///
    /// Fails if `dir` is not a directory, an override cannot be read, or any
    /// page fails to parse.
    pub fn with_overrides(dir: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(TemplateError::MissingDirectory(dir.to_path_buf()));
        }

        let mut renderer = Self::embedded()?;
        for (name, _) in PAGES {
            let path = dir.join(name);
            if !path.is_file() {
                continue;
            }
            let source = std::fs::read_to_string(&path)
                .map_err(|source| TemplateError::Io { path: path.clone(), source })?;
            renderer.env.add_template_owned(name, source)?;
            tracing::debug!(template = name, path = %path.display(), "template override loaded");
        }
        renderer.overrides = Some(dir.to_path_buf());
        Ok(renderer)
    }

    /// Directory overrides were loaded from, if any
    #[must_use]
    pub fn overrides(&self) -> Option<&Path> {
        self.overrides.as_deref()
    }

    /// Render a page to HTML
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::Render` if rendering fails.
    pub fn render<P: Page>(&self, page: &P) -> Result<String, TemplateError> {
        let tmpl = self.env.get_template(P::TEMPLATE)?;
        Ok(tmpl.render(page)?)
    }
}
