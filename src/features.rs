//! Feature vector assembly
//!
//! Turns a submitted form into the fixed-order vector of eleven wine
//! measurements that a prediction pipeline consumes.
//!
//! ## Field Order
//!
//! ```text
//!  0 fixed_acidity          6 total_sulfur_dioxide
//!  1 volatile_acidity       7 density
//!  2 citric_acid            8 pH
//!  3 residual_sugar         9 sulphates
//!  4 chlorides             10 alcohol
//!  5 free_sulfur_dioxide
//! ```
//!
//! A field that is absent from the form resolves to its declared default
//! (`"0.0"` for every field). A field that is present but not a number is an
//! error for the whole request.
//!
//! ## Example
//!
//! ```
//! use std::collections::HashMap;
//! use sommelier::features::{FeatureField, FeatureVector};
//!
//! let mut form = HashMap::new();
//! form.insert("alcohol".to_string(), "9.4".to_string());
//!
//! let vector = FeatureVector::from_form(&form).unwrap();
//! assert_eq!(vector.get(FeatureField::Alcohol), 9.4);
//! assert_eq!(vector.get(FeatureField::Density), 0.0);
//! assert_eq!(vector.to_matrix().shape(), (1, 11));
//! ```

use std::{collections::HashMap, fmt, hash::BuildHasher};

use serde::Serialize;
use thiserror::Error;

/// Number of measurements in a feature vector
pub const NUM_FEATURES: usize = 11;

/// Form field names in vector order
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "fixed_acidity",
    "volatile_acidity",
    "citric_acid",
    "residual_sugar",
    "chlorides",
    "free_sulfur_dioxide",
    "total_sulfur_dioxide",
    "density",
    "pH",
    "sulphates",
    "alcohol",
];

/// Error type for feature assembly
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureError {
    /// A submitted field could not be parsed as a number
    #[error("Field '{field}' is not a number: {value:?}")]
    InvalidNumber {
        /// Form field name
        field: &'static str,
        /// Raw submitted value
        value: String,
    },

    /// The request body could not be read as a form submission
    #[error("Malformed form submission: {0}")]
    MalformedForm(String),

    /// Matrix data does not fill the requested shape
    #[error("Matrix shape {rows}x{cols} needs {expected} values, got {actual}")]
    ShapeMismatch {
        /// Requested rows
        rows: usize,
        /// Requested columns
        cols: usize,
        /// rows * cols
        expected: usize,
        /// Values supplied
        actual: usize,
    },
}

/// One of the eleven wine measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureField {
    /// Tartaric acid, g/dm³
    FixedAcidity,
    /// Acetic acid, g/dm³
    VolatileAcidity,
    /// Citric acid, g/dm³
    CitricAcid,
    /// Residual sugar, g/dm³
    ResidualSugar,
    /// Sodium chloride, g/dm³
    Chlorides,
    /// Free SO₂, mg/dm³
    FreeSulfurDioxide,
    /// Total SO₂, mg/dm³
    TotalSulfurDioxide,
    /// Density, g/cm³
    Density,
    /// pH
    Ph,
    /// Potassium sulphate, g/dm³
    Sulphates,
    /// Alcohol, % vol
    Alcohol,
}

impl FeatureField {
    /// All fields in vector order
    pub const ALL: [FeatureField; NUM_FEATURES] = [
        Self::FixedAcidity,
        Self::VolatileAcidity,
        Self::CitricAcid,
        Self::ResidualSugar,
        Self::Chlorides,
        Self::FreeSulfurDioxide,
        Self::TotalSulfurDioxide,
        Self::Density,
        Self::Ph,
        Self::Sulphates,
        Self::Alcohol,
    ];

    /// Position of this field in the vector
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Form field name
    #[must_use]
    pub const fn name(self) -> &'static str {
        FEATURE_NAMES[self.index()]
    }

    /// Raw value substituted when the form omits this field
    #[must_use]
    pub const fn default_value(self) -> &'static str {
        "0.0"
    }

    /// Look a field up by its form name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }

    /// Resolve this field from a raw lookup, applying the declared default
    ///
    /// # Errors
    ///
    /// Returns `FeatureError::InvalidNumber` if the raw value (after trimming
    /// surrounding whitespace) is not a floating-point literal.
    pub fn resolve(self, raw: Option<&str>) -> Result<f64, FeatureError> {
        let raw = raw.unwrap_or(self.default_value());
        parse_float(raw.trim()).ok_or_else(|| FeatureError::InvalidNumber {
            field: self.name(),
            value: raw.to_string(),
        })
    }
}

/// Float literal, also accepting `_` between two digits (`"1_000.5"`)
fn parse_float(text: &str) -> Option<f64> {
    if !text.contains('_') {
        return text.parse().ok();
    }
    let bytes = text.as_bytes();
    let separators_ok = bytes.iter().enumerate().all(|(i, &b)| {
        b != b'_'
            || (i > 0
                && bytes[i - 1].is_ascii_digit()
                && bytes.get(i + 1).is_some_and(u8::is_ascii_digit))
    });
    if !separators_ok {
        return None;
    }
    text.replace('_', "").parse().ok()
}

impl fmt::Display for FeatureField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Eleven wine measurements in fixed order
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector([f64; NUM_FEATURES]);

impl FeatureVector {
    /// Wrap already-parsed values (must be in `FEATURE_NAMES` order)
    #[must_use]
    pub const fn new(values: [f64; NUM_FEATURES]) -> Self {
        Self(values)
    }

    /// Assemble from any name → raw value lookup
    ///
    /// # Errors
    ///
    /// Fails on the first field (in vector order) whose value is present but
    /// not numeric.
    pub fn from_lookup<'a, F>(lookup: F) -> Result<Self, FeatureError>
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let mut values = [0.0; NUM_FEATURES];
        for field in FeatureField::ALL {
            values[field.index()] = field.resolve(lookup(field.name()))?;
        }
        Ok(Self(values))
    }

    /// Assemble from a decoded form submission; unknown keys are ignored
    ///
    /// # Errors
    ///
    /// See [`FeatureVector::from_lookup`].
    pub fn from_form<S: BuildHasher>(
        form: &HashMap<String, String, S>,
    ) -> Result<Self, FeatureError> {
        Self::from_lookup(|name| form.get(name).map(String::as_str))
    }

    /// Value of a single field
    #[must_use]
    pub fn get(&self, field: FeatureField) -> f64 {
        self.0[field.index()]
    }

    /// Values in vector order
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Consume into the underlying array
    #[must_use]
    pub const fn into_array(self) -> [f64; NUM_FEATURES] {
        self.0
    }

    /// Reshape into a single-row, 11-column matrix
    #[must_use]
    pub fn to_matrix(&self) -> FeatureMatrix {
        FeatureMatrix {
            data: self.0.to_vec(),
            rows: 1,
            cols: NUM_FEATURES,
        }
    }
}

/// Row-major numeric matrix handed to a prediction pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureMatrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl FeatureMatrix {
    /// Build a matrix from flattened row-major data
    ///
    /// # Errors
    ///
    /// Returns `FeatureError::ShapeMismatch` if `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self, FeatureError> {
        let expected = rows * cols;
        if data.len() != expected {
            return Err(FeatureError::ShapeMismatch {
                rows,
                cols,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { data, rows, cols })
    }

    /// `(rows, cols)`
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Borrow row `index`
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[f64]> {
        if index >= self.rows {
            return None;
        }
        let start = index * self.cols;
        Some(&self.data[start..start + self.cols])
    }

    /// Iterate rows in order
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact panics on zero; a 0-column matrix has no rows worth yielding
        self.data.chunks_exact(self.cols.max(1)).take(self.rows)
    }

    /// Flattened row-major data
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

impl From<FeatureVector> for FeatureMatrix {
    fn from(vector: FeatureVector) -> Self {
        vector.to_matrix()
    }
}
