//! Error types for wind fusion
//!
//! Estimation itself never fails: missing data is reported as `None` and a
//! failed spatial regression is recorded on the returned field. The errors
//! here cover engine construction and the regression step in isolation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use windfield_common::ConfigValidationError;

/// Top-level fusion error type
#[derive(Error, Debug)]
pub enum FusionError {
    /// The supplied configuration failed validation
    #[error("Invalid fusion configuration: {0}")]
    InvalidConfig(#[from] ConfigValidationError),
}

/// Errors raised while fitting or evaluating the spatial regression.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FitError {
    /// Not enough positioned samples to fit
    #[error("Insufficient samples for spatial regression: need {required}, have {available}")]
    TooFewSamples {
        /// Minimum samples required
        required: usize,
        /// Samples supplied
        available: usize,
    },

    /// A sample position or target value is NaN or infinite
    #[error("Non-finite value in regression sample {index}")]
    NonFiniteSample {
        /// Index of the offending sample
        index: usize,
    },

    /// All samples lie (almost) on top of each other
    #[error("Degenerate sample geometry: spread {spread_km:.4} km below {min_spread_km:.4} km")]
    DegenerateGeometry {
        /// Largest distance between any two samples
        spread_km: f64,
        /// Configured minimum spread
        min_spread_km: f64,
    },

    /// The kernel matrix could not be factorised
    #[error("Kernel matrix is not positive definite ({samples} samples)")]
    NotPositiveDefinite {
        /// Number of samples in the kernel
        samples: usize,
    },

    /// The interpolator returned grids of a different shape than requested
    #[error("Interpolated grid shape {found:?} does not match requested {expected:?}")]
    ShapeMismatch {
        /// Requested `(rows, cols)`
        expected: (usize, usize),
        /// Shape of the first mismatching grid
        found: (usize, usize),
    },

    /// The interpolator returned a NaN or infinite cell
    #[error("Non-finite value in interpolated cell ({row}, {col})")]
    NonFiniteCell {
        /// Row of the offending cell
        row: usize,
        /// Column of the offending cell
        col: usize,
    },
}
