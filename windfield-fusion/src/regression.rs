//! Gaussian-process spatial regression
//!
//! Interpolates positioned wind samples onto a lat/lon grid. Direction is
//! regressed through its sin and cos components and reconstructed with
//! `atan2`, speed is regressed directly. The kernel is
//!
//! ```text
//! k(x, x') = exp(-|x - x'|² / (2 ℓ²)) + δ(x, x') · σ²_noise / w
//! ```
//!
//! on standardised targets, with distances in local kilometres and `w` the
//! temporal weight of each sample. All three regressions share one kernel
//! matrix, so it is factorised once.

use nalgebra::{DMatrix, DVector};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use windfield_common::{GeoPosition, SpatialConfig};

use crate::circular::{direction_from_components, mean_and_std};
use crate::error::FitError;
use crate::integrator::{direction_uncertainty, speed_uncertainty};

/// Targets whose spread is below this are treated as having this spread.
const TARGET_STD_FLOOR: f64 = 1e-3;

/// Sample weights are floored here before dividing the noise term.
const MIN_SAMPLE_WEIGHT: f64 = 0.1;

/// Confidence assigned to a cell with no predictive uncertainty.
pub const MAX_CELL_CONFIDENCE: f64 = 0.8;

/// Confidence never reported below this.
pub const MIN_CELL_CONFIDENCE: f64 = 0.1;

/// One positioned wind sample, already projected to the requested instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialSample {
    /// Where the wind was estimated
    pub position: GeoPosition,
    /// Direction (degrees)
    pub direction: f64,
    /// Speed (knots)
    pub speed: f64,
    /// Temporal relevance weight in (0, 1]
    pub weight: f64,
}

/// Per-cell output of an interpolator, shaped like the query grid.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedField {
    /// Direction per cell (degrees, [0, 360))
    pub direction: Array2<f64>,
    /// Speed per cell (knots, ≥ 0)
    pub speed: Array2<f64>,
    /// Confidence per cell ([0.1, 0.8])
    pub confidence: Array2<f64>,
}

/// Capability to interpolate positioned samples onto a grid.
///
/// The engine delegates to an implementation of this trait; a failed fit is
/// returned as an error and the caller keeps its uniform field.
pub trait SpatialInterpolator: std::fmt::Debug {
    /// Interpolates `samples` at every cell of `lat_grid`/`lon_grid`.
    fn interpolate(
        &self,
        samples: &[SpatialSample],
        lat_grid: &Array2<f64>,
        lon_grid: &Array2<f64>,
    ) -> Result<InterpolatedField, FitError>;
}

/// Gaussian-process regression with a squared-exponential spatial kernel and
/// a per-sample observation-noise term.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianProcessInterpolator {
    /// Kernel length scale (km)
    pub length_scale_km: f64,
    /// Observation-noise variance on standardised targets
    pub noise_variance: f64,
    /// Minimum number of samples to fit
    pub min_samples: usize,
    /// Minimum largest pairwise sample distance (km)
    pub min_spread_km: f64,
}

impl Default for GaussianProcessInterpolator {
    fn default() -> Self {
        Self::from_config(&SpatialConfig::default())
    }
}

impl GaussianProcessInterpolator {
    /// Creates an interpolator from the spatial configuration
    pub fn from_config(config: &SpatialConfig) -> Self {
        Self {
            length_scale_km: config.length_scale_km,
            noise_variance: config.noise_variance,
            min_samples: config.min_positioned_samples,
            min_spread_km: config.min_sample_spread_km,
        }
    }

    fn kernel(&self, a: (f64, f64), b: (f64, f64)) -> f64 {
        let d2 = (a.0 - b.0).powi(2) + (a.1 - b.1).powi(2);
        (-d2 / (2.0 * self.length_scale_km.powi(2))).exp()
    }

    fn validate(&self, samples: &[SpatialSample]) -> Result<(), FitError> {
        let required = self.min_samples.max(1);
        if samples.len() < required {
            return Err(FitError::TooFewSamples {
                required,
                available: samples.len(),
            });
        }
        for (index, s) in samples.iter().enumerate() {
            let finite = s.position.is_finite()
                && s.direction.is_finite()
                && s.speed.is_finite()
                && s.weight.is_finite();
            if !finite {
                return Err(FitError::NonFiniteSample { index });
            }
        }
        Ok(())
    }
}

/// Standardised copy of `values` plus the mean and scale used.
fn standardise(values: &[f64]) -> (DVector<f64>, f64, f64) {
    let (mean, std) = mean_and_std(values).unwrap_or((0.0, 1.0));
    let scale = std.max(TARGET_STD_FLOOR);
    let v = DVector::from_iterator(values.len(), values.iter().map(|x| (x - mean) / scale));
    (v, mean, scale)
}

impl SpatialInterpolator for GaussianProcessInterpolator {
    fn interpolate(
        &self,
        samples: &[SpatialSample],
        lat_grid: &Array2<f64>,
        lon_grid: &Array2<f64>,
    ) -> Result<InterpolatedField, FitError> {
        self.validate(samples)?;
        let n = samples.len();

        let n_f = n as f64;
        let origin = GeoPosition::new(
            samples.iter().map(|s| s.position.lat).sum::<f64>() / n_f,
            samples.iter().map(|s| s.position.lon).sum::<f64>() / n_f,
        );
        let xs: Vec<(f64, f64)> = samples.iter().map(|s| s.position.to_local_km(&origin)).collect();

        let mut spread_km: f64 = 0.0;
        for (i, a) in samples.iter().enumerate() {
            for b in &samples[i + 1..] {
                spread_km = spread_km.max(a.position.distance_km(&b.position));
            }
        }
        if spread_km < self.min_spread_km {
            return Err(FitError::DegenerateGeometry {
                spread_km,
                min_spread_km: self.min_spread_km,
            });
        }

        let k = DMatrix::from_fn(n, n, |i, j| {
            let noise = if i == j {
                self.noise_variance / samples[i].weight.max(MIN_SAMPLE_WEIGHT)
            } else {
                0.0
            };
            self.kernel(xs[i], xs[j]) + noise
        });
        let chol = k
            .cholesky()
            .ok_or(FitError::NotPositiveDefinite { samples: n })?;

        let sin: Vec<f64> = samples.iter().map(|s| s.direction.to_radians().sin()).collect();
        let cos: Vec<f64> = samples.iter().map(|s| s.direction.to_radians().cos()).collect();
        let speed: Vec<f64> = samples.iter().map(|s| s.speed).collect();
        let (sin_y, sin_mean, sin_scale) = standardise(&sin);
        let (cos_y, cos_mean, cos_scale) = standardise(&cos);
        let (speed_y, speed_mean, speed_scale) = standardise(&speed);
        let sin_alpha = chol.solve(&sin_y);
        let cos_alpha = chol.solve(&cos_y);
        let speed_alpha = chol.solve(&speed_y);

        // Cross-covariance between samples (rows) and grid cells (columns)
        let cells: Vec<(f64, f64)> = lat_grid
            .iter()
            .zip(lon_grid.iter())
            .map(|(&lat, &lon)| GeoPosition::new(lat, lon).to_local_km(&origin))
            .collect();
        let m = cells.len();
        let k_star = DMatrix::from_fn(n, m, |i, j| self.kernel(xs[i], cells[j]));
        let v = chol
            .l()
            .solve_lower_triangular(&k_star)
            .ok_or(FitError::NotPositiveDefinite { samples: n })?;

        let sin_pred = k_star.tr_mul(&sin_alpha);
        let cos_pred = k_star.tr_mul(&cos_alpha);
        let speed_pred = k_star.tr_mul(&speed_alpha);

        let mut direction = Vec::with_capacity(m);
        let mut speed_out = Vec::with_capacity(m);
        let mut confidence = Vec::with_capacity(m);
        for j in 0..m {
            let latent_std = (1.0 - v.column(j).norm_squared()).max(0.0).sqrt();

            let s = sin_pred[j] * sin_scale + sin_mean;
            let c = cos_pred[j] * cos_scale + cos_mean;
            let spd = (speed_pred[j] * speed_scale + speed_mean).max(0.0);

            let resultant = s.hypot(c);
            let dir_uncertainty = if resultant > 1e-6 {
                let component_std = latent_std * sin_scale.hypot(cos_scale);
                direction_uncertainty((component_std / resultant).to_degrees())
            } else {
                1.0
            };
            let spd_uncertainty = speed_uncertainty(latent_std * speed_scale, spd);

            direction.push(direction_from_components(s, c));
            speed_out.push(spd);
            confidence.push(
                (MAX_CELL_CONFIDENCE - 0.4 * dir_uncertainty - 0.4 * spd_uncertainty)
                    .max(MIN_CELL_CONFIDENCE),
            );
        }

        let shape = lat_grid.dim();
        let ncols = shape.1;
        let to_grid = |values: &[f64]| Array2::from_shape_fn(shape, |(r, col)| values[r * ncols + col]);
        Ok(InterpolatedField {
            direction: to_grid(&direction),
            speed: to_grid(&speed_out),
            confidence: to_grid(&confidence),
        })
    }
}
