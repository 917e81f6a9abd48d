//! Spatial wind field estimation
//!
//! Builds a regular lat/lon grid for one instant. Every field starts as the
//! closest-in-time fused estimate projected to the instant and spread
//! uniformly over the grid. When enough history entries carry a position,
//! the uniform fill is replaced by a regression over those entries.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use windfield_common::{elapsed_minutes, GeoPosition, GridBounds, SpatialConfig};

use crate::circular::normalize_direction;
use crate::drift::DriftModel;
use crate::error::FitError;
use crate::history::EstimationHistory;
use crate::integrator::{direction_uncertainty, speed_uncertainty};
use crate::regression::{
    InterpolatedField, SpatialInterpolator, SpatialSample, MAX_CELL_CONFIDENCE,
    MIN_CELL_CONFIDENCE,
};
use crate::FusedEstimate;

/// Temporal weight never drops below this inside the relevance window.
const MIN_TEMPORAL_WEIGHT: f64 = 0.1;

/// Why a field was left as a uniform projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FallbackReason {
    /// Fewer positioned entries than regression needs
    InsufficientPositions {
        /// Positioned entries in the relevance window
        available: usize,
        /// Entries required
        required: usize,
    },
    /// Regression was attempted and failed
    FitFailed(FitError),
}

/// How a field's cells were produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldMethod {
    /// Closest-in-time estimate projected to the instant, same value everywhere
    UniformProjection {
        /// Why regression was not used
        reason: FallbackReason,
    },
    /// Regression over positioned history entries
    SpatiallyInterpolated {
        /// Number of samples the regression was fitted on
        samples: usize,
    },
}

impl FieldMethod {
    /// Short label for logs and exported records
    pub fn label(&self) -> &'static str {
        match self {
            FieldMethod::UniformProjection { .. } => "uniform_projection",
            FieldMethod::SpatiallyInterpolated { .. } => "spatially_interpolated",
        }
    }
}

/// Wind field over a regular grid at one instant.
///
/// All grids share the same `(rows, cols)` shape; rows run south to north
/// and columns west to east.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialField {
    /// Instant the field describes (ms)
    pub timestamp_ms: u64,
    /// Latitude of each cell (degrees)
    pub lat_grid: Array2<f64>,
    /// Longitude of each cell (degrees)
    pub lon_grid: Array2<f64>,
    /// Direction per cell (degrees, [0, 360))
    pub direction_grid: Array2<f64>,
    /// Speed per cell (knots)
    pub speed_grid: Array2<f64>,
    /// Confidence per cell ([0, 1])
    pub confidence_grid: Array2<f64>,
    /// How the cells were produced
    pub method: FieldMethod,
}

impl SpatialField {
    /// Grid shape as `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        self.lat_grid.dim()
    }

    /// Bounding box covered by the grid cells
    pub fn bounds(&self) -> GridBounds {
        let (min_lat, max_lat) = min_max(self.lat_grid.iter().copied());
        let (min_lon, max_lon) = min_max(self.lon_grid.iter().copied());
        GridBounds::new(min_lat, max_lat, min_lon, max_lon)
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

/// Evenly spaced values from `start` to `end` inclusive. One point is the
/// midpoint.
fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![(start + end) / 2.0],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Checks an interpolator's output against the requested grid and clamps
/// every cell into range: directions in [0, 360), speeds non-negative,
/// confidence in [0, 1].
fn checked_cells(
    mut interpolated: InterpolatedField,
    shape: (usize, usize),
) -> Result<InterpolatedField, FitError> {
    for grid in [
        &interpolated.direction,
        &interpolated.speed,
        &interpolated.confidence,
    ] {
        if grid.dim() != shape {
            return Err(FitError::ShapeMismatch {
                expected: shape,
                found: grid.dim(),
            });
        }
        if let Some(((row, col), _)) = grid.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(FitError::NonFiniteCell { row, col });
        }
    }

    interpolated.direction.mapv_inplace(normalize_direction);
    interpolated.speed.mapv_inplace(|s| s.max(0.0));
    interpolated.confidence.mapv_inplace(|c| c.clamp(0.0, 1.0));
    Ok(interpolated)
}

/// Builds the field grids for a given history snapshot.
#[derive(Debug, Clone, Default)]
pub struct SpatialFieldEstimator {
    config: SpatialConfig,
}

impl SpatialFieldEstimator {
    /// Creates an estimator
    pub fn new(config: SpatialConfig) -> Self {
        Self { config }
    }

    /// Estimator configuration
    pub fn config(&self) -> &SpatialConfig {
        &self.config
    }

    /// Relevance weight of an entry `minutes` away from the instant, or
    /// `None` if outside the window.
    pub fn temporal_weight(&self, minutes: f64) -> Option<f64> {
        let window = self.config.relevance_window_minutes;
        let span = minutes.abs();
        if span > window {
            return None;
        }
        Some((1.0 - span / window).max(MIN_TEMPORAL_WEIGHT))
    }

    /// Grid box for the given positions, or the fallback box if there are none.
    pub fn grid_bounds(&self, positions: &[GeoPosition]) -> GridBounds {
        if positions.is_empty() {
            return self.config.fallback_bounds;
        }
        let (min_lat, max_lat) = min_max(positions.iter().map(|p| p.lat));
        let (min_lon, max_lon) = min_max(positions.iter().map(|p| p.lon));
        GridBounds::new(min_lat, max_lat, min_lon, max_lon)
            .expanded(self.config.bounds_padding, self.config.min_bounds_padding_deg)
    }

    /// Estimates the field at `instant_ms` on a `resolution × resolution` grid.
    ///
    /// Returns `None` when no history entry lies within the relevance window
    /// or the resolution is 0. Reads its inputs only, so repeated calls with
    /// the same arguments return identical fields.
    pub fn estimate(
        &self,
        instant_ms: u64,
        resolution: usize,
        history: &EstimationHistory,
        drift: &DriftModel,
        interpolator: &dyn SpatialInterpolator,
    ) -> Option<SpatialField> {
        if resolution == 0 {
            return None;
        }

        let relevant: Vec<(&FusedEstimate, f64, f64)> = history
            .iter()
            .filter_map(|e| {
                let minutes = elapsed_minutes(e.timestamp_ms, instant_ms);
                self.temporal_weight(minutes).map(|w| (e, minutes, w))
            })
            .collect();
        if relevant.is_empty() {
            debug!(instant_ms, "No fused estimates within relevance window");
            return None;
        }

        let positions: Vec<GeoPosition> =
            relevant.iter().filter_map(|(e, _, _)| e.position).collect();
        let bounds = self.grid_bounds(&positions);
        let lats = linspace(bounds.min_lat, bounds.max_lat, resolution);
        let lons = linspace(bounds.min_lon, bounds.max_lon, resolution);
        let shape = (resolution, resolution);
        let lat_grid = Array2::from_shape_fn(shape, |(r, _)| lats[r]);
        let lon_grid = Array2::from_shape_fn(shape, |(_, c)| lons[c]);

        // Baseline: closest entry projected to the instant; ties go to the later entry
        let (closest, minutes, _) = relevant
            .iter()
            .min_by(|a, b| {
                a.1.abs()
                    .total_cmp(&b.1.abs())
                    .then(b.0.timestamp_ms.cmp(&a.0.timestamp_ms))
            })
            .copied()?;
        let direction = drift.project_direction(closest.direction, minutes);
        let speed = drift.project_speed(closest.speed, minutes);
        let (direction_std, speed_std) = drift.projection_std(minutes);
        let confidence = (MAX_CELL_CONFIDENCE
            - 0.4 * direction_uncertainty(direction_std)
            - 0.4 * speed_uncertainty(speed_std, speed))
        .max(MIN_CELL_CONFIDENCE);

        let mut field = SpatialField {
            timestamp_ms: instant_ms,
            direction_grid: Array2::from_elem(shape, direction),
            speed_grid: Array2::from_elem(shape, speed),
            confidence_grid: Array2::from_elem(shape, confidence),
            lat_grid,
            lon_grid,
            method: FieldMethod::UniformProjection {
                reason: FallbackReason::InsufficientPositions {
                    available: positions.len(),
                    required: self.config.min_positioned_samples,
                },
            },
        };

        if positions.len() < self.config.min_positioned_samples {
            return Some(field);
        }

        let samples: Vec<SpatialSample> = relevant
            .iter()
            .filter_map(|(e, minutes, weight)| {
                e.position.map(|position| SpatialSample {
                    position,
                    direction: drift.project_direction(e.direction, *minutes),
                    speed: drift.project_speed(e.speed, *minutes),
                    weight: *weight,
                })
            })
            .collect();

        let fitted = interpolator
            .interpolate(&samples, &field.lat_grid, &field.lon_grid)
            .and_then(|interpolated| checked_cells(interpolated, shape));
        match fitted {
            Ok(interpolated) => {
                field.direction_grid = interpolated.direction;
                field.speed_grid = interpolated.speed;
                field.confidence_grid = interpolated.confidence;
                field.method = FieldMethod::SpatiallyInterpolated {
                    samples: samples.len(),
                };
            }
            Err(e) => {
                debug!(
                    instant_ms,
                    samples = samples.len(),
                    "Spatial regression failed, keeping uniform field: {}",
                    e
                );
                field.method = FieldMethod::UniformProjection {
                    reason: FallbackReason::FitFailed(e),
                };
            }
        }
        Some(field)
    }
}
