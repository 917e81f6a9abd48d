//! Multi-source wind fusion and spatiotemporal wind field estimation
//!
//! Turns independent, unreliable per-boat wind estimates into one
//! consolidated estimate per instant and an interpolated spatial grid of
//! direction, speed and confidence, while tracking how the wind drifts.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           WindFusionEngine                              │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │ Per-source observations  {source_id -> [Observation]}            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │ ReliabilityScorer                                                │   │
//! │  │  • skill level, vessel type adjustment                          │   │
//! │  │  • internal consistency (circular concentration, speed CV)      │   │
//! │  │  • drift-corrected agreement with fused history                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │ BayesianIntegrator                                               │   │
//! │  │  • simple tier: weighted circular mean (< 3 sources)            │   │
//! │  │  • Bayesian tier: prior blend + median-robust speed             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │  ┌──────────────────────────────┐  ┌───────────────────────────────┐   │
//! │  │ EstimationHistory (ring)     │─▶│ TemporalDriftModel            │   │
//! │  └──────────────────────────────┘  └───────────────────────────────┘   │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │ SpatialFieldEstimator                                            │   │
//! │  │  • uniform time-projected field                                 │   │
//! │  │  • Gaussian-process interpolation when ≥ 3 positioned samples   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine is single-threaded and synchronous. One engine belongs to one
//! race or session; callers sharing it across threads must serialise access.

pub mod circular;
pub mod drift;
pub mod engine;
pub mod error;
pub mod history;
pub mod integrator;
pub mod regression;
pub mod reliability;
pub mod spatial;
pub mod view;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub use windfield_common::{GeoPosition, WindPrior};

pub use drift::DriftModel;
pub use engine::{SourceReport, WindFusionEngine};
pub use error::{FitError, FusionError};
pub use history::EstimationHistory;
pub use integrator::{BayesianIntegrator, FusionTier, PriorBelief};
pub use regression::{
    GaussianProcessInterpolator, InterpolatedField, SpatialInterpolator, SpatialSample,
};
pub use reliability::ReliabilityScorer;
pub use spatial::{FallbackReason, FieldMethod, SpatialField, SpatialFieldEstimator};
pub use view::{FieldCell, SpatialFieldRecord, SpatiotemporalField};

use circular::normalize_direction;

// ─── Core data types ──────────────────────────────────────────────────────────

/// A single wind observation produced by a per-vehicle estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Source (boat) identifier
    pub source_id: String,
    /// Observation time (ms)
    pub timestamp_ms: u64,
    /// Direction the wind blows from (degrees, [0, 360))
    pub direction: f64,
    /// Wind speed (knots, ≥ 0)
    pub speed: f64,
    /// Where the observation was made, when known
    pub position: Option<GeoPosition>,
    /// Confidence reported by the per-vehicle estimator ([0, 1])
    pub raw_confidence: f64,
}

impl Observation {
    /// Creates a new observation without position
    pub fn new(
        source_id: impl Into<String>,
        timestamp_ms: u64,
        direction: f64,
        speed: f64,
        raw_confidence: f64,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            timestamp_ms,
            direction,
            speed,
            position: None,
            raw_confidence,
        }
    }

    /// Attaches a position
    pub fn with_position(mut self, lat: f64, lon: f64) -> Self {
        self.position = Some(GeoPosition::new(lat, lon));
        self
    }

    /// Returns a copy with direction normalised, speed clamped to ≥ 0 and
    /// confidence clamped to [0, 1]. A non-finite position is dropped.
    ///
    /// Returns `None` when direction, speed or confidence is not finite.
    pub fn sanitized(&self) -> Option<Self> {
        if !(self.direction.is_finite()
            && self.speed.is_finite()
            && self.raw_confidence.is_finite())
        {
            warn!(
                source = %self.source_id,
                timestamp_ms = self.timestamp_ms,
                "Discarding non-finite wind observation"
            );
            return None;
        }
        Some(Self {
            source_id: self.source_id.clone(),
            timestamp_ms: self.timestamp_ms,
            direction: normalize_direction(self.direction),
            speed: self.speed.max(0.0),
            position: self.position.filter(GeoPosition::is_finite),
            raw_confidence: self.raw_confidence.clamp(0.0, 1.0),
        })
    }
}

/// An observation together with the reliability of its source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredObservation {
    /// The underlying observation
    pub observation: Observation,
    /// Source reliability ([0, 1])
    pub reliability: f64,
    /// `raw_confidence * reliability` (≥ 0)
    pub weight: f64,
}

impl ScoredObservation {
    /// Scores an observation; reliability is clamped to [0, 1].
    pub fn new(observation: Observation, reliability: f64) -> Self {
        let reliability = reliability.clamp(0.0, 1.0);
        let weight = (observation.raw_confidence.clamp(0.0, 1.0) * reliability).max(0.0);
        Self {
            observation,
            reliability,
            weight,
        }
    }
}

/// Consolidated wind estimate for one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedEstimate {
    /// Instant the estimate describes (ms)
    pub timestamp_ms: u64,
    /// Fused direction (degrees, [0, 360))
    pub direction: f64,
    /// Fused speed (knots, ≥ 0)
    pub speed: f64,
    /// Overall confidence ([0, 1])
    pub confidence: f64,
    /// Direction spread (degrees)
    pub direction_std: f64,
    /// Speed spread (knots)
    pub speed_std: f64,
    /// Weighted centroid of contributing positioned sources
    pub position: Option<GeoPosition>,
    /// Number of sources that contributed
    pub source_count: usize,
}
