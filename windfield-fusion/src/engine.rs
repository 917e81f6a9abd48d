//! Wind fusion engine
//!
//! Owns the history, drift model and static reliability tables of one
//! session, and exposes the fusion and field-estimation entry points.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use windfield_common::{elapsed_minutes, FusionConfig};

use crate::drift::DriftModel;
use crate::error::FusionError;
use crate::history::EstimationHistory;
use crate::integrator::{
    direction_uncertainty, speed_uncertainty, BayesianIntegrator, PriorBelief,
};
use crate::regression::{GaussianProcessInterpolator, SpatialInterpolator};
use crate::reliability::ReliabilityScorer;
use crate::spatial::{SpatialField, SpatialFieldEstimator};
use crate::view::SpatiotemporalField;
use crate::{FusedEstimate, Observation, ScoredObservation};

/// Confidence multiplier never drops below this when projecting.
const MIN_PROJECTION_FACTOR: f64 = 0.2;

/// Per-source diagnostics from the latest fusion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReport {
    /// Source identifier
    pub source_id: String,
    /// Reliability score ([0, 1])
    pub reliability: f64,
    /// Weight the representative observation carried into fusion
    pub weight: f64,
    /// Usable observations supplied for the source
    pub observation_count: usize,
    /// Timestamp of the observation used for fusion (ms)
    pub representative_timestamp_ms: u64,
}

/// Multi-source wind fusion engine for one session.
#[derive(Debug)]
pub struct WindFusionEngine {
    config: FusionConfig,
    scorer: ReliabilityScorer,
    integrator: BayesianIntegrator,
    history: EstimationHistory,
    drift: DriftModel,
    spatial: SpatialFieldEstimator,
    interpolator: Box<dyn SpatialInterpolator>,
    last_reports: Vec<SourceReport>,
}

impl WindFusionEngine {
    /// Creates an engine after validating `config`.
    pub fn new(config: FusionConfig) -> Result<Self, FusionError> {
        config.validate()?;
        Ok(Self::assemble(config))
    }

    fn assemble(config: FusionConfig) -> Self {
        Self {
            scorer: ReliabilityScorer::from_config(&config),
            integrator: BayesianIntegrator::new(
                config.prior_weight,
                config.min_sources_for_bayesian,
            ),
            history: EstimationHistory::new(config.history_capacity),
            drift: DriftModel::default(),
            spatial: SpatialFieldEstimator::new(config.spatial.clone()),
            interpolator: Box::new(GaussianProcessInterpolator::from_config(&config.spatial)),
            last_reports: Vec::new(),
            config,
        }
    }

    /// Replaces the spatial interpolator.
    pub fn with_interpolator(mut self, interpolator: Box<dyn SpatialInterpolator>) -> Self {
        self.interpolator = interpolator;
        self
    }

    /// Engine configuration
    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Fused estimates so far, oldest-first
    pub fn history(&self) -> &EstimationHistory {
        &self.history
    }

    /// Current drift model
    pub fn drift(&self) -> &DriftModel {
        &self.drift
    }

    /// Reliability scorer, for updating static tables at runtime
    pub fn scorer_mut(&mut self) -> &mut ReliabilityScorer {
        &mut self.scorer
    }

    /// Per-source diagnostics from the latest successful fusion call
    pub fn last_source_reports(&self) -> &[SourceReport] {
        &self.last_reports
    }

    /// Drops history, drift and diagnostics. Static tables are kept.
    pub fn reset(&mut self) {
        self.history.clear();
        self.drift = DriftModel::default();
        self.last_reports.clear();
    }

    /// Fuses the latest per-source observations into one estimate.
    ///
    /// `instant_ms` defaults to the newest observation timestamp. Each source
    /// contributes the observation closest to the instant and is scored on
    /// all of its usable observations. On success the estimate is appended
    /// to the history and the drift model is refreshed.
    ///
    /// Returns `None` when no source supplies a usable observation.
    pub fn fuse_wind_estimates(
        &mut self,
        sources: &HashMap<String, Vec<Observation>>,
        instant_ms: Option<u64>,
    ) -> Option<FusedEstimate> {
        // Sorted for a deterministic default prior
        let mut entries: Vec<(&String, &Vec<Observation>)> = sources.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let cleaned: Vec<(&String, Vec<Observation>)> = entries
            .into_iter()
            .filter_map(|(id, raw)| {
                let observations: Vec<Observation> =
                    raw.iter().filter_map(Observation::sanitized).collect();
                (!observations.is_empty()).then_some((id, observations))
            })
            .collect();

        let instant_ms = instant_ms.or_else(|| {
            cleaned
                .iter()
                .flat_map(|(_, obs)| obs.iter().map(|o| o.timestamp_ms))
                .max()
        })?;

        let mut scored = Vec::with_capacity(cleaned.len());
        let mut reports = Vec::with_capacity(cleaned.len());
        for (source_id, observations) in &cleaned {
            let reliability = self
                .scorer
                .score(source_id, observations, &self.history, &self.drift);
            let Some(representative) = observations
                .iter()
                .min_by_key(|o| o.timestamp_ms.abs_diff(instant_ms))
            else {
                continue;
            };
            let scored_obs = ScoredObservation::new(representative.clone(), reliability);
            reports.push(SourceReport {
                source_id: (*source_id).clone(),
                reliability: scored_obs.reliability,
                weight: scored_obs.weight,
                observation_count: observations.len(),
                representative_timestamp_ms: representative.timestamp_ms,
            });
            scored.push(scored_obs);
        }

        let prior: Option<PriorBelief> = self
            .history
            .latest()
            .map(PriorBelief::from)
            .or_else(|| self.config.prior.as_ref().map(PriorBelief::from));

        let estimate = self
            .integrator
            .fuse(&scored, prior.as_ref(), &self.drift, instant_ms)?;

        self.history.push(estimate.clone());
        self.drift = self.drift.update(&self.history, self.config.drift_window);
        self.last_reports = reports;

        info!(
            instant_ms,
            direction = estimate.direction,
            speed = estimate.speed,
            confidence = estimate.confidence,
            sources = estimate.source_count,
            history_len = self.history.len(),
            "Appended fused estimate"
        );
        Some(estimate)
    }

    /// Projects the most recent fused estimate to `instant_ms`.
    ///
    /// Spreads grow by `|Δt| × rate_std` and confidence drops accordingly.
    /// Returns `None` before the first successful fusion.
    pub fn project_estimate(&self, instant_ms: u64) -> Option<FusedEstimate> {
        let latest = self.history.latest()?;
        let minutes = elapsed_minutes(latest.timestamp_ms, instant_ms);
        let speed = self.drift.project_speed(latest.speed, minutes);
        let (direction_drift_std, speed_drift_std) = self.drift.projection_std(minutes);

        let factor = (1.0
            - 0.4 * direction_uncertainty(direction_drift_std)
            - 0.4 * speed_uncertainty(speed_drift_std, speed))
        .max(MIN_PROJECTION_FACTOR);

        Some(FusedEstimate {
            timestamp_ms: instant_ms,
            direction: self.drift.project_direction(latest.direction, minutes),
            speed,
            confidence: (latest.confidence * factor).clamp(0.0, 1.0),
            direction_std: latest.direction_std.hypot(direction_drift_std),
            speed_std: latest.speed_std.hypot(speed_drift_std),
            position: latest.position,
            source_count: latest.source_count,
        })
    }

    /// Estimates the wind field at `instant_ms` on a square grid.
    ///
    /// Does not modify the engine, so repeated calls with unchanged history
    /// return identical fields.
    pub fn estimate_spatial_field(
        &self,
        instant_ms: u64,
        grid_resolution: usize,
    ) -> Option<SpatialField> {
        let field = self.spatial.estimate(
            instant_ms,
            grid_resolution,
            &self.history,
            &self.drift,
            self.interpolator.as_ref(),
        )?;
        debug!(
            instant_ms,
            grid_resolution,
            method = field.method.label(),
            "Estimated spatial field"
        );
        Some(field)
    }

    /// Estimates a field for every instant; instants without data are left out.
    pub fn estimate_spatiotemporal_field(
        &self,
        instants_ms: &[u64],
        grid_resolution: usize,
    ) -> SpatiotemporalField {
        instants_ms
            .iter()
            .filter_map(|&t| self.estimate_spatial_field(t, grid_resolution))
            .collect()
    }
}

impl Default for WindFusionEngine {
    fn default() -> Self {
        Self::assemble(FusionConfig::default())
    }
}
