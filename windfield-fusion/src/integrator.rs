//! Bayesian integration of weighted observations
//!
//! Two tiers:
//!
//! - **Simple** (fewer than `min_sources_for_bayesian` sources): weighted
//!   circular mean of direction and weighted mean of speed.
//! - **Bayesian**: the observed sin/cos and robust speed are blended with a
//!   prior (previous posterior, caller prior, or the first observation):
//!
//! ```text
//! posterior = prior_weight * prior + (1 - prior_weight) * observed
//! ```
//!
//!   Direction is blended component-wise in sin/cos space. Speed uses a
//!   median-anchored robust mean so one faulty source cannot dominate.

use serde::{Deserialize, Serialize};
use tracing::debug;

use windfield_common::{elapsed_minutes, GeoPosition, WindPrior};

use crate::circular::{
    components, direction_from_components, median, weighted_circular_std, weighted_components,
    weighted_std,
};
use crate::drift::DriftModel;
use crate::{FusedEstimate, ScoredObservation};

/// Robust weights never drop below this factor.
const MIN_ROBUST_FACTOR: f64 = 0.1;

/// Direction std (degrees) that maps to full uncertainty.
const DIRECTION_UNCERTAINTY_SCALE: f64 = 90.0;

/// Fraction of the speed whose std maps to full uncertainty.
const SPEED_UNCERTAINTY_FRACTION: f64 = 0.5;

/// Which fusion tier produced an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FusionTier {
    /// Robust weighted average for few sources
    Simple,
    /// Prior-blended posterior
    Bayesian,
}

/// Prior belief about the wind at some instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorBelief {
    /// Direction (degrees)
    pub direction: f64,
    /// Speed (knots)
    pub speed: f64,
    /// Instant the belief refers to; `None` means timeless
    pub timestamp_ms: Option<u64>,
}

impl PriorBelief {
    /// Projects the belief to `instant_ms` with the drift model. Timeless
    /// beliefs are returned unchanged.
    pub fn projected(&self, drift: &DriftModel, instant_ms: u64) -> PriorBelief {
        match self.timestamp_ms {
            Some(t) => {
                let minutes = elapsed_minutes(t, instant_ms);
                PriorBelief {
                    direction: drift.project_direction(self.direction, minutes),
                    speed: drift.project_speed(self.speed, minutes),
                    timestamp_ms: Some(instant_ms),
                }
            }
            None => *self,
        }
    }
}

impl From<&FusedEstimate> for PriorBelief {
    fn from(estimate: &FusedEstimate) -> Self {
        Self {
            direction: estimate.direction,
            speed: estimate.speed,
            timestamp_ms: Some(estimate.timestamp_ms),
        }
    }
}

impl From<&WindPrior> for PriorBelief {
    fn from(prior: &WindPrior) -> Self {
        Self {
            direction: prior.direction_mean,
            speed: prior.speed_mean.max(0.0),
            timestamp_ms: None,
        }
    }
}

/// Normalised uncertainty of a direction std, in [0, 1].
pub fn direction_uncertainty(direction_std: f64) -> f64 {
    (direction_std / DIRECTION_UNCERTAINTY_SCALE).clamp(0.0, 1.0)
}

/// Normalised uncertainty of a speed std relative to the speed, in [0, 1].
pub fn speed_uncertainty(speed_std: f64, speed: f64) -> f64 {
    let scale = speed * SPEED_UNCERTAINTY_FRACTION;
    if scale <= f64::EPSILON {
        return if speed_std > f64::EPSILON { 1.0 } else { 0.0 };
    }
    (speed_std / scale).clamp(0.0, 1.0)
}

/// Weighted centroid of the observations that carry a position.
fn weighted_centroid(observations: &[ScoredObservation], weights: &[f64]) -> Option<GeoPosition> {
    let (mut lat, mut lon, mut total, mut count) = (0.0, 0.0, 0.0, 0usize);
    for (scored, &w) in observations.iter().zip(weights) {
        if let Some(p) = scored.observation.position {
            lat += w * p.lat;
            lon += w * p.lon;
            total += w;
            count += 1;
        }
    }
    if count == 0 {
        return None;
    }
    if total <= 0.0 {
        // Positioned sources all carry zero weight: plain centroid
        let positions: Vec<GeoPosition> = observations
            .iter()
            .filter_map(|s| s.observation.position)
            .collect();
        let n = positions.len() as f64;
        return Some(GeoPosition::new(
            positions.iter().map(|p| p.lat).sum::<f64>() / n,
            positions.iter().map(|p| p.lon).sum::<f64>() / n,
        ));
    }
    Some(GeoPosition::new(lat / total, lon / total))
}

/// Fuses scored observations into a single estimate.
#[derive(Debug, Clone)]
pub struct BayesianIntegrator {
    prior_weight: f64,
    min_sources_for_bayesian: usize,
}

impl Default for BayesianIntegrator {
    fn default() -> Self {
        Self::new(0.3, 3)
    }
}

impl BayesianIntegrator {
    /// Creates an integrator. `prior_weight` is clamped to [0, 1].
    pub fn new(prior_weight: f64, min_sources_for_bayesian: usize) -> Self {
        Self {
            prior_weight: prior_weight.clamp(0.0, 1.0),
            min_sources_for_bayesian: min_sources_for_bayesian.max(1),
        }
    }

    /// Tier that `source_count` observations would be fused with.
    pub fn tier_for(&self, source_count: usize) -> FusionTier {
        if source_count < self.min_sources_for_bayesian {
            FusionTier::Simple
        } else {
            FusionTier::Bayesian
        }
    }

    /// Fuses the observations for `instant_ms`.
    ///
    /// Returns `None` for an empty observation list. The prior is projected
    /// to `instant_ms` with the drift model before blending.
    pub fn fuse(
        &self,
        observations: &[ScoredObservation],
        prior: Option<&PriorBelief>,
        drift: &DriftModel,
        instant_ms: u64,
    ) -> Option<FusedEstimate> {
        if observations.is_empty() {
            return None;
        }

        let mut weights: Vec<f64> = observations.iter().map(|o| o.weight.max(0.0)).collect();
        if weights.iter().sum::<f64>() <= 0.0 {
            // Every source is untrusted; fall back to equal weights
            weights.iter_mut().for_each(|w| *w = 1.0);
        }

        let tier = self.tier_for(observations.len());
        let estimate = match tier {
            FusionTier::Simple => self.fuse_simple(observations, &weights, instant_ms),
            FusionTier::Bayesian => {
                let prior = prior.map(|p| p.projected(drift, instant_ms));
                self.fuse_bayesian(observations, &weights, prior.as_ref(), instant_ms)
            }
        };

        debug!(
            ?tier,
            sources = estimate.source_count,
            direction = estimate.direction,
            speed = estimate.speed,
            confidence = estimate.confidence,
            "Fused wind estimate"
        );
        Some(estimate)
    }

    fn fuse_simple(
        &self,
        observations: &[ScoredObservation],
        weights: &[f64],
        instant_ms: u64,
    ) -> FusedEstimate {
        let directions: Vec<f64> = observations.iter().map(|o| o.observation.direction).collect();
        let speeds: Vec<f64> = observations.iter().map(|o| o.observation.speed).collect();
        let total: f64 = weights.iter().sum();

        let (s, c) = weighted_components(&directions, weights).unwrap_or((0.0, 1.0));
        let direction = direction_from_components(s, c);
        let speed = (speeds.iter().zip(weights).map(|(v, w)| v * w).sum::<f64>() / total).max(0.0);

        let n = observations.len() as f64;
        let mean_weight = observations.iter().map(|o| o.weight).sum::<f64>() / n;
        let confidence = (0.4 + 0.1 * n + 0.4 * mean_weight).min(0.9).clamp(0.0, 1.0);

        FusedEstimate {
            timestamp_ms: instant_ms,
            direction,
            speed,
            confidence,
            direction_std: weighted_circular_std(&directions, weights, direction),
            speed_std: weighted_std(&speeds, weights, speed),
            position: weighted_centroid(observations, weights),
            source_count: observations.len(),
        }
    }

    fn fuse_bayesian(
        &self,
        observations: &[ScoredObservation],
        weights: &[f64],
        prior: Option<&PriorBelief>,
        instant_ms: u64,
    ) -> FusedEstimate {
        let directions: Vec<f64> = observations.iter().map(|o| o.observation.direction).collect();
        let speeds: Vec<f64> = observations.iter().map(|o| o.observation.speed).collect();

        let first = &observations[0].observation;
        let (prior_direction, prior_speed) = prior
            .map(|p| (p.direction, p.speed))
            .unwrap_or((first.direction, first.speed));
        let likelihood_weight = 1.0 - self.prior_weight;

        // Direction: blend in sin/cos space
        let (obs_sin, obs_cos) = weighted_components(&directions, weights).unwrap_or((0.0, 1.0));
        let (prior_sin, prior_cos) = components(prior_direction);
        let direction = direction_from_components(
            self.prior_weight * prior_sin + likelihood_weight * obs_sin,
            self.prior_weight * prior_cos + likelihood_weight * obs_cos,
        );

        // Speed: down-weight by distance from the median
        let robust_weights = robust_speed_weights(&speeds, weights);
        let robust_total: f64 = robust_weights.iter().sum();
        let observed_speed = if robust_total > 0.0 {
            speeds
                .iter()
                .zip(&robust_weights)
                .map(|(v, w)| v * w)
                .sum::<f64>()
                / robust_total
        } else {
            median(&speeds).unwrap_or(0.0)
        };
        let speed = (self.prior_weight * prior_speed + likelihood_weight * observed_speed).max(0.0);

        let direction_std = weighted_circular_std(&directions, weights, direction);
        let speed_std = weighted_std(&speeds, &robust_weights, speed);
        let dir_uncertainty = direction_uncertainty(direction_std);
        let spd_uncertainty = speed_uncertainty(speed_std, speed);

        let n = observations.len() as f64;
        let base = 0.5 + (0.05 * n).min(0.2);
        let confidence =
            (base * (1.0 - 0.6 * dir_uncertainty) * (1.0 - 0.4 * spd_uncertainty)).clamp(0.0, 1.0);

        FusedEstimate {
            timestamp_ms: instant_ms,
            direction,
            speed,
            confidence,
            direction_std,
            speed_std,
            position: weighted_centroid(observations, weights),
            source_count: observations.len(),
        }
    }
}

/// Source weights scaled down in proportion to each speed's distance from
/// the median, relative to the largest distance. Factors never fall below
/// [`MIN_ROBUST_FACTOR`].
pub fn robust_speed_weights(speeds: &[f64], weights: &[f64]) -> Vec<f64> {
    let Some(center) = median(speeds) else {
        return Vec::new();
    };
    let deviations: Vec<f64> = speeds.iter().map(|s| (s - center).abs()).collect();
    let max_deviation = deviations.iter().copied().fold(0.0, f64::max);

    deviations
        .iter()
        .zip(weights)
        .map(|(&dev, &w)| {
            let factor = if max_deviation > 0.0 {
                (1.0 - dev / max_deviation).max(MIN_ROBUST_FACTOR)
            } else {
                1.0
            };
            w * factor
        })
        .collect()
}
