//! Per-source reliability scoring
//!
//! A source's reliability blends three signals:
//!
//! ```text
//! reliability = (0.4 * skill + 0.4 * consistency + 0.2 * agreement) * type_adjustment
//! ```
//!
//! - **skill** comes from the static profile table
//! - **consistency** measures how stable the source's own recent readings are
//! - **agreement** compares the latest reading with recent fused estimates
//!   after removing the drift the model expects, so a source tracking a real
//!   wind shift is not penalised for it

use std::collections::HashMap;

use tracing::trace;

use windfield_common::{elapsed_minutes, FusionConfig, ReliabilityConfig, VesselCharacteristics};

use crate::circular::{angular_difference, mean_and_std, mean_resultant_length};
use crate::drift::DriftModel;
use crate::history::EstimationHistory;
use crate::Observation;

const SKILL_WEIGHT: f64 = 0.4;
const CONSISTENCY_WEIGHT: f64 = 0.4;
const AGREEMENT_WEIGHT: f64 = 0.2;

/// Share of the consistency score given to direction stability.
const DIRECTION_CONSISTENCY_SHARE: f64 = 0.7;

/// Speed coefficient of variation above which the penalty doubles.
const SPEED_CV_KNEE: f64 = 0.5;

/// Share of the agreement score given to direction.
const DIRECTION_AGREEMENT_SHARE: f64 = 0.6;

/// Maximum deviation of the vessel type adjustment from neutral.
const TYPE_ADJUSTMENT_RANGE: f64 = 0.1;

/// Scores how far each source's observations can be trusted.
#[derive(Debug, Clone, Default)]
pub struct ReliabilityScorer {
    /// `source_id` -> crew skill level
    skill_levels: HashMap<String, f64>,
    /// `source_id` -> vessel type name
    source_types: HashMap<String, String>,
    /// vessel type name -> characteristics
    vessel_types: HashMap<String, VesselCharacteristics>,
    config: ReliabilityConfig,
}

impl ReliabilityScorer {
    /// Creates a scorer with empty static tables
    pub fn new(config: ReliabilityConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Creates a scorer from the static tables of a fusion configuration
    pub fn from_config(config: &FusionConfig) -> Self {
        Self {
            skill_levels: config.skill_levels(),
            source_types: config.source_types(),
            vessel_types: config.vessel_types.clone(),
            config: config.reliability.clone(),
        }
    }

    /// Sets the skill level of a source
    pub fn set_skill_level(&mut self, source_id: impl Into<String>, skill: f64) {
        self.skill_levels.insert(source_id.into(), skill);
    }

    /// Sets the vessel type of a source
    pub fn set_source_type(&mut self, source_id: impl Into<String>, vessel_type: impl Into<String>) {
        self.source_types.insert(source_id.into(), vessel_type.into());
    }

    /// Registers the characteristics of a vessel type
    pub fn set_vessel_characteristics(
        &mut self,
        vessel_type: impl Into<String>,
        characteristics: VesselCharacteristics,
    ) {
        self.vessel_types.insert(vessel_type.into(), characteristics);
    }

    /// Reliability of `source_id` in [0, 1], given its recent observations.
    ///
    /// Missing inputs fall back to the configured defaults; scoring never
    /// fails.
    pub fn score(
        &self,
        source_id: &str,
        observations: &[Observation],
        history: &EstimationHistory,
        drift: &DriftModel,
    ) -> f64 {
        let skill = self.base_reliability(source_id);
        let consistency = self.consistency(observations);
        let agreement = self.historical_agreement(observations, history, drift);
        let adjustment = self.type_adjustment(source_id);

        let reliability = ((SKILL_WEIGHT * skill
            + CONSISTENCY_WEIGHT * consistency
            + AGREEMENT_WEIGHT * agreement)
            * adjustment)
            .clamp(0.0, 1.0);

        trace!(
            source = source_id,
            skill,
            consistency,
            agreement,
            adjustment,
            reliability,
            "Scored source reliability"
        );
        reliability
    }

    /// Configured skill of the source, or the default skill.
    pub fn base_reliability(&self, source_id: &str) -> f64 {
        self.skill_levels
            .get(source_id)
            .copied()
            .filter(|s| s.is_finite())
            .unwrap_or(self.config.default_skill)
            .clamp(0.0, 1.0)
    }

    /// Stability of the source's own readings, in [0, 1].
    pub fn consistency(&self, observations: &[Observation]) -> f64 {
        if observations.len() < self.config.min_consistency_samples.max(1) {
            return self.config.default_consistency;
        }

        let directions: Vec<f64> = observations.iter().map(|o| o.direction).collect();
        let direction_consistency = mean_resultant_length(&directions);

        let speeds: Vec<f64> = observations.iter().map(|o| o.speed).collect();
        let speed_consistency = match mean_and_std(&speeds) {
            Some((mean, std)) if mean > f64::EPSILON => {
                let cv = std / mean;
                (1.0 - cv - (cv - SPEED_CV_KNEE).max(0.0)).max(0.0)
            }
            // Becalmed: nothing to compare against
            _ => 1.0,
        };

        (DIRECTION_CONSISTENCY_SHARE * direction_consistency
            + (1.0 - DIRECTION_CONSISTENCY_SHARE) * speed_consistency)
            .clamp(0.0, 1.0)
    }

    /// Agreement of the latest observation with recent fused estimates after
    /// subtracting the drift expected over the elapsed time, in [0, 1].
    pub fn historical_agreement(
        &self,
        observations: &[Observation],
        history: &EstimationHistory,
        drift: &DriftModel,
    ) -> f64 {
        let Some(latest) = observations.iter().max_by_key(|o| o.timestamp_ms) else {
            return self.config.default_agreement;
        };

        let window_ms = (self.config.agreement_window_minutes * 60_000.0).max(0.0) as u64;
        let scores: Vec<f64> = history
            .iter()
            .rev()
            .filter(|e| e.timestamp_ms.abs_diff(latest.timestamp_ms) <= window_ms)
            .take(self.config.agreement_entries)
            .map(|entry| {
                let minutes = elapsed_minutes(entry.timestamp_ms, latest.timestamp_ms);
                let expected_direction = drift.project_direction(entry.direction, minutes);
                let expected_speed = drift.project_speed(entry.speed, minutes);

                let direction_deviation =
                    angular_difference(latest.direction, expected_direction).abs();
                let direction_score =
                    (1.0 - direction_deviation / self.config.direction_tolerance_deg).max(0.0);

                let speed_tolerance =
                    (expected_speed * self.config.speed_tolerance_fraction).max(f64::EPSILON);
                let speed_score =
                    (1.0 - (latest.speed - expected_speed).abs() / speed_tolerance).max(0.0);

                DIRECTION_AGREEMENT_SHARE * direction_score
                    + (1.0 - DIRECTION_AGREEMENT_SHARE) * speed_score
            })
            .collect();

        if scores.is_empty() {
            return self.config.default_agreement;
        }
        (scores.iter().sum::<f64>() / scores.len() as f64).clamp(0.0, 1.0)
    }

    /// Multiplier derived from the source's vessel type; 1.0 when unknown.
    pub fn type_adjustment(&self, source_id: &str) -> f64 {
        self.source_types
            .get(source_id)
            .and_then(|vessel_type| self.vessel_types.get(vessel_type))
            .map(|c| {
                let centred = (c.mean() - 0.5) * 2.0 * TYPE_ADJUSTMENT_RANGE;
                1.0 + centred.clamp(-TYPE_ADJUSTMENT_RANGE, TYPE_ADJUSTMENT_RANGE)
            })
            .filter(|a| a.is_finite())
            .unwrap_or(1.0)
    }
}
