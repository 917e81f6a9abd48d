//! Configuration structures for the wind fusion engine
//!
//! This module provides the static tables (skill levels, vessel types and
//! their performance characteristics) and the tunable constants consumed by
//! the fusion engine. Every field carries a serde default so that partial
//! YAML documents load.
//!
//! The relevance windows, prior weight and history sizes are tuning values,
//! not derived constants; the defaults reproduce the behaviour the engine was
//! calibrated with.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigValidationError {
    /// History capacity must hold at least one estimate
    #[error("History capacity must be at least 1")]
    ZeroHistoryCapacity,

    /// Drift window must contain at least one transition
    #[error("Drift window must be at least 2 entries, got {0}")]
    DriftWindowTooSmall(usize),

    /// A probability-like value is outside [0, 1]
    #[error("{field} must be within [0, 1], got {value}")]
    OutOfUnitRange {
        /// Name of the offending field
        field: String,
        /// Value that was supplied
        value: f64,
    },

    /// A strictly positive value is zero, negative or not finite
    #[error("{field} must be positive, got {value}")]
    NotPositive {
        /// Name of the offending field
        field: String,
        /// Value that was supplied
        value: f64,
    },

    /// Fallback grid bounds are empty or inverted
    #[error("Invalid fallback bounds: {0}")]
    InvalidBounds(String),

    /// A source refers to a vessel type with no characteristics entry
    #[error("Source {source_id} refers to unknown vessel type {vessel_type}")]
    UnknownVesselType {
        /// Source that carries the reference
        source_id: String,
        /// Missing type name
        vessel_type: String,
    },
}

/// Prior wind belief supplied by the caller (forecast, committee boat reading).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindPrior {
    /// Mean direction the wind blows from (degrees)
    pub direction_mean: f64,
    /// Direction standard deviation (degrees)
    pub direction_std: f64,
    /// Mean speed (knots)
    pub speed_mean: f64,
    /// Speed standard deviation (knots)
    pub speed_std: f64,
}

/// Performance characteristics of a vessel type, each in [0, 1] with 0.5
/// being an average boat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VesselCharacteristics {
    /// Upwind VMG efficiency
    pub upwind_efficiency: f64,
    /// Downwind VMG efficiency
    pub downwind_efficiency: f64,
    /// Ability to point high
    pub pointing_ability: f64,
}

impl VesselCharacteristics {
    /// Mean of the three characteristics.
    pub fn mean(&self) -> f64 {
        (self.upwind_efficiency + self.downwind_efficiency + self.pointing_ability) / 3.0
    }
}

/// Static profile of one observation source (boat).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceProfile {
    /// Crew skill level in [0, 1]
    #[serde(default)]
    pub skill_level: Option<f64>,
    /// Vessel type name, key into [`FusionConfig::vessel_types`]
    #[serde(default)]
    pub vessel_type: Option<String>,
}

/// Tuning for the per-source reliability score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliabilityConfig {
    /// Skill assumed for sources without a profile
    pub default_skill: f64,
    /// Minimum observations before consistency is measured
    pub min_consistency_samples: usize,
    /// Consistency used when too few observations exist
    pub default_consistency: f64,
    /// Agreement used when no fused history is close enough
    pub default_agreement: f64,
    /// Maximum age of fused estimates compared against (minutes)
    pub agreement_window_minutes: f64,
    /// Maximum number of fused estimates compared against
    pub agreement_entries: usize,
    /// Unexplained direction deviation that scores zero (degrees)
    pub direction_tolerance_deg: f64,
    /// Unexplained speed deviation that scores zero, as a fraction of speed
    pub speed_tolerance_fraction: f64,
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            default_skill: 0.5,
            min_consistency_samples: 3,
            default_consistency: 0.7,
            default_agreement: 0.8,
            agreement_window_minutes: 30.0,
            agreement_entries: 5,
            direction_tolerance_deg: 45.0,
            speed_tolerance_fraction: 0.3,
        }
    }
}

/// Lat/lon bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridBounds {
    /// Southern edge (degrees)
    pub min_lat: f64,
    /// Northern edge (degrees)
    pub max_lat: f64,
    /// Western edge (degrees)
    pub min_lon: f64,
    /// Eastern edge (degrees)
    pub max_lon: f64,
}

impl GridBounds {
    /// Creates a new bounding box
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    /// Returns true if the box has positive extent on both axes
    pub fn is_valid(&self) -> bool {
        [self.min_lat, self.max_lat, self.min_lon, self.max_lon]
            .iter()
            .all(|v| v.is_finite())
            && self.max_lat > self.min_lat
            && self.max_lon > self.min_lon
    }

    /// Grows the box by `fraction` of its span on every side. A zero span is
    /// padded by `min_pad` degrees instead.
    pub fn expanded(&self, fraction: f64, min_pad: f64) -> Self {
        let lat_pad = ((self.max_lat - self.min_lat) * fraction).max(min_pad);
        let lon_pad = ((self.max_lon - self.min_lon) * fraction).max(min_pad);
        Self {
            min_lat: self.min_lat - lat_pad,
            max_lat: self.max_lat + lat_pad,
            min_lon: self.min_lon - lon_pad,
            max_lon: self.max_lon + lon_pad,
        }
    }
}

impl Default for GridBounds {
    fn default() -> Self {
        // Roughly a 5.5 km square, the size of a typical race area
        Self::new(-0.025, 0.025, -0.025, 0.025)
    }
}

/// Tuning for the spatial field estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    /// History entries further than this from the requested instant are ignored (minutes)
    pub relevance_window_minutes: f64,
    /// Fraction of the positioned bounding box added on each side
    pub bounds_padding: f64,
    /// Padding used when all positions coincide (degrees)
    pub min_bounds_padding_deg: f64,
    /// Grid box used when no history entry carries a position
    pub fallback_bounds: GridBounds,
    /// Positioned samples needed before regression is attempted
    pub min_positioned_samples: usize,
    /// Spatial correlation length of the regression kernel (km)
    pub length_scale_km: f64,
    /// Observation-noise variance of the regression kernel (normalised units)
    pub noise_variance: f64,
    /// Samples spread over less than this are rejected as degenerate (km)
    pub min_sample_spread_km: f64,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            relevance_window_minutes: 30.0,
            bounds_padding: 0.1,
            min_bounds_padding_deg: 0.001,
            fallback_bounds: GridBounds::default(),
            min_positioned_samples: 3,
            length_scale_km: 1.0,
            noise_variance: 0.1,
            min_sample_spread_km: 0.01,
        }
    }
}

/// Top-level fusion engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Maximum number of fused estimates retained
    pub history_capacity: usize,
    /// Weight of the prior in the Bayesian blend
    pub prior_weight: f64,
    /// Sources needed for the Bayesian tier; fewer use the simple tier
    pub min_sources_for_bayesian: usize,
    /// Number of most recent history entries the drift model looks at
    pub drift_window: usize,
    /// Reliability scoring
    pub reliability: ReliabilityConfig,
    /// Spatial interpolation
    pub spatial: SpatialConfig,
    /// Prior used before the first fused estimate exists
    pub prior: Option<WindPrior>,
    /// Per-source static profile (`source_id` -> profile)
    pub sources: HashMap<String, SourceProfile>,
    /// Vessel type characteristics (`type_name` -> characteristics)
    pub vessel_types: HashMap<String, VesselCharacteristics>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            history_capacity: 100,
            prior_weight: 0.3,
            min_sources_for_bayesian: 3,
            drift_window: 10,
            reliability: ReliabilityConfig::default(),
            spatial: SpatialConfig::default(),
            prior: None,
            sources: HashMap::new(),
            vessel_types: HashMap::new(),
        }
    }
}

fn check_unit(field: &str, value: f64) -> Result<(), ConfigValidationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigValidationError::OutOfUnitRange {
            field: field.to_string(),
            value,
        })
    }
}

fn check_positive(field: &str, value: f64) -> Result<(), ConfigValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigValidationError::NotPositive {
            field: field.to_string(),
            value,
        })
    }
}

impl FusionConfig {
    /// Parses a fusion configuration from a YAML string.
    ///
    /// # Example
    /// ```
    /// use windfield_common::config::FusionConfig;
    ///
    /// let yaml = r#"
    /// history_capacity: 50
    /// sources:
    ///   GBR-7:
    ///     skill_level: 0.9
    ///     vessel_type: ilca7
    /// vessel_types:
    ///   ilca7:
    ///     upwind_efficiency: 0.6
    ///     downwind_efficiency: 0.5
    ///     pointing_ability: 0.55
    /// "#;
    ///
    /// let config = FusionConfig::from_yaml(yaml).unwrap();
    /// assert_eq!(config.history_capacity, 50);
    /// assert_eq!(config.prior_weight, 0.3);
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Loads a fusion configuration from a YAML file.
    ///
    /// # Returns
    /// * `Ok(FusionConfig)` - Successfully loaded configuration
    /// * `Err(Error)` - File I/O or YAML parsing error
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Serializes the configuration to a YAML string.
    pub fn to_yaml(&self) -> Result<String, Error> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Checks every value against its admissible range.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.history_capacity == 0 {
            return Err(ConfigValidationError::ZeroHistoryCapacity);
        }
        if self.drift_window < 2 {
            return Err(ConfigValidationError::DriftWindowTooSmall(self.drift_window));
        }
        check_unit("prior_weight", self.prior_weight)?;

        let reliability = &self.reliability;
        check_unit("reliability.default_skill", reliability.default_skill)?;
        check_unit(
            "reliability.default_consistency",
            reliability.default_consistency,
        )?;
        check_unit("reliability.default_agreement", reliability.default_agreement)?;
        check_positive(
            "reliability.agreement_window_minutes",
            reliability.agreement_window_minutes,
        )?;
        check_positive(
            "reliability.direction_tolerance_deg",
            reliability.direction_tolerance_deg,
        )?;
        check_positive(
            "reliability.speed_tolerance_fraction",
            reliability.speed_tolerance_fraction,
        )?;

        let spatial = &self.spatial;
        check_positive(
            "spatial.relevance_window_minutes",
            spatial.relevance_window_minutes,
        )?;
        check_positive("spatial.length_scale_km", spatial.length_scale_km)?;
        check_positive("spatial.noise_variance", spatial.noise_variance)?;
        if spatial.bounds_padding.is_nan() || spatial.bounds_padding < 0.0 {
            return Err(ConfigValidationError::NotPositive {
                field: "spatial.bounds_padding".to_string(),
                value: spatial.bounds_padding,
            });
        }
        if !spatial.fallback_bounds.is_valid() {
            return Err(ConfigValidationError::InvalidBounds(format!(
                "{:?}",
                spatial.fallback_bounds
            )));
        }

        for (source_id, profile) in &self.sources {
            if let Some(skill) = profile.skill_level {
                check_unit(&format!("sources.{source_id}.skill_level"), skill)?;
            }
            if let Some(vessel_type) = &profile.vessel_type {
                if !self.vessel_types.contains_key(vessel_type) {
                    return Err(ConfigValidationError::UnknownVesselType {
                        source_id: source_id.clone(),
                        vessel_type: vessel_type.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Skill level table (`source_id` -> skill) for sources with a configured skill.
    pub fn skill_levels(&self) -> HashMap<String, f64> {
        self.sources
            .iter()
            .filter_map(|(id, profile)| profile.skill_level.map(|skill| (id.clone(), skill)))
            .collect()
    }

    /// Vessel type table (`source_id` -> type name) for sources with a configured type.
    pub fn source_types(&self) -> HashMap<String, String> {
        self.sources
            .iter()
            .filter_map(|(id, profile)| {
                profile
                    .vessel_type
                    .as_ref()
                    .map(|vessel_type| (id.clone(), vessel_type.clone()))
            })
            .collect()
    }
}
