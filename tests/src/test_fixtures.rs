//! Test fixtures and configuration helpers
//!
//! Builders for per-source observation maps and engines with a known fleet.

use std::collections::HashMap;

use windfield_common::{FusionConfig, SourceProfile, VesselCharacteristics};
use windfield_fusion::{Observation, WindFusionEngine};

/// One source's reading for a scenario
#[derive(Debug, Clone)]
pub struct SourceSpec {
    /// Source identifier
    pub id: &'static str,
    /// Direction (degrees)
    pub direction: f64,
    /// Speed (knots)
    pub speed: f64,
    /// Reported confidence
    pub confidence: f64,
    /// Optional (lat, lon)
    pub position: Option<(f64, f64)>,
}

impl SourceSpec {
    /// Unpositioned reading
    pub fn new(id: &'static str, direction: f64, speed: f64, confidence: f64) -> Self {
        Self {
            id,
            direction,
            speed,
            confidence,
            position: None,
        }
    }

    /// Attaches a position
    pub fn at(mut self, lat: f64, lon: f64) -> Self {
        self.position = Some((lat, lon));
        self
    }

    fn observation(&self, timestamp_ms: u64) -> Observation {
        let obs = Observation::new(
            self.id,
            timestamp_ms,
            self.direction,
            self.speed,
            self.confidence,
        );
        match self.position {
            Some((lat, lon)) => obs.with_position(lat, lon),
            None => obs,
        }
    }
}

/// Builds the `{source_id -> [observation]}` map for one instant.
pub fn observation_set(
    timestamp_ms: u64,
    specs: &[SourceSpec],
) -> HashMap<String, Vec<Observation>> {
    let mut map: HashMap<String, Vec<Observation>> = HashMap::new();
    for spec in specs {
        map.entry(spec.id.to_string())
            .or_default()
            .push(spec.observation(timestamp_ms));
    }
    map
}

/// Engine plus the identifiers of its configured sources
pub struct TestFleet {
    /// Engine under test
    pub engine: WindFusionEngine,
    /// Configured source identifiers
    pub ids: Vec<&'static str>,
}

/// Configuration for a fleet of `ids`, all with the same skill.
pub fn fleet_config(ids: &[&'static str], skill: f64) -> FusionConfig {
    let mut config = FusionConfig::default();
    config.vessel_types.insert(
        "one-design".to_string(),
        VesselCharacteristics {
            upwind_efficiency: 0.5,
            downwind_efficiency: 0.5,
            pointing_ability: 0.5,
        },
    );
    for id in ids {
        config.sources.insert(
            id.to_string(),
            SourceProfile {
                skill_level: Some(skill),
                vessel_type: Some("one-design".to_string()),
            },
        );
    }
    config
}

/// Engine for a fleet of `ids`, all with the same skill and a neutral vessel type.
pub fn fleet(ids: &[&'static str], skill: f64) -> TestFleet {
    let config = fleet_config(ids, skill);
    TestFleet {
        engine: WindFusionEngine::new(config).expect("fleet config is valid"),
        ids: ids.to_vec(),
    }
}

/// Four boats holding station on the corners of a roughly 1.1 km square near
/// (50.0, -1.0), all reporting the same wind.
pub fn positioned_fleet() -> Vec<SourceSpec> {
    vec![
        SourceSpec::new("NW", 355.0, 12.0, 0.9).at(50.01, -1.0),
        SourceSpec::new("SW", 355.0, 12.0, 0.9).at(50.0, -1.0),
        SourceSpec::new("NE", 355.0, 12.0, 0.9).at(50.01, -0.985),
        SourceSpec::new("SE", 355.0, 12.0, 0.9).at(50.0, -0.985),
    ]
}
