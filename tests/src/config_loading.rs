//! Engine construction from YAML configuration

use windfield_common::{ConfigValidationError, FusionConfig};
use windfield_fusion::{FusionError, WindFusionEngine};

use integration_tests::{init_test_logging, observation_set, SourceSpec};

const RACE_CONFIG: &str = r#"
history_capacity: 50
prior_weight: 0.3
prior:
  direction_mean: 225.0
  direction_std: 15.0
  speed_mean: 14.0
  speed_std: 3.0
reliability:
  default_skill: 0.4
spatial:
  relevance_window_minutes: 20.0
  length_scale_km: 1.5
sources:
  GBR-7:
    skill_level: 0.9
    vessel_type: nacra17
  FRA-2:
    skill_level: 0.6
    vessel_type: nacra17
  ITA-5: {}
vessel_types:
  nacra17:
    upwind_efficiency: 0.8
    downwind_efficiency: 0.9
    pointing_ability: 0.7
"#;

#[test]
fn test_engine_from_yaml() {
    init_test_logging();
    let config = FusionConfig::from_yaml(RACE_CONFIG).unwrap();
    assert_eq!(config.history_capacity, 50);
    assert_eq!(config.reliability.agreement_entries, 5);
    assert_eq!(config.spatial.min_positioned_samples, 3);

    let mut engine = WindFusionEngine::new(config).unwrap();
    assert_eq!(engine.history().capacity(), 50);

    let input = observation_set(
        0,
        &[
            SourceSpec::new("GBR-7", 220.0, 13.0, 0.9),
            SourceSpec::new("FRA-2", 230.0, 14.0, 0.9),
            SourceSpec::new("ITA-5", 225.0, 15.0, 0.9),
        ],
    );
    let fused = engine.fuse_wind_estimates(&input, Some(0)).unwrap();
    assert!((215.0..=235.0).contains(&fused.direction), "direction {}", fused.direction);

    // Skilled crew on a fast boat is trusted most
    let reports = engine.last_source_reports();
    let reliability = |id: &str| {
        reports
            .iter()
            .find(|r| r.source_id == id)
            .map(|r| r.reliability)
            .unwrap()
    };
    assert!(reliability("GBR-7") > reliability("FRA-2"));
    assert!(reliability("FRA-2") > reliability("ITA-5"));
}

#[test]
fn test_config_file_round_trip() {
    let config = FusionConfig::from_yaml(RACE_CONFIG).unwrap();
    let path = std::env::temp_dir().join(format!("windfield-config-{}.yaml", std::process::id()));
    std::fs::write(&path, config.to_yaml().unwrap()).unwrap();

    let loaded = FusionConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(loaded, config);
}

#[test]
fn test_invalid_yaml_config_rejected_by_engine() {
    let yaml = r#"
sources:
  USA-1:
    vessel_type: moth
"#;
    let config = FusionConfig::from_yaml(yaml).unwrap();
    match WindFusionEngine::new(config) {
        Err(FusionError::InvalidConfig(ConfigValidationError::UnknownVesselType {
            source_id,
            vessel_type,
        })) => {
            assert_eq!(source_id, "USA-1");
            assert_eq!(vessel_type, "moth");
        }
        other => panic!("expected unknown vessel type, got {other:?}"),
    }
}

#[test]
fn test_missing_config_file() {
    assert!(FusionConfig::from_file("/nonexistent/windfield.yaml").is_err());
}
