//! Multi-source fusion scenarios
//!
//! These tests drive the engine through `fuse_wind_estimates` and check the
//! consolidated estimate, the history it leaves behind and the drift model
//! learned from it.

use integration_tests::{
    assert_direction_near, assert_unit_interval, fleet, init_test_logging, observation_set,
    SourceSpec, MINUTE_MS,
};
use windfield_fusion::{BayesianIntegrator, FusionTier, Observation};

#[test]
fn test_three_boats_agree() {
    init_test_logging();
    let mut fleet = fleet(&["A", "B", "C"], 0.8);

    let input = observation_set(
        0,
        &[
            SourceSpec::new("A", 90.0, 10.0, 0.8),
            SourceSpec::new("B", 95.0, 11.0, 0.8),
            SourceSpec::new("C", 88.0, 9.0, 0.8),
        ],
    );
    let fused = fleet.engine.fuse_wind_estimates(&input, Some(0)).unwrap();

    assert!((85.0..=95.0).contains(&fused.direction), "direction {}", fused.direction);
    assert!((9.0..=11.0).contains(&fused.speed), "speed {}", fused.speed);
    assert!(fused.confidence > 0.5, "confidence {}", fused.confidence);
    assert_eq!(fused.source_count, 3);
    assert_eq!(fleet.engine.history().len(), 1);
}

#[test]
fn test_directions_straddling_north() {
    init_test_logging();
    let mut fleet = fleet(&["A", "B", "C"], 0.5);

    let input = observation_set(
        0,
        &[
            SourceSpec::new("A", 350.0, 10.0, 0.8),
            SourceSpec::new("B", 10.0, 10.0, 0.8),
            SourceSpec::new("C", 0.0, 10.0, 0.8),
        ],
    );
    let fused = fleet.engine.fuse_wind_estimates(&input, Some(0)).unwrap();

    // A linear mean would land near 120
    assert_direction_near(fused.direction, 0.0, 5.0);
    assert!((0.0..360.0).contains(&fused.direction));
}

#[test]
fn test_outlier_speed_damped() {
    init_test_logging();
    let ids = ["A", "B", "C", "D", "E"];
    let mut fleet = fleet(&ids, 0.5);

    let speeds = [10.0, 10.0, 10.0, 10.0, 100.0];
    let specs: Vec<SourceSpec> = ids
        .iter()
        .zip(speeds)
        .map(|(&id, speed)| SourceSpec::new(id, 200.0, speed, 0.8))
        .collect();
    let fused = fleet
        .engine
        .fuse_wind_estimates(&observation_set(0, &specs), Some(0))
        .unwrap();

    // The naive mean is 28
    assert!(fused.speed < 15.0, "speed {}", fused.speed);
    assert!(fused.speed >= 10.0);
}

#[test]
fn test_zero_and_360_are_the_same_wind() {
    init_test_logging();
    let run = |first: f64| {
        let mut fleet = fleet(&["A", "B", "C"], 0.6);
        let input = observation_set(
            0,
            &[
                SourceSpec::new("A", first, 10.0, 0.8),
                SourceSpec::new("B", 20.0, 11.0, 0.8),
                SourceSpec::new("C", 40.0, 12.0, 0.8),
            ],
        );
        fleet.engine.fuse_wind_estimates(&input, Some(0)).unwrap()
    };

    let from_zero = run(0.0);
    let from_360 = run(360.0);
    assert_eq!(from_zero.direction, from_360.direction);
    assert_eq!(from_zero.speed, from_360.speed);
    assert_eq!(from_zero.confidence, from_360.confidence);
}

#[test]
fn test_tier_depends_on_source_count() {
    let fleet = fleet(&["A"], 0.5);
    let config = fleet.engine.config();
    let integrator = BayesianIntegrator::new(config.prior_weight, config.min_sources_for_bayesian);
    assert_eq!(integrator.tier_for(2), FusionTier::Simple);
    assert_eq!(integrator.tier_for(3), FusionTier::Bayesian);
}

#[test]
fn test_history_pinned_at_capacity() {
    init_test_logging();
    let mut fleet = fleet(&["A", "B"], 0.7);

    for minute in 0..250u64 {
        let input = observation_set(
            minute * MINUTE_MS,
            &[
                SourceSpec::new("A", 180.0, 10.0, 0.8),
                SourceSpec::new("B", 182.0, 10.5, 0.8),
            ],
        );
        fleet.engine.fuse_wind_estimates(&input, None).unwrap();
        assert!(fleet.engine.history().len() <= 100);
    }

    let history = fleet.engine.history();
    assert_eq!(history.len(), 100);
    assert_eq!(history.get(0).unwrap().timestamp_ms, 150 * MINUTE_MS);
    assert_eq!(history.latest().unwrap().timestamp_ms, 249 * MINUTE_MS);
}

#[test]
fn test_steady_veer_learned_by_drift_model() {
    init_test_logging();
    let mut fleet = fleet(&["A", "B", "C"], 0.8);

    // Wind veers 1 deg per minute
    for minute in 0..12u64 {
        let base = 100.0 + minute as f64;
        let input = observation_set(
            minute * MINUTE_MS,
            &[
                SourceSpec::new("A", base, 12.0, 0.8),
                SourceSpec::new("B", base + 1.0, 12.0, 0.8),
                SourceSpec::new("C", base - 1.0, 12.0, 0.8),
            ],
        );
        fleet.engine.fuse_wind_estimates(&input, None).unwrap();
    }

    let drift = *fleet.engine.drift();
    assert!(
        (drift.direction_rate - 1.0).abs() < 0.3,
        "direction rate {}",
        drift.direction_rate
    );
    assert!(drift.speed_rate.abs() < 1e-6);

    let latest = fleet.engine.history().latest().unwrap().clone();
    let projected = fleet.engine.project_estimate(21 * MINUTE_MS).unwrap();
    assert_direction_near(
        projected.direction,
        latest.direction + 10.0 * drift.direction_rate,
        1e-6,
    );
    assert!(projected.direction_std >= latest.direction_std);
    assert!(projected.confidence <= latest.confidence);
}

#[test]
fn test_erratic_source_scored_lower() {
    init_test_logging();
    let mut fleet = fleet(&["STEADY", "ERRATIC", "OTHER"], 0.6);

    let steady = [(90.0, 10.0), (91.0, 10.2), (89.0, 9.9), (90.0, 10.0)];
    let erratic = [(40.0, 5.0), (140.0, 15.0), (70.0, 8.0), (120.0, 13.0)];
    let mut input = std::collections::HashMap::new();
    for (id, readings) in [("STEADY", steady), ("ERRATIC", erratic), ("OTHER", steady)] {
        let observations: Vec<Observation> = readings
            .iter()
            .enumerate()
            .map(|(i, (d, s))| Observation::new(id, i as u64 * MINUTE_MS, *d, *s, 0.8))
            .collect();
        input.insert(id.to_string(), observations);
    }

    fleet.engine.fuse_wind_estimates(&input, None).unwrap();
    let reports = fleet.engine.last_source_reports();
    let reliability = |id: &str| {
        reports
            .iter()
            .find(|r| r.source_id == id)
            .map(|r| r.reliability)
            .unwrap()
    };
    assert!(reliability("STEADY") > reliability("ERRATIC"));
    assert_unit_interval(reports.iter().map(|r| &r.reliability), "reliability");
    assert!(reports.iter().all(|r| r.observation_count == 4));
}

#[test]
fn test_outputs_stay_in_range_over_a_session() {
    init_test_logging();
    let ids = ["A", "B", "C", "D"];
    let mut fleet = fleet(&ids, 0.5);

    // Deterministic pseudo-random readings
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state % 10_000) as f64 / 10_000.0
    };

    for minute in 0..40u64 {
        let specs: Vec<SourceSpec> = ids
            .iter()
            .map(|&id| {
                let direction = next() * 720.0 - 180.0;
                let speed = next() * 30.0 - 2.0;
                let confidence = next() * 1.4 - 0.2;
                SourceSpec::new(id, direction, speed, confidence)
            })
            .collect();
        let Some(fused) = fleet
            .engine
            .fuse_wind_estimates(&observation_set(minute * MINUTE_MS, &specs), None)
        else {
            continue;
        };
        assert!((0.0..360.0).contains(&fused.direction), "direction {}", fused.direction);
        assert!(fused.speed >= 0.0);
        assert!(fused.direction_std >= 0.0 && fused.speed_std >= 0.0);
        assert_unit_interval([fused.confidence].iter(), "confidence");
        assert_unit_interval(
            fleet.engine.last_source_reports().iter().map(|r| &r.reliability),
            "reliability",
        );
    }
    assert_eq!(fleet.engine.history().len(), 40);
}

#[test]
fn test_no_usable_observations() {
    let mut fleet = fleet(&["A"], 0.5);
    let input = observation_set(0, &[SourceSpec::new("A", f64::NAN, 10.0, 0.8)]);
    assert!(fleet.engine.fuse_wind_estimates(&input, None).is_none());
    assert!(fleet.engine.history().is_empty());
    assert!(fleet.ids.contains(&"A"));
}
