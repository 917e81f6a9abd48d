//! Spatial and spatiotemporal field scenarios

use ndarray::Array2;

use integration_tests::{
    assert_direction_near, assert_unit_interval, fleet, init_test_logging, observation_set,
    positioned_fleet, SourceSpec, TestFleet, MINUTE_MS,
};
use windfield_fusion::{
    FallbackReason, FieldMethod, FitError, InterpolatedField, SpatialFieldRecord,
    SpatialInterpolator, SpatialSample,
};

/// Three boats sailing north together at about 0.55 km per minute.
fn moving_fleet(minutes: u64) -> TestFleet {
    let mut fleet = fleet(&["A", "B", "C"], 0.7);
    for minute in 0..minutes {
        let lat = 50.0 + 0.005 * minute as f64;
        let input = observation_set(
            minute * MINUTE_MS,
            &[
                SourceSpec::new("A", 90.0, 10.0, 0.8).at(lat, -1.0),
                SourceSpec::new("B", 92.0, 11.0, 0.8).at(lat + 0.001, -0.998),
                SourceSpec::new("C", 88.0, 9.0, 0.8).at(lat - 0.001, -1.002),
            ],
        );
        fleet.engine.fuse_wind_estimates(&input, None).unwrap();
    }
    fleet
}

#[test]
fn test_two_positioned_entries_give_uniform_field() {
    init_test_logging();
    let fleet = moving_fleet(2);

    let field = fleet.engine.estimate_spatial_field(MINUTE_MS, 5).unwrap();
    assert_eq!(
        field.method,
        FieldMethod::UniformProjection {
            reason: FallbackReason::InsufficientPositions {
                available: 2,
                required: 3
            }
        }
    );
    assert!(field.confidence_grid.iter().all(|c| *c <= 0.8));
    let first = field.direction_grid[[0, 0]];
    assert!(field.direction_grid.iter().all(|d| *d == first));
}

#[test]
fn test_moving_fleet_interpolated() {
    init_test_logging();
    let fleet = moving_fleet(6);

    let field = fleet.engine.estimate_spatial_field(5 * MINUTE_MS, 8).unwrap();
    assert_eq!(field.method, FieldMethod::SpatiallyInterpolated { samples: 6 });
    assert_eq!(field.shape(), (8, 8));

    for d in field.direction_grid.iter() {
        assert!((0.0..360.0).contains(d));
        assert_direction_near(*d, 90.0, 10.0);
    }
    assert!(field.speed_grid.iter().all(|s| *s >= 0.0));
    assert_unit_interval(field.confidence_grid.iter(), "confidence");
    assert!(field.confidence_grid.iter().all(|c| *c >= 0.1 && *c <= 0.8));

    // Grid covers the track with padding
    let bounds = field.bounds();
    assert!(bounds.min_lat < 50.0 && bounds.max_lat > 50.025);
}

#[test]
fn test_stationary_fleet_records_degenerate_fit() {
    init_test_logging();
    let mut fleet = fleet(&["NW", "SW", "NE", "SE"], 0.7);
    for minute in 0..3u64 {
        let input = observation_set(minute * MINUTE_MS, &positioned_fleet());
        fleet.engine.fuse_wind_estimates(&input, None).unwrap();
    }

    // Every fused estimate sits on the same centroid
    let field = fleet.engine.estimate_spatial_field(2 * MINUTE_MS, 4).unwrap();
    match &field.method {
        FieldMethod::UniformProjection {
            reason: FallbackReason::FitFailed(FitError::DegenerateGeometry { .. }),
        } => {}
        other => panic!("expected degenerate fallback, got {other:?}"),
    }
    let latest = fleet.engine.history().latest().unwrap();
    assert!(field.direction_grid.iter().all(|d| *d == latest.direction));
}

#[test]
fn test_repeated_requests_bit_identical() {
    init_test_logging();
    let fleet = moving_fleet(5);

    let first = fleet.engine.estimate_spatial_field(3 * MINUTE_MS, 6).unwrap();
    let second = fleet.engine.estimate_spatial_field(3 * MINUTE_MS, 6).unwrap();
    assert_eq!(first, second);
    assert_eq!(fleet.engine.history().len(), 5);
}

#[test]
fn test_spatiotemporal_field_and_export() {
    init_test_logging();
    let fleet = moving_fleet(4);

    let instants = [0, 2 * MINUTE_MS, 20 * MINUTE_MS, 120 * MINUTE_MS];
    let fields = fleet.engine.estimate_spatiotemporal_field(&instants, 3);
    assert_eq!(
        fields.instants().collect::<Vec<_>>(),
        vec![0, 2 * MINUTE_MS, 20 * MINUTE_MS]
    );

    let json = fields.to_json().unwrap();
    let records: Vec<SpatialFieldRecord> = serde_json::from_str(&json).unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.cells.len() == 9));
    assert!(records.windows(2).all(|w| w[0].timestamp_ms < w[1].timestamp_ms));
}

#[test]
fn test_field_requested_without_history() {
    let fleet = fleet(&["A"], 0.5);
    assert!(fleet.engine.estimate_spatial_field(0, 5).is_none());
    assert!(fleet
        .engine
        .estimate_spatiotemporal_field(&[0, MINUTE_MS], 5)
        .is_empty());
}

/// Interpolator that reports the mean sample speed everywhere.
#[derive(Debug)]
struct MeanSpeedInterpolator;

impl SpatialInterpolator for MeanSpeedInterpolator {
    fn interpolate(
        &self,
        samples: &[SpatialSample],
        lat_grid: &Array2<f64>,
        _lon_grid: &Array2<f64>,
    ) -> Result<InterpolatedField, FitError> {
        if samples.is_empty() {
            return Err(FitError::TooFewSamples {
                required: 1,
                available: 0,
            });
        }
        let mean = samples.iter().map(|s| s.speed).sum::<f64>() / samples.len() as f64;
        let shape = lat_grid.dim();
        Ok(InterpolatedField {
            direction: Array2::from_elem(shape, 45.0),
            speed: Array2::from_elem(shape, mean),
            confidence: Array2::from_elem(shape, 0.5),
        })
    }
}

#[test]
fn test_injected_interpolator_used() {
    init_test_logging();
    let TestFleet { engine, .. } = moving_fleet(3);
    let engine = engine.with_interpolator(Box::new(MeanSpeedInterpolator));

    let field = engine.estimate_spatial_field(2 * MINUTE_MS, 3).unwrap();
    assert_eq!(field.method, FieldMethod::SpatiallyInterpolated { samples: 3 });
    assert!(field.direction_grid.iter().all(|d| *d == 45.0));
    assert!(field.confidence_grid.iter().all(|c| *c == 0.5));
}
