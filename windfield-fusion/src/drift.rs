//! Temporal drift model
//!
//! Median rate of change of direction and speed over the most recent fused
//! estimates, used to project an estimate to another instant. The median
//! keeps one abrupt transition from dominating the rate.

use serde::{Deserialize, Serialize};

use windfield_common::elapsed_minutes;

use crate::circular::{angular_difference, mean_and_std, median, normalize_direction};
use crate::history::EstimationHistory;

/// Minimum number of usable transitions before the model is refreshed.
const MIN_TRANSITIONS: usize = 2;

/// Drift rates and their spread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DriftModel {
    /// Direction rate of change (degrees per minute, positive = veering)
    pub direction_rate: f64,
    /// Spread of the direction rate (degrees per minute)
    pub direction_rate_std: f64,
    /// Speed rate of change (knots per minute)
    pub speed_rate: f64,
    /// Spread of the speed rate (knots per minute)
    pub speed_rate_std: f64,
}

impl DriftModel {
    /// Recomputes the model from the last `window` history entries.
    ///
    /// Adjacent pairs with a non-positive time gap are skipped. With fewer
    /// than two usable pairs the current values are returned unchanged.
    pub fn update(&self, history: &EstimationHistory, window: usize) -> DriftModel {
        let recent = history.recent(window);

        let mut direction_rates = Vec::with_capacity(recent.len());
        let mut speed_rates = Vec::with_capacity(recent.len());
        for pair in recent.windows(2) {
            let (earlier, later) = (pair[0], pair[1]);
            let minutes = elapsed_minutes(earlier.timestamp_ms, later.timestamp_ms);
            if minutes <= 0.0 {
                continue;
            }
            direction_rates.push(angular_difference(later.direction, earlier.direction) / minutes);
            speed_rates.push((later.speed - earlier.speed) / minutes);
        }

        if direction_rates.len() < MIN_TRANSITIONS {
            return *self;
        }

        let (Some(direction_rate), Some(speed_rate)) =
            (median(&direction_rates), median(&speed_rates))
        else {
            return *self;
        };
        let direction_rate_std = mean_and_std(&direction_rates).map_or(0.0, |(_, s)| s);
        let speed_rate_std = mean_and_std(&speed_rates).map_or(0.0, |(_, s)| s);

        DriftModel {
            direction_rate,
            direction_rate_std,
            speed_rate,
            speed_rate_std,
        }
    }

    /// Direction projected by `minutes` (may be negative), in [0, 360).
    pub fn project_direction(&self, direction: f64, minutes: f64) -> f64 {
        normalize_direction(direction + self.direction_rate * minutes)
    }

    /// Speed projected by `minutes`, clamped to ≥ 0.
    pub fn project_speed(&self, speed: f64, minutes: f64) -> f64 {
        (speed + self.speed_rate * minutes).max(0.0)
    }

    /// Direction and speed uncertainty accumulated over `minutes`.
    pub fn projection_std(&self, minutes: f64) -> (f64, f64) {
        let span = minutes.abs();
        (span * self.direction_rate_std, span * self.speed_rate_std)
    }
}
