//! Circular and robust statistics helpers
//!
//! Wind directions are periodic, so every average over directions goes
//! through unit-vector (sin/cos) components. Nothing in the crate averages
//! raw degree values.

/// Normalises a direction into `[0, 360)`.
///
/// Non-finite input is returned unchanged so callers can filter it.
pub fn normalize_direction(direction_deg: f64) -> f64 {
    if !direction_deg.is_finite() {
        return direction_deg;
    }
    let d = direction_deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if d >= 360.0 {
        0.0
    } else {
        d
    }
}

/// Signed smallest difference `a - b`, in `[-180, 180)` degrees.
pub fn angular_difference(a_deg: f64, b_deg: f64) -> f64 {
    let d = (a_deg - b_deg + 180.0).rem_euclid(360.0) - 180.0;
    if d >= 180.0 {
        d - 360.0
    } else {
        d
    }
}

/// Unit-vector components `(sin, cos)` of a direction in degrees.
pub fn components(direction_deg: f64) -> (f64, f64) {
    let r = direction_deg.to_radians();
    (r.sin(), r.cos())
}

/// Direction in `[0, 360)` of the vector `(sin, cos)`.
pub fn direction_from_components(sin: f64, cos: f64) -> f64 {
    normalize_direction(sin.atan2(cos).to_degrees())
}

/// Weighted mean of the `(sin, cos)` components of `directions`.
///
/// Returns `None` when the weights sum to zero.
pub fn weighted_components(directions: &[f64], weights: &[f64]) -> Option<(f64, f64)> {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return None;
    }
    let (mut s, mut c) = (0.0, 0.0);
    for (&d, &w) in directions.iter().zip(weights) {
        let (ds, dc) = components(d);
        s += w * ds;
        c += w * dc;
    }
    Some((s / total, c / total))
}

/// Weighted circular mean direction in `[0, 360)`.
pub fn weighted_circular_mean(directions: &[f64], weights: &[f64]) -> Option<f64> {
    weighted_components(directions, weights).map(|(s, c)| direction_from_components(s, c))
}

/// Mean resultant length `R` of the directions, in `[0, 1]`.
///
/// 1 means all directions are identical, 0 means they cancel out.
pub fn mean_resultant_length(directions: &[f64]) -> f64 {
    if directions.is_empty() {
        return 0.0;
    }
    let weights = vec![1.0; directions.len()];
    weighted_components(directions, &weights)
        .map(|(s, c)| s.hypot(c).clamp(0.0, 1.0))
        .unwrap_or(0.0)
}

/// Weighted standard deviation of directions around `center`, with each
/// difference wrapped into `[-180, 180)` before squaring.
pub fn weighted_circular_std(directions: &[f64], weights: &[f64], center: f64) -> f64 {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let var = directions
        .iter()
        .zip(weights)
        .map(|(&d, &w)| w * angular_difference(d, center).powi(2))
        .sum::<f64>()
        / total;
    var.sqrt()
}

/// Weighted standard deviation of linear values around `center`.
pub fn weighted_std(values: &[f64], weights: &[f64], center: f64) -> f64 {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let var = values
        .iter()
        .zip(weights)
        .map(|(&v, &w)| w * (v - center).powi(2))
        .sum::<f64>()
        / total;
    var.sqrt()
}

/// Median of the values; `None` for an empty slice.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Population mean and standard deviation; `None` for an empty slice.
pub fn mean_and_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, var.sqrt()))
}
