//! Spatiotemporal field container and its export view
//!
//! [`SpatiotemporalField`] keeps fields keyed by instant for lookups.
//! [`SpatialFieldRecord`] is the flat, list-of-records shape handed to
//! consumers outside the crate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::spatial::{FallbackReason, FieldMethod, SpatialField};

/// Fields for a set of instants, ordered by time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpatiotemporalField {
    fields: BTreeMap<u64, SpatialField>,
}

impl SpatiotemporalField {
    /// Creates an empty container
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a field under its own timestamp, replacing any previous one.
    pub fn insert(&mut self, field: SpatialField) {
        self.fields.insert(field.timestamp_ms, field);
    }

    /// Field at exactly `instant_ms`
    pub fn get(&self, instant_ms: u64) -> Option<&SpatialField> {
        self.fields.get(&instant_ms)
    }

    /// Number of instants with a field
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no instant produced a field
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Instants with a field, ascending
    pub fn instants(&self) -> impl Iterator<Item = u64> + '_ {
        self.fields.keys().copied()
    }

    /// Fields in time order
    pub fn iter(&self) -> impl Iterator<Item = (u64, &SpatialField)> + '_ {
        self.fields.iter().map(|(t, f)| (*t, f))
    }

    /// Flattens every field into an export record, in time order.
    pub fn to_records(&self) -> Vec<SpatialFieldRecord> {
        self.fields.values().map(SpatialFieldRecord::from).collect()
    }

    /// Serialises [`Self::to_records`] as JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_records())
    }
}

impl FromIterator<SpatialField> for SpatiotemporalField {
    fn from_iter<I: IntoIterator<Item = SpatialField>>(iter: I) -> Self {
        let mut out = Self::new();
        for field in iter {
            out.insert(field);
        }
        out
    }
}

/// One grid cell of an exported field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldCell {
    /// Latitude (degrees)
    pub lat: f64,
    /// Longitude (degrees)
    pub lon: f64,
    /// Direction (degrees)
    pub direction: f64,
    /// Speed (knots)
    pub speed: f64,
    /// Confidence ([0, 1])
    pub confidence: f64,
}

/// Export view of one field: grid metadata plus cells in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialFieldRecord {
    /// Instant the field describes (ms)
    pub timestamp_ms: u64,
    /// `uniform_projection` or `spatially_interpolated`
    pub method: String,
    /// Why regression was skipped, for uniform fields
    pub fallback_reason: Option<String>,
    /// Grid rows
    pub rows: usize,
    /// Grid columns
    pub cols: usize,
    /// Cells, row-major
    pub cells: Vec<FieldCell>,
}

fn describe(reason: &FallbackReason) -> String {
    match reason {
        FallbackReason::InsufficientPositions {
            available,
            required,
        } => format!("insufficient positioned estimates ({available} of {required})"),
        FallbackReason::FitFailed(e) => e.to_string(),
    }
}

impl From<&SpatialField> for SpatialFieldRecord {
    fn from(field: &SpatialField) -> Self {
        let (rows, cols) = field.shape();
        let cells = field
            .lat_grid
            .iter()
            .zip(field.lon_grid.iter())
            .zip(field.direction_grid.iter())
            .zip(field.speed_grid.iter())
            .zip(field.confidence_grid.iter())
            .map(|((((&lat, &lon), &direction), &speed), &confidence)| FieldCell {
                lat,
                lon,
                direction,
                speed,
                confidence,
            })
            .collect();
        let fallback_reason = match &field.method {
            FieldMethod::UniformProjection { reason } => Some(describe(reason)),
            FieldMethod::SpatiallyInterpolated { .. } => None,
        };
        Self {
            timestamp_ms: field.timestamp_ms,
            method: field.method.label().to_string(),
            fallback_reason,
            rows,
            cols,
            cells,
        }
    }
}
