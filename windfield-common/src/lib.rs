//! Common types and utilities for windfield
//!
//! This crate provides shared types, configuration structures, and utilities
//! used by the fusion engine and its integration tests.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::{
    ConfigValidationError, FusionConfig, GridBounds, ReliabilityConfig, SourceProfile,
    SpatialConfig, VesselCharacteristics, WindPrior,
};
pub use error::Error;
pub use logging::{init_logging, init_logging_with_filter, LogLevel, ParseLogLevelError};
pub use types::{elapsed_minutes, GeoPosition, MS_PER_MINUTE};
