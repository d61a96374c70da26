//! Shared types, error model, and configuration for trackalt.
//!
//! This crate is the foundation depended on by all other trackalt crates.
//! It provides:
//! - [`TrackAltError`]: the unified error type
//! - Domain types ([`InjectionMode`], [`Coordinate`], [`AltitudeKey`], [`PointsReport`])
//! - Configuration ([`AppConfig`], [`FetchConfig`], config loading, credential resolution)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DEFAULT_ENDPOINT, ElevationConfig, FetchConfig, OutputConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, resolve_api_key,
};
pub use error::{Result, TrackAltError};
pub use types::{
    AltitudeKey, AltitudeResult, Coordinate, InjectionMode, POINTS_SCHEMA_VERSION, PointRecord,
    PointsReport,
};
