//! pulsegrid-core — domain types for PulseGrid.
//!
//! Holds the per-source health record and status vocabulary, the
//! derived snapshot and statistics shapes, the closed monitor event
//! vocabulary, the health-score formula, and the `pulsegrid.toml`
//! configuration loader.
//!
//! Everything here is runtime-free: the monitor, scheduler, and HTTP
//! surface live in `pulsegrid-monitor` and `pulsegrid-api`.

pub mod config;
pub mod error;
pub mod score;
pub mod types;

pub use config::{parse_duration, MonitorConfig, PulseConfig, SourceSpec};
pub use error::{ConfigError, ConfigResult};
pub use score::{health_score, ScoreThresholds};
pub use types::*;
