//! pulsegrid-monitor — the health monitoring core.
//!
//! Polls N external sources on independent cadences, tracks a health
//! record per source, derives freshness and a 0–100 health score, and
//! publishes a closed vocabulary of events for alerting and streaming
//! consumers.
//!
//! # Architecture
//!
//! - [`probe::HealthProbe`] — pluggable per-source check; one
//!   implementation per source type ([`probe::HttpProbe`] ships here).
//! - [`scheduler::Scheduler`] — one self-renewing timer task per
//!   source; a slow probe never delays another source.
//! - [`events::EventBus`] — broadcast channel of
//!   `pulsegrid_core::MonitorEvent`s.
//! - [`monitor::HealthMonitor`] — owns the records, merges probe
//!   results, computes derived metrics, and emits events.

pub mod events;
pub mod monitor;
pub mod probe;
pub mod scheduler;

pub use events::EventBus;
pub use monitor::{HealthMonitor, MonitoredSource};
pub use probe::{HealthProbe, HttpProbe, ProbeReport, StaticProbe};
pub use scheduler::{ProbeTick, Scheduler};
