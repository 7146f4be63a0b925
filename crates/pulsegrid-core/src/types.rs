//! Domain types for PulseGrid health monitoring.
//!
//! These types describe the observed state of each monitored source,
//! the derived snapshots served to API clients, fleet-wide statistics,
//! and the closed event vocabulary published on the event bus. All
//! types serialize to the JSON wire shape consumed by dashboards
//! (camelCase fields, snake_case status strings).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Identifier for a monitored source (e.g. "notion", "gmail").
pub type SourceId = String;

// ── Source status ─────────────────────────────────────────────────

/// Health status of a single source as reported by its probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    /// The source responded and its data is available.
    Connected,
    /// A data refresh is currently in progress.
    Syncing,
    /// The last probe failed.
    Error,
    /// The source is reachable as a host but refused the connection.
    Disconnected,
    /// The source is throttling us; back off.
    RateLimited,
    /// Credentials or configuration are missing. Not a failure.
    NotConfigured,
    /// The source responded but holds no records.
    NoData,
    /// Configured but never probed (or the probe reported something
    /// outside this vocabulary).
    #[default]
    Unknown,
}

impl SourceStatus {
    /// Wire form of the status (matches the serde rename).
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceStatus::Connected => "connected",
            SourceStatus::Syncing => "syncing",
            SourceStatus::Error => "error",
            SourceStatus::Disconnected => "disconnected",
            SourceStatus::RateLimited => "rate_limited",
            SourceStatus::NotConfigured => "not_configured",
            SourceStatus::NoData => "no_data",
            SourceStatus::Unknown => "unknown",
        }
    }

    /// Parse a wire-form status string, mapping anything unrecognized
    /// to `Unknown` rather than failing.
    pub fn parse_lossy(s: &str) -> Self {
        match s {
            "connected" => SourceStatus::Connected,
            "syncing" => SourceStatus::Syncing,
            "error" => SourceStatus::Error,
            "disconnected" => SourceStatus::Disconnected,
            "rate_limited" => SourceStatus::RateLimited,
            "not_configured" => SourceStatus::NotConfigured,
            "no_data" => SourceStatus::NoData,
            _ => SourceStatus::Unknown,
        }
    }
}

impl std::fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Source health record ──────────────────────────────────────────

/// Observed state of one monitored source.
///
/// One record exists per configured source for the lifetime of the
/// monitor; every probe cycle rewrites it as a complete merge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceHealth {
    /// Source identifier. Immutable once created.
    pub source: SourceId,
    pub status: SourceStatus,
    /// Unix timestamp (seconds) of the most recent probe completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_check: Option<u64>,
    /// Unix timestamp (seconds) of the most recent successful refresh.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<u64>,
    /// Hint for when the next refresh is expected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_sync: Option<u64>,
    /// Number of records the source currently reports.
    pub record_count: u64,
    /// Run-length of back-to-back failed probes. Reset on any
    /// non-error result.
    pub consecutive_errors: u32,
    /// Wall-clock duration of the most recent probe, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    /// Last error message. Cleared whenever status is not `error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceHealth {
    /// Fresh record for a configured-but-unchecked source.
    pub fn new(source: impl Into<SourceId>) -> Self {
        Self {
            source: source.into(),
            status: SourceStatus::Unknown,
            last_check: None,
            last_sync: None,
            next_sync: None,
            record_count: 0,
            consecutive_errors: 0,
            latency_ms: None,
            error: None,
        }
    }

    /// Seconds since the last successful sync, or `None` if the
    /// source has never synced.
    pub fn freshness(&self, now: u64) -> Option<u64> {
        self.last_sync.map(|ts| now.saturating_sub(ts))
    }
}

// ── Snapshot ──────────────────────────────────────────────────────

/// Copy-on-read view of a source record plus derived metrics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    #[serde(flatten)]
    pub record: SourceHealth,
    /// Seconds since last sync; null when the source has never synced.
    pub freshness: Option<u64>,
    /// Derived 0–100 health score.
    pub health_score: u8,
}

/// Snapshot map for all configured sources, keyed by source id.
pub type HealthMap = BTreeMap<SourceId, HealthSnapshot>;

// ── Statistics ────────────────────────────────────────────────────

/// Fleet-wide aggregate over all source records.
///
/// Averages are rounded to the nearest integer; latency averages only
/// over sources that have a latency reading, freshness only over
/// sources that have synced at least once. Zero configured sources
/// yields the all-zero aggregate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total: u32,
    pub connected: u32,
    pub errors: u32,
    /// Sources with at least one consecutive error.
    pub warnings: u32,
    /// Mean probe latency in milliseconds.
    pub average_latency: u64,
    /// Mean freshness in seconds.
    pub average_freshness: u64,
    /// Mean health score, 0–100.
    pub overall_health: u8,
}

// ── Events ────────────────────────────────────────────────────────

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Critical,
    Warning,
}

/// Events published by the health monitor.
///
/// The vocabulary is closed: subscribers match on the variant, and
/// the wire form is a tagged JSON object (`{"type": "health-update",
/// ...}`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MonitorEvent {
    /// A probe cycle completed and the record was refreshed.
    HealthUpdate {
        source: SourceId,
        health: HealthSnapshot,
    },
    /// A threshold was crossed (consecutive errors or staleness).
    #[serde(rename_all = "camelCase")]
    Alert {
        severity: AlertSeverity,
        source: SourceId,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        last_sync: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        consecutive_errors: Option<u32>,
    },
    /// The probe itself blew up (unexpected fault), as opposed to a
    /// refreshed-but-bad reading.
    Error { source: SourceId, error: String },
    /// An on-demand sync was requested.
    SyncStart { source: SourceId },
    SyncComplete { source: SourceId },
    SyncError { source: SourceId, error: String },
    /// Full snapshot sent once when a stream subscriber connects.
    Initial { health: HealthMap },
}

impl MonitorEvent {
    /// Wire tag of this event, e.g. `"health-update"`.
    pub fn event_type(&self) -> &'static str {
        match self {
            MonitorEvent::HealthUpdate { .. } => "health-update",
            MonitorEvent::Alert { .. } => "alert",
            MonitorEvent::Error { .. } => "error",
            MonitorEvent::SyncStart { .. } => "sync-start",
            MonitorEvent::SyncComplete { .. } => "sync-complete",
            MonitorEvent::SyncError { .. } => "sync-error",
            MonitorEvent::Initial { .. } => "initial",
        }
    }
}

/// Result of an on-demand sync request. Never an `Err`: failures are
/// reported in-band.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_wire_form() {
        for status in [
            SourceStatus::Connected,
            SourceStatus::Syncing,
            SourceStatus::Error,
            SourceStatus::Disconnected,
            SourceStatus::RateLimited,
            SourceStatus::NotConfigured,
            SourceStatus::NoData,
            SourceStatus::Unknown,
        ] {
            assert_eq!(SourceStatus::parse_lossy(status.as_str()), status);
        }
    }

    #[test]
    fn unrecognized_status_maps_to_unknown() {
        assert_eq!(SourceStatus::parse_lossy("banana"), SourceStatus::Unknown);
        assert_eq!(SourceStatus::parse_lossy(""), SourceStatus::Unknown);
    }

    #[test]
    fn new_record_starts_unknown() {
        let record = SourceHealth::new("notion");
        assert_eq!(record.status, SourceStatus::Unknown);
        assert_eq!(record.consecutive_errors, 0);
        assert_eq!(record.record_count, 0);
        assert!(record.last_sync.is_none());
    }

    #[test]
    fn freshness_is_none_before_first_sync() {
        let record = SourceHealth::new("gmail");
        assert_eq!(record.freshness(1_000_000), None);
    }

    #[test]
    fn freshness_counts_seconds_since_sync() {
        let mut record = SourceHealth::new("gmail");
        record.last_sync = Some(1_000_000);
        assert_eq!(record.freshness(1_000_300), Some(300));
        // Clock skew must not underflow.
        assert_eq!(record.freshness(999_999), Some(0));
    }

    #[test]
    fn events_serialize_with_kebab_case_tag() {
        let event = MonitorEvent::SyncStart {
            source: "xero".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "sync-start");
        assert_eq!(json["source"], "xero");
        assert_eq!(event.event_type(), "sync-start");
    }

    #[test]
    fn alert_event_wire_shape() {
        let event = MonitorEvent::Alert {
            severity: AlertSeverity::Critical,
            source: "gmail".to_string(),
            message: "gmail has failed 3 consecutive health checks".to_string(),
            error: Some("timeout".to_string()),
            last_sync: None,
            consecutive_errors: Some(3),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "alert");
        assert_eq!(json["severity"], "critical");
        assert_eq!(json["consecutiveErrors"], 3);
        assert!(json.get("lastSync").is_none());
    }

    #[test]
    fn record_serializes_camel_case() {
        let mut record = SourceHealth::new("calendar");
        record.record_count = 42;
        record.latency_ms = Some(120);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["recordCount"], 42);
        assert_eq!(json["latencyMs"], 120);
        assert_eq!(json["status"], "unknown");
        assert!(json.get("error").is_none());
    }
}
