//! pulsegrid.toml configuration parser.
//!
//! The manifest names the monitored sources, each with its own probe
//! cadence, plus optional monitor-wide tuning:
//!
//! ```toml
//! [monitor]
//! probe_timeout = "10s"
//! critical_error_threshold = 3
//! stale_alert_after = "1h"
//!
//! [[sources]]
//! name = "notion"
//! address = "127.0.0.1:9001"
//! endpoint = "/health"
//! interval = "5m"
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::score::ScoreThresholds;

/// Monitor-wide runtime configuration, with the score thresholds.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Ceiling on a single probe call; a timed-out probe counts as a
    /// probe failure.
    pub probe_timeout: Duration,
    /// Consecutive errors before a critical alert fires.
    pub critical_error_threshold: u32,
    /// Freshness beyond this (seconds) fires a warning alert.
    pub stale_alert_after_secs: u64,
    /// Broadcast channel capacity for the event bus.
    pub event_capacity: usize,
    pub thresholds: ScoreThresholds,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(10),
            critical_error_threshold: 3,
            stale_alert_after_secs: 3600,
            event_capacity: 256,
            thresholds: ScoreThresholds::default(),
        }
    }
}

/// One validated source definition: what to probe and how often.
#[derive(Debug, Clone)]
pub struct SourceSpec {
    pub name: String,
    /// Probe target (`host:port`). Absent means the source is known
    /// but not configured; its probe reports `not_configured`.
    pub address: Option<String>,
    /// HTTP path probed on the source's health endpoint.
    pub endpoint: String,
    /// Cadence of the source's own repeating timer.
    pub interval: Duration,
}

// ── Manifest (raw TOML shapes) ────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseConfig {
    pub monitor: Option<MonitorSection>,
    pub sources: Vec<SourceEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorSection {
    pub probe_timeout: Option<String>,
    pub critical_error_threshold: Option<u32>,
    pub stale_alert_after: Option<String>,
    pub very_stale_after: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    pub name: String,
    pub address: Option<String>,
    /// Defaults to "/health".
    pub endpoint: Option<String>,
    /// Defaults to "5m".
    pub interval: Option<String>,
}

impl PulseConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        let config: PulseConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        let mut seen = HashSet::new();
        for entry in &self.sources {
            if !seen.insert(entry.name.as_str()) {
                return Err(ConfigError::DuplicateSource(entry.name.clone()));
            }
        }
        Ok(())
    }

    /// Resolve the `[monitor]` section against defaults.
    pub fn monitor_config(&self) -> ConfigResult<MonitorConfig> {
        let mut config = MonitorConfig::default();
        let Some(section) = &self.monitor else {
            return Ok(config);
        };
        if let Some(s) = &section.probe_timeout {
            config.probe_timeout = parse_duration(s)?;
        }
        if let Some(n) = section.critical_error_threshold {
            config.critical_error_threshold = n;
        }
        if let Some(s) = &section.stale_alert_after {
            let stale = parse_duration(s)?.as_secs();
            config.stale_alert_after_secs = stale;
            config.thresholds.stale_after_secs = stale;
        }
        if let Some(s) = &section.very_stale_after {
            config.thresholds.very_stale_after_secs = parse_duration(s)?.as_secs();
        }
        Ok(config)
    }

    /// Resolve the `[[sources]]` entries into validated specs.
    pub fn source_specs(&self) -> ConfigResult<Vec<SourceSpec>> {
        self.sources
            .iter()
            .map(|entry| {
                let interval = match &entry.interval {
                    Some(s) => parse_duration(s)?,
                    None => Duration::from_secs(300),
                };
                Ok(SourceSpec {
                    name: entry.name.clone(),
                    address: entry.address.clone(),
                    endpoint: entry
                        .endpoint
                        .clone()
                        .unwrap_or_else(|| "/health".to_string()),
                    interval,
                })
            })
            .collect()
    }
}

/// Parse a duration string like "500ms", "30s", "5m", "1h", or a bare
/// number of seconds.
pub fn parse_duration(s: &str) -> ConfigResult<Duration> {
    let trimmed = s.trim();
    let parsed = if let Some(ms) = trimmed.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = trimmed.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = trimmed.strip_suffix('m') {
        mins.parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else if let Some(hours) = trimmed.strip_suffix('h') {
        hours
            .parse::<u64>()
            .ok()
            .map(|h| Duration::from_secs(h * 3600))
    } else {
        trimmed.parse::<u64>().ok().map(Duration::from_secs)
    };
    parsed.ok_or_else(|| ConfigError::BadDuration(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [monitor]
        probe_timeout = "5s"
        critical_error_threshold = 4
        stale_alert_after = "30m"

        [[sources]]
        name = "notion"
        address = "127.0.0.1:9001"
        interval = "5m"

        [[sources]]
        name = "xero"
        interval = "30m"
        endpoint = "/status"
    "#;

    #[test]
    fn parses_full_manifest() {
        let config = PulseConfig::from_toml(SAMPLE).unwrap();
        let monitor = config.monitor_config().unwrap();
        assert_eq!(monitor.probe_timeout, Duration::from_secs(5));
        assert_eq!(monitor.critical_error_threshold, 4);
        assert_eq!(monitor.stale_alert_after_secs, 1800);
        assert_eq!(monitor.thresholds.stale_after_secs, 1800);

        let specs = config.source_specs().unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name, "notion");
        assert_eq!(specs[0].interval, Duration::from_secs(300));
        assert_eq!(specs[0].endpoint, "/health");
        assert!(specs[1].address.is_none());
        assert_eq!(specs[1].endpoint, "/status");
        assert_eq!(specs[1].interval, Duration::from_secs(1800));
    }

    #[test]
    fn missing_monitor_section_uses_defaults() {
        let config = PulseConfig::from_toml("[[sources]]\nname = \"gmail\"").unwrap();
        let monitor = config.monitor_config().unwrap();
        assert_eq!(monitor.probe_timeout, Duration::from_secs(10));
        assert_eq!(monitor.critical_error_threshold, 3);
        let specs = config.source_specs().unwrap();
        assert_eq!(specs[0].interval, Duration::from_secs(300));
    }

    #[test]
    fn rejects_empty_source_list() {
        let err = PulseConfig::from_toml("sources = []").unwrap_err();
        assert!(matches!(err, ConfigError::NoSources));
    }

    #[test]
    fn rejects_duplicate_source_names() {
        let content = "[[sources]]\nname = \"gmail\"\n[[sources]]\nname = \"gmail\"";
        let err = PulseConfig::from_toml(content).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateSource(name) if name == "gmail"));
    }

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("45").unwrap(), Duration::from_secs(45));
    }

    #[test]
    fn parse_duration_rejects_garbage() {
        assert!(parse_duration("fast").is_err());
        assert!(parse_duration("").is_err());
        assert!(parse_duration("9q").is_err());
    }
}
