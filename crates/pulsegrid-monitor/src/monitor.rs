//! Health monitor — owns the per-source records and drives probes.
//!
//! The `HealthMonitor` holds the registry of source health records,
//! the per-source scheduler, and the event bus. Every probe cycle is
//! a complete merge into the source's record under the registry write
//! lock, so a manual sync racing a scheduled probe still leaves a
//! consistent record (last writer wins).

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use pulsegrid_core::{
    health_score, AlertSeverity, HealthMap, HealthSnapshot, MonitorConfig, MonitorEvent,
    SourceHealth, SourceStatus, Statistics, SyncOutcome,
};

use crate::events::EventBus;
use crate::probe::{HealthProbe, ProbeReport};
use crate::scheduler::{ProbeTick, Scheduler};

/// A source registered with the monitor: its probe and cadence.
pub struct MonitoredSource {
    pub name: String,
    pub interval: Duration,
    pub probe: Arc<dyn HealthProbe>,
}

struct SourceSlot {
    interval: Duration,
    probe: Arc<dyn HealthProbe>,
}

struct Inner {
    config: MonitorConfig,
    /// Probe + cadence per source. Fixed at construction.
    sources: HashMap<String, SourceSlot>,
    /// One record per configured source, for the monitor's lifetime.
    records: RwLock<BTreeMap<String, SourceHealth>>,
    scheduler: Scheduler,
    bus: EventBus,
}

/// Aggregates health state for all configured sources.
///
/// Cloneable handle over shared state; construct one per process (or
/// several in tests — there is no global registry).
#[derive(Clone)]
pub struct HealthMonitor {
    inner: Arc<Inner>,
}

impl HealthMonitor {
    pub fn new(config: MonitorConfig, sources: Vec<MonitoredSource>) -> Self {
        let mut slots = HashMap::new();
        let mut records = BTreeMap::new();
        for source in sources {
            records.insert(source.name.clone(), SourceHealth::new(&source.name));
            slots.insert(
                source.name,
                SourceSlot {
                    interval: source.interval,
                    probe: source.probe,
                },
            );
        }
        let bus = EventBus::new(config.event_capacity);
        Self {
            inner: Arc::new(Inner {
                config,
                sources: slots,
                records: RwLock::new(records),
                scheduler: Scheduler::new(),
                bus,
            }),
        }
    }

    /// Handle to the event bus for subscribers.
    pub fn events(&self) -> EventBus {
        self.inner.bus.clone()
    }

    /// Start the per-source timers. Each fires an immediate probe, so
    /// initial health state is published without waiting an interval.
    pub async fn start_monitoring(&self) {
        let plan: Vec<(String, Duration)> = self
            .inner
            .sources
            .iter()
            .map(|(name, slot)| (name.clone(), slot.interval))
            .collect();

        let monitor = self.clone();
        let tick: ProbeTick = Arc::new(move |source| {
            let monitor = monitor.clone();
            Box::pin(async move {
                monitor.check_source(&source).await;
            })
        });

        info!(sources = plan.len(), "health monitoring started");
        self.inner.scheduler.start(plan, tick).await;
    }

    /// Cancel all source timers. Idempotent.
    pub async fn stop_monitoring(&self) {
        self.inner.scheduler.stop().await;
        info!("health monitoring stopped");
    }

    /// Run one probe cycle for `source` and merge the result.
    ///
    /// Never panics and never propagates probe failures: a probe
    /// `Err` (or timeout) becomes an error reading for that source
    /// only. Returns `None` for a source that was never configured.
    pub async fn check_source(&self, source: &str) -> Option<HealthSnapshot> {
        let slot = self.inner.sources.get(source)?;
        let probe = slot.probe.clone();
        let timeout = self.inner.config.probe_timeout;

        debug!(%source, "probing source");
        let start = Instant::now();
        let outcome = tokio::time::timeout(timeout, probe.probe()).await;
        let latency_ms = start.elapsed().as_millis() as u64;
        let now = epoch_secs();

        // A probe fault is merged like an error report but also gets
        // its own event. Timeouts are ordinary probe failures.
        let mut fault: Option<String> = None;
        let report = match outcome {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => {
                let message = e.to_string();
                fault = Some(message.clone());
                ProbeReport::error(message)
            }
            Err(_) => ProbeReport::error(format!(
                "probe timed out after {}ms",
                timeout.as_millis()
            )),
        };

        let snapshot = {
            let mut records = self.inner.records.write().await;
            let record = records.get_mut(source)?;

            record.last_check = Some(now);
            record.latency_ms = Some(latency_ms);
            record.status = report.status;
            if let Some(count) = report.record_count {
                record.record_count = count;
            }
            if let Some(ts) = report.last_sync {
                record.last_sync = Some(ts);
            }
            record.next_sync = report
                .next_sync
                .or_else(|| Some(now + slot.interval.as_secs()));

            if report.status == SourceStatus::Error {
                record.consecutive_errors += 1;
                record.error = report
                    .error
                    .clone()
                    .or_else(|| Some("probe failed".to_string()));
            } else {
                record.consecutive_errors = 0;
                record.error = None;
            }

            self.snapshot_of(record, now)
        };

        if let Some(message) = fault {
            error!(%source, error = %message, "health probe failed unexpectedly");
            self.inner.bus.emit(MonitorEvent::Error {
                source: source.to_string(),
                error: message,
            });
        }

        self.inner.bus.emit(MonitorEvent::HealthUpdate {
            source: source.to_string(),
            health: snapshot.clone(),
        });

        // Two independent alert conditions; both may fire in one cycle.
        let errors = snapshot.record.consecutive_errors;
        if snapshot.record.status == SourceStatus::Error
            && errors >= self.inner.config.critical_error_threshold
        {
            warn!(%source, consecutive_errors = errors, "critical alert");
            self.inner.bus.emit(MonitorEvent::Alert {
                severity: AlertSeverity::Critical,
                source: source.to_string(),
                message: format!("{source} has failed {errors} consecutive health checks"),
                error: snapshot.record.error.clone(),
                last_sync: None,
                consecutive_errors: Some(errors),
            });
        }
        if let Some(age) = snapshot.freshness {
            if age > self.inner.config.stale_alert_after_secs {
                warn!(%source, freshness_secs = age, "stale data alert");
                self.inner.bus.emit(MonitorEvent::Alert {
                    severity: AlertSeverity::Warning,
                    source: source.to_string(),
                    message: format!("{source} data is stale: last synced {age}s ago"),
                    error: None,
                    last_sync: snapshot.record.last_sync,
                    consecutive_errors: None,
                });
            }
        }

        Some(snapshot)
    }

    /// Snapshot of every configured source. Copy-on-read: the
    /// returned map never aliases the monitor's own records.
    pub async fn all_health(&self) -> HealthMap {
        let now = epoch_secs();
        let records = self.inner.records.read().await;
        records
            .iter()
            .map(|(name, record)| (name.clone(), self.snapshot_of(record, now)))
            .collect()
    }

    /// Snapshot of one source, or `None` if it was never configured
    /// (distinct from a configured source still at `unknown`).
    pub async fn health(&self, source: &str) -> Option<HealthSnapshot> {
        let now = epoch_secs();
        let records = self.inner.records.read().await;
        records.get(source).map(|record| self.snapshot_of(record, now))
    }

    /// Request an out-of-band probe for `source`. Never returns an
    /// error to the caller; failures come back in the outcome.
    pub async fn trigger_sync(&self, source: &str) -> SyncOutcome {
        if !self.inner.sources.contains_key(source) {
            return SyncOutcome::failed(format!("unknown source '{source}'"));
        }

        info!(%source, "manual sync triggered");
        self.inner.bus.emit(MonitorEvent::SyncStart {
            source: source.to_string(),
        });

        match self.check_source(source).await {
            Some(snapshot) if snapshot.record.status == SourceStatus::Error => {
                let message = snapshot
                    .record
                    .error
                    .unwrap_or_else(|| "sync failed".to_string());
                self.inner.bus.emit(MonitorEvent::SyncError {
                    source: source.to_string(),
                    error: message.clone(),
                });
                SyncOutcome::failed(message)
            }
            Some(_) => {
                self.inner.bus.emit(MonitorEvent::SyncComplete {
                    source: source.to_string(),
                });
                SyncOutcome::ok()
            }
            None => {
                let message = format!("unknown source '{source}'");
                self.inner.bus.emit(MonitorEvent::SyncError {
                    source: source.to_string(),
                    error: message.clone(),
                });
                SyncOutcome::failed(message)
            }
        }
    }

    /// Aggregate statistics across all sources. Zero sources yields
    /// the all-zero aggregate.
    pub async fn statistics(&self) -> Statistics {
        let now = epoch_secs();
        let records = self.inner.records.read().await;

        let mut stats = Statistics {
            total: records.len() as u32,
            ..Statistics::default()
        };
        if records.is_empty() {
            return stats;
        }

        let mut latency_sum: u64 = 0;
        let mut latency_count: u64 = 0;
        let mut freshness_sum: u64 = 0;
        let mut freshness_count: u64 = 0;
        let mut score_sum: u64 = 0;

        for record in records.values() {
            match record.status {
                SourceStatus::Connected => stats.connected += 1,
                SourceStatus::Error => stats.errors += 1,
                _ => {}
            }
            if record.consecutive_errors > 0 {
                stats.warnings += 1;
            }
            if let Some(latency) = record.latency_ms {
                latency_sum += latency;
                latency_count += 1;
            }
            let freshness = record.freshness(now);
            if let Some(age) = freshness {
                freshness_sum += age;
                freshness_count += 1;
            }
            score_sum += health_score(
                record.status,
                record.consecutive_errors,
                freshness,
                &self.inner.config.thresholds,
            ) as u64;
        }

        stats.average_latency = round_mean(latency_sum, latency_count);
        stats.average_freshness = round_mean(freshness_sum, freshness_count);
        stats.overall_health = round_mean(score_sum, records.len() as u64) as u8;
        stats
    }

    fn snapshot_of(&self, record: &SourceHealth, now: u64) -> HealthSnapshot {
        let freshness = record.freshness(now);
        HealthSnapshot {
            record: record.clone(),
            freshness,
            health_score: health_score(
                record.status,
                record.consecutive_errors,
                freshness,
                &self.inner.config.thresholds,
            ),
        }
    }
}

fn round_mean(sum: u64, count: u64) -> u64 {
    if count == 0 {
        return 0;
    }
    (sum as f64 / count as f64).round() as u64
}

fn epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
