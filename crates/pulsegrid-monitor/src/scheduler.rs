//! Per-source probe scheduling.
//!
//! Every source gets its own background task with an independently
//! configured interval, so a slow probe on one source never delays or
//! skips another source's timer. Timers are self-renewing single
//! shots: the next probe is scheduled only after the previous one
//! completes, which keeps probes from overlapping within a source at
//! the cost of a little cumulative drift.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Future type returned by a probe tick.
type BoxFuture = std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>;

/// Callback invoked on every timer fire, with the source name.
pub type ProbeTick = Arc<dyn Fn(String) -> BoxFuture + Send + Sync>;

/// Per-source timer state.
struct TimerSlot {
    handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

/// Owns one repeating timer per source.
pub struct Scheduler {
    timers: Arc<RwLock<HashMap<String, TimerSlot>>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            timers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Start a timer for every `(source, interval)` in the plan. Each
    /// timer fires one probe immediately, so health is known without
    /// waiting a full interval. Starting a source that already has a
    /// timer replaces the old one.
    pub async fn start(&self, plan: Vec<(String, Duration)>, tick: ProbeTick) {
        let mut timers = self.timers.write().await;
        for (source, interval) in plan {
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            let tick = tick.clone();
            let task_source = source.clone();

            let handle = tokio::spawn(async move {
                run_timer_loop(task_source, interval, tick, shutdown_rx).await;
            });

            if let Some(old) = timers.insert(
                source.clone(),
                TimerSlot {
                    handle,
                    shutdown_tx,
                },
            ) {
                let _ = old.shutdown_tx.send(true);
                old.handle.abort();
            }
            debug!(%source, ?interval, "source timer started");
        }
        info!(timers = timers.len(), "scheduler started");
    }

    /// Cancel every outstanding timer. Idempotent: a second call is a
    /// no-op. In-flight probes are aborted at their next await point,
    /// so a late result can never land after shutdown.
    pub async fn stop(&self) {
        let mut timers = self.timers.write().await;
        if timers.is_empty() {
            return;
        }
        for (source, slot) in timers.drain() {
            let _ = slot.shutdown_tx.send(true);
            slot.handle.abort();
            debug!(%source, "source timer stopped");
        }
        info!("scheduler stopped");
    }

    /// Sources with an active timer.
    pub async fn active_sources(&self) -> Vec<String> {
        let timers = self.timers.read().await;
        timers.keys().cloned().collect()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// The timer loop for a single source: probe, then sleep, repeat.
async fn run_timer_loop(
    source: String,
    interval: Duration,
    tick: ProbeTick,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tick(source.clone()).await;

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => {
                debug!(%source, "timer loop shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_tick(counter: Arc<AtomicU32>) -> ProbeTick {
        Arc::new(move |_source| {
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
    }

    #[tokio::test]
    async fn first_probe_fires_immediately() {
        let scheduler = Scheduler::new();
        let count = Arc::new(AtomicU32::new(0));
        scheduler
            .start(
                vec![("notion".to_string(), Duration::from_secs(3600))],
                counting_tick(count.clone()),
            )
            .await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        scheduler.stop().await;
    }

    #[tokio::test]
    async fn timer_reschedules_itself() {
        let scheduler = Scheduler::new();
        let count = Arc::new(AtomicU32::new(0));
        scheduler
            .start(
                vec![("gmail".to_string(), Duration::from_millis(20))],
                counting_tick(count.clone()),
            )
            .await;

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(count.load(Ordering::SeqCst) >= 3);
        scheduler.stop().await;
    }

    #[tokio::test]
    async fn sources_get_independent_timers() {
        let scheduler = Scheduler::new();
        let count = Arc::new(AtomicU32::new(0));
        // One tick per source stalls forever after incrementing; the
        // fast source must keep firing regardless.
        let slow_or_fast: ProbeTick = {
            let count = count.clone();
            Arc::new(move |source| {
                let count = count.clone();
                Box::pin(async move {
                    if source == "slow" {
                        tokio::time::sleep(Duration::from_secs(600)).await;
                    } else {
                        count.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
        };

        scheduler
            .start(
                vec![
                    ("slow".to_string(), Duration::from_millis(10)),
                    ("fast".to_string(), Duration::from_millis(20)),
                ],
                slow_or_fast,
            )
            .await;

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(count.load(Ordering::SeqCst) >= 3);

        let mut active = scheduler.active_sources().await;
        active.sort();
        assert_eq!(active, vec!["fast".to_string(), "slow".to_string()]);
        scheduler.stop().await;
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_halts_probes() {
        let scheduler = Scheduler::new();
        let count = Arc::new(AtomicU32::new(0));
        scheduler
            .start(
                vec![("xero".to_string(), Duration::from_millis(10))],
                counting_tick(count.clone()),
            )
            .await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.stop().await;
        scheduler.stop().await;

        let after_stop = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
        assert!(scheduler.active_sources().await.is_empty());
    }
}
