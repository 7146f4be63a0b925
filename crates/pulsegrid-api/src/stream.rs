//! Server-push event stream.
//!
//! `GET /stream` is an SSE endpoint: on connect the client receives
//! one `initial` event with the full health snapshot, then every
//! subsequent `health-update` and `alert` as the monitor emits them.
//! Other bus events (sync lifecycle, probe faults) are not forwarded.
//! Subscription resources are dropped with the connection.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::debug;

use pulsegrid_core::MonitorEvent;

use crate::ApiState;

/// GET /stream
pub async fn stream_events(
    State(state): State<ApiState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Subscribe before snapshotting so no update between the two is
    // lost; a client may see an update older than its snapshot, which
    // is harmless.
    let rx = state.monitor.events().subscribe();
    let initial = MonitorEvent::Initial {
        health: state.monitor.all_health().await,
    };
    debug!(subscribers = state.monitor.events().subscriber_count(), "stream client connected");

    let greeting = tokio_stream::iter(sse_event(&initial).into_iter().map(Ok));
    let updates = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) if forwards(&event) => sse_event(&event).map(Ok),
        Ok(_) => None,
        // Lagged subscriber: skip the missed events rather than
        // terminating the stream.
        Err(_) => None,
    });

    Sse::new(greeting.chain(updates)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    )
}

/// Only health updates and alerts are relayed to stream clients.
fn forwards(event: &MonitorEvent) -> bool {
    matches!(
        event,
        MonitorEvent::HealthUpdate { .. } | MonitorEvent::Alert { .. }
    )
}

fn sse_event(event: &MonitorEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().event(event.event_type()).data(json)),
        Err(e) => {
            debug!(error = %e, "failed to serialize stream event");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsegrid_core::{AlertSeverity, HealthMap};

    #[test]
    fn only_health_updates_and_alerts_are_forwarded() {
        let update = MonitorEvent::Alert {
            severity: AlertSeverity::Warning,
            source: "gmail".to_string(),
            message: "stale".to_string(),
            error: None,
            last_sync: Some(1),
            consecutive_errors: None,
        };
        assert!(forwards(&update));
        assert!(!forwards(&MonitorEvent::SyncStart {
            source: "gmail".to_string()
        }));
        assert!(!forwards(&MonitorEvent::Error {
            source: "gmail".to_string(),
            error: "boom".to_string()
        }));
        assert!(!forwards(&MonitorEvent::Initial {
            health: HealthMap::new()
        }));
    }

    #[test]
    fn initial_event_serializes_with_tag() {
        let event = MonitorEvent::Initial {
            health: HealthMap::new(),
        };
        assert!(sse_event(&event).is_some());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "initial");
        assert!(json["health"].is_object());
    }
}
