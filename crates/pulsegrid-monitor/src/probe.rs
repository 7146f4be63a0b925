//! Health probe contract and the HTTP prober.
//!
//! A probe answers "how is this source right now" as a [`ProbeReport`].
//! Ordinary conditions — missing credentials, an empty dataset, a
//! throttling upstream — are reported as statuses, never as `Err`;
//! `Err` is reserved for unexpected faults inside the probe itself,
//! which the monitor logs through a distinct path.

use async_trait::async_trait;
use http_body_util::BodyExt;
use serde::Deserialize;
use tracing::debug;

use pulsegrid_core::SourceStatus;

/// Outcome of one probe call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeReport {
    pub status: SourceStatus,
    /// Records the source currently reports, if it told us.
    pub record_count: Option<u64>,
    /// Unix timestamp of the source's last successful refresh.
    pub last_sync: Option<u64>,
    /// When the source expects to refresh next.
    pub next_sync: Option<u64>,
    /// Error detail; only meaningful with `status == Error`.
    pub error: Option<String>,
}

impl ProbeReport {
    pub fn with_status(status: SourceStatus) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn connected() -> Self {
        Self::with_status(SourceStatus::Connected)
    }

    pub fn not_configured() -> Self {
        Self::with_status(SourceStatus::NotConfigured)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: SourceStatus::Error,
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Per-source health check capability.
///
/// Implementations may perform network I/O. A probe with missing
/// configuration must report `not_configured` rather than fail, so an
/// unconfigured source never accrues consecutive errors.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self) -> anyhow::Result<ProbeReport>;
}

/// Probe that always returns a fixed report. Useful for wiring tests
/// and placeholder sources.
#[derive(Debug, Clone)]
pub struct StaticProbe {
    report: ProbeReport,
}

impl StaticProbe {
    pub fn new(report: ProbeReport) -> Self {
        Self { report }
    }
}

#[async_trait]
impl HealthProbe for StaticProbe {
    async fn probe(&self) -> anyhow::Result<ProbeReport> {
        Ok(self.report.clone())
    }
}

// ── HTTP prober ───────────────────────────────────────────────────

/// Probes a source's HTTP health endpoint.
///
/// Interpretation: 2xx with an optional JSON body (`{"status": …,
/// "recordCount": …, "lastSync": …}`) is the source's own report;
/// a bare 2xx means `connected`; 429 means `rate_limited`; any other
/// response or transport failure is an `error` report. A missing
/// address means the source is not configured.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    address: Option<String>,
    endpoint: String,
}

impl HttpProbe {
    pub fn new(address: Option<String>, endpoint: impl Into<String>) -> Self {
        Self {
            address,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn probe(&self) -> anyhow::Result<ProbeReport> {
        let Some(address) = &self.address else {
            return Ok(ProbeReport::not_configured());
        };
        let uri = format!("http://{}{}", address, self.endpoint);

        let stream = match tokio::net::TcpStream::connect(address).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
                debug!(%uri, "health probe connection refused");
                let mut report = ProbeReport::with_status(SourceStatus::Disconnected);
                report.error = Some(format!("connection refused: {address}"));
                return Ok(report);
            }
            Err(e) => {
                debug!(error = %e, %uri, "health probe connection failed");
                return Ok(ProbeReport::error(format!("connect {address}: {e}")));
            }
        };

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = http::Request::builder()
            .method("GET")
            .uri(&uri)
            .header("host", address.as_str())
            .header("user-agent", "pulsegrid-monitor/0.1")
            .body(http_body_util::Empty::<bytes::Bytes>::new())?;

        let resp = match sender.send_request(req).await {
            Ok(resp) => resp,
            Err(e) => {
                debug!(error = %e, %uri, "health probe request failed");
                return Ok(ProbeReport::error(format!("request failed: {e}")));
            }
        };

        let status = resp.status();
        if status.as_u16() == 429 {
            debug!(%uri, "health probe rate limited");
            return Ok(ProbeReport::with_status(SourceStatus::RateLimited));
        }
        if !status.is_success() {
            debug!(status = %status, %uri, "health probe non-2xx");
            return Ok(ProbeReport::error(format!(
                "health endpoint returned {status}"
            )));
        }

        let body = match resp.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(_) => bytes::Bytes::new(),
        };
        Ok(parse_health_body(&body))
    }
}

/// Interpret the JSON body of a 2xx health response. Anything that is
/// not a recognizable report means plain `connected`.
fn parse_health_body(body: &[u8]) -> ProbeReport {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct HealthBody {
        status: Option<String>,
        record_count: Option<u64>,
        last_sync: Option<u64>,
        next_sync: Option<u64>,
        error: Option<String>,
    }

    match serde_json::from_slice::<HealthBody>(body) {
        Ok(parsed) => {
            let status = parsed
                .status
                .as_deref()
                .map(SourceStatus::parse_lossy)
                .unwrap_or(SourceStatus::Connected);
            ProbeReport {
                status,
                record_count: parsed.record_count,
                last_sync: parsed.last_sync,
                next_sync: parsed.next_sync,
                error: parsed.error,
            }
        }
        Err(_) => ProbeReport::connected(),
    }
}
