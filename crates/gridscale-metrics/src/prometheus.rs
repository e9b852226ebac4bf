//! Prometheus HTTP API client.
//!
//! Executes instant queries against `/api/v1/query` and reduces the
//! answer to a single scalar. Vector results contribute their first
//! element; empty vectors and matrix/string results are errors, so the
//! policy engine only ever sees well-formed samples.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::source::{MetricError, MetricResult, MetricSource, MetricSourceProvider};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for one Prometheus base URL.
#[derive(Debug, Clone)]
pub struct PrometheusClient {
    /// `host:port` to connect to.
    address: String,
    /// Path prefix from the base URL, usually empty.
    base_path: String,
    timeout: Duration,
}

impl PrometheusClient {
    /// Build a client for a base URL like `http://prom.monitoring:9090`.
    pub fn new(base_url: &str) -> MetricResult<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> MetricResult<Self> {
        let invalid = |message: &str| MetricError::InvalidUrl {
            url: base_url.to_string(),
            message: message.to_string(),
        };

        let uri: http::Uri = base_url.parse().map_err(|_| invalid("not a valid uri"))?;
        match uri.scheme_str() {
            Some("http") => {}
            Some(other) => return Err(invalid(&format!("unsupported scheme {other:?}"))),
            None => return Err(invalid("missing scheme")),
        }
        let host = uri.host().ok_or_else(|| invalid("missing host"))?;
        let port = uri.port_u16().unwrap_or(80);
        let base_path = uri.path().trim_end_matches('/').to_string();

        Ok(Self {
            address: format!("{host}:{port}"),
            base_path,
            timeout,
        })
    }

    async fn fetch(&self, path: &str) -> MetricResult<bytes::Bytes> {
        let stream = tokio::net::TcpStream::connect(&self.address)
            .await
            .map_err(|e| MetricError::Connect {
                address: self.address.clone(),
                message: e.to_string(),
            })?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| MetricError::Http(e.to_string()))?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = http::Request::builder()
            .method("GET")
            .uri(path)
            .header("host", &self.address)
            .header("user-agent", "gridscale-metrics/0.1")
            .body(http_body_util::Empty::<bytes::Bytes>::new())
            .map_err(|e| MetricError::Http(e.to_string()))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| MetricError::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(MetricError::Status(status.as_u16()));
        }

        use http_body_util::BodyExt;
        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| MetricError::Http(e.to_string()))?;
        Ok(body.to_bytes())
    }
}

#[async_trait::async_trait]
impl MetricSource for PrometheusClient {
    async fn query(&self, query: &str) -> MetricResult<f64> {
        let path = format!(
            "{}/api/v1/query?query={}",
            self.base_path,
            urlencode(query)
        );

        let body = tokio::time::timeout(self.timeout, self.fetch(&path))
            .await
            .map_err(|_| MetricError::Http("request timed out".to_string()))??;

        let value = scalar_from_response(&body)?;
        debug!(address = %self.address, query, value, "prometheus query resolved");
        Ok(value)
    }
}

/// Default provider: one fresh client per configured endpoint.
#[derive(Debug, Clone)]
pub struct PrometheusProvider {
    timeout: Duration,
}

impl PrometheusProvider {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for PrometheusProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSourceProvider for PrometheusProvider {
    fn acquire(&self, url: &str) -> MetricResult<Arc<dyn MetricSource>> {
        Ok(Arc::new(PrometheusClient::with_timeout(url, self.timeout)?))
    }
}

// ── Response decoding ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(rename = "resultType")]
    result_type: String,
    result: serde_json::Value,
}

/// Reduce a `/api/v1/query` response body to a single scalar.
fn scalar_from_response(body: &[u8]) -> MetricResult<f64> {
    let resp: ApiResponse =
        serde_json::from_slice(body).map_err(|e| MetricError::Decode(e.to_string()))?;

    if resp.status != "success" {
        return Err(MetricError::Query(
            resp.error.unwrap_or_else(|| "unknown error".to_string()),
        ));
    }

    let data = resp
        .data
        .ok_or_else(|| MetricError::Decode("missing data field".to_string()))?;

    match data.result_type.as_str() {
        "vector" => {
            let first = data
                .result
                .as_array()
                .and_then(|items| items.first())
                .ok_or(MetricError::Empty)?;
            value_from_pair(first.get("value"))
        }
        "scalar" => value_from_pair(Some(&data.result)),
        other => Err(MetricError::UnexpectedResultType(other.to_string())),
    }
}

/// Decode a Prometheus `[timestamp, "value"]` pair.
fn value_from_pair(pair: Option<&serde_json::Value>) -> MetricResult<f64> {
    pair.and_then(|v| v.as_array())
        .and_then(|v| v.get(1))
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| MetricError::Decode("malformed sample value".to_string()))
}

/// Percent-encode a query expression for use in a URL query string.
fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}
