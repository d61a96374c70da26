//! Sequential, retrying client for the elevation lookup service.
//!
//! Points are sent in consecutive batches, one request per batch, strictly in
//! order. A transient failure (transport error, non-success HTTP status,
//! unreadable body, non-`OK` service status) is retried with linear backoff;
//! exhausting the attempts for any batch aborts the whole run.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use trackalt_shared::{AltitudeResult, Coordinate, FetchConfig, Result, TrackAltError};

use crate::batch::{backoff_delay, batch_ranges, locations_param, round_elevation};

/// User-Agent string for lookup requests.
const USER_AGENT: &str = concat!("trackalt/", env!("CARGO_PKG_VERSION"));

/// Status the service reports on success.
const STATUS_OK: &str = "OK";

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ElevationResponse {
    status: String,
    #[serde(default)]
    results: Vec<ElevationSample>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ElevationSample {
    #[serde(default)]
    elevation: Option<f64>,
}

// ---------------------------------------------------------------------------
// ElevationClient
// ---------------------------------------------------------------------------

/// Batched elevation lookups against a single endpoint.
pub struct ElevationClient {
    config: FetchConfig,
    client: Client,
}

impl ElevationClient {
    /// Create a client. Fails if the config is unusable.
    pub fn new(config: FetchConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TrackAltError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Look up every point, returning altitudes in the same order.
    ///
    /// Batches run one after another with `batch_pause` in between. The
    /// result has exactly `points.len()` entries; `None` marks a point the
    /// service had no elevation for.
    #[instrument(skip_all, fields(points = points.len(), batch_size = self.config.batch_size))]
    pub async fn fetch_all(&self, points: &[Coordinate]) -> Result<Vec<AltitudeResult>> {
        let ranges = batch_ranges(points.len(), self.config.batch_size);
        let total = ranges.len();
        let mut altitudes = Vec::with_capacity(points.len());

        info!(batches = total, "starting elevation lookups");

        for (index, range) in ranges.into_iter().enumerate() {
            if index > 0 && !self.config.batch_pause.is_zero() {
                tokio::time::sleep(self.config.batch_pause).await;
            }

            let batch_no = index + 1;
            let batch = &points[range];
            let results = self.fetch_batch(batch_no, batch).await?;
            altitudes.extend(results);

            debug!(batch = batch_no, total, size = batch.len(), "batch complete");
        }

        let missing = altitudes.iter().filter(|a| a.is_none()).count();
        info!(points = altitudes.len(), missing, "elevation lookups complete");

        Ok(altitudes)
    }

    /// Fetch one batch, retrying transient failures up to `max_attempts`.
    async fn fetch_batch(&self, batch_no: usize, batch: &[Coordinate]) -> Result<Vec<AltitudeResult>> {
        let max_attempts = self.config.max_attempts;
        let mut attempt: u32 = 1;

        loop {
            match self.request(batch).await {
                Ok(samples) => {
                    if samples.len() != batch.len() {
                        return Err(TrackAltError::ResultCardinalityMismatch {
                            batch: batch_no,
                            expected: batch.len(),
                            actual: samples.len(),
                        });
                    }
                    return Ok(samples
                        .into_iter()
                        .map(|s| s.elevation.map(round_elevation))
                        .collect());
                }
                Err(TrackAltError::Network(message)) => {
                    if attempt >= max_attempts {
                        return Err(TrackAltError::LookupFailure {
                            batch: batch_no,
                            attempts: attempt,
                            message,
                        });
                    }

                    let delay = backoff_delay(self.config.retry_base_delay, attempt);
                    warn!(
                        batch = batch_no,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %message,
                        "elevation lookup failed, retrying"
                    );
                    sleep_unless_zero(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One request for one batch. Every failure is reported as `Network`.
    async fn request(&self, batch: &[Coordinate]) -> Result<Vec<ElevationSample>> {
        let locations = locations_param(batch);

        let response = self
            .client
            .get(self.config.endpoint.clone())
            .query(&[("locations", locations.as_str()), ("key", self.config.api_key.as_str())])
            .send()
            .await
            // The URL carries the credential; keep it out of messages.
            .map_err(|e| TrackAltError::Network(format!("request failed: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrackAltError::Network(format!("HTTP {status}")));
        }

        let body: ElevationResponse = response.json().await.map_err(|e| {
            TrackAltError::Network(format!("invalid response body: {}", e.without_url()))
        })?;

        if body.status != STATUS_OK {
            let detail = body
                .error_message
                .map(|m| format!(": {m}"))
                .unwrap_or_default();
            return Err(TrackAltError::Network(format!(
                "service status {}{detail}",
                body.status
            )));
        }

        Ok(body.results)
    }
}

async fn sleep_unless_zero(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
