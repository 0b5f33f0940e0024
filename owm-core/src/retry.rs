//! Single-request fetching with a bounded, fixed-delay retry on transport failures.
//!
//! Retried:
//! - connection failures, timeouts, resets ([`OwmError::Transport`])
//!
//! Not retried:
//! - responses with a non-2xx status ([`OwmError::Protocol`])
//! - bodies that do not decode ([`OwmError::Decode`])
//! - requests that cannot be built ([`OwmError::InvalidRequest`])

use std::{sync::Arc, time::Duration};

use rand::Rng;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    error::OwmError,
    http::{HttpTransport, redact_api_key},
};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 5000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Fixed wait between attempts.
    pub delay_ms: u64,
    /// Upper bound of a random extra wait added to each delay.
    pub jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS, delay_ms: DEFAULT_RETRY_DELAY_MS, jitter_ms: 0 }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        let jitter = if self.jitter_ms > 0 { rand::rng().random_range(0..=self.jitter_ms) } else { 0 };
        Duration::from_millis(self.delay_ms.saturating_add(jitter))
    }
}

#[derive(Debug, Clone)]
pub struct RetryingFetcher {
    transport: Arc<dyn HttpTransport>,
    config: RetryConfig,
    user_agent: String,
}

impl RetryingFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, config: RetryConfig, user_agent: String) -> Self {
        Self { transport, config, user_agent }
    }

    pub fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.transport
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// GET `url` and return the body of a 2xx response.
    ///
    /// Transport failures are retried up to `max_attempts` total tries with
    /// `delay` in between; the last one is returned if all fail.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, OwmError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.fetch_once(url).await {
                Ok(body) => {
                    if attempt > 1 {
                        tracing::info!(attempt, "Request succeeded after retrying");
                    }
                    return Ok(body);
                }
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = self.config.delay();
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        ?delay,
                        error = %err,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_transient() {
                        tracing::error!(max_attempts, error = %err, "All attempts exhausted");
                    } else {
                        tracing::debug!(error = %err, "Non-retryable failure");
                    }
                    return Err(err);
                }
            }
        }
    }

    /// [`fetch`](Self::fetch) and decode the body as JSON. Decoding errors are never retried.
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, OwmError> {
        let body = self.fetch(url).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// One request, no retry.
    pub async fn fetch_once(&self, url: &str) -> Result<Vec<u8>, OwmError> {
        tracing::debug!(url = %redact_api_key(url), "GET");

        let res = self.transport.get(url, &[("User-Agent", self.user_agent.as_str())]).await?;

        if !res.is_success() {
            return Err(OwmError::Protocol {
                status: res.status,
                message: truncate_body(&String::from_utf8_lossy(&res.body)),
            });
        }

        Ok(res.body)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}
