//! JSON-over-HTTP calls with retry, shared by the embedding and answer
//! providers.
//!
//! Retry strategy:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: base, 2×base, 4×base, ... (capped at 2^5 × base)

use anyhow::{anyhow, bail, Result};
use std::time::Duration;

/// Timeout and retry settings for one provider.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub max_retries: u32,
    /// First backoff delay; doubles on each further retry.
    pub backoff_base: Duration,
}

impl HttpSettings {
    pub fn new(timeout_secs: u64, max_retries: u32) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
            max_retries,
            backoff_base: Duration::from_secs(1),
        }
    }

    pub fn client(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder().timeout(self.timeout).build()?)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base * (1u32 << (attempt - 1).min(5))
    }
}

/// POST `body` to `url` and return the parsed JSON response.
///
/// `label` names the provider in errors and logs.
pub async fn post_json(
    client: &reqwest::Client,
    settings: &HttpSettings,
    label: &str,
    url: &str,
    headers: &[(&str, String)],
    body: &serde_json::Value,
) -> Result<serde_json::Value> {
    let mut last_err = None;

    for attempt in 0..=settings.max_retries {
        if attempt > 0 {
            let delay = settings.backoff(attempt);
            tracing::debug!(provider = label, attempt, delay_ms = delay.as_millis() as u64, "retrying request");
            tokio::time::sleep(delay).await;
        }

        let mut request = client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, value);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: serde_json::Value = response
                        .json()
                        .await
                        .map_err(|e| anyhow!("{} returned invalid JSON: {}", label, e.without_url()))?;
                    return Ok(json);
                }

                let body_text = response.text().await.unwrap_or_default();
                if status.as_u16() == 429 || status.is_server_error() {
                    tracing::warn!(provider = label, %status, attempt, "transient provider error");
                    last_err = Some(anyhow!("{} API error {}: {}", label, status, body_text));
                    continue;
                }

                bail!("{} API error {}: {}", label, status, body_text);
            }
            Err(e) => {
                // Errors carry the request URL; strip it before logging.
                let e = e.without_url();
                tracing::warn!(provider = label, attempt, error = %e, "provider request failed");
                last_err = Some(anyhow!("{} connection error: {}", label, e));
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("{} request failed after retries", label)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let s = HttpSettings::new(5, 10);
        assert_eq!(s.backoff(1), Duration::from_secs(1));
        assert_eq!(s.backoff(2), Duration::from_secs(2));
        assert_eq!(s.backoff(4), Duration::from_secs(8));
        assert_eq!(s.backoff(9), Duration::from_secs(32));
    }
}
