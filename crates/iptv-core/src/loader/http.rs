use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::{LoadError, ManifestLoader};
use crate::config::PlayerConfig;

/// HTTP loader with a pooled client and exponential backoff between retries.
#[derive(Debug, Clone)]
pub struct HttpLoader {
    client: Client,
    max_retries: u32,
    base_backoff: Duration,
}

impl HttpLoader {
    pub fn new(timeout: Duration, max_retries: u32, base_backoff: Duration) -> Result<Self, LoadError> {
        Ok(Self::with_client(Self::build_client(timeout)?, max_retries, base_backoff))
    }

    pub fn with_client(client: Client, max_retries: u32, base_backoff: Duration) -> Self {
        Self {
            client,
            max_retries,
            base_backoff,
        }
    }

    pub fn from_config(config: &PlayerConfig) -> Result<Self, LoadError> {
        Self::new(config.request_timeout, config.max_retries, config.retry_backoff)
    }

    /// Same client, no retries. Catalog fetches are never retried.
    pub fn single_shot(&self) -> Self {
        Self::with_client(self.client.clone(), 0, self.base_backoff)
    }

    pub fn build_client(timeout: Duration) -> Result<Client, LoadError> {
        Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .pool_max_idle_per_host(8)
            .gzip(true)
            .build()
            .map_err(|e| LoadError::Client(e.to_string()))
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        self.base_backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

#[async_trait]
impl ManifestLoader for HttpLoader {
    async fn load(&self, uri: &str) -> Result<String, LoadError> {
        let mut attempts = 0;

        loop {
            if attempts > 0 {
                let backoff = self.backoff_for(attempts);
                debug!(uri, attempts, backoff_ms = backoff.as_millis() as u64, "Retrying fetch");
                tokio::time::sleep(backoff).await;
            }
            attempts += 1;

            let err = match self.client.get(uri).send().await {
                Ok(response) if response.status().is_success() => match response.text().await {
                    Ok(body) => return Ok(body),
                    Err(e) => LoadError::Network {
                        url: uri.to_string(),
                        reason: e.to_string(),
                        attempts,
                    },
                },
                Ok(response) => {
                    let status = response.status().as_u16();
                    warn!(uri, status, attempts, "Fetch returned error status");
                    LoadError::Status {
                        url: uri.to_string(),
                        status,
                        attempts,
                    }
                }
                Err(e) if e.is_timeout() => {
                    warn!(uri, attempts, "Fetch timed out");
                    LoadError::Timeout {
                        url: uri.to_string(),
                        attempts,
                    }
                }
                Err(e) => {
                    warn!(uri, attempts, error = %e, "Fetch network error");
                    LoadError::Network {
                        url: uri.to_string(),
                        reason: e.to_string(),
                        attempts,
                    }
                }
            };

            if attempts > self.max_retries || !err.is_retryable() {
                return Err(err);
            }
        }
    }
}
