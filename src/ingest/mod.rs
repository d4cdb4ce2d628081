//! Ingestion notifier
//!
//! Tells the asynchronous ingest service that a named staged file is ready
//! for loading. One request/response pair per call, addressed to the fully
//! qualified pipe; the service owns deduplication, so notify-by-name is safe
//! to retry on transport failures.

mod jwt;

pub use jwt::KeyPairAuth;

use crate::config::SnowflakeConfig;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(250);

/// One staged file reference in an insert request
#[derive(Debug, Serialize)]
struct StagedFileRef {
    path: String,
}

#[derive(Debug, Serialize)]
struct InsertRequest {
    files: Vec<StagedFileRef>,
}

/// Response from the ingest service
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    /// Service acknowledgment code; `SUCCESS` means the file was queued
    pub response_code: String,
    #[serde(default)]
    pub request_id: Option<String>,
}

impl IngestResponse {
    /// Whether the file was accepted for loading
    pub fn is_success(&self) -> bool {
        self.response_code == "SUCCESS"
    }
}

/// Client for the pipe's `insertFiles` endpoint
pub struct IngestClient {
    http: reqwest::Client,
    base_url: String,
    pipe_fqn: String,
    auth: KeyPairAuth,
    max_retries: u32,
    initial_backoff: Duration,
}

impl IngestClient {
    /// Build a client from the loaded configuration
    pub fn new(config: &SnowflakeConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(format!("liftpipe/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::from)?;
        Ok(Self {
            http,
            base_url: config.ingest_base_url().trim_end_matches('/').to_string(),
            pipe_fqn: config.pipe_fqn(),
            auth: KeyPairAuth::new(config)?,
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
        })
    }

    /// Override the retry policy
    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, initial_backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.initial_backoff = initial_backoff;
        self
    }

    /// Fully qualified pipe this client notifies
    pub fn pipe(&self) -> &str {
        &self.pipe_fqn
    }

    /// Submit one staged file name for asynchronous loading.
    ///
    /// Transport failures and retryable statuses are retried with bounded
    /// backoff; the returned response code still needs to be checked by the
    /// caller, since a non-success acknowledgment is not an abort.
    pub async fn insert_file(&self, file_name: &str) -> Result<IngestResponse> {
        let url = format!(
            "{}/v1/data/pipes/{}/insertFiles",
            self.base_url, self.pipe_fqn
        );
        let body = InsertRequest {
            files: vec![StagedFileRef {
                path: file_name.to_string(),
            }],
        };

        let mut attempt = 0;
        loop {
            let result = self
                .http
                .post(&url)
                .query(&[("requestId", Uuid::new_v4().to_string())])
                .bearer_auth(self.auth.token().await?)
                .json(&body)
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let parsed: IngestResponse = response.json().await.map_err(|e| {
                            Error::ingest(format!("invalid ingest response: {e}"))
                        })?;
                        debug!(
                            file = file_name,
                            pipe = %self.pipe_fqn,
                            code = %parsed.response_code,
                            "ingest request acknowledged"
                        );
                        return Ok(parsed);
                    }

                    let err = Error::IngestStatus {
                        status: status.as_u16(),
                        body: response.text().await.unwrap_or_default(),
                    };
                    if err.is_retryable() && attempt < self.max_retries {
                        self.backoff(attempt, file_name, &err).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(err);
                }
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < self.max_retries => {
                    let err = Error::from(e);
                    self.backoff(attempt, file_name, &err).await;
                    attempt += 1;
                }
                Err(e) => return Err(Error::from(e)),
            }
        }
    }

    async fn backoff(&self, attempt: u32, file_name: &str, err: &Error) {
        let delay = self.initial_backoff * 2u32.pow(attempt);
        warn!(
            file = file_name,
            pipe = %self.pipe_fqn,
            attempt = attempt + 1,
            "ingest request failed, retrying in {delay:?}: {err}"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests;
