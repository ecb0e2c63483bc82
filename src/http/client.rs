//! Downloading release assets with retries.

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::Client;
use std::future::Future;

use super::retry::{NonRetryableError, RetryPolicy, check_retryable};

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("mitt-install/", env!("MITT_INSTALL_VERSION"));

/// Largest body `get_bytes` will hold in memory.
pub const MAX_ASSET_BYTES: usize = 256 << 20;

/// Upper bound on the up-front allocation taken from `Content-Length`.
const PREALLOCATE_LIMIT: usize = 8 << 20;

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    policy: RetryPolicy,
    max_body: usize,
}

impl HttpClient {
    /// Wrap an existing reqwest client with the default retry policy.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            policy: RetryPolicy::default(),
            max_body: MAX_ASSET_BYTES,
        }
    }

    /// A client that sends this tool's user agent.
    pub fn build(policy: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::new(client).with_policy(policy))
    }

    pub fn with_policy(self, policy: RetryPolicy) -> Self {
        Self { policy, ..self }
    }

    pub fn with_max_body(self, max_body: usize) -> Self {
        Self { max_body, ..self }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Read the whole body at `url` into memory.
    ///
    /// Transport errors and 5xx responses are retried per the policy; 4xx
    /// responses and bodies over the size limit fail on the first attempt.
    #[tracing::instrument(skip(self))]
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.with_retry(url, || self.fetch_once(url)).await
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<u8>> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .context("Request failed")?
            .error_for_status()
            .map_err(check_retryable)?;

        let too_large = NonRetryableError::TooLarge {
            limit: self.max_body,
        };
        let declared = response.content_length().unwrap_or_default();
        if declared > self.max_body as u64 {
            debug!("{} declares {} bytes", url, declared);
            return Err(too_large.into());
        }

        let mut body = Vec::with_capacity((declared as usize).min(PREALLOCATE_LIMIT));
        while let Some(chunk) = response
            .chunk()
            .await
            .context("Connection dropped while reading body")?
        {
            if body.len() + chunk.len() > self.max_body {
                return Err(too_large.into());
            }
            body.extend_from_slice(&chunk);
        }
        debug!("Read {} bytes from {}", body.len(), url);
        Ok(body)
    }

    async fn with_retry<F, Fut, T>(&self, what: &str, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.policy.max_attempts.max(1);
        let mut tried = 0;
        loop {
            tried += 1;
            let err = match attempt().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if err.downcast_ref::<NonRetryableError>().is_some() {
                debug!("{}: giving up, {}", what, err);
                return Err(err);
            }
            if tried >= attempts {
                return Err(err.context(format!("Gave up after {} attempt(s)", tried)));
            }

            warn!(
                "{}: attempt {}/{} failed ({:#}), retrying in {}ms",
                what,
                tried,
                attempts,
                err,
                self.policy.delay.as_millis()
            );
            tokio::time::sleep(self.policy.delay).await;
        }
    }
}
