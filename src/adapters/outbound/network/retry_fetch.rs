use crate::shared::error::CdnError;
use crate::shared::CdnResult;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

/// How many times a request is attempted and how long to wait in between.
///
/// The delay is fixed: no jitter, no exponential growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
    pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(250);

    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts,
            retry_delay,
        }
    }

    /// One attempt, no retries.
    pub fn single_attempt() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Effective attempt count; a zero bound still makes one attempt.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_RETRY_DELAY)
    }
}

/// Returned by [`retry_with`] once every attempt has failed.
#[derive(Debug)]
pub struct Exhausted<E> {
    pub attempts: u32,
    /// Error of the final attempt; earlier errors are dropped
    pub last_error: E,
}

/// Runs `operation` until it succeeds or the policy's attempts run out.
///
/// `operation` receives the 1-based attempt number. Attempts are strictly
/// sequential.
pub async fn retry_with<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, Exhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if attempt >= attempts => {
                return Err(Exhausted {
                    attempts,
                    last_error: error,
                })
            }
            Err(_) => {
                tokio::time::sleep(policy.retry_delay).await;
                attempt += 1;
            }
        }
    }
}

/// Error body the CDN sends alongside non-success statuses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Bounded-retry GET used by every CDN request.
///
/// Transport failures and non-success statuses are retried; each call runs
/// its own attempt sequence and concurrent calls are not coalesced.
#[derive(Debug, Clone)]
pub struct RetryFetch {
    client: reqwest::Client,
}

impl RetryFetch {
    const TIMEOUT_SECONDS: u64 = 30;

    /// Creates a fetcher with the default request timeout
    pub fn new() -> CdnResult<Self> {
        Self::with_timeout(Duration::from_secs(Self::TIMEOUT_SECONDS))
    }

    /// Creates a fetcher whose individual attempts time out after `timeout`
    pub fn with_timeout(timeout: Duration) -> CdnResult<Self> {
        let version = env!("CARGO_PKG_VERSION");
        let user_agent = format!("cdn-harness/{}", version);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(CdnError::Client)?;

        Ok(Self { client })
    }

    /// Fetches `url`, returning the response body of the first successful attempt.
    ///
    /// # Errors
    /// `CdnError::RequestExhausted` wrapping the final attempt's error once
    /// `policy` runs out of attempts.
    pub async fn fetch(&self, url: &str, policy: &RetryPolicy) -> CdnResult<Vec<u8>> {
        retry_with(policy, |_| self.fetch_once(url))
            .await
            .map_err(|exhausted| CdnError::RequestExhausted {
                attempts: exhausted.attempts,
                source: Box::new(exhausted.last_error),
            })
    }

    /// Sends GET requests to `url` until the server answers at all and
    /// returns the status of that answer.
    ///
    /// Only transport failures (refused connection, timeout) are retried;
    /// any HTTP status, 5xx included, counts as an answer.
    pub async fn fetch_status(&self, url: &str, policy: &RetryPolicy) -> CdnResult<u16> {
        retry_with(policy, |_| async move {
            self.client
                .get(url)
                .send()
                .await
                .map(|response| response.status().as_u16())
                .map_err(|source| CdnError::Transport {
                    url: url.to_string(),
                    source,
                })
        })
        .await
        .map_err(|exhausted| CdnError::RequestExhausted {
            attempts: exhausted.attempts,
            source: Box::new(exhausted.last_error),
        })
    }

    async fn fetch_once(&self, url: &str) -> CdnResult<Vec<u8>> {
        let transport = |source: reqwest::Error| CdnError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport)?;

        if !status.is_success() {
            return Err(CdnError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        Ok(body.to_vec())
    }
}

fn error_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .map(|body| body.message)
}
