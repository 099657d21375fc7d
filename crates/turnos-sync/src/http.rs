//! Upstream page fetches with bounded retry.

use std::time::Duration;

use tracing::{debug, warn};

use crate::SyncError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("turnos/", env!("CARGO_PKG_VERSION"));

/// Fixed attempt count with exponential backoff between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    pub factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(2),
            factor: 2,
        }
    }
}

impl RetryPolicy {
    /// Wait after the `attempt`-th failure (1-based) before trying again.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * self.factor.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Shared GET client for scrapers. Cheap to clone.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            policy: RetryPolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// GET `url` and return the body as text.
    ///
    /// Network errors and 5xx responses are retried per the policy; a 4xx
    /// response fails on the first attempt.
    pub async fn get_text(&self, url: &str) -> Result<String, SyncError> {
        let mut attempt = 1;
        loop {
            match self.try_get(url).await {
                Ok(body) => {
                    debug!(url, attempt, bytes = body.len(), "fetched");
                    return Ok(body);
                }
                Err(e) if e.is_transient() && attempt < self.policy.attempts => {
                    let delay = self.policy.delay_after(attempt);
                    warn!(url, attempt, error = %e, delay_ms = delay.as_millis() as u64, "fetch failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_get(&self, url: &str) -> Result<String, SyncError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Server {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }
        Ok(resp.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::serve;

    fn fast() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            base_delay: Duration::from_millis(1),
            factor: 2,
        }
    }

    #[test]
    fn default_backoff_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 3);
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn server_errors_are_retried_until_success() {
        let server = serve(vec![(503, "busy"), (502, "busy"), (200, "<html>ok</html>")]).await;
        let fetcher = HttpFetcher::new().unwrap().with_policy(fast());

        let body = fetcher.get_text(&server.url).await.unwrap();

        assert_eq!(body, "<html>ok</html>");
        assert_eq!(server.hits(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_last_attempt() {
        let server = serve(vec![(500, "down")]).await;
        let fetcher = HttpFetcher::new().unwrap().with_policy(fast());

        let err = fetcher.get_text(&server.url).await.unwrap_err();

        assert!(matches!(err, SyncError::Server { status: 500, .. }));
        assert_eq!(server.hits(), 3);
    }

    #[tokio::test]
    async fn client_errors_fail_fast() {
        let server = serve(vec![(404, "not found")]).await;
        let fetcher = HttpFetcher::new().unwrap().with_policy(fast());

        let err = fetcher.get_text(&server.url).await.unwrap_err();

        assert!(matches!(err, SyncError::Server { status: 404, .. }));
        assert_eq!(server.hits(), 1);
    }
}
