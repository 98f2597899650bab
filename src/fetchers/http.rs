// src/fetchers/http.rs
//! Retrying JSON client shared by the aggregator fetchers and the Gemini client

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::core::config_manager::RetryConfig;

pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    retry: RetryConfig,
}

impl HttpFetcher {
    pub fn new(retry: RetryConfig) -> Result<Self> {
        Self::with_timeout(retry, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(retry: RetryConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, retry })
    }

    pub async fn get_json(
        &self,
        url: &str,
        query: &[(&str, String)],
        headers: &[(&str, &str)],
    ) -> Result<Value> {
        self.send_with_retry(url, || {
            let mut request = self.client.get(url).query(query);
            for (name, value) in headers {
                request = request.header(*name, *value);
            }
            request
        })
        .await
    }

    pub async fn post_json(
        &self,
        url: &str,
        body: &Value,
        headers: &[(&str, &str)],
    ) -> Result<Value> {
        self.send_with_retry(url, || {
            let mut request = self.client.post(url).json(body);
            for (name, value) in headers {
                request = request.header(*name, *value);
            }
            request
        })
        .await
    }

    /// Delay before retry number `attempt` (1-based), doubling up to the configured cap
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        let delay = self.retry.base_delay_ms.saturating_mul(factor);
        Duration::from_millis(delay.min(self.retry.max_delay_ms))
    }

    async fn send_with_retry<F>(&self, url: &str, build: F) -> Result<Value>
    where
        F: Fn() -> RequestBuilder,
    {
        let attempts = self.retry.attempts.max(1);
        let target = origin(url);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match Self::send_once(build()).await {
                Ok(value) => return Ok(value),
                Err(RequestError::Fatal(e)) => return Err(e),
                Err(RequestError::Retryable(e)) if attempt >= attempts => {
                    return Err(e.context(format!("Giving up on {} after {} attempts", target, attempt)));
                }
                Err(RequestError::Retryable(e)) => {
                    let delay = self.backoff(attempt);
                    warn!(
                        "Request to {} failed (attempt {}/{}): {:#}. Retrying in {:?}",
                        target, attempt, attempts, e, delay
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    async fn send_once(request: RequestBuilder) -> Result<Value, RequestError> {
        let response = request.send().await.map_err(|e| {
            RequestError::Retryable(anyhow::Error::new(e.without_url()).context("HTTP request failed"))
        })?;

        let status = response.status();
        debug!("Response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = anyhow::anyhow!("Service returned error status {}: {}", status, body);
            return Err(if is_retryable(status) {
                RequestError::Retryable(error)
            } else {
                RequestError::Fatal(error)
            });
        }

        response.json::<Value>().await.map_err(|e| {
            RequestError::Fatal(
                anyhow::Error::new(e.without_url()).context("Failed to parse JSON response"),
            )
        })
    }
}

enum RequestError {
    Retryable(anyhow::Error),
    Fatal(anyhow::Error),
}

/// Scheme and host only; some APIs carry the key in the path
fn origin(url: &str) -> String {
    reqwest::Url::parse(url)
        .map(|u| u.origin().ascii_serialization())
        .unwrap_or_else(|_| "<invalid url>".to_string())
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 5,
        }
    }

    #[test]
    fn test_origin_hides_path() {
        assert_eq!(
            origin("https://jooble.org/api/secret-key"),
            "https://jooble.org"
        );
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let fetcher = HttpFetcher::new(RetryConfig {
            attempts: 3,
            base_delay_ms: 4_000,
            max_delay_ms: 10_000,
        })
        .unwrap();
        assert_eq!(fetcher.backoff(1), Duration::from_millis(4_000));
        assert_eq!(fetcher.backoff(2), Duration::from_millis(8_000));
        assert_eq!(fetcher.backoff(3), Duration::from_millis(10_000));
    }

    #[tokio::test]
    async fn test_retries_server_errors_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(fast_retry()).unwrap();
        let value = fetcher
            .get_json(&format!("{}/flaky", server.uri()), &[], &[])
            .await
            .unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/denied"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(fast_retry()).unwrap();
        let result = fetcher
            .post_json(&format!("{}/denied", server.uri()), &json!({}), &[])
            .await;
        assert!(result.is_err());
    }
}
