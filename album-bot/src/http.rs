use crate::types::{BotError, HttpConfig, Result};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Upper bound on how long a single rate-limit wait may take.
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

/// Thin wrapper around a shared reqwest client that retries transient failures.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpConfig,
}

impl HttpClient {
    pub fn new(config: HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;

        Ok(Self { client, config })
    }

    /// Send the request built by `build`, retrying network errors, 5xx responses
    /// and rate limits. Any other response is returned to the caller as is.
    pub async fn send<F>(&self, what: &str, build: F) -> Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_secs(self.config.retry_delay_seconds),
            initial_interval: Duration::from_secs(self.config.retry_delay_seconds),
            max_interval: Duration::from_secs(self.config.retry_delay_seconds * 32),
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        };

        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            let is_last = attempt == self.config.max_retries;

            match build(&self.client).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let wait = retry_after(response).await;
                        last_error = Some(BotError::Upstream(format!("{} rate limited", what)));
                        if !is_last {
                            warn!("{} rate limited, retrying in {:?}", what, wait);
                            tokio::time::sleep(wait).await;
                            continue;
                        }
                        break;
                    }

                    if status.is_server_error() {
                        last_error = Some(BotError::Upstream(format!("{} returned HTTP {}", what, status)));
                        if !is_last {
                            if let Some(delay) = backoff.next_backoff() {
                                warn!("Attempt {} of {} failed with {}, retrying in {:?}", attempt + 1, what, status, delay);
                                tokio::time::sleep(delay).await;
                                continue;
                            }
                        }
                        break;
                    }

                    debug!("{} -> {}", what, status);
                    return Ok(response);
                }
                Err(e) => {
                    let retryable = e.is_timeout() || e.is_connect() || e.is_request();
                    last_error = Some(BotError::Http(e));
                    if retryable && !is_last {
                        if let Some(delay) = backoff.next_backoff() {
                            warn!("Attempt {} of {} failed, retrying in {:?}", attempt + 1, what, delay);
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                    }
                    break;
                }
            }
        }

        error!("{} failed after {} attempts", what, self.config.max_retries + 1);
        Err(last_error.unwrap_or_else(|| BotError::Upstream(format!("{} failed", what))))
    }
}

/// Fail with the response body when the status is not a success.
pub async fn expect_success(what: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BotError::Upstream(format!(
        "{} returned HTTP {}: {}",
        what,
        status,
        body.chars().take(200).collect::<String>()
    )))
}

async fn retry_after(response: Response) -> Duration {
    let header = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<f64>().ok());

    // Discord also reports the wait in the JSON body, with sub-second precision.
    let body = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|v| v.get("retry_after").and_then(|r| r.as_f64()));

    let seconds = body.or(header).unwrap_or(1.0).max(0.0);
    Duration::from_secs_f64(seconds).min(MAX_RATE_LIMIT_WAIT)
}
