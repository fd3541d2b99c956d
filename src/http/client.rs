//! GraphQL request executor with retry and rate limiting
//!
//! Provides an HTTP client that handles:
//! - Sending one GraphQL request unit and unwrapping its `data` object
//! - Outcome classification (transient vs terminal)
//! - Automatic retries driven by a caller-supplied `RetryPolicy`
//! - Optional client-side rate limiting

use super::backoff::{RetryPolicy, Sleeper, TokioSleeper};
use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::config::Credentials;
use crate::error::{Error, Result};
use crate::query::GraphqlRequest;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default GraphQL endpoint
pub const GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// Executes one request unit against the remote API.
///
/// Implementations retry transient failures according to `policy` and
/// return the GraphQL `data` object on success. They never hold pagination
/// state.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Execute a request, retrying transient failures
    async fn execute(&self, request: &GraphqlRequest, policy: &RetryPolicy) -> Result<Value>;
}

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// GraphQL endpoint
    pub endpoint: String,
    /// Request timeout
    pub timeout: Duration,
    /// Rate limiter configuration
    pub rate_limit: Option<RateLimiterConfig>,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            endpoint: GITHUB_GRAPHQL_URL.to_string(),
            timeout: Duration::from_secs(30),
            rate_limit: None,
            default_headers: HashMap::new(),
            user_agent: format!("repo-census/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the GraphQL endpoint
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Disable rate limiting
    pub fn no_rate_limit(mut self) -> Self {
        self.config.rate_limit = None;
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// GraphQL response envelope
#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphqlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorEntry {
    message: String,
}

impl GraphqlResponse {
    fn into_data(self) -> Result<Value> {
        let messages = self
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");

        match self.data {
            Some(data) if !data.is_null() => {
                if !messages.is_empty() {
                    warn!("GraphQL returned partial data with errors: {}", messages);
                }
                Ok(data)
            }
            _ if !messages.is_empty() => Err(Error::graphql(messages)),
            _ => Err(Error::decode("response has neither data nor errors")),
        }
    }
}

/// HTTP client with retry and rate limiting
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    rate_limiter: Option<RateLimiter>,
    sleeper: Arc<dyn Sleeper>,
}

impl HttpClient {
    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            config,
            rate_limiter,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Create a client that sends the given bearer token on every request
    pub fn with_credentials(config: HttpClientConfig, credentials: &Credentials) -> Result<Self> {
        let mut config = config;
        config.default_headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", credentials.token()),
        );
        Self::with_config(config)
    }

    /// Replace the sleeper used between retries
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Send a single attempt and classify the outcome
    pub async fn send_once(&self, request: &GraphqlRequest) -> Result<Value> {
        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait().await;
        }

        let mut req = self.client.post(&self.config.endpoint).json(request);
        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    timeout_ms: self.config.timeout.as_millis() as u64,
                }
            } else {
                Error::Http(e)
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited {
                retry_after_seconds: extract_retry_after(&response).unwrap_or(0),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::http_status(status.as_u16(), body));
        }

        let envelope: GraphqlResponse = response
            .json()
            .await
            .map_err(|e| Error::decode(format!("malformed GraphQL body: {e}")))?;
        envelope.into_data()
    }
}

#[async_trait]
impl QueryExecutor for HttpClient {
    async fn execute(&self, request: &GraphqlRequest, policy: &RetryPolicy) -> Result<Value> {
        let attempts = policy.attempts();
        let mut attempt = 0;

        loop {
            match self.send_once(request).await {
                Ok(data) => {
                    debug!("Request succeeded after {} attempt(s)", attempt + 1);
                    return Ok(data);
                }
                Err(err) if err.is_retryable() => {
                    attempt += 1;
                    if attempt >= attempts {
                        warn!("Giving up after {} attempts: {}", attempts, err);
                        return Err(Error::RetriesExhausted {
                            attempts,
                            last: Box::new(err),
                        });
                    }

                    let delay = retry_delay(policy, attempt - 1, &err);
                    warn!(
                        "Request failed ({}), attempt {}/{}, retrying in {:?}",
                        err, attempt, attempts, delay
                    );
                    self.sleeper.sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("endpoint", &self.config.endpoint)
            .field("timeout", &self.config.timeout)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Delay before the next attempt, stretched to honour `Retry-After`
fn retry_delay(policy: &RetryPolicy, attempt: u32, err: &Error) -> Duration {
    let delay = policy.delay(attempt);
    match err {
        Error::RateLimited {
            retry_after_seconds,
        } => delay.max(Duration::from_secs(*retry_after_seconds)),
        _ => delay,
    }
}

/// Extract retry-after header value
fn extract_retry_after(response: &Response) -> Option<u64> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
}
