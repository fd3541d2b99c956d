//! Request executor module
//!
//! Sends GraphQL request units with retry, backoff and rate limiting.
//!
//! # Features
//!
//! - **Outcome classification**: transient (gateway, timeout, 429) vs terminal
//! - **Retry policies**: constant, linear and exponential backoff as data
//! - **Fake clock**: the `Sleeper` trait lets tests observe delays without waiting
//! - **Rate Limiting**: optional token bucket using governor

mod backoff;
mod client;
mod rate_limit;

pub use backoff::{RecordingSleeper, RetryPolicy, Sleeper, TokioSleeper};
pub use client::{HttpClient, HttpClientConfig, QueryExecutor, GITHUB_GRAPHQL_URL};
pub use rate_limit::{RateLimiter, RateLimiterConfig};

#[cfg(test)]
mod tests;
