//! Pipeline configuration
//!
//! Everything a run needs is collected into one `PipelineConfig`, built once
//! at startup (YAML file, then CLI overrides) and passed down by reference.
//! Credentials live in a separate `Credentials` value so the config can be
//! printed or serialized without leaking the token.

use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, RateLimiterConfig, RetryPolicy, GITHUB_GRAPHQL_URL};
use crate::stats::{default_aggregates, AggregateSpec};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the API token
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

// ============================================================================
// Credentials
// ============================================================================

/// Read-only API credentials
#[derive(Clone)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    /// Wrap a token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Read the token from `GITHUB_TOKEN`
    pub fn from_env() -> Result<Self> {
        match std::env::var(TOKEN_ENV_VAR) {
            Ok(token) if !token.trim().is_empty() => Ok(Self::new(token.trim())),
            _ => Err(Error::missing_field(TOKEN_ENV_VAR)),
        }
    }

    /// The bearer token
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// API
// ============================================================================

/// Remote API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// GraphQL endpoint
    pub endpoint: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Optional user agent override
    pub user_agent: Option<String>,
    /// Optional client-side rate limit
    pub rate_limit: Option<RateLimiterConfig>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: GITHUB_GRAPHQL_URL.to_string(),
            timeout_secs: 30,
            user_agent: None,
            rate_limit: None,
        }
    }
}

impl ApiConfig {
    /// Build the HTTP client configuration
    pub fn http_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .endpoint(&self.endpoint)
            .timeout(Duration::from_secs(self.timeout_secs));
        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent);
        }
        if let Some(limit) = &self.rate_limit {
            builder = builder.rate_limit(limit.clone());
        }
        builder.build()
    }
}

// ============================================================================
// Enrichment
// ============================================================================

/// Per-repository pull request enrichment settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Whether to enrich at all
    pub enabled: bool,
    /// Maximum pages of pull requests listed per repository
    pub max_sub_pages: u32,
    /// Pull requests per listing page
    pub sub_page_size: u32,
    /// Maximum reviewed pull requests whose detail is fetched per repository
    pub max_sub_items_per_item: usize,
    /// Resolutions faster than this many hours are dropped
    pub min_resolution_hours: f64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_sub_pages: 3,
            sub_page_size: 100,
            max_sub_items_per_item: 10,
            min_resolution_hours: 1.0,
        }
    }
}

// ============================================================================
// Static Analysis
// ============================================================================

/// External static analysis collaborator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Program to run; receives the checkout path as its last argument
    pub program: String,
    /// Extra arguments placed before the path
    #[serde(default)]
    pub args: Vec<String>,
    /// Directory where repositories are checked out
    #[serde(default = "default_workdir")]
    pub workdir: PathBuf,
    /// Clone each repository before analysis
    #[serde(default = "default_true")]
    pub clone: bool,
    /// Time limit per repository in seconds
    #[serde(default = "default_analysis_timeout")]
    pub timeout_secs: u64,
}

fn default_workdir() -> PathBuf {
    PathBuf::from("checkouts")
}

fn default_true() -> bool {
    true
}

fn default_analysis_timeout() -> u64 {
    600
}

// ============================================================================
// Pipeline
// ============================================================================

/// Complete configuration of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Remote API settings
    pub api: ApiConfig,
    /// Search expression for the top-level collection
    pub search_query: String,
    /// Repositories wanted
    pub total_desired: u32,
    /// Repositories per page
    pub batch_size: u32,
    /// Retry policy for top-level search pages
    pub top_level_retry: RetryPolicy,
    /// Retry policy for nested per-repository requests
    pub batch_retry: RetryPolicy,
    /// Pull request enrichment
    pub enrichment: EnrichmentConfig,
    /// Repositories whose name or description contains one of these are skipped
    pub exclude_keywords: Vec<String>,
    /// Placeholder values left out of categorical rankings
    pub ignored_categorical_values: BTreeSet<String>,
    /// Instant ages are measured against; `None` means now
    pub reference_instant: Option<DateTime<Utc>>,
    /// Columns kept in the final table; empty keeps all
    pub fields: Vec<String>,
    /// Aggregates computed over the table
    pub aggregates: Vec<AggregateSpec>,
    /// Optional static analysis stage
    pub analysis: Option<AnalysisConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            search_query: "stars:>10000".to_string(),
            total_desired: 1000,
            batch_size: 25,
            top_level_retry: RetryPolicy::top_level(),
            batch_retry: RetryPolicy::batch(),
            enrichment: EnrichmentConfig::default(),
            exclude_keywords: Vec::new(),
            ignored_categorical_values: BTreeSet::from(["Unknown".to_string()]),
            reference_instant: None,
            fields: Vec::new(),
            aggregates: default_aggregates(),
            analysis: None,
        }
    }
}

impl PipelineConfig {
    /// Parse from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Reference instant, defaulting to now
    pub fn reference_instant_or_now(&self) -> DateTime<Utc> {
        self.reference_instant.unwrap_or_else(Utc::now)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.api.endpoint)?;
        if self.search_query.trim().is_empty() {
            return Err(Error::invalid_value("search_query", "must not be empty"));
        }
        if self.batch_size == 0 || self.batch_size > 100 {
            return Err(Error::invalid_value(
                "batch_size",
                format!("must be between 1 and 100, got {}", self.batch_size),
            ));
        }
        if self.enrichment.sub_page_size == 0 || self.enrichment.sub_page_size > 100 {
            return Err(Error::invalid_value(
                "enrichment.sub_page_size",
                format!(
                    "must be between 1 and 100, got {}",
                    self.enrichment.sub_page_size
                ),
            ));
        }
        if !is_non_negative(self.enrichment.min_resolution_hours) {
            return Err(Error::invalid_value(
                "enrichment.min_resolution_hours",
                "must be a non-negative number",
            ));
        }
        for (field, policy) in [
            ("top_level_retry", &self.top_level_retry),
            ("batch_retry", &self.batch_retry),
        ] {
            if policy.max_attempts == 0 {
                return Err(Error::invalid_value(field, "max_attempts must be at least 1"));
            }
            if !is_non_negative(policy.backoff_base_seconds)
                || !is_non_negative(policy.max_backoff_seconds)
            {
                return Err(Error::invalid_value(field, "delays must be non-negative"));
            }
        }
        if let Some(analysis) = &self.analysis {
            if analysis.program.trim().is_empty() {
                return Err(Error::missing_field("analysis.program"));
            }
        }
        Ok(())
    }
}

fn is_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}
