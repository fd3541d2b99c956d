//! Typed API response nodes
//!
//! One deserialization step turns response JSON into these structures.
//! Nullable nested objects are `Option`s; defaults are applied later, once,
//! by the normalizer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `{ totalCount }` connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountConnection {
    /// Total number of nodes behind the connection
    #[serde(default)]
    pub total_count: u64,
}

/// Repository owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOwner {
    /// Login name
    pub login: String,
}

/// `{ name }` node such as a language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedNode {
    /// Name
    pub name: String,
}

/// Repository node from the search query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRepository {
    pub name: String,
    pub owner: RawOwner,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub stargazer_count: Option<u64>,
    #[serde(default)]
    pub primary_language: Option<NamedNode>,
    #[serde(default)]
    pub pull_requests: Option<CountConnection>,
    #[serde(default)]
    pub releases: Option<CountConnection>,
    #[serde(default)]
    pub open_issues: Option<CountConnection>,
    #[serde(default)]
    pub closed_issues: Option<CountConnection>,
}

/// Minimal repository identity used for nested queries
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    /// Owner login
    pub owner: String,
    /// Repository name
    pub name: String,
}

impl RepoRef {
    /// Create a reference
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl From<&RawRepository> for RepoRef {
    fn from(raw: &RawRepository) -> Self {
        Self::new(&raw.owner.login, &raw.name)
    }
}

/// Pull request entry from a repository listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPullRequestRef {
    pub number: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub reviews: Option<CountConnection>,
}

impl RawPullRequestRef {
    /// Number of reviews, 0 when the connection is absent
    pub fn review_count(&self) -> u64 {
        self.reviews.map_or(0, |r| r.total_count)
    }
}

/// Pull request lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PullRequestState {
    Open,
    Closed,
    Merged,
    #[serde(other)]
    Unknown,
}

/// Per-file change counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDelta {
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
}

/// Bounded list of changed files
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConnection {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub nodes: Vec<FileDelta>,
}

/// Pull request detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPullRequestDetail {
    pub number: u64,
    #[serde(default)]
    pub title: Option<String>,
    pub state: PullRequestState,
    #[serde(default)]
    pub body_text: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub comments: Option<CountConnection>,
    #[serde(default)]
    pub participants: Option<CountConnection>,
    #[serde(default)]
    pub reviews: Option<CountConnection>,
    #[serde(default)]
    pub files: Option<FileConnection>,
}

impl RawPullRequestDetail {
    /// Resolution instant: merge time for merged PRs, close time otherwise
    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            PullRequestState::Merged => self.merged_at,
            _ => self.closed_at,
        }
    }
}
