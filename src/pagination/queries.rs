//! Concrete paginated queries

use super::types::{take_path, typed_page, PagedQuery};
use crate::error::{Error, Result};
use crate::model::{RawPullRequestRef, RawRepository, RepoRef};
use crate::query::{self, GraphqlRequest};
use crate::types::{Cursor, Page};
use serde_json::Value;

/// Repository search: `data.search.edges[].node`
#[derive(Debug, Clone)]
pub struct RepositorySearch {
    search: String,
}

impl RepositorySearch {
    /// Search with a GitHub search string such as `stars:>10000`
    pub fn new(search: impl Into<String>) -> Self {
        Self {
            search: search.into(),
        }
    }
}

impl PagedQuery for RepositorySearch {
    type Item = RawRepository;

    fn request(&self, after: Option<&Cursor>, page_size: u32) -> GraphqlRequest {
        query::search_repositories(&self.search, page_size, after)
    }

    fn parse(&self, data: Value) -> Result<Page<RawRepository>> {
        let mut search = take_path(data, &["search"])?;
        let page_info = search.get_mut("pageInfo").map(Value::take).unwrap_or(Value::Null);
        let edges = match search.get_mut("edges").map(Value::take) {
            Some(Value::Array(edges)) => edges,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => return Err(Error::decode("'search.edges' is not a list")),
        };

        // Edges without a node still count toward the raw page size.
        let nodes = edges
            .into_iter()
            .map(|mut edge| edge.get_mut("node").map(Value::take).unwrap_or(Value::Null))
            .collect();
        typed_page(nodes, page_info)
    }

    fn label(&self) -> String {
        format!("search '{}'", self.search)
    }
}

/// Resolved pull requests of one repository:
/// `data.repository.pullRequests.nodes`
#[derive(Debug, Clone)]
pub struct PullRequestListing {
    repo: RepoRef,
}

impl PullRequestListing {
    /// List pull requests of `repo`
    pub fn new(repo: RepoRef) -> Self {
        Self { repo }
    }
}

impl PagedQuery for PullRequestListing {
    type Item = RawPullRequestRef;

    fn request(&self, after: Option<&Cursor>, page_size: u32) -> GraphqlRequest {
        query::repository_pull_requests(&self.repo.owner, &self.repo.name, page_size, after)
    }

    fn parse(&self, data: Value) -> Result<Page<RawPullRequestRef>> {
        let mut connection = take_path(data, &["repository", "pullRequests"])?;
        let page_info = connection
            .get_mut("pageInfo")
            .map(Value::take)
            .unwrap_or(Value::Null);
        let nodes = match connection.get_mut("nodes").map(Value::take) {
            Some(Value::Array(nodes)) => nodes,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => return Err(Error::decode("'pullRequests.nodes' is not a list")),
        };
        typed_page(nodes, page_info)
    }

    fn label(&self) -> String {
        format!("pull requests of {}", self.repo.full_name())
    }
}
