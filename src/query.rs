//! GraphQL request composition
//!
//! Every request the pipeline sends is a fixed query document plus a
//! variables object. Cursors and page sizes travel as variables, so query
//! text never has to be re-rendered per page.

use crate::types::Cursor;
use serde::Serialize;
use serde_json::{json, Value};

/// Top-level repository search, one page per call
pub const SEARCH_REPOSITORIES: &str = r"
query SearchRepositories($search: String!, $first: Int!, $after: String) {
  search(query: $search, type: REPOSITORY, first: $first, after: $after) {
    edges {
      node {
        ... on Repository {
          name
          owner { login }
          url
          description
          createdAt
          updatedAt
          stargazerCount
          primaryLanguage { name }
          pullRequests(states: MERGED) { totalCount }
          releases { totalCount }
          openIssues: issues(states: OPEN) { totalCount }
          closedIssues: issues(states: CLOSED) { totalCount }
        }
      }
    }
    pageInfo { hasNextPage endCursor }
  }
}";

/// Resolved pull requests of one repository, with their review counts
pub const REPOSITORY_PULL_REQUESTS: &str = r"
query RepositoryPullRequests($owner: String!, $name: String!, $first: Int!, $after: String) {
  repository(owner: $owner, name: $name) {
    pullRequests(states: [MERGED, CLOSED], first: $first, after: $after) {
      nodes {
        number
        title
        reviews(first: 1) { totalCount }
      }
      pageInfo { hasNextPage endCursor }
    }
  }
}";

/// Detail of a single pull request
pub const PULL_REQUEST_DETAIL: &str = r"
query PullRequestDetail($owner: String!, $name: String!, $number: Int!) {
  repository(owner: $owner, name: $name) {
    pullRequest(number: $number) {
      number
      title
      state
      bodyText
      createdAt
      closedAt
      mergedAt
      comments { totalCount }
      participants { totalCount }
      reviews { totalCount }
      files(first: 100) {
        totalCount
        nodes { additions deletions }
      }
    }
  }
}";

/// One request unit: query document plus variables
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphqlRequest {
    /// Query document
    pub query: String,
    /// Variables object
    pub variables: Value,
}

impl GraphqlRequest {
    /// Create a request from a query and its variables
    pub fn new(query: impl Into<String>, variables: Value) -> Self {
        Self {
            query: query.into(),
            variables,
        }
    }

    /// The `after` cursor variable, if this request carries one
    pub fn after(&self) -> Option<&str> {
        self.variables.get("after").and_then(Value::as_str)
    }
}

/// Build a repository search page request
pub fn search_repositories(search: &str, first: u32, after: Option<&Cursor>) -> GraphqlRequest {
    GraphqlRequest::new(
        SEARCH_REPOSITORIES,
        json!({
            "search": search,
            "first": first,
            "after": after.map(Cursor::as_str),
        }),
    )
}

/// Build a pull request listing page request for one repository
pub fn repository_pull_requests(
    owner: &str,
    name: &str,
    first: u32,
    after: Option<&Cursor>,
) -> GraphqlRequest {
    GraphqlRequest::new(
        REPOSITORY_PULL_REQUESTS,
        json!({
            "owner": owner,
            "name": name,
            "first": first,
            "after": after.map(Cursor::as_str),
        }),
    )
}

/// Build a pull request detail request
pub fn pull_request_detail(owner: &str, name: &str, number: u64) -> GraphqlRequest {
    GraphqlRequest::new(
        PULL_REQUEST_DETAIL,
        json!({
            "owner": owner,
            "name": name,
            "number": number,
        }),
    )
}
