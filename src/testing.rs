//! Test doubles shared by unit tests

use crate::error::{Error, Result};
use crate::http::{QueryExecutor, RetryPolicy};
use crate::query::GraphqlRequest;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

type Responder = Box<dyn Fn(&GraphqlRequest) -> Result<Value> + Send + Sync>;

/// Executor that answers from a script and records every request
pub(crate) struct ScriptedExecutor {
    responder: Responder,
    requests: Mutex<Vec<GraphqlRequest>>,
}

impl ScriptedExecutor {
    /// Answer calls in order; calls beyond the script fail
    pub fn sequence(responses: Vec<Result<Value>>) -> Self {
        let queue = Mutex::new(VecDeque::from(responses));
        Self::from_fn(move |_| {
            queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::Other("script exhausted".to_string())))
        })
    }

    /// Answer every call with a function of the request
    pub fn from_fn(f: impl Fn(&GraphqlRequest) -> Result<Value> + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(f),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<GraphqlRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl QueryExecutor for ScriptedExecutor {
    async fn execute(&self, request: &GraphqlRequest, _policy: &RetryPolicy) -> Result<Value> {
        self.requests.lock().unwrap().push(request.clone());
        (self.responder)(request)
    }
}

/// Minimal valid repository node
pub(crate) fn repo_node(name: &str, stars: u64) -> Value {
    json!({
        "name": name,
        "owner": {"login": "acme"},
        "description": format!("{name} description"),
        "createdAt": "2015-01-01T00:00:00Z",
        "updatedAt": "2025-01-01T00:00:00Z",
        "stargazerCount": stars,
        "primaryLanguage": {"name": "Rust"},
        "pullRequests": {"totalCount": 10},
        "releases": {"totalCount": 2},
        "openIssues": {"totalCount": 3},
        "closedIssues": {"totalCount": 4}
    })
}

/// `data` object of one search page
pub(crate) fn search_page(nodes: Vec<Value>, has_next: bool, cursor: Option<&str>) -> Value {
    json!({
        "search": {
            "edges": nodes.into_iter().map(|n| json!({"node": n})).collect::<Vec<_>>(),
            "pageInfo": {"hasNextPage": has_next, "endCursor": cursor}
        }
    })
}

/// `data` object of one pull request listing page
pub(crate) fn listing_page(nodes: Vec<Value>, has_next: bool, cursor: Option<&str>) -> Value {
    json!({
        "repository": {
            "pullRequests": {
                "nodes": nodes,
                "pageInfo": {"hasNextPage": has_next, "endCursor": cursor}
            }
        }
    })
}
