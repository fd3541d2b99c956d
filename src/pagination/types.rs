//! Pagination types and traits
//!
//! Defines the batch plan, the query abstraction every paginated request
//! implements, and the outcome of one pagination loop.

use crate::error::{Error, Result};
use crate::query::GraphqlRequest;
use crate::types::{Cursor, Page, PageInfo};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// How many pages to request and how large each one is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    num_batches: u32,
    batch_size: u32,
}

impl BatchPlan {
    /// Plan `total_desired / batch_size` pages.
    ///
    /// Floor division: a remainder smaller than one batch is never fetched.
    /// A batch size of zero plans nothing.
    pub fn new(total_desired: u32, batch_size: u32) -> Self {
        let num_batches = total_desired.checked_div(batch_size).unwrap_or(0);
        Self {
            num_batches,
            batch_size,
        }
    }

    /// Plan exactly `pages` pages of `page_size` nodes
    pub fn pages(pages: u32, page_size: u32) -> Self {
        Self {
            num_batches: if page_size == 0 { 0 } else { pages },
            batch_size: page_size,
        }
    }

    /// Number of pages scheduled
    pub fn num_batches(&self) -> u32 {
        self.num_batches
    }

    /// Nodes requested per page
    pub fn batch_size(&self) -> u32 {
        self.batch_size
    }

    /// Upper bound on collected nodes
    pub fn capacity(&self) -> u64 {
        u64::from(self.num_batches) * u64::from(self.batch_size)
    }
}

/// A paginated query: builds the request for a cursor and parses one page
pub trait PagedQuery: Send + Sync {
    /// Node type produced by this query
    type Item: Send;

    /// Build the request for the page after `after`
    fn request(&self, after: Option<&Cursor>, page_size: u32) -> GraphqlRequest;

    /// Parse the `data` object of a response into a page
    fn parse(&self, data: Value) -> Result<Page<Self::Item>>;

    /// Short label for log lines
    fn label(&self) -> String;
}

/// Why a pagination loop stopped
#[derive(Debug)]
pub enum HaltReason {
    /// Every scheduled batch was fetched
    Completed,
    /// The server reported no further pages
    EndOfData,
    /// A page came back with zero nodes
    EmptyPage,
    /// A batch failed after the executor gave up; the cursor was not advanced
    Failed(Error),
    /// The caller cancelled between batches
    Cancelled,
}

impl HaltReason {
    /// Whether the loop ended without a failure or cancellation
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Completed | Self::EndOfData | Self::EmptyPage)
    }
}

/// Items accumulated by one pagination loop plus how it ended
#[derive(Debug)]
pub struct Collected<T> {
    /// Nodes in collection order
    pub items: Vec<T>,
    /// Batches the plan allowed
    pub batches_planned: u32,
    /// Requests actually sent (including a failed one)
    pub batches_issued: u32,
    /// Nodes skipped because they did not match the expected shape
    pub malformed: usize,
    /// How the loop ended
    pub halt: HaltReason,
}

impl<T> Collected<T> {
    /// Start an empty collection for a plan
    pub fn new(plan: BatchPlan) -> Self {
        Self {
            items: Vec::new(),
            batches_planned: plan.num_batches(),
            batches_issued: 0,
            malformed: 0,
            halt: HaltReason::Completed,
        }
    }

    /// The failure that halted the loop, if any
    pub fn failure(&self) -> Option<&Error> {
        match &self.halt {
            HaltReason::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Whether the loop was cancelled
    pub fn was_cancelled(&self) -> bool {
        matches!(self.halt, HaltReason::Cancelled)
    }
}

/// Build a typed page from a list of raw nodes and a `pageInfo` object.
///
/// Nodes that do not deserialize into `T` are skipped; `raw_count` still
/// counts them so an all-malformed page is not mistaken for an empty one.
pub fn typed_page<T: DeserializeOwned>(nodes: Vec<Value>, page_info: Value) -> Result<Page<T>> {
    let raw_count = nodes.len();
    let mut items = Vec::with_capacity(raw_count);
    for node in nodes {
        match serde_json::from_value::<T>(node) {
            Ok(item) => items.push(item),
            Err(e) => debug!("Skipping malformed node: {}", e),
        }
    }

    let page_info: PageInfo = if page_info.is_null() {
        PageInfo::default()
    } else {
        serde_json::from_value(page_info)
            .map_err(|e| Error::decode(format!("invalid pageInfo: {e}")))?
    };

    Ok(Page {
        items,
        raw_count,
        page_info,
    })
}

/// Walk `path` through nested objects, failing with a decode error when a
/// segment is missing or null
pub fn take_path(mut value: Value, path: &[&str]) -> Result<Value> {
    for segment in path {
        value = match value {
            Value::Object(mut map) => map
                .remove(*segment)
                .filter(|v| !v.is_null())
                .ok_or_else(|| Error::decode(format!("missing '{segment}' in response")))?,
            _ => return Err(Error::decode(format!("expected object at '{segment}'"))),
        };
    }
    Ok(value)
}
