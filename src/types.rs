//! Common types used throughout repo-census
//!
//! This module contains shared type definitions and utilities used
//! across multiple modules.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Cursor
// ============================================================================

/// Opaque pagination token issued by the remote API.
///
/// The client never builds or edits a cursor; it only threads the value the
/// server handed back into the next request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Borrow the raw token
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Page Types
// ============================================================================

/// Pagination block of a GraphQL connection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Whether the server has more data after this page
    #[serde(default)]
    pub has_next_page: bool,
    /// Cursor to pass to the next request
    #[serde(default)]
    pub end_cursor: Option<Cursor>,
}

/// One page of typed nodes
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// Nodes that deserialized cleanly, in server order
    pub items: Vec<T>,
    /// Raw node count reported by the server for this page
    pub raw_count: usize,
    /// Pagination info
    pub page_info: PageInfo,
}

impl<T> Page<T> {
    /// Number of nodes that failed typed deserialization
    pub fn malformed(&self) -> usize {
        self.raw_count.saturating_sub(self.items.len())
    }
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Utilities
// ============================================================================

/// Extension trait for Option<String> to handle empty strings
pub trait OptionStringExt {
    /// Returns None if the string is empty
    fn none_if_empty(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_empty(self) -> Option<String> {
        self.filter(|s| !s.is_empty())
    }
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
