//! Raw repository → flat record
//!
//! Every optional object collapses to its default before any field is read,
//! so a sparse API node never produces a partial record.

use crate::model::{CountConnection, RawRepository, RepositoryRecord};
use crate::types::OptionStringExt;

/// Language reported when the repository has none
pub const UNKNOWN_LANGUAGE: &str = "Unknown";

/// Normalize one repository node. Pure and deterministic.
pub fn normalize(raw: &RawRepository) -> RepositoryRecord {
    let count = |c: Option<CountConnection>| c.unwrap_or_default().total_count;
    let owner = raw.owner.login.clone();

    RepositoryRecord {
        url: raw
            .url
            .clone()
            .none_if_empty()
            .unwrap_or_else(|| format!("https://github.com/{}/{}", owner, raw.name)),
        description: raw.description.clone().unwrap_or_default(),
        name: raw.name.clone(),
        owner,
        created_at: raw.created_at,
        updated_at: raw.updated_at,
        star_count: raw.stargazer_count.unwrap_or(0),
        merged_pr_count: count(raw.pull_requests),
        release_count: count(raw.releases),
        open_issue_count: count(raw.open_issues),
        closed_issue_count: count(raw.closed_issues),
        primary_language: raw
            .primary_language
            .as_ref()
            .map(|l| l.name.clone())
            .none_if_empty()
            .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string()),
        enrichment: Default::default(),
        quality: Default::default(),
    }
}

/// Normalize a batch in order
pub fn normalize_all(raw: &[RawRepository]) -> Vec<RepositoryRecord> {
    raw.iter().map(normalize).collect()
}

/// Whether a record looks like course material, tutorials or curated lists.
///
/// Matches any keyword, case-insensitively, against name and description.
pub fn matches_keywords(record: &RepositoryRecord, keywords: &[String]) -> bool {
    let name = record.name.to_lowercase();
    let description = record.description.to_lowercase();
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .any(|k| name.contains(&k) || description.contains(&k))
}
