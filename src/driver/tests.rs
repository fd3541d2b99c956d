//! Tests for the pipeline driver

use super::*;
use crate::config::EnrichmentConfig;
use crate::http::RetryPolicy;
use crate::model::{columns, EnrichmentSummary};
use crate::query::{PULL_REQUEST_DETAIL, REPOSITORY_PULL_REQUESTS, SEARCH_REPOSITORIES};
use crate::stats::{AggregateSpec, AggregateValue, Cell};
use crate::testing::{listing_page, repo_node, search_page, ScriptedExecutor};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::BTreeMap;

fn config(total: u32, batch: u32) -> PipelineConfig {
    PipelineConfig {
        total_desired: total,
        batch_size: batch,
        top_level_retry: RetryPolicy::immediate(1),
        batch_retry: RetryPolicy::immediate(1),
        reference_instant: Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()),
        ..PipelineConfig::default()
    }
}

fn pipeline(executor: ScriptedExecutor, config: PipelineConfig) -> (Arc<ScriptedExecutor>, Pipeline) {
    let executor = Arc::new(executor);
    let pipeline = Pipeline::new(executor.clone(), config);
    (executor, pipeline)
}

fn names(output: &PipelineOutput) -> Vec<String> {
    output.records.iter().map(|r| r.name.clone()).collect()
}

#[tokio::test]
async fn test_run_collects_all_batches() {
    let (executor, pipeline) = pipeline(
        ScriptedExecutor::sequence(vec![
            Ok(search_page(vec![repo_node("a", 10), repo_node("b", 20)], true, Some("c1"))),
            Ok(search_page(vec![repo_node("c", 30), repo_node("d", 40)], true, Some("c2"))),
        ]),
        config(4, 2),
    );

    let output = pipeline.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(names(&output), vec!["a", "b", "c", "d"]);
    assert_eq!(output.table.num_rows(), 4);
    assert_eq!(output.report.batches_planned, 2);
    assert_eq!(output.report.halt, "completed");
    assert!(!output.report.is_partial());
    assert_eq!(
        output.aggregates.get("mean(star_count)").unwrap().as_scalar(),
        Some(25.0)
    );
    assert!(executor
        .requests()
        .iter()
        .all(|r| r.query == SEARCH_REPOSITORIES));
}

#[tokio::test]
async fn test_failed_first_batch_is_no_data() {
    let (_, pipeline) = pipeline(
        ScriptedExecutor::sequence(vec![Err(Error::http_status(401, "Bad credentials"))]),
        config(50, 25),
    );

    let err = pipeline.run(&CancellationToken::new()).await.unwrap_err();
    match err {
        Error::NoData { cause } => assert!(cause.contains("401")),
        other => panic!("expected NoData, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_first_batch_is_no_data() {
    let (_, pipeline) = pipeline(
        ScriptedExecutor::sequence(vec![Ok(search_page(vec![], false, None))]),
        config(50, 25),
    );
    assert!(matches!(
        pipeline.run(&CancellationToken::new()).await,
        Err(Error::NoData { .. })
    ));
}

#[tokio::test]
async fn test_zero_batch_size_is_no_data() {
    let (executor, pipeline) = pipeline(ScriptedExecutor::sequence(vec![]), config(50, 0));
    assert!(matches!(
        pipeline.run(&CancellationToken::new()).await,
        Err(Error::NoData { .. })
    ));
    assert_eq!(executor.call_count(), 0);
}

#[tokio::test]
async fn test_later_failure_keeps_partial_results() {
    let (_, pipeline) = pipeline(
        ScriptedExecutor::sequence(vec![
            Ok(search_page(vec![repo_node("a", 1), repo_node("b", 2)], true, Some("c1"))),
            Err(Error::RetriesExhausted {
                attempts: 3,
                last: Box::new(Error::http_status(502, "")),
            }),
        ]),
        config(6, 2),
    );

    let output = pipeline.run(&CancellationToken::new()).await.unwrap();
    assert_eq!(output.table.num_rows(), 2);
    assert_eq!(output.report.halt, "failed");
    assert!(output.report.collection_error.is_some());
    assert!(output.report.is_partial());
}

#[tokio::test]
async fn test_keyword_filter() {
    let mut tutorial = repo_node("learn-x", 5);
    tutorial["description"] = json!("An interactive Tutorial");
    let mut cfg = config(3, 3);
    cfg.exclude_keywords = vec!["tutorial".to_string(), "awesome".to_string()];

    let (_, pipeline) = pipeline(
        ScriptedExecutor::sequence(vec![Ok(search_page(
            vec![repo_node("awesome-lists", 1), tutorial, repo_node("engine", 9)],
            false,
            None,
        ))]),
        cfg,
    );

    let output = pipeline.run(&CancellationToken::new()).await.unwrap();
    assert_eq!(names(&output), vec!["engine"]);
    assert_eq!(output.report.excluded, 2);
    assert_eq!(output.report.collected, 3);
}

fn merged_detail(number: u64, hours: u32) -> Value {
    json!({"repository": {"pullRequest": {
        "number": number,
        "state": "MERGED",
        "createdAt": "2024-01-01T00:00:00Z",
        "mergedAt": format!("2024-01-01T{hours:02}:00:00Z"),
        "closedAt": format!("2024-01-01T{hours:02}:00:00Z"),
        "comments": {"totalCount": 1},
        "participants": {"totalCount": 2},
        "reviews": {"totalCount": 1},
        "files": {"totalCount": 1, "nodes": [{"additions": 3, "deletions": 1}]}
    }}})
}

/// Two repositories with one reviewed 4h pull request each; detail requests
/// for `failing` get a terminal GraphQL error
fn enrichment_executor(failing: &'static str) -> ScriptedExecutor {
    ScriptedExecutor::from_fn(move |request| {
        if request.query == SEARCH_REPOSITORIES {
            return Ok(search_page(
                vec![repo_node("one", 1), repo_node("two", 2)],
                false,
                None,
            ));
        }
        let repo = request.variables["name"].as_str().unwrap().to_string();
        if request.query == REPOSITORY_PULL_REQUESTS {
            return Ok(listing_page(
                vec![json!({"number": 1, "reviews": {"totalCount": 1}})],
                false,
                None,
            ));
        }
        assert_eq!(request.query, PULL_REQUEST_DETAIL);
        if repo == failing {
            return Err(Error::graphql("Could not resolve to a PullRequest"));
        }
        Ok(merged_detail(1, 4))
    })
}

fn enriched_config() -> PipelineConfig {
    let mut cfg = config(2, 2);
    cfg.enrichment = EnrichmentConfig {
        enabled: true,
        ..EnrichmentConfig::default()
    };
    cfg
}

#[tokio::test]
async fn test_enrichment_failure_is_isolated() {
    let (_, pipeline) = pipeline(enrichment_executor("two"), enriched_config());

    let output = pipeline.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(output.table.num_rows(), 2);
    assert_eq!(output.report.enriched, 1);
    assert_eq!(output.report.enrichment_failures, 1);
    assert_eq!(output.records[0].enrichment.avg_analysis_hours, 4.0);
    assert_eq!(output.records[1].enrichment, EnrichmentSummary::default());
    assert_eq!(
        output.table.cell(1, columns::REVIEWED_PR_COUNT).unwrap(),
        Some(&Cell::Int(0))
    );
    assert_eq!(
        output.table.cell(1, columns::AVG_ANALYSIS_HOURS).unwrap(),
        Some(&Cell::Null)
    );
}

#[tokio::test]
async fn test_failed_sibling_does_not_bias_enrichment_aggregates() {
    let (_, pipeline) = pipeline(enrichment_executor("two"), enriched_config());

    let output = pipeline.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(
        output.aggregates.get("mean(avg_analysis_hours)"),
        Some(&AggregateValue::Scalar { value: 4.0 })
    );
    assert_eq!(
        output.aggregates.get("mean(merge_rate)"),
        Some(&AggregateValue::Scalar { value: 1.0 })
    );
}

#[tokio::test]
async fn test_cancel_during_detail_leaves_item_unenriched() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let executor = ScriptedExecutor::from_fn(move |request| {
        if request.query == SEARCH_REPOSITORIES {
            return Ok(search_page(
                vec![repo_node("one", 1), repo_node("two", 2)],
                false,
                None,
            ));
        }
        if request.query == REPOSITORY_PULL_REQUESTS {
            return Ok(listing_page(
                vec![
                    json!({"number": 1, "reviews": {"totalCount": 1}}),
                    json!({"number": 2, "reviews": {"totalCount": 3}}),
                ],
                false,
                None,
            ));
        }
        trigger.cancel();
        Ok(merged_detail(request.variables["number"].as_u64().unwrap(), 4))
    });
    let (executor, pipeline) = pipeline(executor, enriched_config());

    let output = pipeline.run(&cancel).await.unwrap();

    assert!(output.report.cancelled);
    assert_eq!(output.report.enriched, 0);
    assert_eq!(output.report.enrichment_failures, 0);
    assert_eq!(output.table.num_rows(), 2);
    for record in &output.records {
        assert_eq!(record.enrichment, EnrichmentSummary::default());
    }
    assert_eq!(
        output.table.numeric(columns::AVG_ANALYSIS_HOURS).unwrap(),
        vec![None, None]
    );
    // nothing was requested for the second repository
    assert!(executor
        .requests()
        .iter()
        .all(|r| r.variables.get("name").map_or(true, |n| n == "one")));
}

#[tokio::test]
async fn test_field_selection_and_custom_aggregates() {
    let mut cfg = config(2, 2);
    cfg.fields = vec![
        columns::NAME.to_string(),
        columns::STAR_COUNT.to_string(),
        "no_such_field".to_string(),
    ];
    cfg.aggregates = vec![
        AggregateSpec::median(columns::RELEASE_COUNT),
        AggregateSpec::mode("no_such_field"),
    ];
    let (_, pipeline) = pipeline(
        ScriptedExecutor::sequence(vec![Ok(search_page(
            vec![repo_node("a", 1), repo_node("b", 2)],
            false,
            None,
        ))]),
        cfg,
    );

    let output = pipeline.run(&CancellationToken::new()).await.unwrap();
    assert_eq!(output.table.columns(), &["name", "star_count"]);
    // aggregates see every column, not just the selected ones
    assert_eq!(
        output.aggregates.get("median(release_count)"),
        Some(&AggregateValue::Scalar { value: 2.0 })
    );
    assert_eq!(
        output.report.undefined_aggregates,
        vec!["mode(no_such_field)".to_string()]
    );
}

#[tokio::test]
async fn test_cancelled_run_is_clean_and_empty() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let (executor, pipeline) = pipeline(ScriptedExecutor::sequence(vec![]), config(50, 25));

    let output = pipeline.run(&cancel).await.unwrap();
    assert!(output.report.cancelled);
    assert!(output.table.is_empty());
    assert_eq!(executor.call_count(), 0);
}

#[tokio::test]
async fn test_fetch_range_uses_difference() {
    let (executor, pipeline) = pipeline(
        ScriptedExecutor::from_fn(|request| {
            let page = request.after().map_or(0, |c| c.len());
            Ok(search_page(
                vec![repo_node(&format!("r{page}"), 1)],
                true,
                Some(&"x".repeat(page + 1)),
            ))
        }),
        config(1000, 25),
    );

    let records = pipeline.fetch_range(10, 60).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(executor.call_count(), 2);
    assert_eq!(executor.requests()[1].variables["first"], 25);
}

struct FlakyAnalyzer;

#[async_trait]
impl QualityAnalyzer for FlakyAnalyzer {
    async fn analyze(&self, record: &RepositoryRecord) -> Result<BTreeMap<String, f64>> {
        if record.name == "broken" {
            return Err(Error::analysis("ck crashed"));
        }
        Ok(BTreeMap::from([("cbo".to_string(), record.star_count as f64)]))
    }
}

#[tokio::test]
async fn test_analysis_failure_leaves_metrics_absent() {
    let (_, pipeline) = pipeline(
        ScriptedExecutor::sequence(vec![Ok(search_page(
            vec![repo_node("fine", 4), repo_node("broken", 5)],
            false,
            None,
        ))]),
        config(2, 2),
    );
    let pipeline = pipeline.with_analyzer(Arc::new(FlakyAnalyzer));

    let output = pipeline.run(&CancellationToken::new()).await.unwrap();
    assert_eq!(output.report.analyzed, 1);
    assert_eq!(output.report.analysis_failures, 1);
    assert_eq!(
        output.table.numeric("cbo").unwrap(),
        vec![Some(4.0), None]
    );
}

#[test]
fn test_report_serializes() {
    let report = RunReport {
        requested: 10,
        halt: "completed".to_string(),
        ..RunReport::default()
    };
    let value: Value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["requested"], 10);
    assert_eq!(value["dropped"]["unavailable"], 0);
}
