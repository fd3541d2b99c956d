//! Tests for the request executor

use super::*;
use crate::config::Credentials;
use crate::error::Error;
use crate::query::{search_repositories, GraphqlRequest};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, sleeper: &RecordingSleeper) -> HttpClient {
    let config = HttpClientConfig::builder()
        .endpoint(format!("{}/graphql", server.uri()))
        .no_rate_limit()
        .build();
    HttpClient::with_config(config)
        .unwrap()
        .with_sleeper(Arc::new(sleeper.clone()))
}

fn request() -> GraphqlRequest {
    search_repositories("stars:>10000", 25, None)
}

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.endpoint, GITHUB_GRAPHQL_URL);
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert!(config.rate_limit.is_none());
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder()
        .endpoint("http://localhost:9000/graphql")
        .timeout(Duration::from_secs(60))
        .rate_limit(RateLimiterConfig::new(5, 5))
        .header("X-Custom", "value")
        .user_agent("test-agent/1.0")
        .build();

    assert_eq!(config.endpoint, "http://localhost:9000/graphql");
    assert_eq!(config.timeout, Duration::from_secs(60));
    assert_eq!(config.rate_limit, Some(RateLimiterConfig::new(5, 5)));
    assert_eq!(
        config.default_headers.get("X-Custom"),
        Some(&"value".to_string())
    );
    assert_eq!(config.user_agent, "test-agent/1.0");
}

#[tokio::test]
async fn test_execute_returns_data_object() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("SearchRepositories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"search": {"edges": [], "pageInfo": {"hasNextPage": false}}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let sleeper = RecordingSleeper::new();
    let client = client_for(&server, &sleeper);
    let data = client
        .execute(&request(), &RetryPolicy::batch())
        .await
        .unwrap();

    assert_eq!(data["search"]["pageInfo"]["hasNextPage"], false);
    assert!(sleeper.delays().is_empty());
}

#[tokio::test]
async fn test_execute_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("Authorization", "Bearer ghp_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"ok": true}})))
        .expect(1)
        .mount(&server)
        .await;

    let config = HttpClientConfig::builder()
        .endpoint(format!("{}/graphql", server.uri()))
        .build();
    let client = HttpClient::with_credentials(config, &Credentials::new("ghp_test")).unwrap();
    let data = client
        .execute(&request(), &RetryPolicy::immediate(1))
        .await
        .unwrap();
    assert_eq!(data["ok"], true);
}

#[tokio::test]
async fn test_execute_retries_gateway_error_with_exponential_backoff() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"ok": 1}})))
        .mount(&server)
        .await;

    let sleeper = RecordingSleeper::new();
    let client = client_for(&server, &sleeper);
    let data = client
        .execute(&request(), &RetryPolicy::batch())
        .await
        .unwrap();

    assert_eq!(data["ok"], 1);
    assert_eq!(
        sleeper.delays(),
        vec![Duration::from_secs(2), Duration::from_secs(4)]
    );
}

#[tokio::test]
async fn test_execute_gives_up_after_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let sleeper = RecordingSleeper::new();
    let client = client_for(&server, &sleeper);
    let err = client
        .execute(&request(), &RetryPolicy::top_level())
        .await
        .unwrap_err();

    match err {
        Error::RetriesExhausted { attempts, ref last } => {
            assert_eq!(attempts, 3);
            assert_eq!(last.status(), Some(502));
        }
        other => panic!("Expected RetriesExhausted, got {other:?}"),
    }
    assert_eq!(
        sleeper.delays(),
        vec![Duration::from_secs(5), Duration::from_secs(5)]
    );
}

#[tokio::test]
async fn test_execute_does_not_retry_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Bad credentials"))
        .expect(1)
        .mount(&server)
        .await;

    let sleeper = RecordingSleeper::new();
    let client = client_for(&server, &sleeper);
    let err = client
        .execute(&request(), &RetryPolicy::batch())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert!(err.is_terminal());
    assert!(err.to_string().contains("Bad credentials"));
    assert!(sleeper.delays().is_empty());
}

#[tokio::test]
async fn test_execute_graphql_errors_are_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{"message": "Parse error on \"}\""}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let sleeper = RecordingSleeper::new();
    let client = client_for(&server, &sleeper);
    let err = client
        .execute(&request(), &RetryPolicy::batch())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Graphql { .. }));
    assert!(err.is_terminal());
}

#[tokio::test]
async fn test_execute_partial_data_is_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"repository": null},
            "errors": [{"message": "Could not resolve to a Repository"}]
        })))
        .mount(&server)
        .await;

    let sleeper = RecordingSleeper::new();
    let client = client_for(&server, &sleeper);
    let data = client
        .execute(&request(), &RetryPolicy::batch())
        .await
        .unwrap();
    assert!(data["repository"].is_null());
}

#[tokio::test]
async fn test_execute_honours_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"ok": 1}})))
        .mount(&server)
        .await;

    let sleeper = RecordingSleeper::new();
    let client = client_for(&server, &sleeper);
    client
        .execute(&request(), &RetryPolicy::immediate(2))
        .await
        .unwrap();

    assert_eq!(sleeper.delays(), vec![Duration::from_secs(7)]);
}

#[tokio::test]
async fn test_execute_rate_limit_beyond_budget_is_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .expect(2)
        .mount(&server)
        .await;

    let sleeper = RecordingSleeper::new();
    let client = client_for(&server, &sleeper);
    let err = client
        .execute(&request(), &RetryPolicy::immediate(2))
        .await
        .unwrap_err();

    assert!(err.is_terminal());
    assert_eq!(err.status(), Some(429));
}

#[tokio::test]
async fn test_execute_malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let sleeper = RecordingSleeper::new();
    let client = client_for(&server, &sleeper);
    let err = client
        .execute(&request(), &RetryPolicy::batch())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
}
