use std::time::{Duration, Instant};

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use exchange_api_client::error::ExchangeError;
use exchange_api_client::retry::RetryPolicy;
use exchange_api_client::{RestClient, RestClientBuilder};

fn builder(server: &MockServer) -> RestClientBuilder {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    RestClient::builder(server.uri()).error_keys(["message", "error", "errors", "detail"])
}

fn fast_retry(max_retries: u32, retryable: &[u16]) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        backoff_factor: 0.01,
        max_elapsed: Duration::from_secs(5),
        retryable_status: retryable.iter().copied().collect(),
    }
}

#[tokio::test]
async fn test_get_returns_payload() {
    let server = MockServer::start().await;
    let payload = json!({"ticker": {"last_price": ["830000.0", "CLP"]}});

    Mock::given(method("GET"))
        .and(path("/ticker"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&payload))
        .mount(&server)
        .await;

    let client = builder(&server).build().unwrap();
    let decoded = client.get("ticker").await.unwrap();
    assert_eq!(decoded, payload);
}

#[tokio::test]
async fn test_error_status_maps_to_invalid_response() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"message": "insufficient balance"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = builder(&server)
        .retry(fast_retry(3, &[500, 503]))
        .build()
        .unwrap();
    let error = client.get("orders").await.unwrap_err();

    match error {
        ExchangeError::InvalidResponse(response) => {
            assert_eq!(response.status, 422);
            assert_eq!(response.message.as_deref(), Some("insufficient balance"));
            assert!(response.url.contains("/orders"));
        }
        other => panic!("expected InvalidResponse, got {other:?}"),
    }
}

#[tokio::test]
async fn test_status_outside_retryable_set_gives_up_after_one_attempt() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "not found"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = builder(&server)
        .retry(fast_retry(3, &[500, 503]))
        .build()
        .unwrap();
    let error = client.get("missing").await.unwrap_err();
    assert_eq!(error.status(), Some(404));
}

#[tokio::test]
async fn test_retryable_status_retried_to_exhaustion() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"message": "busy"})))
        .expect(3)
        .mount(&server)
        .await;

    let client = builder(&server)
        .retry(fast_retry(3, &[500, 503]))
        .build()
        .unwrap();
    let error = client.get("busy").await.unwrap_err();
    assert_eq!(error.status(), Some(503));
}

#[tokio::test]
async fn test_transient_server_error_then_success() {
    let server = MockServer::start().await;
    let payload = json!({"balances": []});

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "oops"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&payload))
        .mount(&server)
        .await;

    let client = builder(&server)
        .retry(fast_retry(3, &[500, 503]))
        .build()
        .unwrap();
    let decoded = client.get("flaky").await.unwrap();
    assert_eq!(decoded, payload);
}

#[tokio::test]
async fn test_non_json_body_yields_decode_error_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body>maintenance</body></html>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = builder(&server).build().unwrap();
    let error = client.get("broken").await.unwrap_err();

    match error {
        ExchangeError::Decode { body, .. } => assert!(body.contains("maintenance")),
        other => panic!("expected Decode, got {other:?}"),
    }
}

#[tokio::test]
async fn test_embedded_error_on_success_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/balance"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"error": "EAPI:Invalid key", "result": null})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = builder(&server).build().unwrap();
    let error = client.get("balance").await.unwrap_err();

    match error {
        ExchangeError::InvalidResponse(response) => {
            assert_eq!(response.status, 200);
            assert_eq!(response.message.as_deref(), Some("EAPI:Invalid key"));
        }
        other => panic!("expected InvalidResponse, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limited_requests_are_spaced() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ticker"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let client = builder(&server)
        .rate_limit(Duration::from_millis(50))
        .build()
        .unwrap();

    let start = Instant::now();
    for _ in 0..3 {
        client.get("ticker").await.unwrap();
    }
    // Three paced requests cross the interval twice.
    assert!(start.elapsed() >= Duration::from_millis(100));
}

#[tokio::test]
async fn test_connection_errors_are_retried() {
    // Nothing listens here; every attempt fails below the HTTP layer.
    let client = RestClient::builder("http://127.0.0.1:9/")
        .timeout(Duration::from_millis(250))
        .retry(RetryPolicy {
            max_retries: 2,
            backoff_factor: 0.05,
            ..Default::default()
        })
        .build()
        .unwrap();

    let start = Instant::now();
    let error = client.get("ticker").await.unwrap_err();

    assert!(matches!(error, ExchangeError::Http(_)));
    // One backoff sleep proves the second attempt happened.
    assert!(start.elapsed() >= Duration::from_millis(50));
}
