mod common;

use color_eyre::Result;
use common::{detector_body, start_mock_detector, test_breaker, test_detector_client};
use reqwest::header::HeaderMap;
use serde_json::{Value, json};
use std::time::Duration;
use veristream_pipeline::detector::{DEPENDENCY_KEY, DetectorError, NOOP_SERVICE_URL, STUB_MODEL_VERSION};
use veristream_pipeline::resilience::{
    BreakerState, CallOptions, RequestError, ResilienceEvent, ResilienceEvents, ResilientClient,
};

fn call_options(max_retries: u32) -> CallOptions {
    CallOptions {
        max_retries,
        timeout: Duration::from_secs(2),
    }
}

#[tokio::test]
async fn test_transient_failures_are_retried_within_budget() -> Result<()> {
    let mock = start_mock_detector(2, 500, json!({"error": "overloaded"}), detector_body(0.1)).await?;
    let events = ResilienceEvents::new();
    let mut retries = events.subscribe();
    let client = ResilientClient::new(reqwest::Client::new(), events);

    let url = format!("{}/analyze", mock.base_url);
    let response: Value = client
        .post_json(
            DEPENDENCY_KEY,
            &url,
            &HeaderMap::new(),
            &json!({"image_url": "https://cdn.test/a.jpg"}),
            call_options(2),
        )
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e))?;

    assert_eq!(response["model_version"], "deepfake-detector-v7");
    assert_eq!(mock.hit_count(), 3);

    // One retry event per failed attempt.
    for expected_attempt in 1..=2 {
        let event = retries.recv().await?;
        match event.as_ref() {
            ResilienceEvent::Retry { attempt, .. } => assert_eq!(*attempt, expected_attempt),
            other => panic!("unexpected event: {other:?}"),
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_retry_budget_is_bounded() -> Result<()> {
    let mock = start_mock_detector(10, 503, json!({"error": "down"}), detector_body(0.1)).await?;
    let client = ResilientClient::new(reqwest::Client::new(), ResilienceEvents::new());

    let url = format!("{}/analyze", mock.base_url);
    let result: Result<Value, RequestError> = client
        .post_json(
            DEPENDENCY_KEY,
            &url,
            &HeaderMap::new(),
            &json!({"image_url": "https://cdn.test/a.jpg"}),
            call_options(2),
        )
        .await;

    // max_retries = 2 means at most 3 network attempts.
    assert_eq!(mock.hit_count(), 3);
    match result {
        Err(RequestError::Status { status, .. }) => assert_eq!(status, 503),
        other => panic!("expected status error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_client_errors_are_not_retried() -> Result<()> {
    let mock =
        start_mock_detector(10, 404, json!({"detail": "Resource not found"}), detector_body(0.1))
            .await?;
    let client = ResilientClient::new(reqwest::Client::new(), ResilienceEvents::new());

    let url = format!("{}/analyze", mock.base_url);
    let result: Result<Value, RequestError> = client
        .post_json(
            DEPENDENCY_KEY,
            &url,
            &HeaderMap::new(),
            &json!({"image_url": "https://cdn.test/gone.jpg"}),
            call_options(3),
        )
        .await;

    assert_eq!(mock.hit_count(), 1);
    let error = result.expect_err("404 should fail");
    assert!(error.is_not_found());
    assert!(!error.is_retryable());
    Ok(())
}

#[tokio::test]
async fn test_breaker_opens_after_repeated_failures_and_sheds_load() -> Result<()> {
    let mock = start_mock_detector(100, 500, json!({"error": "down"}), detector_body(0.1)).await?;
    let breaker = test_breaker(5, Duration::from_secs(60));
    let detector = test_detector_client(&mock.base_url, 0, false, breaker.clone());

    for _ in 0..5 {
        let error = detector
            .analyze("https://cdn.test/a.jpg")
            .await
            .expect_err("detector is down");
        assert!(matches!(error, DetectorError::Request(_)));
    }
    assert_eq!(breaker.state(DEPENDENCY_KEY), BreakerState::Open);
    assert_eq!(mock.hit_count(), 5);

    // Open circuit rejects without touching the network.
    let error = detector
        .analyze("https://cdn.test/a.jpg")
        .await
        .expect_err("circuit is open");
    assert!(matches!(error, DetectorError::CircuitOpen(_)));
    assert_eq!(mock.hit_count(), 5);
    Ok(())
}

#[tokio::test]
async fn test_breaker_closes_again_after_successful_trial() -> Result<()> {
    let mock = start_mock_detector(5, 500, json!({"error": "down"}), detector_body(0.1)).await?;
    let breaker = test_breaker(5, Duration::from_millis(50));
    let detector = test_detector_client(&mock.base_url, 0, false, breaker.clone());

    for _ in 0..5 {
        let _ = detector.analyze("https://cdn.test/a.jpg").await;
    }
    assert_eq!(breaker.state(DEPENDENCY_KEY), BreakerState::Open);

    // After the reset timeout a trial call goes through; the mock has
    // recovered, so the breaker closes.
    tokio::time::sleep(Duration::from_millis(80)).await;
    let analysis = detector.analyze("https://cdn.test/a.jpg").await?;
    assert_eq!(analysis.model_version.as_deref(), Some("deepfake-detector-v7"));
    assert_eq!(breaker.state(DEPENDENCY_KEY), BreakerState::Closed);
    Ok(())
}

#[tokio::test]
async fn test_open_circuit_falls_back_to_stub_when_enabled() -> Result<()> {
    let mock = start_mock_detector(100, 500, json!({"error": "down"}), detector_body(0.1)).await?;
    let breaker = test_breaker(5, Duration::from_secs(60));
    let detector = test_detector_client(&mock.base_url, 0, true, breaker.clone());

    for _ in 0..5 {
        let _ = detector.analyze("https://cdn.test/a.jpg").await;
    }
    assert_eq!(breaker.state(DEPENDENCY_KEY), BreakerState::Open);

    let analysis = detector.analyze("https://cdn.test/a.jpg").await?;
    assert_eq!(analysis.model_version.as_deref(), Some(STUB_MODEL_VERSION));
    assert_eq!(analysis.extra["degraded"], json!(true));
    assert_eq!(mock.hit_count(), 5);
    Ok(())
}

#[tokio::test]
async fn test_disabled_service_url_always_stubs() -> Result<()> {
    let breaker = test_breaker(5, Duration::from_secs(60));
    let detector = test_detector_client(NOOP_SERVICE_URL, 0, false, breaker);

    let first = detector.analyze("https://cdn.test/a.jpg").await?;
    let second = detector.analyze("https://cdn.test/a.jpg").await?;
    assert_eq!(first.model_version.as_deref(), Some(STUB_MODEL_VERSION));
    // Stub output is a pure function of the media URL.
    assert_eq!(first.fake_score, second.fake_score);
    Ok(())
}

#[tokio::test]
async fn test_health_check_reports_model_state() -> Result<()> {
    let mock = start_mock_detector(0, 500, json!({}), detector_body(0.1)).await?;
    let breaker = test_breaker(5, Duration::from_secs(60));
    let detector = test_detector_client(&mock.base_url, 0, false, breaker);

    let health = detector.health_check().await?;
    assert_eq!(health.status, "healthy");
    assert!(health.model_loaded);
    Ok(())
}

#[tokio::test]
async fn test_not_found_does_not_trip_the_breaker() -> Result<()> {
    let mock =
        start_mock_detector(100, 404, json!({"detail": "Resource not found"}), detector_body(0.1))
            .await?;
    let breaker = test_breaker(5, Duration::from_secs(60));
    let detector = test_detector_client(&mock.base_url, 0, false, breaker.clone());

    for _ in 0..8 {
        let error = detector
            .analyze("https://cdn.test/gone.jpg")
            .await
            .expect_err("resource is gone");
        assert!(error.is_not_found());
    }
    // The dependency answered every time; the circuit stays closed.
    assert_eq!(breaker.state(DEPENDENCY_KEY), BreakerState::Closed);
    assert_eq!(mock.hit_count(), 8);
    Ok(())
}
