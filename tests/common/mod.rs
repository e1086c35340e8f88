#![allow(dead_code)]

use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use veristream_pipeline::database::{SqlitePool, get_db_pool};
use veristream_pipeline::detector::{DetectorClient, DetectorConfig};
use veristream_pipeline::resilience::{BreakerConfig, BreakerRegistry, ResilienceEvents};

/// Fresh migrated sqlite database in a temp dir. Keep the `TempDir` alive for
/// the duration of the test.
pub async fn test_pool() -> color_eyre::Result<(SqlitePool, TempDir)> {
    let dir = tempfile::tempdir()?;
    let url = format!("sqlite://{}", dir.path().join("test.db").display());
    let pool = get_db_pool(&url, 5, Duration::from_secs(5)).await?;
    Ok((pool, dir))
}

/// A stand-in detection service with scriptable failures.
pub struct MockDetector {
    pub base_url: String,
    pub hits: Arc<AtomicU32>,
}

impl MockDetector {
    pub fn hit_count(&self) -> u32 {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Serves `POST /analyze`: the first `fail_first` requests answer with
/// `fail_status`/`fail_body`, every request after that answers 200 with
/// `ok_body`.
pub async fn start_mock_detector(
    fail_first: u32,
    fail_status: u16,
    fail_body: Value,
    ok_body: Value,
) -> color_eyre::Result<MockDetector> {
    let hits = Arc::new(AtomicU32::new(0));
    let handler_hits = Arc::clone(&hits);

    let app = Router::new()
        .route(
            "/health",
            get(|| async { Json(json!({"status": "healthy", "model_loaded": true})) }),
        )
        .route(
            "/analyze",
            post(move |_body: Json<Value>| {
                let hits = Arc::clone(&handler_hits);
                let fail_body = fail_body.clone();
                let ok_body = ok_body.clone();
                async move {
                    let seen = hits.fetch_add(1, Ordering::SeqCst);
                    if seen < fail_first {
                        (
                            StatusCode::from_u16(fail_status)
                                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                            Json(fail_body),
                        )
                    } else {
                        (StatusCode::OK, Json(ok_body))
                    }
                }
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let base_url = format!("http://{}", listener.local_addr()?);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(MockDetector { base_url, hits })
}

pub fn detector_body(fake_score: f64) -> Value {
    json!({
        "fake_score": fake_score,
        "real_score": 1.0 - fake_score,
        "classification": if fake_score > 0.6 { "fake" } else if fake_score > 0.2 { "suspicious" } else { "real" },
        "confidence": 0.92,
        "processing_time_ms": 123,
        "model_version": "deepfake-detector-v7",
        "faces_detected": 1,
        "content_type": "portrait",
    })
}

pub fn test_detector_client(
    service_url: &str,
    max_retries: u32,
    fallback_to_stub: bool,
    breaker: Arc<BreakerRegistry>,
) -> DetectorClient {
    DetectorClient::new(
        DetectorConfig {
            service_url: service_url.to_owned(),
            api_key: None,
            timeout: Duration::from_secs(2),
            max_retries,
            fallback_to_stub,
        },
        breaker,
        ResilienceEvents::new(),
    )
    .expect("detector client")
}

pub fn test_breaker(failure_threshold: u32, reset_timeout: Duration) -> Arc<BreakerRegistry> {
    Arc::new(BreakerRegistry::new(
        BreakerConfig {
            failure_threshold,
            reset_timeout,
        },
        ResilienceEvents::new(),
    ))
}

pub async fn insert_post(
    pool: &SqlitePool,
    id: &str,
    user_id: &str,
    media_url: &str,
    is_video: bool,
) -> color_eyre::Result<()> {
    sqlx::query("INSERT INTO posts (id, user_id, media_url, is_video) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(user_id)
        .bind(media_url)
        .bind(is_video)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn insert_short(
    pool: &SqlitePool,
    id: &str,
    user_id: &str,
    video_url: &str,
) -> color_eyre::Result<()> {
    sqlx::query("INSERT INTO shorts (id, user_id, video_url) VALUES (?, ?, ?)")
        .bind(id)
        .bind(user_id)
        .bind(video_url)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn insert_story(
    pool: &SqlitePool,
    id: &str,
    user_id: &str,
    media_url: &str,
) -> color_eyre::Result<()> {
    sqlx::query("INSERT INTO stories (id, user_id, media_url) VALUES (?, ?, ?)")
        .bind(id)
        .bind(user_id)
        .bind(media_url)
        .execute(pool)
        .await?;
    Ok(())
}
