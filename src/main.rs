use clap::Parser;
use color_eyre::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use veristream_pipeline::analysis::AnalysisHandler;
use veristream_pipeline::database::get_db_pool;
use veristream_pipeline::detector::{DetectorClient, DetectorConfig};
use veristream_pipeline::fanout::{AnalyticsHandler, NotificationHandler, RealtimeHub};
use veristream_pipeline::queue::QueueName;
use veristream_pipeline::resilience::{BreakerConfig, BreakerRegistry, ResilienceEvents};
use veristream_pipeline::settings::settings;
use veristream_pipeline::worker::{QueueConfig, WorkerPool};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Also run the analysis pool on this worker process (the notification
    /// and analytics pools always run).
    #[clap(long, default_value_t = true, action = clap::ArgAction::Set)]
    analysis: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let settings = settings();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.logging.level.clone())),
        )
        .init();

    let pool = get_db_pool(
        &settings.database.url,
        settings.database.max_connections,
        Duration::from_secs(settings.database.acquire_timeout),
    )
    .await?;

    let events = ResilienceEvents::new();
    let breaker = Arc::new(BreakerRegistry::new(
        BreakerConfig {
            failure_threshold: settings.breaker.failure_threshold,
            reset_timeout: Duration::from_secs(settings.breaker.reset_timeout_secs),
        },
        events.clone(),
    ));
    let detector = DetectorClient::new(
        DetectorConfig {
            service_url: settings.detector.service_url.clone(),
            api_key: settings.detector.api_key.clone(),
            timeout: Duration::from_millis(settings.detector.timeout_ms),
            max_retries: settings.detector.max_retries,
            fallback_to_stub: settings.detector.fallback_to_stub,
        },
        breaker,
        events,
    )?;

    if detector.is_noop() {
        info!("Detector is disabled; analyses will use the local stub.");
    } else {
        match detector.health_check().await {
            Ok(health) => info!(
                "Detector healthy: status '{}', model loaded: {}.",
                health.status, health.model_loaded
            ),
            Err(e) => warn!("Detector health check failed: {}", e),
        }
    }

    let realtime = RealtimeHub::new();
    let mut pools = Vec::new();

    if args.analysis {
        pools.push(WorkerPool::start(
            pool.clone(),
            QueueName::Analysis,
            QueueConfig::from_settings(&settings.queues.analysis),
            Arc::new(AnalysisHandler::new(
                pool.clone(),
                detector.clone(),
                realtime.clone(),
            )),
        ));
    }
    pools.push(WorkerPool::start(
        pool.clone(),
        QueueName::Notification,
        QueueConfig::from_settings(&settings.queues.notification),
        Arc::new(NotificationHandler::new(pool.clone())),
    ));
    pools.push(WorkerPool::start(
        pool.clone(),
        QueueName::Analytics,
        QueueConfig::from_settings(&settings.queues.analytics),
        Arc::new(AnalyticsHandler::new(pool.clone())),
    ));

    info!("Worker pools started, waiting for jobs.");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down worker pools.");
    for worker_pool in pools {
        worker_pool.shutdown().await;
    }

    Ok(())
}
