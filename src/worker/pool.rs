use crate::alert;
use crate::database::SqlitePool;
use crate::queue::{
    Job, QueueName, claim_next_job, reclaim_stalled, trim_finished, update_job_on_completion,
    update_job_on_failure,
};
use crate::settings::QueueSettings;
use crate::utils::nice_id;
use crate::worker::rate_limit::{RateLimit, RateLimiter};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Runtime configuration for one queue's worker pool.
#[derive(Clone, Debug)]
pub struct QueueConfig {
    pub concurrency: usize,
    /// Exclusive lease a worker holds on a claimed job.
    pub lock_duration: Duration,
    /// How often the stall detector scans for expired leases.
    pub stalled_interval: Duration,
    /// Times a job may be reclaimed from an expired lease before it fails.
    pub max_stalled_count: i64,
    pub keep_finished: i64,
    pub rate_limit: Option<RateLimit>,
    /// Idle sleep between claim attempts when the queue is empty.
    pub poll_interval: Duration,
}

impl QueueConfig {
    #[must_use]
    pub fn from_settings(settings: &QueueSettings) -> Self {
        let rate_limit = match (settings.rate_limit_max, settings.rate_limit_window_secs) {
            (Some(max), Some(window_secs)) => Some(RateLimit {
                max,
                window: Duration::from_secs(window_secs),
            }),
            _ => None,
        };
        Self {
            concurrency: settings.concurrency,
            lock_duration: settings.lock_duration(),
            stalled_interval: settings.stalled_interval(),
            max_stalled_count: settings.max_stalled_count,
            keep_finished: settings.keep_finished,
            rate_limit,
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// A queue's registered job handler.
///
/// `Ok(())` marks the job done; an error marks this attempt failed and lets
/// the pool's retry policy decide between rescheduling and terminal failure.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> color_eyre::Result<()>;
}

/// Handle to a running worker pool; dropping it does not stop the workers,
/// call [`WorkerPool::shutdown`].
pub struct WorkerPool {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Starts `concurrency` claim loops plus one stall detector for a queue.
    #[must_use]
    pub fn start(
        pool: SqlitePool,
        queue: QueueName,
        config: QueueConfig,
        handler: Arc<dyn JobHandler>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let limiter = config.rate_limit.map(|limit| Arc::new(RateLimiter::new(limit)));
        let mut handles = Vec::with_capacity(config.concurrency + 1);

        for _ in 0..config.concurrency {
            let worker_id = nice_id(8);
            handles.push(tokio::spawn(run_worker_loop(
                pool.clone(),
                queue,
                config.clone(),
                Arc::clone(&handler),
                limiter.clone(),
                cancel.clone(),
                worker_id,
            )));
        }
        handles.push(tokio::spawn(run_stall_detector(
            pool,
            queue,
            config,
            cancel.clone(),
        )));

        Self { cancel, handles }
    }

    /// Signals all loops to stop and waits for them to finish their current
    /// job.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

async fn run_worker_loop(
    pool: SqlitePool,
    queue: QueueName,
    config: QueueConfig,
    handler: Arc<dyn JobHandler>,
    limiter: Option<Arc<RateLimiter>>,
    cancel: CancellationToken,
    worker_id: String,
) {
    let mut sleeping = false;

    loop {
        if cancel.is_cancelled() {
            break;
        }

        if let Some(limiter) = &limiter {
            tokio::select! {
                () = cancel.cancelled() => break,
                () = limiter.acquire() => {}
            }
        }

        match claim_next_job(&pool, queue, &worker_id, config.lock_duration).await {
            Ok(Some(job)) => {
                sleeping = false;
                info!(
                    "🐜 [{}] Picked up {} job {} (attempt {}/{}).",
                    worker_id,
                    queue.as_str(),
                    job.id,
                    job.attempts + 1,
                    job.max_attempts
                );
                run_one_job(&pool, &*handler, &job, config.keep_finished).await;
            }
            Ok(None) => {
                // Give the permit back; an idle poll must not drain the
                // window and starve jobs enqueued later in it.
                if let Some(limiter) = &limiter {
                    limiter.release().await;
                }
                if !sleeping {
                    sleeping = true;
                    info!("💤 [{}] No {} jobs, going to sleep...", worker_id, queue.as_str());
                }
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = sleep(config.poll_interval) => {}
                }
            }
            Err(e) => {
                if let Some(limiter) = &limiter {
                    limiter.release().await;
                }
                alert!("Claiming from '{}' failed: {}", queue.as_str(), e);
                sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

async fn run_one_job(pool: &SqlitePool, handler: &dyn JobHandler, job: &Job, keep_finished: i64) {
    let outcome = handler.handle(job).await;

    let update = match outcome {
        Ok(()) => {
            info!("✅ Job {} done.", job.id);
            update_job_on_completion(pool, job).await
        }
        Err(e) => update_job_on_failure(pool, job, &format!("{e:#}")).await,
    };
    if let Err(e) = update {
        alert!("Failed to record outcome of job {}: {}", job.id, e);
        return;
    }

    if let Err(e) = trim_finished(pool, job.queue, keep_finished).await {
        error!("Trimming '{}' failed: {}", job.queue.as_str(), e);
    }
}

async fn run_stall_detector(
    pool: SqlitePool,
    queue: QueueName,
    config: QueueConfig,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            () = sleep(config.stalled_interval) => {}
        }
        if let Err(e) = reclaim_stalled(&pool, queue, config.max_stalled_count).await {
            alert!("Stall check on '{}' failed: {}", queue.as_str(), e);
        }
    }
}
