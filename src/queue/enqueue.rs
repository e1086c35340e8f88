use crate::content::ContentRef;
use crate::database::{DbError, SqlitePool};
use crate::queue::structs::{AnalysisJobPayload, Backoff, JobStatus, QueueName};
use crate::settings::{QueueSettings, settings};
use chrono::Utc;
use serde::Serialize;
use tracing::info;

pub const DEFAULT_PRIORITY: i64 = 50;

fn queue_defaults(queue: QueueName) -> &'static QueueSettings {
    let queues = &settings().queues;
    match queue {
        QueueName::Analysis => &queues.analysis,
        QueueName::Notification => &queues.notification,
        QueueName::Analytics => &queues.analytics,
    }
}

/// Options for [`enqueue`]; unset fields fall back to the queue's configured
/// defaults.
#[derive(Debug, Default, Clone)]
pub struct EnqueueOptions {
    pub priority: Option<i64>,
    /// Prevents accidental duplicate dispatch from retried enqueue calls.
    /// Two independently-triggered analyses of the same content are guarded
    /// at the analysis record layer, not here.
    pub dedupe_key: Option<String>,
    pub max_attempts: Option<i64>,
    pub backoff: Option<Backoff>,
}

/// Durably stores a job before returning its id.
///
/// When a `dedupe_key` collides with an existing job, no new row is created
/// and the existing job's id is returned.
///
/// # Errors
///
/// Returns an error if the payload cannot be serialized or the insert fails.
pub async fn enqueue(
    pool: &SqlitePool,
    queue: QueueName,
    payload: &impl Serialize,
    options: EnqueueOptions,
) -> Result<i64, DbError> {
    let payload = serde_json::to_value(payload)?;
    let now = Utc::now();
    let priority = options.priority.unwrap_or(DEFAULT_PRIORITY);
    let defaults = queue_defaults(queue);
    let max_attempts = options.max_attempts.unwrap_or(defaults.max_attempts);
    let backoff = options
        .backoff
        .unwrap_or_else(|| Backoff::from_config(&defaults.backoff_kind, defaults.backoff_base_ms));

    let inserted: Option<i64> = sqlx::query_scalar(
        r"
        INSERT INTO jobs (queue, payload, priority, status, max_attempts,
                          backoff_kind, backoff_base_ms, dedupe_key,
                          scheduled_at, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (dedupe_key) WHERE dedupe_key IS NOT NULL DO NOTHING
        RETURNING id
        ",
    )
    .bind(queue)
    .bind(&payload)
    .bind(priority)
    .bind(JobStatus::Queued)
    .bind(max_attempts)
    .bind(backoff.kind)
    .bind(backoff.base_ms)
    .bind(&options.dedupe_key)
    .bind(now)
    .bind(now)
    .fetch_optional(pool)
    .await?;

    if let Some(job_id) = inserted {
        info!("Enqueued {} job {}.", queue.as_str(), job_id);
        return Ok(job_id);
    }

    // Dedupe hit; hand back the job that is already in flight.
    let existing: i64 = sqlx::query_scalar("SELECT id FROM jobs WHERE dedupe_key = ?")
        .bind(&options.dedupe_key)
        .fetch_one(pool)
        .await?;
    info!(
        "Not enqueueing {} job, dedupe key {:?} already present as job {}.",
        queue.as_str(),
        options.dedupe_key,
        existing
    );
    Ok(existing)
}

/// Enqueues an authenticity analysis for one content item, with the standard
/// dedupe key guarding against double dispatch from retried calls.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub async fn enqueue_analysis(
    pool: &SqlitePool,
    content: &ContentRef,
    media_url: Option<String>,
) -> Result<i64, DbError> {
    let payload = AnalysisJobPayload {
        content: content.clone(),
        media_url,
    };
    let dedupe_key = format!(
        "analyze-{}-{}",
        content.content_id,
        Utc::now().timestamp_millis()
    );
    enqueue(
        pool,
        QueueName::Analysis,
        &payload,
        EnqueueOptions {
            dedupe_key: Some(dedupe_key),
            ..EnqueueOptions::default()
        },
    )
    .await
}
