use crate::alert;
use crate::database::{DbError, SqlitePool};
use crate::queue::structs::{Job, JobStatus, QueueName};
use chrono::{Duration as ChronoDuration, Utc};
use std::time::Duration;
use tracing::{info, warn};

const JOB_COLUMNS: &str = "id, queue, payload, priority, status, attempts, max_attempts, \
                           backoff_kind, backoff_base_ms, dedupe_key, owner, stalled_count, \
                           lease_expires_at, scheduled_at, created_at";

/// Atomically claims the next available job from a queue.
///
/// The claim takes an exclusive lease until `now + lock_duration`; a worker
/// that dies without completing the job is caught later by
/// [`reclaim_stalled`].
///
/// # Errors
///
/// Returns an error if the database update fails.
pub async fn claim_next_job(
    pool: &SqlitePool,
    queue: QueueName,
    worker_id: &str,
    lock_duration: Duration,
) -> Result<Option<Job>, DbError> {
    let now = Utc::now();
    let lease_expires_at = now
        + ChronoDuration::from_std(lock_duration)
            .unwrap_or_else(|_| ChronoDuration::seconds(300));

    let sql = format!(
        r"
        UPDATE jobs
        SET status = ?, owner = ?, started_at = ?, lease_expires_at = ?
        WHERE id = (SELECT id
                    FROM jobs
                    WHERE queue = ? AND status = ? AND scheduled_at <= ?
                    ORDER BY priority, created_at, id
                    LIMIT 1)
        RETURNING {JOB_COLUMNS}
        "
    );

    let job = sqlx::query_as::<_, Job>(&sql)
        .bind(JobStatus::Running)
        .bind(worker_id)
        .bind(now)
        .bind(lease_expires_at)
        .bind(queue)
        .bind(JobStatus::Queued)
        .bind(now)
        .fetch_optional(pool)
        .await?;

    Ok(job)
}

/// Marks a job as done.
///
/// # Errors
///
/// Returns an error if the database update fails.
pub async fn update_job_on_completion(pool: &SqlitePool, job: &Job) -> Result<(), DbError> {
    sqlx::query("UPDATE jobs SET status = ?, finished_at = ?, owner = NULL WHERE id = ?")
        .bind(JobStatus::Done)
        .bind(Utc::now())
        .bind(job.id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Updates a job's status on failure, either rescheduling it after its
/// backoff delay or marking it terminally failed once attempts run out.
///
/// # Errors
///
/// Returns an error if the database update fails.
pub async fn update_job_on_failure(
    pool: &SqlitePool,
    job: &Job,
    error: &str,
) -> Result<(), DbError> {
    let attempts_made = job.attempts + 1;
    if attempts_made >= job.max_attempts {
        mark_job_failed(pool, job.id, error).await
    } else {
        let delay_ms = job.backoff().delay_ms(attempts_made);
        reschedule_for_retry(pool, job.id, delay_ms, error).await
    }
}

async fn mark_job_failed(pool: &SqlitePool, job_id: i64, last_error: &str) -> Result<(), DbError> {
    alert!("‼️ Marking job {} as failed: {}", job_id, last_error);
    sqlx::query(
        "UPDATE jobs SET status = ?, finished_at = ?, last_error = ?, \
         attempts = attempts + 1, owner = NULL WHERE id = ?",
    )
    .bind(JobStatus::Failed)
    .bind(Utc::now())
    .bind(last_error)
    .bind(job_id)
    .execute(pool)
    .await?;
    Ok(())
}

async fn reschedule_for_retry(
    pool: &SqlitePool,
    job_id: i64,
    delay_ms: i64,
    last_error: &str,
) -> Result<(), DbError> {
    warn!("⚠️ Rescheduling job {}. Backoff: {}ms", job_id, delay_ms);
    let scheduled_at = Utc::now() + ChronoDuration::milliseconds(delay_ms);
    sqlx::query(
        "UPDATE jobs SET status = ?, scheduled_at = ?, attempts = attempts + 1, \
         owner = NULL, started_at = NULL, lease_expires_at = NULL, last_error = ? \
         WHERE id = ?",
    )
    .bind(JobStatus::Queued)
    .bind(scheduled_at)
    .bind(last_error)
    .bind(job_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Returns stalled jobs (expired lease, worker never reported back) to the
/// queue, or fails them once they have stalled `max_stalled_count` times.
///
/// Returns `(requeued, failed)` counts.
///
/// # Errors
///
/// Returns an error if a database update fails.
pub async fn reclaim_stalled(
    pool: &SqlitePool,
    queue: QueueName,
    max_stalled_count: i64,
) -> Result<(u64, u64), DbError> {
    let now = Utc::now();

    let failed = sqlx::query(
        "UPDATE jobs SET status = ?, finished_at = ?, owner = NULL, \
         last_error = 'job stalled too many times; lease expired without completion' \
         WHERE queue = ? AND status = ? AND lease_expires_at < ? AND stalled_count >= ?",
    )
    .bind(JobStatus::Failed)
    .bind(now)
    .bind(queue)
    .bind(JobStatus::Running)
    .bind(now)
    .bind(max_stalled_count)
    .execute(pool)
    .await?
    .rows_affected();

    let requeued = sqlx::query(
        "UPDATE jobs SET status = ?, owner = NULL, started_at = NULL, \
         lease_expires_at = NULL, stalled_count = stalled_count + 1, scheduled_at = ? \
         WHERE queue = ? AND status = ? AND lease_expires_at < ?",
    )
    .bind(JobStatus::Queued)
    .bind(now)
    .bind(queue)
    .bind(JobStatus::Running)
    .bind(now)
    .execute(pool)
    .await?
    .rows_affected();

    if requeued > 0 || failed > 0 {
        info!(
            "Stall check on '{}': requeued {}, failed {}.",
            queue.as_str(),
            requeued,
            failed
        );
    }
    Ok((requeued, failed))
}

/// Trims terminal jobs beyond `keep_finished`, oldest first, to cap storage.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub async fn trim_finished(
    pool: &SqlitePool,
    queue: QueueName,
    keep_finished: i64,
) -> Result<u64, DbError> {
    let removed = sqlx::query(
        r"
        DELETE FROM jobs
        WHERE queue = ? AND status IN (?, ?)
          AND id NOT IN (SELECT id
                         FROM jobs
                         WHERE queue = ? AND status IN (?, ?)
                         ORDER BY finished_at DESC, id DESC
                         LIMIT ?)
        ",
    )
    .bind(queue)
    .bind(JobStatus::Done)
    .bind(JobStatus::Failed)
    .bind(queue)
    .bind(JobStatus::Done)
    .bind(JobStatus::Failed)
    .bind(keep_finished)
    .execute(pool)
    .await?
    .rows_affected();
    Ok(removed)
}
