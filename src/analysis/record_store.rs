use crate::classify::Classification;
use crate::database::{DbError, SqlitePool};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type)]
#[sqlx(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Processing,
    Completed,
    Failed,
    Skipped,
}

/// One analysis record per content item; re-runs reset it instead of
/// creating a duplicate.
#[derive(FromRow, Debug, Clone)]
pub struct AnalysisRecord {
    pub id: i64,
    pub content_id: String,
    pub parent_id: Option<String>,
    pub status: AnalysisStatus,
    pub confidence_score: Option<f64>,
    pub classification: Option<String>,
    pub analysis_details: Option<Value>,
    pub processing_time_ms: Option<i64>,
    pub error_message: Option<String>,
    pub model_version: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Terminal result of a successful analysis.
#[derive(Debug, Clone)]
pub struct CompletedAnalysis {
    /// Fake-likelihood, 0-100.
    pub confidence_score: f64,
    pub classification: Classification,
    /// The detector's full result payload, preserved verbatim.
    pub analysis_details: Value,
    pub processing_time_ms: i64,
    pub model_version: Option<String>,
}

pub struct AnalysisRecordStore;

impl AnalysisRecordStore {
    /// Creates the record in `processing` state, or resets an existing one.
    /// Idempotent: at most one record per content id ever exists. A reset
    /// clears the previous run's result so readers never see a stale
    /// classification next to a `processing` status.
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails.
    pub async fn upsert_processing(
        pool: &SqlitePool,
        content_id: &str,
        parent_id: Option<&str>,
    ) -> Result<i64, DbError> {
        let now = Utc::now();
        let id = sqlx::query_scalar(
            r"
            INSERT INTO analysis_records (content_id, parent_id, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (content_id) DO UPDATE
                SET status             = excluded.status,
                    parent_id          = excluded.parent_id,
                    confidence_score   = NULL,
                    classification     = NULL,
                    analysis_details   = NULL,
                    processing_time_ms = NULL,
                    model_version      = NULL,
                    error_message      = NULL,
                    updated_at         = excluded.updated_at
            RETURNING id
            ",
        )
        .bind(content_id)
        .bind(parent_id)
        .bind(AnalysisStatus::Processing)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await?;
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn mark_completed(
        pool: &SqlitePool,
        content_id: &str,
        outcome: &CompletedAnalysis,
    ) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE analysis_records \
             SET status = ?, confidence_score = ?, classification = ?, analysis_details = ?, \
                 processing_time_ms = ?, model_version = ?, error_message = NULL, updated_at = ? \
             WHERE content_id = ?",
        )
        .bind(AnalysisStatus::Completed)
        .bind(outcome.confidence_score)
        .bind(outcome.classification.as_str())
        .bind(&outcome.analysis_details)
        .bind(outcome.processing_time_ms)
        .bind(&outcome.model_version)
        .bind(Utc::now())
        .bind(content_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn mark_failed(
        pool: &SqlitePool,
        content_id: &str,
        error_message: &str,
        processing_time_ms: i64,
    ) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE analysis_records \
             SET status = ?, error_message = ?, processing_time_ms = ?, updated_at = ? \
             WHERE content_id = ?",
        )
        .bind(AnalysisStatus::Failed)
        .bind(error_message)
        .bind(processing_time_ms)
        .bind(Utc::now())
        .bind(content_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn mark_skipped(
        pool: &SqlitePool,
        content_id: &str,
        error_message: &str,
    ) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE analysis_records SET status = ?, error_message = ?, updated_at = ? \
             WHERE content_id = ?",
        )
        .bind(AnalysisStatus::Skipped)
        .bind(error_message)
        .bind(Utc::now())
        .bind(content_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_by_content_id(
        pool: &SqlitePool,
        content_id: &str,
    ) -> Result<Option<AnalysisRecord>, DbError> {
        let record = sqlx::query_as::<_, AnalysisRecord>(
            "SELECT id, content_id, parent_id, status, confidence_score, classification, \
                    analysis_details, processing_time_ms, error_message, model_version, \
                    created_at, updated_at \
             FROM analysis_records WHERE content_id = ?",
        )
        .bind(content_id)
        .fetch_optional(pool)
        .await?;
        Ok(record)
    }
}
