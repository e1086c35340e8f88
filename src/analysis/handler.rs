use crate::analysis::record_store::{AnalysisRecordStore, CompletedAnalysis};
use crate::classify::{Classification, score_from_fake_probability};
use crate::content::{ContentAdapter, ContentRef, ResolvedMedia, adapter_for};
use crate::database::SqlitePool;
use crate::detector::{AnalyzeResponse, DetectorClient};
use crate::fanout::RealtimeHub;
use crate::queue::{AnalysisJobPayload, AnalyticsJobPayload, EnqueueOptions, Job, QueueName, enqueue};
use crate::worker::JobHandler;
use async_trait::async_trait;
use color_eyre::Result;
use serde_json::json;
use std::time::Instant;
use tracing::{info, warn};

/// Handler for the analysis queue: drives one content item from
/// `processing` to a terminal status and fans out the side effects.
pub struct AnalysisHandler {
    pool: SqlitePool,
    detector: DetectorClient,
    realtime: RealtimeHub,
}

impl AnalysisHandler {
    #[must_use]
    pub fn new(pool: SqlitePool, detector: DetectorClient, realtime: RealtimeHub) -> Self {
        Self {
            pool,
            detector,
            realtime,
        }
    }

    async fn fan_out_completed(
        &self,
        adapter: &dyn ContentAdapter,
        content: &ContentRef,
        resolved: &ResolvedMedia,
        record_id: i64,
        score: f64,
        classification: Classification,
        response: &AnalyzeResponse,
    ) -> Result<()> {
        adapter
            .update_trust(
                &self.pool,
                &content.content_id,
                classification.trust_level(),
                record_id,
            )
            .await?;

        // Everything below is best-effort; a lost notice must not discard a
        // correctly-analyzed result.
        self.realtime.emit(
            &resolved.owner_id,
            "analysis_complete",
            json!({
                "content_id": content.content_id,
                "content_kind": content.kind.as_str(),
                "status": "completed",
                "confidence_score": score,
                "classification": classification.as_str(),
                "trust_level": classification.trust_level(),
                "analysis": response,
            }),
        );

        if let Some(notification) =
            adapter.notification(&content.content_id, &resolved.owner_id, classification)
        {
            let enqueued = enqueue(
                &self.pool,
                QueueName::Notification,
                &notification,
                EnqueueOptions::default(),
            )
            .await;
            if let Err(e) = enqueued {
                warn!(
                    "Could not enqueue notification for {}: {}",
                    content.content_id, e
                );
            }
        }

        let analytics = AnalyticsJobPayload {
            event: "analysis_completed".to_owned(),
            content_id: Some(content.content_id.clone()),
            properties: json!({
                "content_kind": content.kind.as_str(),
                "classification": classification.as_str(),
                "confidence_score": score,
            }),
        };
        if let Err(e) = enqueue(
            &self.pool,
            QueueName::Analytics,
            &analytics,
            EnqueueOptions::default(),
        )
        .await
        {
            warn!(
                "Could not enqueue analytics event for {}: {}",
                content.content_id, e
            );
        }

        Ok(())
    }
}

#[async_trait]
impl JobHandler for AnalysisHandler {
    async fn handle(&self, job: &Job) -> Result<()> {
        let payload: AnalysisJobPayload = job.payload_as()?;
        let content = payload.content;
        let adapter = adapter_for(content.kind);
        let started = Instant::now();

        let resolved = adapter
            .resolve_media(&self.pool, &content.content_id)
            .await?;
        let Some(resolved) = resolved else {
            // Content was deleted before we got to it. Same terminal path as
            // a detector 404: skipped, and the job reports success.
            AnalysisRecordStore::upsert_processing(
                &self.pool,
                &content.content_id,
                content.parent_id.as_deref(),
            )
            .await?;
            AnalysisRecordStore::mark_skipped(
                &self.pool,
                &content.content_id,
                &format!("{} {} no longer exists", content.kind.as_str(), content.content_id),
            )
            .await?;
            info!(
                "⏭️ Skipping analysis of {} {}, content is gone.",
                content.kind.as_str(),
                content.content_id
            );
            return Ok(());
        };

        let media_url = payload
            .media_url
            .unwrap_or_else(|| resolved.media_url.clone());

        let record_id = AnalysisRecordStore::upsert_processing(
            &self.pool,
            &content.content_id,
            content.parent_id.as_deref(),
        )
        .await?;

        self.realtime.emit(
            &resolved.owner_id,
            "analysis_started",
            json!({
                "content_id": content.content_id,
                "content_kind": content.kind.as_str(),
                "status": "processing",
                "is_video": resolved.is_video,
            }),
        );

        match self.detector.analyze(&media_url).await {
            Ok(response) => {
                let score = score_from_fake_probability(response.fake_score);
                let classification = Classification::from_score(score);
                let processing_time_ms =
                    i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);

                let outcome = CompletedAnalysis {
                    confidence_score: score,
                    classification,
                    analysis_details: serde_json::to_value(&response)?,
                    processing_time_ms,
                    model_version: response.model_version.clone(),
                };
                AnalysisRecordStore::mark_completed(&self.pool, &content.content_id, &outcome)
                    .await?;
                info!(
                    "🔍 Analysis of {} {} completed: score {:.1}, {}.",
                    content.kind.as_str(),
                    content.content_id,
                    score,
                    classification.as_str()
                );

                self.fan_out_completed(
                    adapter,
                    &content,
                    &resolved,
                    record_id,
                    score,
                    classification,
                    &response,
                )
                .await
            }
            Err(error) if error.is_not_found() => {
                AnalysisRecordStore::mark_skipped(
                    &self.pool,
                    &content.content_id,
                    &format!("Media no longer available: {error}"),
                )
                .await?;
                info!(
                    "⏭️ Skipping analysis of {} {}, media is gone.",
                    content.kind.as_str(),
                    content.content_id
                );
                // The content is gone; retrying cannot help.
                Ok(())
            }
            Err(error) => {
                let processing_time_ms =
                    i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);
                AnalysisRecordStore::mark_failed(
                    &self.pool,
                    &content.content_id,
                    &error.to_string(),
                    processing_time_ms,
                )
                .await?;
                // The worker pool decides between retry and terminal failure.
                Err(error.into())
            }
        }
    }
}
