use crate::content::ContentRef;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, Type};

/// The three durable queues the pipeline dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QueueName {
    Analysis,
    Notification,
    Analytics,
}

impl QueueName {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::Notification => "notification",
            Self::Analytics => "analytics",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type)]
#[sqlx(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    None,
    Fixed,
    Exponential,
}

/// Delay policy between retry attempts of a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backoff {
    pub kind: BackoffKind,
    pub base_ms: i64,
}

impl Backoff {
    /// Builds a backoff from its configured form. Unrecognized kinds mean no
    /// backoff.
    #[must_use]
    pub fn from_config(kind: &str, base_ms: i64) -> Self {
        let kind = match kind {
            "fixed" => BackoffKind::Fixed,
            "exponential" => BackoffKind::Exponential,
            _ => BackoffKind::None,
        };
        Self { kind, base_ms }
    }

    /// Delay before the next attempt, given how many attempts have been made.
    /// Exponential backoff doubles per attempt, capped at one hour.
    #[must_use]
    pub fn delay_ms(&self, attempts_made: i64) -> i64 {
        const CAP_MS: i64 = 3_600_000;
        match self.kind {
            BackoffKind::None => 0,
            BackoffKind::Fixed => self.base_ms.min(CAP_MS),
            BackoffKind::Exponential => {
                let exponent = u32::try_from(attempts_made.max(1) - 1).unwrap_or(u32::MAX);
                let multiplier = 2_i64.checked_pow(exponent).unwrap_or(i64::MAX);
                self.base_ms.saturating_mul(multiplier).min(CAP_MS)
            }
        }
    }
}

/// One unit of dispatched work, as stored in the `jobs` table.
#[derive(FromRow, Debug, Clone)]
pub struct Job {
    pub id: i64,
    pub queue: QueueName,
    pub payload: Value,
    pub priority: i64,
    pub status: JobStatus,
    pub attempts: i64,
    pub max_attempts: i64,
    pub backoff_kind: BackoffKind,
    pub backoff_base_ms: i64,
    pub dedupe_key: Option<String>,
    pub owner: Option<String>,
    pub stalled_count: i64,
    pub lease_expires_at: Option<DateTime<Utc>>,
    pub scheduled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Deserializes the job payload into its typed form.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored payload does not match `T`; the worker
    /// treats this as a permanent job failure.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }

    #[must_use]
    pub const fn backoff(&self) -> Backoff {
        Backoff {
            kind: self.backoff_kind,
            base_ms: self.backoff_base_ms,
        }
    }
}

/// Payload of an analysis job: which content to analyze, plus an optional
/// pre-resolved media URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisJobPayload {
    pub content: ContentRef,
    #[serde(default)]
    pub media_url: Option<String>,
}

/// Payload of an analytics job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsJobPayload {
    pub event: String,
    #[serde(default)]
    pub content_id: Option<String>,
    #[serde(default)]
    pub properties: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff_doubles() {
        let backoff = Backoff {
            kind: BackoffKind::Exponential,
            base_ms: 2000,
        };
        assert_eq!(backoff.delay_ms(1), 2000);
        assert_eq!(backoff.delay_ms(2), 4000);
        assert_eq!(backoff.delay_ms(3), 8000);
    }

    #[test]
    fn test_backoff_caps_at_one_hour() {
        let backoff = Backoff {
            kind: BackoffKind::Exponential,
            base_ms: 2000,
        };
        assert_eq!(backoff.delay_ms(60), 3_600_000);
    }

    #[test]
    fn test_backoff_from_config() {
        assert_eq!(
            Backoff::from_config("exponential", 2000).kind,
            BackoffKind::Exponential
        );
        assert_eq!(Backoff::from_config("fixed", 500).kind, BackoffKind::Fixed);
        assert_eq!(Backoff::from_config("none", 0).kind, BackoffKind::None);
        assert_eq!(Backoff::from_config("bogus", 0).kind, BackoffKind::None);
    }

    #[test]
    fn test_no_backoff() {
        let backoff = Backoff {
            kind: BackoffKind::None,
            base_ms: 0,
        };
        assert_eq!(backoff.delay_ms(1), 0);
        assert_eq!(backoff.delay_ms(5), 0);
    }
}
