use serde::Deserialize;
use std::time::Duration;

/// Overall application configuration structure.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
    pub detector: DetectorSettings,
    pub breaker: BreakerSettings,
    pub queues: QueuesSettings,
}

/// Database connection and related configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://veristream.db".to_owned(),
            max_connections: 5,
            acquire_timeout: 30,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

/// Configuration for the external detection service.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    /// Base URL of the detection service, or `"disabled"` for the local stub.
    pub service_url: String,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
    pub max_retries: u32,
    /// Fall back to the local stub while the circuit is open, instead of
    /// failing the job.
    pub fallback_to_stub: bool,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            service_url: "http://localhost:8000".to_owned(),
            api_key: None,
            timeout_ms: 30_000,
            max_retries: 2,
            fallback_to_stub: true,
        }
    }
}

/// Circuit breaker thresholds, shared by every guarded dependency.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub reset_timeout_secs: u64,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_secs: 60,
        }
    }
}

/// Per-queue worker configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct QueuesSettings {
    pub analysis: QueueSettings,
    pub notification: QueueSettings,
    pub analytics: QueueSettings,
}

impl Default for QueuesSettings {
    fn default() -> Self {
        Self {
            analysis: QueueSettings {
                concurrency: 3,
                lock_duration_secs: 300,
                max_attempts: 3,
                backoff_kind: "exponential".to_owned(),
                backoff_base_ms: 2000,
                ..QueueSettings::base()
            },
            notification: QueueSettings {
                rate_limit_max: Some(10),
                rate_limit_window_secs: Some(60),
                ..QueueSettings::base()
            },
            analytics: QueueSettings {
                concurrency: 1,
                max_attempts: 2,
                keep_finished: 100,
                rate_limit_max: Some(3),
                rate_limit_window_secs: Some(60),
                ..QueueSettings::base()
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    pub concurrency: usize,
    pub lock_duration_secs: u64,
    pub stalled_interval_secs: u64,
    pub max_stalled_count: i64,
    pub max_attempts: i64,
    pub backoff_kind: String,
    pub backoff_base_ms: i64,
    /// How many terminal (done or failed) jobs to retain before trimming.
    pub keep_finished: i64,
    pub rate_limit_max: Option<u32>,
    pub rate_limit_window_secs: Option<u64>,
}

impl QueueSettings {
    fn base() -> Self {
        Self {
            concurrency: 3,
            lock_duration_secs: 60,
            stalled_interval_secs: 30,
            max_stalled_count: 2,
            max_attempts: 3,
            backoff_kind: "none".to_owned(),
            backoff_base_ms: 0,
            keep_finished: 200,
            rate_limit_max: None,
            rate_limit_window_secs: None,
        }
    }

    #[must_use]
    pub fn lock_duration(&self) -> Duration {
        Duration::from_secs(self.lock_duration_secs)
    }

    #[must_use]
    pub fn stalled_interval(&self) -> Duration {
        Duration::from_secs(self.stalled_interval_secs)
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self::base()
    }
}
