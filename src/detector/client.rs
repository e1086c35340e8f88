use crate::detector::structs::{AnalyzeRequest, AnalyzeResponse, HealthResponse};
use crate::detector::stub::stub_analysis;
use crate::resilience::{
    BreakerError, BreakerRegistry, CallOptions, RequestError, ResilienceEvents, ResilientClient,
};
use reqwest::header::{HeaderMap, HeaderValue};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Circuit breaker key for the detection service.
pub const DEPENDENCY_KEY: &str = "ai-service";

/// Sentinel `service_url` meaning "no external detector, always use the
/// local stub".
pub const NOOP_SERVICE_URL: &str = "disabled";

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    CircuitOpen(#[from] BreakerError),
}

impl DetectorError {
    /// Whether the failure means the analyzed content is permanently gone
    /// (so the job should be skipped, not retried).
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Request(error) => error.is_not_found(),
            Self::CircuitOpen(_) => false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DetectorConfig {
    pub service_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub max_retries: u32,
    /// When the circuit is open, fall back to the local stub instead of
    /// surfacing the short-circuit error.
    pub fallback_to_stub: bool,
}

/// Client for the external detection service, guarded by the circuit breaker
/// and the retrying HTTP client.
#[derive(Clone)]
pub struct DetectorClient {
    config: DetectorConfig,
    http: reqwest::Client,
    client: ResilientClient,
    breaker: Arc<BreakerRegistry>,
    headers: HeaderMap,
}

impl DetectorClient {
    /// # Errors
    ///
    /// Returns an error if the service URL does not parse or the configured
    /// API key is not a valid header value.
    pub fn new(
        config: DetectorConfig,
        breaker: Arc<BreakerRegistry>,
        events: ResilienceEvents,
    ) -> color_eyre::Result<Self> {
        if config.service_url != NOOP_SERVICE_URL {
            url::Url::parse(&config.service_url)?;
        }
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &config.api_key {
            headers.insert("X-API-Key", HeaderValue::from_str(api_key)?);
        }
        let http = reqwest::Client::new();
        Ok(Self {
            config,
            client: ResilientClient::new(http.clone(), events),
            http,
            breaker,
            headers,
        })
    }

    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.config.service_url == NOOP_SERVICE_URL
    }

    /// Runs detection for a media URL.
    ///
    /// Calls go through the circuit breaker; transport-level failures count
    /// against it, while "content gone" responses do not (the dependency
    /// answered). With the no-op sentinel, or while the circuit is open and
    /// stub fallback is enabled, a local stub result is returned instead.
    ///
    /// # Errors
    ///
    /// * [`DetectorError::CircuitOpen`] when the circuit rejects the call and
    ///   stub fallback is disabled.
    /// * [`DetectorError::Request`] when the call fails after retries.
    pub async fn analyze(&self, media_url: &str) -> Result<AnalyzeResponse, DetectorError> {
        if self.is_noop() {
            info!("Detector disabled, using local stub analysis.");
            return Ok(stub_analysis(media_url, "detector disabled"));
        }

        if let Err(error) = self.breaker.try_acquire(DEPENDENCY_KEY) {
            if self.config.fallback_to_stub {
                warn!("{}; falling back to local stub analysis.", error);
                return Ok(stub_analysis(media_url, "circuit open"));
            }
            return Err(error.into());
        }

        let url = format!("{}/analyze", self.config.service_url.trim_end_matches('/'));
        let request = AnalyzeRequest {
            image_url: media_url.to_owned(),
        };
        let options = CallOptions {
            max_retries: self.config.max_retries,
            timeout: self.config.timeout,
        };

        let result: Result<AnalyzeResponse, RequestError> = self
            .client
            .post_json(DEPENDENCY_KEY, &url, &self.headers, &request, options)
            .await;

        match result {
            Ok(response) => {
                self.breaker.record_success(DEPENDENCY_KEY);
                Ok(response)
            }
            Err(error) => {
                if error.is_not_found() {
                    // The service answered; only transport-level failures
                    // count against the circuit.
                    self.breaker.record_success(DEPENDENCY_KEY);
                } else {
                    self.breaker.record_failure(DEPENDENCY_KEY);
                }
                Err(error.into())
            }
        }
    }

    /// Startup health probe, logged only.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be
    /// decoded.
    pub async fn health_check(&self) -> color_eyre::Result<HealthResponse> {
        let url = format!("{}/health", self.config.service_url.trim_end_matches('/'));
        let response = self
            .http
            .get(&url)
            .headers(self.headers.clone())
            .timeout(Duration::from_secs(5))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<HealthResponse>().await?)
    }
}
