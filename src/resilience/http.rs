use crate::resilience::events::{ResilienceEvent, ResilienceEvents};
use reqwest::header::HeaderMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Error from a single resilient call, after the retry budget is spent.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("network error calling {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl RequestError {
    /// Transient failures worth another attempt: timeouts, network errors and
    /// 5xx responses. Client errors (4xx) are surfaced immediately.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Network { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Decode { .. } => false,
        }
    }

    /// Whether the failure means the analyzed resource is permanently gone.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Status { status, body, .. } => {
                let body = body.to_lowercase();
                *status == 404 || body.contains("not found") || body.contains("no longer exists")
            }
            _ => false,
        }
    }
}

/// Per-call options for [`ResilientClient`].
#[derive(Clone, Copy, Debug)]
pub struct CallOptions {
    /// Additional attempts after the first one; `max_retries = N` means at
    /// most `N + 1` network attempts.
    pub max_retries: u32,
    /// Bound on each individual attempt.
    pub timeout: Duration,
}

/// A thin wrapper over `reqwest` that bounds each attempt with a timeout and
/// retries transient failures immediately within the retry budget. Backoff
/// between retries is the caller's (the job queue's) concern, not this
/// layer's.
#[derive(Clone)]
pub struct ResilientClient {
    http: reqwest::Client,
    events: ResilienceEvents,
}

impl ResilientClient {
    #[must_use]
    pub fn new(http: reqwest::Client, events: ResilienceEvents) -> Self {
        Self { http, events }
    }

    /// POSTs `body` as JSON and decodes a JSON response, retrying transient
    /// failures up to `options.max_retries` times.
    ///
    /// # Errors
    ///
    /// Returns the last [`RequestError`] once the retry budget is exhausted,
    /// or immediately for non-retryable failures (4xx responses).
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        dependency: &str,
        url: &str,
        headers: &HeaderMap,
        body: &B,
        options: CallOptions,
    ) -> Result<T, RequestError> {
        let mut attempt: u32 = 0;
        loop {
            match self.attempt_post(url, headers, body, options.timeout).await {
                Ok(response) => return Ok(response),
                Err(error) => {
                    attempt += 1;
                    if !error.is_retryable() || attempt > options.max_retries {
                        return Err(error);
                    }
                    warn!(
                        "Retrying call to {} (attempt {}/{}): {}",
                        dependency, attempt, options.max_retries, error
                    );
                    self.events.publish(ResilienceEvent::Retry {
                        dependency: dependency.to_owned(),
                        attempt,
                        error: error.to_string(),
                    });
                }
            }
        }
    }

    async fn attempt_post<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &HeaderMap,
        body: &B,
        timeout: Duration,
    ) -> Result<T, RequestError> {
        let result = self
            .http
            .post(url)
            .headers(headers.clone())
            .timeout(timeout)
            .json(body)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(source) if source.is_timeout() => {
                return Err(RequestError::Timeout {
                    url: url.to_owned(),
                });
            }
            Err(source) => {
                return Err(RequestError::Network {
                    url: url.to_owned(),
                    source,
                });
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RequestError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
                body,
            });
        }

        response.json::<T>().await.map_err(|source| {
            if source.is_timeout() {
                RequestError::Timeout {
                    url: url.to_owned(),
                }
            } else {
                RequestError::Decode {
                    url: url.to_owned(),
                    source,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::RequestError;

    #[test]
    fn test_not_found_detection() {
        let by_status = RequestError::Status {
            url: "http://x".into(),
            status: 404,
            body: String::new(),
        };
        let by_body = RequestError::Status {
            url: "http://x".into(),
            status: 400,
            body: "Resource not found".into(),
        };
        let server_error = RequestError::Status {
            url: "http://x".into(),
            status: 500,
            body: "boom".into(),
        };
        assert!(by_status.is_not_found());
        assert!(by_body.is_not_found());
        assert!(!server_error.is_not_found());
    }

    #[test]
    fn test_retryable_classification() {
        let timeout = RequestError::Timeout {
            url: "http://x".into(),
        };
        let server_error = RequestError::Status {
            url: "http://x".into(),
            status: 503,
            body: String::new(),
        };
        let client_error = RequestError::Status {
            url: "http://x".into(),
            status: 404,
            body: String::new(),
        };
        assert!(timeout.is_retryable());
        assert!(server_error.is_retryable());
        assert!(!client_error.is_retryable());
    }
}
