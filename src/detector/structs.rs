use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Request body for `POST {service_url}/analyze`.
#[derive(Debug, Serialize)]
pub struct AnalyzeRequest {
    pub image_url: String,
}

/// Response from the detection service.
///
/// Besides the core scores, the service returns a growing set of enrichment
/// fields (face breakdowns, filter detection, compression analysis, ...).
/// Those are preserved verbatim in `extra` and stored with the analysis
/// record rather than modeled field by field.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    /// Fake-probability, 0-1.
    pub fake_score: f64,
    pub real_score: f64,
    /// The detector's own label ("real", "suspicious", "fake"); the pipeline
    /// derives its classification from `fake_score` instead.
    pub classification: String,
    pub confidence: f64,
    pub processing_time_ms: i64,
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response from `GET {service_url}/health`.
#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub model_loaded: bool,
}
