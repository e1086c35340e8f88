mod client;
mod structs;
mod stub;

pub use client::{DEPENDENCY_KEY, DetectorClient, DetectorConfig, DetectorError, NOOP_SERVICE_URL};
pub use structs::{AnalyzeRequest, AnalyzeResponse, HealthResponse};
pub use stub::{STUB_MODEL_VERSION, stub_analysis};
