use crate::detector::structs::AnalyzeResponse;
use serde_json::{Map, Value, json};

pub const STUB_MODEL_VERSION: &str = "local-fallback-v1";

/// Local degraded-mode analysis used when the external detector is
/// unreachable or explicitly disabled.
///
/// The score is derived from a hash of the media URL, so re-running the same
/// content produces the same result. This is a liveness guarantee for the
/// job, not a correctness claim about the analysis content.
#[must_use]
pub fn stub_analysis(media_url: &str, reason: &str) -> AnalyzeResponse {
    let mut rng = fastrand::Rng::with_seed(seed_from_url(media_url));
    // Bias towards low scores; a degraded detector should rarely cry fake.
    let fake_score = (rng.f64() * rng.f64() * 0.9).clamp(0.0, 1.0);

    let classification = if fake_score <= 0.2 {
        "real"
    } else if fake_score <= 0.6 {
        "suspicious"
    } else {
        "fake"
    };

    let mut extra = Map::new();
    extra.insert("degraded".to_owned(), Value::Bool(true));
    extra.insert("fallback_reason".to_owned(), json!(reason));

    AnalyzeResponse {
        fake_score,
        real_score: 1.0 - fake_score,
        classification: classification.to_owned(),
        confidence: 0.5 + rng.f64() * 0.3,
        processing_time_ms: 0,
        model_version: Some(STUB_MODEL_VERSION.to_owned()),
        extra,
    }
}

fn seed_from_url(media_url: &str) -> u64 {
    // FNV-1a, enough to spread urls over the score range.
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in media_url.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_is_deterministic_per_url() {
        let a = stub_analysis("https://cdn.example/a.jpg", "test");
        let b = stub_analysis("https://cdn.example/a.jpg", "test");
        assert!((a.fake_score - b.fake_score).abs() < f64::EPSILON);
        assert_eq!(a.classification, b.classification);
    }

    #[test]
    fn test_stub_scores_in_range() {
        for i in 0..50 {
            let response = stub_analysis(&format!("https://cdn.example/{i}.jpg"), "test");
            assert!((0.0..=1.0).contains(&response.fake_score));
            assert!((0.0..=1.0).contains(&response.real_score));
            assert_eq!(response.model_version.as_deref(), Some(STUB_MODEL_VERSION));
            assert_eq!(response.extra.get("degraded"), Some(&true.into()));
        }
    }
}
