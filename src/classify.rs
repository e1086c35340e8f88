use serde::{Deserialize, Serialize};

/// Three-tier authenticity label derived from the detector's fake-likelihood
/// score (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Authentic,
    Suspicious,
    LikelyFake,
}

impl Classification {
    /// Maps a 0-100 fake-likelihood score to a classification.
    ///
    /// Boundaries are inclusive on the lower tier: exactly 20 is still
    /// `Authentic`, exactly 60 is still `Suspicious`.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score <= 20.0 {
            Self::Authentic
        } else if score <= 60.0 {
            Self::Suspicious
        } else {
            Self::LikelyFake
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Authentic => "AUTHENTIC",
            Self::Suspicious => "SUSPICIOUS",
            Self::LikelyFake => "LIKELY_FAKE",
        }
    }

    /// User-facing trust-level string attached to the owning content.
    #[must_use]
    pub const fn trust_level(self) -> &'static str {
        match self {
            Self::Authentic => "authentic",
            Self::Suspicious => "suspicious",
            Self::LikelyFake => "likely_fake",
        }
    }
}

/// Trust level for content that may not have a classification yet.
#[must_use]
pub const fn trust_level(classification: Option<Classification>) -> &'static str {
    match classification {
        Some(c) => c.trust_level(),
        None => "pending",
    }
}

/// The detector reports a 0-1 fake-probability; the pipeline classifies on a
/// 0-100 scale.
#[must_use]
pub fn score_from_fake_probability(probability: f64) -> f64 {
    (probability * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, Classification::Authentic)]
    #[case(5.0, Classification::Authentic)]
    #[case(20.0, Classification::Authentic)]
    #[case(20.1, Classification::Suspicious)]
    #[case(21.0, Classification::Suspicious)]
    #[case(40.0, Classification::Suspicious)]
    #[case(60.0, Classification::Suspicious)]
    #[case(60.1, Classification::LikelyFake)]
    #[case(61.0, Classification::LikelyFake)]
    #[case(75.0, Classification::LikelyFake)]
    #[case(100.0, Classification::LikelyFake)]
    fn test_score_boundaries(#[case] score: f64, #[case] expected: Classification) {
        assert_eq!(Classification::from_score(score), expected);
    }

    #[rstest]
    #[case(Classification::Authentic, "authentic")]
    #[case(Classification::Suspicious, "suspicious")]
    #[case(Classification::LikelyFake, "likely_fake")]
    fn test_trust_levels(#[case] classification: Classification, #[case] expected: &str) {
        assert_eq!(classification.trust_level(), expected);
        assert_eq!(trust_level(Some(classification)), expected);
    }

    #[test]
    fn test_pending_without_classification() {
        assert_eq!(trust_level(None), "pending");
    }

    #[test]
    fn test_score_from_probability() {
        assert!((score_from_fake_probability(0.05) - 5.0).abs() < f64::EPSILON);
        assert!((score_from_fake_probability(0.75) - 75.0).abs() < f64::EPSILON);
        assert!((score_from_fake_probability(1.5) - 100.0).abs() < f64::EPSILON);
        assert!((score_from_fake_probability(-0.5) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_serde_screaming_snake() -> color_eyre::Result<()> {
        let json = serde_json::to_string(&Classification::LikelyFake)?;
        assert_eq!(json, "\"LIKELY_FAKE\"");
        Ok(())
    }
}
