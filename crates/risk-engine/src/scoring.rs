/// Score aggregation.
///
/// Category scores take the highest severity in each category; the global
/// score takes the highest category. Nothing is summed except the deprecated
/// legacy score, which never feeds back into the authoritative outputs.
use crate::model::{CategoryScores, DetectedRisk, OverallLevel, Severity};

pub const LEGACY_SCORE_MAX: u8 = 10;

pub fn category_scores(risks: &[DetectedRisk]) -> CategoryScores {
    let mut scores = CategoryScores::default();
    for risk in risks {
        scores.raise(risk.category, risk.score());
    }
    scores
}

pub fn risk_score(scores: &CategoryScores) -> u8 {
    scores.max()
}

pub fn overall_level(risk_score: u8) -> OverallLevel {
    OverallLevel::from_score(risk_score)
}

/// Additive 0–10 score: low=3, med=5, high=8 per finding, clamped.
#[deprecated(note = "use `risk_score`; the additive score is kept for older consumers")]
pub fn legacy_score(risks: &[DetectedRisk]) -> u8 {
    let total: u32 = risks
        .iter()
        .map(|risk| match risk.severity {
            Severity::Low => 3,
            Severity::Med => 5,
            Severity::High => 8,
        })
        .sum();
    total.min(u32::from(LEGACY_SCORE_MAX)) as u8
}
