use serde::{Deserialize, Serialize};

use super::super::domain::ExamPrep;
use super::checks::{Inconsistency, Severity};
use super::domains::DataQuality;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    Green,
    Orange,
    Red,
}

impl TrustLevel {
    fn from_score(score: i32) -> Self {
        if score >= 70 {
            TrustLevel::Green
        } else if score >= 40 {
            TrustLevel::Orange
        } else {
            TrustLevel::Red
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            TrustLevel::Green => "green",
            TrustLevel::Orange => "orange",
            TrustLevel::Red => "red",
        }
    }
}

/// Penalty-based reliability score for the questionnaire answers.
pub(crate) fn trust_score(
    data_quality: &DataQuality,
    inconsistencies: &[Inconsistency],
    exam: &ExamPrep,
) -> (u8, TrustLevel) {
    let mut score: i32 = 100;

    score -= (4 - data_quality.active_domains as i32).max(0) * 15;
    score -= (data_quality.unknown_competencies as i32 * 5).min(20);

    for flag in inconsistencies {
        score -= match flag.severity {
            Severity::Error => 10,
            Severity::Warning => 5,
        };
    }

    if !exam.mini_test.finished_in_time() {
        score -= 10;
    }

    if data_quality.evaluated_competencies < 8 {
        score -= 15;
    }

    score -= data_quality.critical_fields_missing as i32 * 8;

    let score = score.clamp(0, 100);
    (score as u8, TrustLevel::from_score(score))
}
