//! Eight-week SSN projection from a small ridge model over the student's history.

use serde::{Deserialize, Serialize};

use crate::workflows::diagnostic::scoring::round_half_up;

pub const MODEL_VERSION: &str = "ridge_v1";

/// Prediction assumes this many study hours when none are declared.
pub const DEFAULT_WEEKLY_HOURS: f64 = 3.0;

const MAX_TREND: f64 = 20.0;
const FULL_HISTORY: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RidgeCoefficients {
    pub intercept: f64,
    pub ssn: f64,
    pub hours: f64,
    pub methodology: f64,
    pub trend: f64,
}

pub const RIDGE_V1: RidgeCoefficients = RidgeCoefficients {
    intercept: 5.0,
    ssn: 0.6,
    hours: 1.2,
    methodology: 0.3,
    trend: 0.8,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionInput {
    pub ssn: f64,
    pub weekly_hours: f64,
    pub methodology_score: f64,
    pub progression_trend: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceBreakdown {
    pub history_depth: u8,
    pub stability: u8,
    pub dispersion_inverse: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub ssn_projected: f64,
    pub confidence: u8,
    pub model_version: String,
    pub input: PredictionInput,
    pub confidence_breakdown: ConfidenceBreakdown,
}

/// Projected SSN, one decimal, within `0..=100`.
pub fn predict_from_input(input: &PredictionInput, beta: &RidgeCoefficients) -> f64 {
    let prediction = beta.intercept
        + beta.ssn * input.ssn
        + beta.hours * input.weekly_hours
        + beta.methodology * input.methodology_score
        + beta.trend * input.progression_trend;
    ((prediction * 10.0).round() / 10.0).clamp(0.0, 100.0)
}

/// Average change per recorded point between the first and last SSN.
pub fn progression_trend(history: &[f64]) -> f64 {
    match (history.first(), history.last()) {
        (Some(first), Some(last)) if history.len() >= 2 => {
            ((last - first) / history.len() as f64).clamp(-MAX_TREND, MAX_TREND)
        }
        _ => 0.0,
    }
}

/// How regular the history is: 60% direction agreement, 40% amplitude agreement.
///
/// Fewer than three points is treated as neutral (50).
pub fn stability_trend(history: &[f64]) -> u8 {
    if history.len() < 3 {
        return 50;
    }

    let deltas: Vec<f64> = history.windows(2).map(|pair| pair[1] - pair[0]).collect();
    let pairs = (deltas.len() - 1) as f64;

    let same_direction = deltas
        .windows(2)
        .filter(|pair| direction(pair[0]) == direction(pair[1]))
        .count() as f64;
    let direction_score = same_direction / pairs * 100.0;

    let amplitude_sum: f64 = deltas
        .windows(2)
        .map(|pair| {
            let (a, b) = (pair[0].abs(), pair[1].abs());
            let max = a.max(b);
            if max == 0.0 {
                1.0
            } else {
                a.min(b) / max
            }
        })
        .sum();
    let amplitude_score = amplitude_sum / pairs * 100.0;

    round_half_up(0.6 * direction_score + 0.4 * amplitude_score)
}

fn direction(delta: f64) -> i8 {
    if delta > 0.0 {
        1
    } else if delta < 0.0 {
        -1
    } else {
        0
    }
}

/// Confidence from history depth (40%), stability (30%) and low dispersion (30%).
pub fn prediction_confidence(assessment_count: usize, history: &[f64]) -> (u8, ConfidenceBreakdown) {
    let history_depth = (assessment_count as f64 / FULL_HISTORY).min(1.0) * 100.0;
    let stability = f64::from(stability_trend(history));

    let dispersion_inverse = if history.len() >= 2 {
        let n = history.len() as f64;
        let mean = history.iter().sum::<f64>() / n;
        let std = (history.iter().map(|value| (value - mean).powi(2)).sum::<f64>() / n).sqrt();
        (100.0 - std * 4.0).clamp(0.0, 100.0)
    } else {
        50.0
    };

    let confidence = round_half_up(0.4 * history_depth + 0.3 * stability + 0.3 * dispersion_inverse)
        .min(100);

    (
        confidence,
        ConfidenceBreakdown {
            history_depth: round_half_up(history_depth),
            stability: round_half_up(stability),
            dispersion_inverse: round_half_up(dispersion_inverse),
        },
    )
}

/// Project the latest SSN of a chronological history; `None` without history.
pub fn predict(
    history: &[f64],
    weekly_hours: Option<f64>,
    methodology_score: Option<f64>,
) -> Option<PredictionResult> {
    let current = *history.last()?;
    let input = PredictionInput {
        ssn: current,
        weekly_hours: weekly_hours.unwrap_or(DEFAULT_WEEKLY_HOURS),
        methodology_score: methodology_score.unwrap_or(super::NEUTRAL_COMPONENT),
        progression_trend: progression_trend(history),
    };
    let (confidence, confidence_breakdown) = prediction_confidence(history.len(), history);

    Some(PredictionResult {
        ssn_projected: predict_from_input(&input, &RIDGE_V1),
        confidence,
        model_version: MODEL_VERSION.to_string(),
        input,
        confidence_breakdown,
    })
}
