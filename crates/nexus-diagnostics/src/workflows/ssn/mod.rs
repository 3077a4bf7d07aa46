//! Standardised headline score (SSN) and its short-term projection.
//!
//! The raw composite blends the disciplinary score with methodology and rigor, then is
//! projected onto a 0-100 scale against the cohort distribution (mean 50, 15 points per
//! standard deviation).

pub mod projection;

use serde::{Deserialize, Serialize};

use crate::workflows::diagnostic::scoring::round_half_up;

/// Value used for a component the assessment did not measure.
pub const NEUTRAL_COMPONENT: f64 = 50.0;

const SSN_CENTER: f64 = 50.0;
const SSN_SPREAD: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SsnWeights {
    pub disciplinary: f64,
    pub methodology: f64,
    pub rigor: f64,
}

impl Default for SsnWeights {
    fn default() -> Self {
        Self {
            disciplinary: 0.6,
            methodology: 0.2,
            rigor: 0.2,
        }
    }
}

/// Inputs of the composite, each on a 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SsnComponents {
    pub disciplinary: f64,
    pub methodology: f64,
    pub rigor: f64,
}

impl SsnComponents {
    /// Missing methodology or rigor measurements count as neutral.
    pub fn new(disciplinary: f64, methodology: Option<f64>, rigor: Option<f64>) -> Self {
        Self {
            disciplinary,
            methodology: methodology.unwrap_or(NEUTRAL_COMPONENT),
            rigor: rigor.unwrap_or(NEUTRAL_COMPONENT),
        }
    }
}

pub fn raw_composite(components: &SsnComponents, weights: &SsnWeights) -> f64 {
    weights.disciplinary * components.disciplinary
        + weights.methodology * components.methodology
        + weights.rigor * components.rigor
}

/// Z-score projection; a flat cohort maps everyone to the centre.
pub fn normalize_score(raw: f64, mean: f64, std: f64) -> u8 {
    if std == 0.0 || !std.is_finite() {
        return SSN_CENTER as u8;
    }
    let z = (raw - mean) / std;
    round_half_up((SSN_CENTER + SSN_SPREAD * z).clamp(0.0, 100.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SsnLevel {
    Excellence,
    TresSolide,
    Stable,
    Fragile,
    Prioritaire,
}

impl SsnLevel {
    pub fn classify(ssn: f64) -> Self {
        if ssn >= 85.0 {
            SsnLevel::Excellence
        } else if ssn >= 70.0 {
            SsnLevel::TresSolide
        } else if ssn >= 55.0 {
            SsnLevel::Stable
        } else if ssn >= 40.0 {
            SsnLevel::Fragile
        } else {
            SsnLevel::Prioritaire
        }
    }

    pub const fn key(self) -> &'static str {
        match self {
            SsnLevel::Excellence => "excellence",
            SsnLevel::TresSolide => "tres_solide",
            SsnLevel::Stable => "stable",
            SsnLevel::Fragile => "fragile",
            SsnLevel::Prioritaire => "prioritaire",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            SsnLevel::Excellence => "Excellence",
            SsnLevel::TresSolide => "Très solide",
            SsnLevel::Stable => "Stable",
            SsnLevel::Fragile => "Fragile",
            SsnLevel::Prioritaire => "Prioritaire",
        }
    }
}

/// Share of the distribution strictly below `value`, as a rounded percentage.
pub fn compute_percentile(value: f64, distribution: &[f64]) -> u8 {
    if distribution.is_empty() {
        return 50;
    }
    let below = distribution.iter().filter(|score| **score < value).count();
    round_half_up(below as f64 / distribution.len() as f64 * 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortStats {
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    pub sample_size: usize,
}

impl CohortStats {
    /// An empty cohort has zero spread, so every score normalises to 50.
    pub fn from_scores(scores: &[f64]) -> Self {
        if scores.is_empty() {
            return Self {
                mean: 0.0,
                std: 0.0,
                sample_size: 0,
            };
        }
        let n = scores.len() as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let variance = scores.iter().map(|score| (score - mean).powi(2)).sum::<f64>() / n;
        Self {
            mean,
            std: variance.sqrt(),
            sample_size: scores.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsnResult {
    /// Rounded to one decimal.
    pub raw_composite: f64,
    pub ssn: u8,
    pub level: SsnLevel,
    pub components: SsnComponents,
    pub cohort: CohortStats,
}

pub fn compute_ssn(components: SsnComponents, cohort: CohortStats) -> SsnResult {
    let raw = raw_composite(&components, &SsnWeights::default());
    let ssn = normalize_score(raw, cohort.mean, cohort.std);
    SsnResult {
        raw_composite: (raw * 10.0).round() / 10.0,
        ssn,
        level: SsnLevel::classify(f64::from(ssn)),
        components,
        cohort,
    }
}
