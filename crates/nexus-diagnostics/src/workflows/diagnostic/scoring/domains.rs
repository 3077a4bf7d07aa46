use serde::{Deserialize, Serialize};

use super::super::definition::ScoringPolicy;
use super::super::domain::{Competencies, CompetencyItem, SkillStatus};
use super::round_half_up;

/// A domain needs this many evaluated items before it counts toward mastery.
pub const MIN_EVALUATED_PER_DOMAIN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainPriority {
    Critical,
    High,
    Medium,
    Low,
}

impl DomainPriority {
    fn from_score(score: f64) -> Self {
        if score < 35.0 {
            DomainPriority::Critical
        } else if score < 50.0 {
            DomainPriority::High
        } else if score < 70.0 {
            DomainPriority::Medium
        } else {
            DomainPriority::Low
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            DomainPriority::Critical => "critical",
            DomainPriority::High => "high",
            DomainPriority::Medium => "medium",
            DomainPriority::Low => "low",
        }
    }

    pub fn is_urgent(self) -> bool {
        matches!(self, DomainPriority::Critical | DomainPriority::High)
    }
}

/// Per-domain breakdown kept in submission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainScore {
    pub domain: String,
    pub score: u8,
    pub evaluated_count: usize,
    pub total_count: usize,
    pub not_studied_count: usize,
    pub unknown_count: usize,
    pub gaps: Vec<String>,
    pub dominant_errors: Vec<String>,
    pub priority: DomainPriority,
}

impl DomainScore {
    pub fn is_active(&self) -> bool {
        self.evaluated_count >= MIN_EVALUATED_PER_DOMAIN
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQualityLevel {
    Good,
    Partial,
    Insufficient,
}

impl DataQualityLevel {
    pub const fn label(self) -> &'static str {
        match self {
            DataQualityLevel::Good => "good",
            DataQualityLevel::Partial => "partial",
            DataQualityLevel::Insufficient => "insufficient",
        }
    }
}

/// How much of the questionnaire can be trusted for scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuality {
    pub active_domains: usize,
    pub evaluated_competencies: usize,
    pub not_studied_competencies: usize,
    pub unknown_competencies: usize,
    pub low_confidence: bool,
    pub quality: DataQualityLevel,
    pub coherence_issues: usize,
    pub mini_test_filled: bool,
    pub critical_fields_missing: usize,
}

pub(crate) struct DomainBreakdown {
    pub domain_scores: Vec<DomainScore>,
    pub mastery_index: u8,
    pub coverage_index: u8,
    pub data_quality: DataQuality,
}

pub(crate) fn score_domains(competencies: &Competencies, policy: &ScoringPolicy) -> DomainBreakdown {
    let mut domain_scores = Vec::with_capacity(competencies.len());
    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;
    let mut total_items = 0;
    let mut total_evaluated = 0;
    let mut total_not_studied = 0;
    let mut total_unknown = 0;
    let mut active_domains = 0;

    for (domain, items) in competencies.domains() {
        let evaluated: Vec<u8> = items
            .iter()
            .filter(|item| item.is_evaluated())
            .filter_map(|item| item.mastery)
            .collect();
        let not_studied = count_status(items, SkillStatus::NotStudied);
        let unknown = count_status(items, SkillStatus::Unknown);

        total_items += items.len();
        total_evaluated += evaluated.len();
        total_not_studied += not_studied;
        total_unknown += unknown;

        let gaps = items
            .iter()
            .filter(|item| item.mastery.map(|mastery| mastery <= 1).unwrap_or(false))
            .map(|item| item.skill_label.clone())
            .collect();

        let (score, priority) = if evaluated.len() >= MIN_EVALUATED_PER_DOMAIN {
            let mean = evaluated.iter().map(|m| f64::from(*m)).sum::<f64>() / evaluated.len() as f64;
            let score = mean / 4.0 * 100.0;
            let weight = policy.weight_for(domain);
            weighted_sum += weight * score;
            weight_sum += weight;
            active_domains += 1;
            (round_half_up(score), DomainPriority::from_score(score))
        } else {
            (0, DomainPriority::Critical)
        };

        domain_scores.push(DomainScore {
            domain: domain.to_string(),
            score,
            evaluated_count: evaluated.len(),
            total_count: items.len(),
            not_studied_count: not_studied,
            unknown_count: unknown,
            gaps,
            dominant_errors: dominant_errors(items),
            priority,
        });
    }

    let mastery_index = if weight_sum > 0.0 {
        round_half_up(weighted_sum / weight_sum)
    } else {
        0
    };

    let coverage_index = if total_items > 0 {
        round_half_up(total_evaluated as f64 / total_items as f64 * 100.0)
    } else {
        0
    };

    let quality = if active_domains >= 4 && total_unknown <= 2 {
        DataQualityLevel::Good
    } else if active_domains >= 3 {
        DataQualityLevel::Partial
    } else {
        DataQualityLevel::Insufficient
    };

    DomainBreakdown {
        domain_scores,
        mastery_index,
        coverage_index,
        data_quality: DataQuality {
            active_domains,
            evaluated_competencies: total_evaluated,
            not_studied_competencies: total_not_studied,
            unknown_competencies: total_unknown,
            low_confidence: active_domains < 3,
            quality,
            coherence_issues: 0,
            mini_test_filled: false,
            critical_fields_missing: 0,
        },
    }
}

/// Mean mastery over every evaluated item, as a percentage.
pub(crate) fn global_evaluated_mastery(competencies: &Competencies) -> Option<f64> {
    let masteries: Vec<f64> = competencies
        .items()
        .filter(|(_, item)| item.is_evaluated())
        .filter_map(|(_, item)| item.mastery.map(f64::from))
        .collect();
    if masteries.is_empty() {
        return None;
    }
    Some(masteries.iter().sum::<f64>() / masteries.len() as f64 / 4.0 * 100.0)
}

fn count_status(items: &[CompetencyItem], status: SkillStatus) -> usize {
    items.iter().filter(|item| item.status == status).count()
}

/// Two most frequent error types; ties keep first-seen order.
fn dominant_errors(items: &[CompetencyItem]) -> Vec<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for error in items.iter().flat_map(|item| item.error_types.iter()) {
        match counts.iter_mut().find(|(seen, _)| *seen == error.as_str()) {
            Some((_, count)) => *count += 1,
            None => counts.push((error.as_str(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(2)
        .map(|(error, _)| error.to_string())
        .collect()
}
