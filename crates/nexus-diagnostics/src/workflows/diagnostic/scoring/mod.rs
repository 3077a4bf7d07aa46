mod checks;
mod decision;
mod domains;
mod exam;
mod priorities;
mod programme;
mod trust;

pub use checks::{AlertLevel, Inconsistency, ScoringAlert, Severity};
pub use decision::Recommendation;
pub use domains::{DataQuality, DataQualityLevel, DomainPriority, DomainScore};
pub use priorities::{PriorityItem, EXAM_PREP_DOMAIN};
pub use programme::{ProgrammeCoverage, WeakPrerequisite, PREREQUISITE_WEIGHT};
pub use trust::TrustLevel;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::definition::{ChapterDefinition, DiagnosticDefinition, ScoringPolicy, SkillMeta};
use super::domain::{ChaptersSelection, DiagnosticProfile, DiagnosticSubmission};
use decision::DecisionInputs;

/// Round to the nearest integer with halves going up, clamped into `0..=255`.
pub(crate) fn round_half_up(value: f64) -> u8 {
    (value + 0.5).floor().clamp(0.0, f64::from(u8::MAX)) as u8
}

/// Stateless scorer that applies a scoring policy to a submission.
///
/// Pure and deterministic: identical inputs always give identical outcomes.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    policy: ScoringPolicy,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(ScoringPolicy::default())
    }
}

impl ScoringEngine {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    pub fn for_definition(definition: &DiagnosticDefinition) -> Self {
        Self::new(definition.scoring_policy.clone())
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Score a validated profile with its definition's chapters and skill metadata.
    pub fn score_profile(
        &self,
        profile: &DiagnosticProfile,
        definition: &DiagnosticDefinition,
    ) -> ScoringOutcome {
        self.score(
            &profile.submission,
            profile.chapters.as_ref(),
            &definition.chapters,
            &definition.skill_meta,
        )
    }

    pub fn score(
        &self,
        submission: &DiagnosticSubmission,
        selection: Option<&ChaptersSelection>,
        chapters: &[ChapterDefinition],
        skill_meta: &[SkillMeta],
    ) -> ScoringOutcome {
        let domains::DomainBreakdown {
            domain_scores,
            mastery_index,
            coverage_index,
            mut data_quality,
        } = domains::score_domains(&submission.competencies, &self.policy);

        let exam_readiness_index = exam::exam_readiness_index(&submission.exam_prep);
        let risk_index = exam::risk_index(&submission.exam_prep);

        let weak_prerequisites = selection
            .map(|selection| {
                programme::weak_prerequisites(&submission.competencies, selection, skill_meta)
            })
            .unwrap_or_default();
        let adjusted_mastery =
            programme::prerequisite_adjusted_mastery(mastery_index, &weak_prerequisites);
        let prerequisite_penalty = f64::from(mastery_index) - adjusted_mastery;

        let readiness_score = round_half_up(
            0.50 * adjusted_mastery + 0.15 * f64::from(coverage_index)
                + 0.35 * f64::from(exam_readiness_index),
        );

        debug!(
            mastery_index,
            coverage_index,
            exam_readiness_index,
            risk_index,
            readiness_score,
            prerequisite_penalty,
            "computed diagnostic indices"
        );

        let thresholds = self.policy.thresholds;
        let recommendation = decision::decide(readiness_score, risk_index, &thresholds);

        let inconsistencies = checks::detect_inconsistencies(submission);
        data_quality.coherence_issues = inconsistencies.len();
        data_quality.mini_test_filled = submission.exam_prep.mini_test.score > 0;
        data_quality.critical_fields_missing =
            checks::critical_fields_missing(submission, &data_quality);

        let mut alerts = checks::detect_alerts(submission, &data_quality);
        alerts.extend(inconsistencies.iter().map(Inconsistency::as_alert));

        let coverage_programme = selection.and_then(|selection| {
            programme::programme_coverage(&submission.competencies, selection, chapters)
                .map(|coverage| (coverage, selection))
        });
        if let Some((coverage, selection)) = &coverage_programme {
            alerts.extend(programme::chapter_alerts(
                coverage,
                selection,
                chapters,
                &domain_scores,
            ));
        }

        let (trust_score, trust_level) =
            trust::trust_score(&data_quality, &inconsistencies, &submission.exam_prep);

        let priorities = priorities::compute_priorities(submission, &domain_scores);

        let (justification, upgrade_conditions) = decision::justify(
            recommendation,
            &DecisionInputs {
                mastery_index,
                coverage_index,
                exam_readiness_index,
                readiness_score,
                risk_index,
            },
            &thresholds,
        );

        ScoringOutcome {
            mastery_index,
            coverage_index,
            exam_readiness_index,
            readiness_score,
            risk_index,
            recommendation,
            recommendation_message: recommendation.message().to_string(),
            justification,
            upgrade_conditions,
            domain_scores,
            alerts,
            data_quality,
            trust_score,
            trust_level,
            top_priorities: priorities.top_priorities,
            quick_wins: priorities.quick_wins,
            high_risk: priorities.high_risk,
            inconsistencies,
            coverage_programme: coverage_programme.map(|(coverage, _)| coverage),
            weak_prerequisites,
            prerequisite_penalty: (prerequisite_penalty * 10.0).round() / 10.0,
        }
    }
}

/// Everything the engine derives from one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringOutcome {
    pub mastery_index: u8,
    pub coverage_index: u8,
    pub exam_readiness_index: u8,
    pub readiness_score: u8,
    pub risk_index: u8,
    pub recommendation: Recommendation,
    pub recommendation_message: String,
    pub justification: String,
    pub upgrade_conditions: Vec<String>,
    pub domain_scores: Vec<DomainScore>,
    pub alerts: Vec<ScoringAlert>,
    pub data_quality: DataQuality,
    pub trust_score: u8,
    pub trust_level: TrustLevel,
    pub top_priorities: Vec<PriorityItem>,
    pub quick_wins: Vec<PriorityItem>,
    pub high_risk: Vec<PriorityItem>,
    pub inconsistencies: Vec<Inconsistency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_programme: Option<ProgrammeCoverage>,
    #[serde(default)]
    pub weak_prerequisites: Vec<WeakPrerequisite>,
    /// Points removed from the mastery term of the readiness formula.
    #[serde(default)]
    pub prerequisite_penalty: f64,
}

impl ScoringOutcome {
    pub fn domain(&self, key: &str) -> Option<&DomainScore> {
        self.domain_scores.iter().find(|ds| ds.domain == key)
    }

    pub fn has_alert(&self, code: &str) -> bool {
        self.alerts.iter().any(|alert| alert.code == code)
    }

    /// Outcomes staff should review before the stage starts.
    pub fn needs_follow_up(&self) -> bool {
        self.trust_level == TrustLevel::Red
            || self.recommendation == Recommendation::Pallier1Recommended
    }
}

#[cfg(test)]
mod tests {
    use super::round_half_up;

    #[test]
    fn rounds_halves_up() {
        assert_eq!(round_half_up(37.5), 38);
        assert_eq!(round_half_up(69.79), 70);
        assert_eq!(round_half_up(0.49), 0);
        assert_eq!(round_half_up(-3.0), 0);
        assert_eq!(round_half_up(100.0), 100);
    }
}
