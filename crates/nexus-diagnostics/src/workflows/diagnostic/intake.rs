use chrono::{DateTime, Utc};

use super::definition::{resolve_chapters_selection, DiagnosticDefinition};
use super::domain::{DiagnosticId, DiagnosticProfile, DiagnosticSubmission, MiniTest};

/// Validation errors raised before a submission is stored.
#[derive(Debug, thiserror::Error)]
pub enum IntakeViolation {
    #[error("identity field {field} is missing or malformed")]
    InvalidIdentity { field: &'static str },
    #[error("competency map is empty")]
    NoCompetencies,
    #[error("skill {skill_id}: {field} {value} exceeds maximum {max}")]
    CompetencyOutOfRange {
        skill_id: String,
        field: &'static str,
        value: u8,
        max: u8,
    },
    #[error("skill {skill_id} in domain {domain} has an empty identifier or label")]
    UnnamedSkill { domain: String, skill_id: String },
    #[error("mini test score {0} exceeds 6")]
    MiniTestOutOfRange(u8),
    #[error("self rating {field} {value} exceeds 4")]
    SelfRatingOutOfRange { field: &'static str, value: u8 },
    #[error("hardest mini test item {0} is outside 1..=6")]
    HardestItemOutOfRange(u8),
}

const MIN_PHONE_LENGTH: usize = 6;
const MAX_MASTERY: u8 = 4;
const MAX_CONFIDENCE: u8 = 3;
const MAX_FRICTION: u8 = 4;
const MAX_SELF_RATING: u8 = 4;

const SELF_RATING_FIELDS: [&str; 5] = [
    "speedNoCalc",
    "calcReliability",
    "redaction",
    "justifications",
    "stress",
];

/// Guard responsible for producing `DiagnosticProfile` instances.
#[derive(Debug, Clone, Default)]
pub struct IntakeGuard;

impl IntakeGuard {
    /// Check the raw questionnaire and bind it to its definition.
    pub fn profile_from_submission(
        &self,
        diagnostic_id: DiagnosticId,
        submission: DiagnosticSubmission,
        definition: &DiagnosticDefinition,
        received_at: DateTime<Utc>,
    ) -> Result<DiagnosticProfile, IntakeViolation> {
        check_identity(&submission)?;
        check_competencies(&submission)?;
        check_exam_prep(&submission)?;

        let chapters = submission
            .chapters
            .is_some()
            .then(|| resolve_chapters_selection(&submission, definition));

        Ok(DiagnosticProfile {
            diagnostic_id,
            definition_key: definition.key.clone(),
            definition_version: definition.version.clone(),
            submission,
            chapters,
            received_at,
        })
    }
}

fn check_identity(submission: &DiagnosticSubmission) -> Result<(), IntakeViolation> {
    let identity = &submission.identity;
    if identity.first_name.trim().is_empty() {
        return Err(IntakeViolation::InvalidIdentity { field: "firstName" });
    }
    if identity.last_name.trim().is_empty() {
        return Err(IntakeViolation::InvalidIdentity { field: "lastName" });
    }
    let email = identity.email.trim();
    if email.len() < 3 || !email.contains('@') {
        return Err(IntakeViolation::InvalidIdentity { field: "email" });
    }
    if identity.phone.trim().len() < MIN_PHONE_LENGTH {
        return Err(IntakeViolation::InvalidIdentity { field: "phone" });
    }
    Ok(())
}

fn check_competencies(submission: &DiagnosticSubmission) -> Result<(), IntakeViolation> {
    if submission.competencies.is_empty() {
        return Err(IntakeViolation::NoCompetencies);
    }

    for (domain, item) in submission.competencies.items() {
        if item.skill_id.trim().is_empty() || item.skill_label.trim().is_empty() {
            return Err(IntakeViolation::UnnamedSkill {
                domain: domain.to_string(),
                skill_id: item.skill_id.clone(),
            });
        }

        let bounded = [
            ("mastery", item.mastery, MAX_MASTERY),
            ("confidence", item.confidence, MAX_CONFIDENCE),
            ("friction", item.friction, MAX_FRICTION),
        ];
        for (field, value, max) in bounded {
            if let Some(value) = value.filter(|value| *value > max) {
                return Err(IntakeViolation::CompetencyOutOfRange {
                    skill_id: item.skill_id.clone(),
                    field,
                    value,
                    max,
                });
            }
        }
    }

    Ok(())
}

fn check_exam_prep(submission: &DiagnosticSubmission) -> Result<(), IntakeViolation> {
    let exam = &submission.exam_prep;
    if exam.mini_test.score > MiniTest::MAX_SCORE {
        return Err(IntakeViolation::MiniTestOutOfRange(exam.mini_test.score));
    }

    for (field, value) in SELF_RATING_FIELDS
        .into_iter()
        .zip(exam.self_ratings.values())
    {
        if value > MAX_SELF_RATING {
            return Err(IntakeViolation::SelfRatingOutOfRange { field, value });
        }
    }

    if let Some(item) = exam
        .signals
        .hardest_items
        .iter()
        .copied()
        .find(|item| !(1..=MiniTest::MAX_SCORE).contains(item))
    {
        return Err(IntakeViolation::HardestItemOutOfRange(item));
    }

    Ok(())
}
