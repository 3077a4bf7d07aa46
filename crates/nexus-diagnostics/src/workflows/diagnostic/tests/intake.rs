use chrono::{TimeZone, Utc};

use super::common::*;
use crate::workflows::diagnostic::domain::{DiagnosticId, DiagnosticSubmission};
use crate::workflows::diagnostic::intake::{IntakeGuard, IntakeViolation};
use crate::workflows::diagnostic::DiagnosticProfile;

fn run(submission: DiagnosticSubmission) -> Result<DiagnosticProfile, IntakeViolation> {
    let registry = registry();
    let definition = registry.get("maths-premiere-p2").expect("definition");
    let received_at = Utc.with_ymd_and_hms(2026, 2, 14, 9, 30, 0).unwrap();
    IntakeGuard.profile_from_submission(
        DiagnosticId("diag-1".to_string()),
        submission,
        definition,
        received_at,
    )
}

#[test]
fn complete_questionnaire_becomes_a_profile() {
    let profile = run(submission()).expect("valid questionnaire");

    assert_eq!(profile.diagnostic_id, DiagnosticId("diag-1".to_string()));
    assert_eq!(profile.definition_key, "maths-premiere-p2");
    let chapters = profile.chapters.as_ref().expect("selection resolved");
    assert_eq!(chapters.selected.len(), 4);
    assert_eq!(chapters.in_progress, vec!["produit_scalaire".to_string()]);
    assert_eq!(chapters.not_yet.len(), 11 - 5);
    assert!(chapters.is_not_yet("exponentielle"));
}

#[test]
fn questionnaire_without_chapters_keeps_no_selection() {
    let mut submission = submission();
    submission.chapters = None;

    let profile = run(submission).expect("valid questionnaire");

    assert!(profile.chapters.is_none());
}

#[test]
fn rejects_short_phone_numbers() {
    let mut submission = submission();
    submission.identity.phone = " 12345 ".to_string();

    match run(submission) {
        Err(IntakeViolation::InvalidIdentity { field }) => assert_eq!(field, "phone"),
        other => panic!("expected phone violation, got {other:?}"),
    }
}

#[test]
fn rejects_emails_without_at_sign() {
    let mut submission = submission();
    submission.identity.email = "ines.example.org".to_string();

    match run(submission) {
        Err(IntakeViolation::InvalidIdentity { field }) => assert_eq!(field, "email"),
        other => panic!("expected email violation, got {other:?}"),
    }
}

#[test]
fn rejects_blank_names() {
    let mut submission = submission();
    submission.identity.last_name = "  ".to_string();

    match run(submission) {
        Err(IntakeViolation::InvalidIdentity { field }) => assert_eq!(field, "lastName"),
        other => panic!("expected name violation, got {other:?}"),
    }
}

#[test]
fn rejects_empty_competencies() {
    let mut submission = submission();
    submission.competencies = competencies(Vec::new());

    match run(submission) {
        Err(IntakeViolation::NoCompetencies) => {}
        other => panic!("expected missing competencies, got {other:?}"),
    }
}

#[test]
fn rejects_out_of_range_mastery() {
    let mut submission = submission();
    submission.competencies = competencies(vec![("algebra", vec![sk("ALG_SUITE_ARITH", 5)])]);

    match run(submission) {
        Err(IntakeViolation::CompetencyOutOfRange {
            skill_id,
            field,
            value,
            max,
        }) => {
            assert_eq!(skill_id, "ALG_SUITE_ARITH");
            assert_eq!(field, "mastery");
            assert_eq!(value, 5);
            assert_eq!(max, 4);
        }
        other => panic!("expected mastery violation, got {other:?}"),
    }
}

#[test]
fn rejects_confidence_above_three() {
    let mut item = sk("ALG_SUITE_ARITH", 2);
    item.confidence = Some(4);
    let mut submission = submission();
    submission.competencies = competencies(vec![("algebra", vec![item])]);

    match run(submission) {
        Err(IntakeViolation::CompetencyOutOfRange { field, max, .. }) => {
            assert_eq!(field, "confidence");
            assert_eq!(max, 3);
        }
        other => panic!("expected confidence violation, got {other:?}"),
    }
}

#[test]
fn rejects_unnamed_skills() {
    let mut item = sk("ALG_SUITE_ARITH", 2);
    item.skill_label = String::new();
    let mut submission = submission();
    submission.competencies = competencies(vec![("algebra", vec![item])]);

    match run(submission) {
        Err(IntakeViolation::UnnamedSkill { domain, skill_id }) => {
            assert_eq!(domain, "algebra");
            assert_eq!(skill_id, "ALG_SUITE_ARITH");
        }
        other => panic!("expected unnamed skill, got {other:?}"),
    }
}

#[test]
fn rejects_mini_test_scores_above_six() {
    let mut submission = submission();
    submission.exam_prep.mini_test.score = 7;

    match run(submission) {
        Err(IntakeViolation::MiniTestOutOfRange(7)) => {}
        other => panic!("expected mini test violation, got {other:?}"),
    }
}

#[test]
fn rejects_self_ratings_above_four() {
    let mut submission = submission();
    submission.exam_prep.self_ratings.stress = 5;

    match run(submission) {
        Err(IntakeViolation::SelfRatingOutOfRange { field, value }) => {
            assert_eq!(field, "stress");
            assert_eq!(value, 5);
        }
        other => panic!("expected self rating violation, got {other:?}"),
    }
}

#[test]
fn rejects_hardest_items_outside_the_test() {
    let mut submission = submission();
    submission.exam_prep.signals.hardest_items = vec![2, 0];

    match run(submission) {
        Err(IntakeViolation::HardestItemOutOfRange(0)) => {}
        other => panic!("expected hardest item violation, got {other:?}"),
    }
}

#[test]
fn violations_render_readable_messages() {
    let violation = IntakeViolation::CompetencyOutOfRange {
        skill_id: "PY_LOOPS".to_string(),
        field: "friction",
        value: 9,
        max: 4,
    };
    assert_eq!(
        violation.to_string(),
        "skill PY_LOOPS: friction 9 exceeds maximum 4"
    );
}
