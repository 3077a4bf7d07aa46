use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::workflows::diagnostic::definition::{
    ChapterDefinition, DefinitionRegistry, ScoringPolicy, Threshold, Thresholds,
};
use crate::workflows::diagnostic::domain::{
    Ambition, ChaptersSelection, Competencies, CompetencyItem, DiagnosticId,
    DiagnosticSubmission, ExamPrep, ExamSignals, Identity, Methodology, MiniTest, Performance,
    SchoolContext, SelfRatings, SkillStatus,
};
use crate::workflows::diagnostic::repository::{
    DiagnosticRecord, DiagnosticRepository, NotifyError, RepositoryError, ScoringNotice,
    ScoringNotifier,
};
use crate::workflows::diagnostic::{diagnostic_router, DiagnosticService};

/// Studied skill rated `mastery`, friction 1, confidence 3, label equal to the id.
pub(super) fn sk(id: &str, mastery: u8) -> CompetencyItem {
    sk_with(id, mastery, 1, &[])
}

pub(super) fn sk_with(id: &str, mastery: u8, friction: u8, errors: &[&str]) -> CompetencyItem {
    CompetencyItem {
        skill_id: id.to_string(),
        skill_label: id.to_string(),
        status: SkillStatus::Studied,
        mastery: Some(mastery),
        confidence: Some(3),
        friction: Some(friction),
        error_types: errors.iter().map(|error| error.to_string()).collect(),
        evidence: String::new(),
    }
}

pub(super) fn sk_not_studied(id: &str) -> CompetencyItem {
    CompetencyItem {
        skill_id: id.to_string(),
        skill_label: id.to_string(),
        status: SkillStatus::NotStudied,
        mastery: None,
        confidence: None,
        friction: None,
        error_types: Vec::new(),
        evidence: String::new(),
    }
}

pub(super) fn competencies(domains: Vec<(&str, Vec<CompetencyItem>)>) -> Competencies {
    domains.into_iter().collect()
}

pub(super) fn policy(weights: &[(&str, f64)]) -> ScoringPolicy {
    ScoringPolicy {
        domain_weights: weights
            .iter()
            .map(|(domain, weight)| (domain.to_string(), *weight))
            .collect(),
        thresholds: Thresholds {
            confirmed: Threshold {
                readiness: 60,
                risk: 55,
            },
            conditional: Threshold {
                readiness: 48,
                risk: 70,
            },
        },
    }
}

/// Exam block shared by every frozen regression fixture.
pub(super) fn frozen_exam() -> ExamPrep {
    ExamPrep {
        mini_test: MiniTest {
            score: 4,
            time_used_minutes: 12,
            completed_in_time: Some(true),
        },
        self_ratings: SelfRatings {
            speed_no_calc: 3,
            calc_reliability: 3,
            redaction: 3,
            justifications: 2,
            stress: 2,
        },
        signals: ExamSignals {
            hardest_items: vec![3, 5],
            dominant_error_type: Some("calcul".to_string()),
            verified_answers: Some(true),
            feeling: Some("ok".to_string()),
        },
        main_risk: None,
    }
}

/// Frozen regression submission; scored directly, never sent through intake.
pub(super) fn frozen_submission(competencies: Competencies) -> DiagnosticSubmission {
    DiagnosticSubmission {
        version: None,
        definition_key: None,
        discipline: None,
        level: None,
        identity: Identity {
            first_name: "Regression".to_string(),
            last_name: "Test".to_string(),
            email: "reg@test.com".to_string(),
            phone: "000".to_string(),
            city: None,
        },
        school_context: SchoolContext {
            establishment: Some("Lycée Test".to_string()),
            ..SchoolContext::default()
        },
        performance: Performance {
            math_average: Some("12".to_string()),
            ..Performance::default()
        },
        chapters: None,
        competencies,
        exam_prep: frozen_exam(),
        methodology: Methodology {
            learning_style: Some("visuel".to_string()),
            error_types: vec!["calcul".to_string()],
            ..Methodology::default()
        },
        ambition: Ambition {
            target_mention: Some("Bien".to_string()),
            post_bac: None,
        },
    }
}

/// Complete maths première questionnaire that passes intake.
pub(super) fn submission() -> DiagnosticSubmission {
    let mut submission = frozen_submission(competencies(vec![
        (
            "algebra",
            vec![
                sk("ALG_SUITE_ARITH", 3),
                sk_with("ALG_QUADRATIC_EQ", 2, 2, &["calcul"]),
                sk("ALG_FACTORIZATION", 3),
            ],
        ),
        (
            "analysis",
            vec![
                sk_with("ANA_DERIV_DEF", 4, 0, &[]),
                sk("ANA_DERIV_RULES", 3),
                sk_with("ANA_VARIATIONS", 2, 2, &["signe"]),
            ],
        ),
        (
            "geometry",
            vec![sk("GEO_DOT_PRODUCT", 3), sk_with("GEO_AL_KASHI", 2, 2, &[])],
        ),
        (
            "prob_stats",
            vec![sk("PROB_CONDITIONAL", 3), sk_with("PROB_TREE", 3, 0, &[])],
        ),
        (
            "algo_prog",
            vec![sk_with("PY_FUNC", 4, 0, &[]), sk("PY_LOOPS", 3)],
        ),
        (
            "logic_sets",
            vec![sk("LOG_IMPLICATION", 2), sk("LOG_QUANTIFIERS", 3)],
        ),
    ]));
    submission.version = Some("v1.3".to_string());
    submission.definition_key = Some("maths-premiere-p2".to_string());
    submission.identity = Identity {
        first_name: "Inès".to_string(),
        last_name: "Haddad".to_string(),
        email: "ines.haddad@example.org".to_string(),
        phone: "+216 20 123 456".to_string(),
        city: Some("Tunis".to_string()),
    };
    submission.chapters = Some(ChaptersSelection {
        selected: vec![
            "suites".to_string(),
            "second_degre".to_string(),
            "derivation".to_string(),
            "algorithmique".to_string(),
        ],
        in_progress: vec!["produit_scalaire".to_string()],
        not_yet: Vec::new(),
    });
    submission
}

pub(crate) fn submission_with_chapters(chapters: ChaptersSelection) -> DiagnosticSubmission {
    let mut submission = submission();
    submission.chapters = Some(chapters);
    submission
}

/// Weak automatisms, panic and heavy stress: lands on the foundations stage.
pub(super) fn struggling_submission() -> DiagnosticSubmission {
    let mut submission = submission();
    submission.identity.email = "struggling@example.org".to_string();
    submission.exam_prep.mini_test = MiniTest {
        score: 1,
        time_used_minutes: 20,
        completed_in_time: Some(false),
    };
    submission.exam_prep.self_ratings = SelfRatings {
        speed_no_calc: 1,
        calc_reliability: 1,
        redaction: 1,
        justifications: 1,
        stress: 4,
    };
    submission.exam_prep.signals.feeling = Some("panic".to_string());
    submission.exam_prep.signals.verified_answers = Some(false);
    submission
}

/// Ten-chapter programme over four domains, two skills at most per chapter.
pub(super) fn ten_chapters() -> Vec<ChapterDefinition> {
    [
        ("CH1", "algebra", &["S1", "S2"][..]),
        ("CH2", "analysis", &["S3", "S4"][..]),
        ("CH3", "prob", &["S5"][..]),
        ("CH4", "python", &["S6"][..]),
        ("CH5", "analysis", &["S7"][..]),
        ("CH6", "algebra", &["S8"][..]),
        ("CH7", "analysis", &["S9"][..]),
        ("CH8", "algebra", &["S10"][..]),
        ("CH9", "prob", &["S11"][..]),
        ("CH10", "python", &["S12"][..]),
    ]
    .into_iter()
    .map(|(chapter_id, domain_id, skills)| ChapterDefinition {
        chapter_id: chapter_id.to_string(),
        chapter_label: chapter_id.to_string(),
        description: String::new(),
        domain_id: domain_id.to_string(),
        skills: skills.iter().map(|skill| skill.to_string()).collect(),
        rag_topics: Vec::new(),
    })
    .collect()
}

pub(super) fn selection(selected: &[&str], in_progress: &[&str], not_yet: &[&str]) -> ChaptersSelection {
    let owned = |ids: &[&str]| -> Vec<String> { ids.iter().map(|id| id.to_string()).collect() };
    ChaptersSelection {
        selected: owned(selected),
        in_progress: owned(in_progress),
        not_yet: owned(not_yet),
    }
}

pub(super) fn registry() -> Arc<DefinitionRegistry> {
    Arc::new(DefinitionRegistry::builtin().expect("builtin definitions parse"))
}

pub(super) fn build_service() -> (
    DiagnosticService<MemoryRepository, MemoryNotifier>,
    Arc<MemoryRepository>,
    Arc<MemoryNotifier>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = DiagnosticService::new(registry(), repository.clone(), notifier.clone());
    (service, repository, notifier)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<BTreeMap<DiagnosticId, DiagnosticRecord>>>,
}

impl DiagnosticRepository for MemoryRepository {
    fn insert(&self, record: DiagnosticRecord) -> Result<DiagnosticRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(record.id()) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id().clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: DiagnosticRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(record.id().clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &DiagnosticId) -> Result<Option<DiagnosticRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<DiagnosticRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut records: Vec<DiagnosticRecord> = guard.values().cloned().collect();
        records.sort_by(|a, b| b.profile.received_at.cmp(&a.profile.received_at));
        records.truncate(limit);
        Ok(records)
    }

    fn find_recent_by_email(
        &self,
        email: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<DiagnosticRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.student_email().eq_ignore_ascii_case(email))
            .filter(|record| record.profile.received_at >= since)
            .max_by_key(|record| record.profile.received_at)
            .cloned())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifier {
    notices: Arc<Mutex<Vec<ScoringNotice>>>,
}

impl MemoryNotifier {
    pub(super) fn notices(&self) -> Vec<ScoringNotice> {
        self.notices.lock().expect("notifier mutex poisoned").clone()
    }
}

impl ScoringNotifier for MemoryNotifier {
    fn notify(&self, notice: ScoringNotice) -> Result<(), NotifyError> {
        self.notices
            .lock()
            .expect("notifier mutex poisoned")
            .push(notice);
        Ok(())
    }
}

pub(super) struct FailingNotifier;

impl ScoringNotifier for FailingNotifier {
    fn notify(&self, _notice: ScoringNotice) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp relay down".to_string()))
    }
}

pub(super) struct ConflictRepository;

impl DiagnosticRepository for ConflictRepository {
    fn insert(&self, _record: DiagnosticRecord) -> Result<DiagnosticRecord, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn update(&self, _record: DiagnosticRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }

    fn fetch(&self, _id: &DiagnosticId) -> Result<Option<DiagnosticRecord>, RepositoryError> {
        Ok(None)
    }

    fn recent(&self, _limit: usize) -> Result<Vec<DiagnosticRecord>, RepositoryError> {
        Ok(Vec::new())
    }

    fn find_recent_by_email(
        &self,
        _email: &str,
        _since: DateTime<Utc>,
    ) -> Result<Option<DiagnosticRecord>, RepositoryError> {
        Ok(None)
    }
}

pub(super) struct UnavailableRepository;

impl DiagnosticRepository for UnavailableRepository {
    fn insert(&self, _record: DiagnosticRecord) -> Result<DiagnosticRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _record: DiagnosticRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &DiagnosticId) -> Result<Option<DiagnosticRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn recent(&self, _limit: usize) -> Result<Vec<DiagnosticRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_recent_by_email(
        &self,
        _email: &str,
        _since: DateTime<Utc>,
    ) -> Result<Option<DiagnosticRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_text_body(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    String::from_utf8(body.to_vec()).expect("utf-8 body")
}

pub(super) fn router_with_service(
    service: DiagnosticService<MemoryRepository, MemoryNotifier>,
) -> axum::Router {
    diagnostic_router(Arc::new(service))
}
