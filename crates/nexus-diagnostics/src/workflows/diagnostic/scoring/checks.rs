use serde::{Deserialize, Serialize};

use super::super::domain::{DiagnosticSubmission, Feeling, SkillStatus};
use super::domains::{global_evaluated_mastery, DataQuality};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Danger,
    Warning,
    Info,
}

/// Flag surfaced to staff alongside the scores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringAlert {
    #[serde(rename = "type")]
    pub level: AlertLevel,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
}

impl ScoringAlert {
    pub(crate) fn new(level: AlertLevel, code: &str, message: impl Into<String>) -> Self {
        Self {
            level,
            code: code.to_string(),
            message: message.into(),
            impact: None,
        }
    }

    pub(crate) fn with_impact(mut self, impact: impl Into<String>) -> Self {
        self.impact = Some(impact.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// Contradiction between answers, kept for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inconsistency {
    pub code: String,
    pub message: String,
    pub fields: Vec<String>,
    pub severity: Severity,
}

impl Inconsistency {
    fn new(code: &str, message: String, fields: Vec<String>, severity: Severity) -> Self {
        Self {
            code: code.to_string(),
            message,
            fields,
            severity,
        }
    }

    pub(crate) fn as_alert(&self) -> ScoringAlert {
        let level = match self.severity {
            Severity::Error => AlertLevel::Danger,
            Severity::Warning => AlertLevel::Warning,
        };
        ScoringAlert::new(level, &self.code, self.message.clone())
            .with_impact(format!("Champs concernés : {}", self.fields.join(", ")))
    }
}

const HIGH_DECLARED_AVERAGE: f64 = 14.0;

pub(crate) fn detect_inconsistencies(submission: &DiagnosticSubmission) -> Vec<Inconsistency> {
    let mut flags = Vec::new();
    let exam = &submission.exam_prep;
    let mini_test = &exam.mini_test;

    if mini_test.score >= 5 && exam.signals.feeling() == Feeling::Panic {
        flags.push(Inconsistency::new(
            "INCONSISTENT_SIGNAL",
            "Mini-test excellent (≥5/6) mais ressenti \"panic\" : incohérence à vérifier en séance"
                .to_string(),
            fields(&["examPrep.miniTest.score", "examPrep.signals.feeling"]),
            Severity::Warning,
        ));
    }

    if mini_test.finished_in_time() && mini_test.score <= 2 && mini_test.time_used_minutes <= 8 {
        flags.push(Inconsistency::new(
            "RUSHED_TEST",
            "Mini-test terminé très vite (≤8min) avec score faible (≤2/6) : possibles réponses aléatoires"
                .to_string(),
            fields(&["examPrep.miniTest.timeUsedMinutes", "examPrep.miniTest.score"]),
            Severity::Warning,
        ));
    }

    let studied_without_mastery: Vec<String> = submission
        .competencies
        .items()
        .filter(|(_, item)| item.status == SkillStatus::Studied && item.mastery.is_none())
        .map(|(_, item)| item.skill_label.clone())
        .collect();
    if studied_without_mastery.len() >= 2 {
        flags.push(Inconsistency::new(
            "STUDIED_NO_MASTERY",
            format!(
                "{} compétences marquées \"studied\" sans mastery : données incomplètes",
                studied_without_mastery.len()
            ),
            studied_without_mastery,
            Severity::Error,
        ));
    }

    if let Some(average) = submission
        .performance
        .parsed_math_average()
        .filter(|average| *average >= HIGH_DECLARED_AVERAGE)
    {
        if global_evaluated_mastery(&submission.competencies)
            .map(|mastery| mastery < 40.0)
            .unwrap_or(false)
        {
            flags.push(Inconsistency::new(
                "HIGH_AVERAGE_LOW_MASTERY",
                format!(
                    "Moyenne déclarée élevée ({average}) mais mastery globale faible (<40%) : possible surévaluation ou programme non couvert"
                ),
                fields(&["performance.mathAverage", "competencies"]),
                Severity::Warning,
            ));
        }
    }

    flags
}

/// Missing average, missing establishment, fewer than five evaluated items.
pub(crate) fn critical_fields_missing(
    submission: &DiagnosticSubmission,
    data_quality: &DataQuality,
) -> usize {
    [
        is_blank(&submission.performance.math_average),
        is_blank(&submission.school_context.establishment),
        data_quality.evaluated_competencies < 5,
    ]
    .into_iter()
    .filter(|missing| *missing)
    .count()
}

pub(crate) fn detect_alerts(
    submission: &DiagnosticSubmission,
    data_quality: &DataQuality,
) -> Vec<ScoringAlert> {
    let mut alerts = Vec::new();
    let exam = &submission.exam_prep;

    if exam.self_ratings.stress >= 3 {
        alerts.push(
            ScoringAlert::new(
                AlertLevel::Warning,
                "HIGH_STRESS",
                "Gestion du stress à travailler (auto-évaluation ≥ 3/4)",
            )
            .with_impact(
                "Risque de sous-performance à l'épreuve anticipée malgré un bon niveau technique",
            ),
        );
    }

    if exam.mini_test.score <= 2 {
        alerts.push(
            ScoringAlert::new(
                AlertLevel::Danger,
                "WEAK_AUTOMATISMS",
                "Automatismes très fragiles (mini-test ≤ 2/6)",
            )
            .with_impact(
                "Partie automatismes de l'épreuve anticipée (sans calculatrice) fortement compromise",
            ),
        );
    }

    if exam.signals.feeling() == Feeling::Panic {
        alerts.push(
            ScoringAlert::new(
                AlertLevel::Danger,
                "PANIC_SIGNAL",
                "Signal de détresse : suivi prioritaire recommandé",
            )
            .with_impact("Nécessite un accompagnement psycho-pédagogique avant le travail technique"),
        );
    }

    let blocked = submission
        .competencies
        .items()
        .filter(|(_, item)| item.high_friction())
        .count();
    if blocked >= 2 {
        alerts.push(
            ScoringAlert::new(
                AlertLevel::Warning,
                "MULTIPLE_BLOCKAGES",
                format!("Blocages identifiés sur {blocked} compétences (friction ≥ 3)"),
            )
            .with_impact("Risque de décrochage si les blocages ne sont pas traités en priorité"),
        );
    }

    if submission
        .methodology
        .weekly_hours()
        .map(|hours| hours < 2.0)
        .unwrap_or(false)
    {
        alerts.push(
            ScoringAlert::new(
                AlertLevel::Info,
                "LOW_WORK_VOLUME",
                "Volume de travail hebdomadaire à augmenter (< 2h)",
            )
            .with_impact("Progression limitée sans augmentation du temps de travail personnel"),
        );
    }

    if submission.methodology.max_concentration.as_deref() == Some("30min") {
        alerts.push(
            ScoringAlert::new(
                AlertLevel::Info,
                "LOW_ENDURANCE",
                "Endurance de concentration à développer (≤ 30min)",
            )
            .with_impact(
                "L'épreuve anticipée dure 2h : endurance insuffisante pour maintenir la qualité",
            ),
        );
    }

    if data_quality.low_confidence {
        alerts.push(
            ScoringAlert::new(
                AlertLevel::Warning,
                "LOW_DATA_QUALITY",
                format!(
                    "Données insuffisantes : seulement {} domaine(s) actif(s) sur {}",
                    data_quality.active_domains,
                    submission.competencies.len()
                ),
            )
            .with_impact("Le scoring et les recommandations sont moins fiables, à confirmer en séance"),
        );
    }

    if data_quality.unknown_competencies >= 3 {
        alerts.push(
            ScoringAlert::new(
                AlertLevel::Info,
                "HIGH_UNKNOWN",
                format!(
                    "{} compétences en statut \"unknown\" : l'élève ne sait pas situer sa progression",
                    data_quality.unknown_competencies
                ),
            )
            .with_impact(
                "Pénalise la qualité des données, évaluation diagnostique en séance recommandée",
            ),
        );
    }

    alerts
}

fn fields(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn is_blank(value: &Option<String>) -> bool {
    value
        .as_deref()
        .map(|value| value.trim().is_empty())
        .unwrap_or(true)
}
