use super::domain::DiagnosticSubmission;
use super::scoring::{AlertLevel, ScoringOutcome, Severity};

const EMPTY_CELL: &str = "-";

/// French display names for the domain keys used by the built-in definitions.
pub const DOMAIN_LABELS: [(&str, &str); 20] = [
    ("algebra", "Algèbre"),
    ("analysis", "Analyse"),
    ("geometry", "Géométrie"),
    ("probabilities", "Probabilités"),
    ("python", "Python / Algorithmique"),
    ("data_representation", "Représentation des données"),
    ("data_processing", "Traitement des données"),
    ("algorithms", "Algorithmique"),
    ("python_programming", "Langage Python"),
    ("systems_architecture", "Architecture & OS"),
    ("data_structures", "Structures de données"),
    ("algorithmic_advanced", "Algorithmique avancée"),
    ("databases", "Bases de données"),
    ("networks", "Réseaux"),
    ("systems_os", "Systèmes d'exploitation"),
    ("python_advanced", "POO & Projets"),
    ("prob_stats", "Probabilités & statistiques"),
    ("algo_prog", "Algorithmique & programmation"),
    ("logic_sets", "Logique & ensembles"),
    ("algorithmic", "Algorithmique & programmation"),
];

/// Domain label, or the raw key when the domain is not a known one.
pub fn domain_label(domain: &str) -> &str {
    DOMAIN_LABELS
        .iter()
        .find(|(key, _)| *key == domain)
        .map(|(_, label)| *label)
        .unwrap_or(domain)
}

/// Word used instead of a raw score for lay readers.
pub fn qualitative_label(score: u8) -> &'static str {
    match score {
        80..=u8::MAX => "très bon",
        65..=79 => "bon",
        50..=64 => "intermédiaire",
        35..=49 => "fragile",
        _ => "insuffisant",
    }
}

/// Student details shown in the staff report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderContext {
    pub first_name: String,
    pub last_name: String,
    pub definition_label: Option<String>,
    pub learning_style: Option<String>,
    pub problem_reflex: Option<String>,
    pub max_concentration: Option<String>,
    pub weekly_work: Option<String>,
    pub mini_test_score: u8,
    pub mini_test_minutes: u16,
    pub mini_test_completed: bool,
}

impl RenderContext {
    pub fn from_submission(submission: &DiagnosticSubmission) -> Self {
        let methodology = &submission.methodology;
        let mini_test = &submission.exam_prep.mini_test;
        Self {
            first_name: submission.identity.first_name.clone(),
            last_name: submission.identity.last_name.clone(),
            definition_label: None,
            learning_style: methodology.learning_style.clone(),
            problem_reflex: methodology.problem_reflex.clone(),
            max_concentration: methodology.max_concentration.clone(),
            weekly_work: methodology.weekly_work.clone(),
            mini_test_score: mini_test.score,
            mini_test_minutes: mini_test.time_used_minutes,
            mini_test_completed: mini_test.finished_in_time(),
        }
    }

    pub fn with_definition_label(mut self, label: impl Into<String>) -> Self {
        self.definition_label = Some(label.into());
        self
    }
}

/// Technical Markdown sheet for the teaching staff.
pub fn render_staff_report(outcome: &ScoringOutcome, context: &RenderContext) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!(
        "# Fiche pédagogique : {} {}",
        context.first_name, context.last_name
    ));
    lines.push(String::new());
    if let Some(label) = &context.definition_label {
        lines.push(format!("*{label}*"));
        lines.push(String::new());
    }

    let quality = &outcome.data_quality;
    lines.push("## Qualité des données".to_string());
    lines.push(String::new());
    lines.push("| Métrique | Valeur |".to_string());
    lines.push("|----------|--------|".to_string());
    lines.push(format!(
        "| TrustScore | **{}/100** ({}) |",
        outcome.trust_score,
        outcome.trust_level.label()
    ));
    lines.push(format!(
        "| Domaines actifs | {}/{} |",
        quality.active_domains,
        outcome.domain_scores.len()
    ));
    lines.push(format!(
        "| Compétences évaluées | {} |",
        quality.evaluated_competencies
    ));
    lines.push(format!("| Non étudiées | {} |", quality.not_studied_competencies));
    lines.push(format!("| Inconnues | {} |", quality.unknown_competencies));
    lines.push(format!("| Qualité | {} |", quality.quality.label()));
    lines.push(format!("| Incohérences | {} |", outcome.inconsistencies.len()));
    lines.push(String::new());

    lines.push("## Scores".to_string());
    lines.push(String::new());
    lines.push("| Indice | Score |".to_string());
    lines.push("|--------|-------|".to_string());
    lines.push(format!("| ReadinessScore | **{}/100** |", outcome.readiness_score));
    lines.push(format!("| MasteryIndex | {}/100 |", outcome.mastery_index));
    lines.push(format!("| CoverageIndex | {}/100 |", outcome.coverage_index));
    lines.push(format!(
        "| ExamReadinessIndex | {}/100 |",
        outcome.exam_readiness_index
    ));
    lines.push(format!("| RiskIndex | {}/100 |", outcome.risk_index));
    if outcome.prerequisite_penalty > 0.0 {
        lines.push(format!(
            "| Pénalité prérequis | -{:.1} |",
            outcome.prerequisite_penalty
        ));
    }
    lines.push(format!(
        "| Recommandation | {} |",
        outcome.recommendation.label()
    ));
    lines.push(String::new());

    if let Some(coverage) = &outcome.coverage_programme {
        lines.push("## Couverture du programme".to_string());
        lines.push(String::new());
        lines.push("| Métrique | Valeur |".to_string());
        lines.push("|----------|--------|".to_string());
        lines.push(format!(
            "| Chapitres vus | {}/{} |",
            coverage.seen_chapters, coverage.total_chapters
        ));
        lines.push(format!(
            "| Chapitres en cours | {} |",
            coverage.in_progress_chapters
        ));
        lines.push(format!(
            "| Ratio couverture | **{}%** |",
            percent(coverage.seen_chapter_ratio)
        ));
        lines.push(format!(
            "| Skills évalués (chapitres vus) | {}% |",
            percent(coverage.evaluated_skill_ratio)
        ));
        lines.push(String::new());
    }

    lines.push("## Cartographie par domaine".to_string());
    lines.push(String::new());
    lines.push("| Domaine | Score | Évalués | Gaps | Erreurs | Priorité |".to_string());
    lines.push("|---------|-------|---------|------|---------|----------|".to_string());
    for ds in &outcome.domain_scores {
        lines.push(format!(
            "| {} | {}% | {}/{} | {} | {} | {} |",
            domain_label(&ds.domain),
            ds.score,
            ds.evaluated_count,
            ds.total_count,
            joined_or_dash(&ds.gaps),
            joined_or_dash(&ds.dominant_errors),
            ds.priority.label()
        ));
    }
    lines.push(String::new());

    if !outcome.high_risk.is_empty() {
        lines.push("## Points bloquants".to_string());
        lines.push(String::new());
        for item in &outcome.high_risk {
            lines.push(format!(
                "- **{}** ({}) : {}",
                item.skill_label, item.domain, item.reason
            ));
        }
        lines.push(String::new());
    }

    if !outcome.top_priorities.is_empty() {
        lines.push("## Priorités pédagogiques".to_string());
        lines.push(String::new());
        for item in &outcome.top_priorities {
            lines.push(format!(
                "- **{}** ({}) : {} → {}",
                item.skill_label,
                item.domain,
                item.reason,
                item.exercise_type.as_deref().unwrap_or("exercices ciblés")
            ));
        }
        lines.push(String::new());
    }

    if !outcome.quick_wins.is_empty() {
        lines.push("## Gains rapides".to_string());
        lines.push(String::new());
        for item in &outcome.quick_wins {
            lines.push(format!(
                "- **{}** ({}) : {}",
                item.skill_label, item.domain, item.reason
            ));
        }
        lines.push(String::new());
    }

    if !outcome.weak_prerequisites.is_empty() {
        lines.push("## Bases à consolider".to_string());
        lines.push(String::new());
        for weak in &outcome.weak_prerequisites {
            lines.push(format!(
                "- **{}** ({}, chapitre {}) : maîtrise actuelle {}%",
                weak.skill_label,
                domain_label(&weak.domain),
                weak.chapter_id,
                super::scoring::round_half_up(weak.score())
            ));
        }
        lines.push(String::new());
    }

    lines.push("## Alertes".to_string());
    lines.push(String::new());
    if outcome.alerts.is_empty() {
        lines.push("Aucune alerte.".to_string());
    } else {
        for alert in &outcome.alerts {
            let level = match alert.level {
                AlertLevel::Danger => "DANGER",
                AlertLevel::Warning => "WARNING",
                AlertLevel::Info => "INFO",
            };
            lines.push(format!("- [{level}] **{}** : {}", alert.code, alert.message));
            if let Some(impact) = &alert.impact {
                lines.push(format!("  → {impact}"));
            }
        }
    }
    lines.push(String::new());

    if !outcome.inconsistencies.is_empty() {
        lines.push("## Incohérences détectées".to_string());
        lines.push(String::new());
        for flag in &outcome.inconsistencies {
            let severity = match flag.severity {
                Severity::Error => "ERROR",
                Severity::Warning => "WARNING",
            };
            lines.push(format!("- [{severity}] **{}** : {}", flag.code, flag.message));
            lines.push(format!("  Champs : {}", flag.fields.join(", ")));
        }
        lines.push(String::new());
    }

    lines.push("## Profil cognitif".to_string());
    lines.push(String::new());
    lines.push(format!("- Style : {}", or_dash(&context.learning_style)));
    lines.push(format!("- Réflexe blocage : {}", or_dash(&context.problem_reflex)));
    lines.push(format!("- Concentration : {}", or_dash(&context.max_concentration)));
    lines.push(format!("- Travail hebdo : {}", or_dash(&context.weekly_work)));
    lines.push(format!(
        "- Mini-test : {}/6 en {}min ({})",
        context.mini_test_score,
        context.mini_test_minutes,
        if context.mini_test_completed {
            "terminé"
        } else {
            "non terminé"
        }
    ));
    lines.push(String::new());

    lines.push("## Justification décision".to_string());
    lines.push(String::new());
    lines.push(outcome.justification.clone());
    if !outcome.upgrade_conditions.is_empty() {
        lines.push(String::new());
        lines.push("**Conditions d'upgrade :**".to_string());
        for condition in &outcome.upgrade_conditions {
            lines.push(format!("- {condition}"));
        }
    }
    lines.push(String::new());

    lines.push("---".to_string());
    lines.push("*Généré automatiquement, données à valider en séance*".to_string());

    lines.join("\n")
}

fn percent(ratio: f64) -> u8 {
    super::scoring::round_half_up(ratio * 100.0)
}

fn joined_or_dash(values: &[String]) -> String {
    if values.is_empty() {
        EMPTY_CELL.to_string()
    } else {
        values.join(", ")
    }
}

fn or_dash(value: &Option<String>) -> &str {
    value
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or(EMPTY_CELL)
}
