use serde::{Deserialize, Serialize};

use super::super::domain::{DiagnosticSubmission, SkillStatus};
use super::domains::DomainScore;

const MAX_TOP_PRIORITIES: usize = 5;
const MAX_QUICK_WINS: usize = 4;
const MAX_HIGH_RISK: usize = 3;

/// Pseudo-domain used for the mini test quick win.
pub const EXAM_PREP_DOMAIN: &str = "examPrep";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_id: Option<String>,
    pub skill_label: String,
    pub domain: String,
    pub reason: String,
    pub impact: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Priorities {
    pub top_priorities: Vec<PriorityItem>,
    pub quick_wins: Vec<PriorityItem>,
    pub high_risk: Vec<PriorityItem>,
}

pub(crate) fn compute_priorities(
    submission: &DiagnosticSubmission,
    domain_scores: &[DomainScore],
) -> Priorities {
    let competencies = &submission.competencies;

    let mut top_priorities = Vec::new();
    for domain_score in domain_scores.iter().filter(|ds| ds.priority.is_urgent()) {
        let items = competencies.get(&domain_score.domain).unwrap_or_default();
        let weak = items
            .iter()
            .filter(|item| item.status == SkillStatus::Studied)
            .filter_map(|item| item.mastery.filter(|m| *m <= 1).map(|m| (item, m)))
            .take(2);
        for (item, mastery) in weak {
            top_priorities.push(PriorityItem {
                skill_id: Some(item.skill_id.clone()),
                skill_label: item.skill_label.clone(),
                domain: domain_score.domain.clone(),
                reason: format!(
                    "Mastery {mastery}/4 dans un domaine prioritaire ({}: {}%)",
                    domain_score.domain, domain_score.score
                ),
                impact: format!(
                    "Impact direct sur le score global, domaine {}",
                    domain_score.domain
                ),
                exercise_type: Some(match item.error_types.first() {
                    Some(error) => format!("Exercices ciblés erreur \"{error}\""),
                    None => "Exercices de base".to_string(),
                }),
            });
        }
    }
    top_priorities.truncate(MAX_TOP_PRIORITIES);

    let mut quick_wins: Vec<PriorityItem> = competencies
        .items()
        .filter_map(|(domain, item)| {
            let mastery = item.mastery.filter(|m| (2..=3).contains(m))?;
            if item.friction.map(|friction| friction > 1).unwrap_or(false) {
                return None;
            }
            Some(PriorityItem {
                skill_id: Some(item.skill_id.clone()),
                skill_label: item.skill_label.clone(),
                domain: domain.to_string(),
                reason: format!("Mastery {mastery}/4 avec friction faible : gain rapide possible"),
                impact: "Consolidation rapide avec 2-3 exercices ciblés".to_string(),
                exercise_type: Some("Exercices de consolidation".to_string()),
            })
        })
        .take(3)
        .collect();

    let mini_score = submission.exam_prep.mini_test.score;
    if (3..=4).contains(&mini_score) {
        quick_wins.push(PriorityItem {
            skill_id: None,
            skill_label: "Automatismes (sans calculatrice)".to_string(),
            domain: EXAM_PREP_DOMAIN.to_string(),
            reason: format!("Mini-test {mini_score}/6 : marge de progression rapide"),
            impact: "Gain direct sur la partie automatismes de l'épreuve anticipée".to_string(),
            exercise_type: Some("Entraînement quotidien 10min sans calculatrice".to_string()),
        });
    }
    quick_wins.truncate(MAX_QUICK_WINS);

    let high_risk = competencies
        .items()
        .filter(|(_, item)| item.mastery == Some(0) || item.friction.map(|f| f >= 4).unwrap_or(false))
        .take(MAX_HIGH_RISK)
        .map(|(domain, item)| PriorityItem {
            skill_id: Some(item.skill_id.clone()),
            skill_label: item.skill_label.clone(),
            domain: domain.to_string(),
            reason: match (item.mastery, item.friction) {
                (Some(0), _) => "Mastery 0/4 : compétence non acquise".to_string(),
                (_, Some(friction)) => format!("Friction {friction}/4 : blocage sévère"),
                _ => "Blocage sévère".to_string(),
            },
            impact: "Point bloquant pour la progression, traitement prioritaire en séance"
                .to_string(),
            exercise_type: Some("Reprise fondamentaux + accompagnement individuel".to_string()),
        })
        .collect();

    Priorities {
        top_priorities,
        quick_wins,
        high_risk,
    }
}
