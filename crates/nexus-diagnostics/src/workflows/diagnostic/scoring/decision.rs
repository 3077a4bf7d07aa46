use serde::{Deserialize, Serialize};

use super::super::definition::Thresholds;

/// Stage placement decided from readiness and risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    #[serde(rename = "Pallier2_confirmed")]
    Pallier2Confirmed,
    #[serde(rename = "Pallier2_conditional")]
    Pallier2Conditional,
    #[serde(rename = "Pallier1_recommended")]
    Pallier1Recommended,
}

impl Recommendation {
    pub const fn label(self) -> &'static str {
        match self {
            Recommendation::Pallier2Confirmed => "Pallier2_confirmed",
            Recommendation::Pallier2Conditional => "Pallier2_conditional",
            Recommendation::Pallier1Recommended => "Pallier1_recommended",
        }
    }

    pub const fn message(self) -> &'static str {
        match self {
            Recommendation::Pallier2Confirmed => "Profil compatible avec le Pallier 2 Excellence",
            Recommendation::Pallier2Conditional => {
                "Pallier 2 possible avec accompagnement renforcé"
            }
            Recommendation::Pallier1Recommended => {
                "Le Pallier 1 Fondamentaux est recommandé pour consolider les bases"
            }
        }
    }
}

pub(crate) fn decide(readiness: u8, risk: u8, thresholds: &Thresholds) -> Recommendation {
    if readiness >= thresholds.confirmed.readiness && risk <= thresholds.confirmed.risk {
        Recommendation::Pallier2Confirmed
    } else if readiness >= thresholds.conditional.readiness && risk <= thresholds.conditional.risk {
        Recommendation::Pallier2Conditional
    } else {
        Recommendation::Pallier1Recommended
    }
}

pub(crate) struct DecisionInputs {
    pub mastery_index: u8,
    pub coverage_index: u8,
    pub exam_readiness_index: u8,
    pub readiness_score: u8,
    pub risk_index: u8,
}

/// Audit text for the decision plus what would move it up a tier.
pub(crate) fn justify(
    recommendation: Recommendation,
    inputs: &DecisionInputs,
    thresholds: &Thresholds,
) -> (String, Vec<String>) {
    let mut parts = Vec::new();
    let mut upgrade_conditions = Vec::new();

    match recommendation {
        Recommendation::Pallier2Confirmed => {
            parts.push(format!(
                "Mastery ({}%) et ExamReadiness ({}%) au-dessus des seuils.",
                inputs.mastery_index, inputs.exam_readiness_index
            ));
            if inputs.coverage_index < 70 {
                parts.push(format!(
                    "Attention : couverture programme à {}%, chapitres non abordés à planifier.",
                    inputs.coverage_index
                ));
            }
        }
        Recommendation::Pallier2Conditional => {
            let confirmed = thresholds.confirmed;
            if inputs.readiness_score < confirmed.readiness {
                parts.push(format!(
                    "ReadinessScore ({}%) sous le seuil confirmé ({}%).",
                    inputs.readiness_score, confirmed.readiness
                ));
                upgrade_conditions.push(format!(
                    "Atteindre {}% de ReadinessScore (actuellement {}%)",
                    confirmed.readiness, inputs.readiness_score
                ));
            }
            if inputs.risk_index > confirmed.risk {
                parts.push(format!(
                    "RiskIndex ({}%) au-dessus du seuil confirmé ({}%).",
                    inputs.risk_index, confirmed.risk
                ));
                upgrade_conditions.push(format!(
                    "Réduire le RiskIndex sous {}% (actuellement {}%)",
                    confirmed.risk, inputs.risk_index
                ));
            }
            parts.push("Pallier 2 possible avec accompagnement renforcé.".to_string());
        }
        Recommendation::Pallier1Recommended => {
            parts.push(
                "Profil nécessitant une consolidation des fondamentaux avant le Pallier 2."
                    .to_string(),
            );
            if inputs.mastery_index < 40 {
                upgrade_conditions.push(format!(
                    "Améliorer le MasteryIndex au-dessus de 40% (actuellement {}%)",
                    inputs.mastery_index
                ));
            }
            if inputs.exam_readiness_index < 40 {
                upgrade_conditions.push(format!(
                    "Améliorer l'ExamReadiness au-dessus de 40% (actuellement {}%)",
                    inputs.exam_readiness_index
                ));
            }
        }
    }

    (parts.join(" "), upgrade_conditions)
}
