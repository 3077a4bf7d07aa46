//! Chapter-aware adjustments: how much of the programme the student has seen, and
//! how shaky the prerequisites of upcoming chapters are.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::super::definition::{ChapterDefinition, SkillMeta};
use super::super::domain::{ChaptersSelection, Competencies};
use super::checks::{AlertLevel, ScoringAlert};
use super::domains::DomainScore;

const MIN_SEEN_CHAPTER_RATIO: f64 = 0.30;
const ADVANCED_GAP_SCORE: u8 = 40;
/// Share of the readiness mastery term given to weak prerequisites.
pub const PREREQUISITE_WEIGHT: f64 = 0.25;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgrammeCoverage {
    pub total_chapters: usize,
    pub seen_chapters: usize,
    pub in_progress_chapters: usize,
    pub seen_chapter_ratio: f64,
    pub evaluated_skill_ratio: f64,
}

/// Core prerequisite of a chapter not studied yet, rated at most 1/4.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeakPrerequisite {
    pub skill_id: String,
    pub skill_label: String,
    pub chapter_id: String,
    pub domain: String,
    pub mastery: u8,
}

impl WeakPrerequisite {
    pub fn score(&self) -> f64 {
        f64::from(self.mastery) / 4.0 * 100.0
    }
}

pub(crate) fn programme_coverage(
    competencies: &Competencies,
    selection: &ChaptersSelection,
    chapters: &[ChapterDefinition],
) -> Option<ProgrammeCoverage> {
    if chapters.is_empty() {
        return None;
    }

    let total_chapters = chapters.len();
    let seen_chapters = selection.selected.len();
    let in_progress_chapters = selection.in_progress.len();

    let expected: BTreeSet<&str> = chapters
        .iter()
        .filter(|chapter| selection.is_seen_or_in_progress(&chapter.chapter_id))
        .flat_map(|chapter| chapter.skills.iter().map(String::as_str))
        .collect();

    let evaluated_skill_ratio = if expected.is_empty() {
        1.0
    } else {
        let evaluated = expected
            .iter()
            .filter(|skill_id| {
                competencies
                    .find_skill(skill_id)
                    .map(|(_, item)| item.is_evaluated())
                    .unwrap_or(false)
            })
            .count();
        evaluated as f64 / expected.len() as f64
    };

    Some(ProgrammeCoverage {
        total_chapters,
        seen_chapters,
        in_progress_chapters,
        seen_chapter_ratio: (seen_chapters + in_progress_chapters) as f64 / total_chapters as f64,
        evaluated_skill_ratio,
    })
}

pub(crate) fn chapter_alerts(
    coverage: &ProgrammeCoverage,
    selection: &ChaptersSelection,
    chapters: &[ChapterDefinition],
    domain_scores: &[DomainScore],
) -> Vec<ScoringAlert> {
    let mut alerts = Vec::new();

    if coverage.seen_chapter_ratio < MIN_SEEN_CHAPTER_RATIO {
        alerts.push(
            ScoringAlert::new(
                AlertLevel::Warning,
                "PROGRAM_NOT_COVERED",
                format!(
                    "Programme peu avancé : {}/{} chapitres vus ou en cours ({}%)",
                    coverage.seen_chapters + coverage.in_progress_chapters,
                    coverage.total_chapters,
                    super::round_half_up(coverage.seen_chapter_ratio * 100.0)
                ),
            )
            .with_impact("Les indices portent sur une faible part du programme, bilan à actualiser"),
        );
    }

    let seen_domains: BTreeSet<&str> = chapters
        .iter()
        .filter(|chapter| selection.selected.contains(&chapter.chapter_id))
        .map(|chapter| chapter.domain_id.as_str())
        .collect();

    let gaps: Vec<String> = domain_scores
        .iter()
        .filter(|ds| {
            seen_domains.contains(ds.domain.as_str()) && ds.is_active() && ds.score < ADVANCED_GAP_SCORE
        })
        .map(|ds| format!("{} ({}%)", ds.domain, ds.score))
        .collect();

    if !gaps.is_empty() {
        alerts.push(
            ScoringAlert::new(
                AlertLevel::Warning,
                "ADVANCED_GAPS",
                format!("Lacunes sur des chapitres déjà vus : {}", gaps.join(", ")),
            )
            .with_impact("Notions censées être acquises en classe, à reprendre avant d'avancer"),
        );
    }

    alerts
}

pub(crate) fn weak_prerequisites(
    competencies: &Competencies,
    selection: &ChaptersSelection,
    skill_meta: &[SkillMeta],
) -> Vec<WeakPrerequisite> {
    skill_meta
        .iter()
        .filter(|meta| meta.is_core_prerequisite() && selection.is_not_yet(&meta.chapter_id))
        .filter_map(|meta| {
            let (domain, item) = competencies.find_skill(&meta.skill_id)?;
            let mastery = item.mastery.filter(|mastery| *mastery <= 1)?;
            Some(WeakPrerequisite {
                skill_id: item.skill_id.clone(),
                skill_label: item.skill_label.clone(),
                chapter_id: meta.chapter_id.clone(),
                domain: domain.to_string(),
                mastery,
            })
        })
        .collect()
}

/// Mastery fed to the readiness formula once weak prerequisites are blended in.
///
/// Only ever lowers the value: when prerequisites average at or above the mastery index
/// the index is returned unchanged.
pub(crate) fn prerequisite_adjusted_mastery(mastery_index: u8, weak: &[WeakPrerequisite]) -> f64 {
    let mastery = f64::from(mastery_index);
    if weak.is_empty() {
        return mastery;
    }

    let prerequisite_score = weak.iter().map(WeakPrerequisite::score).sum::<f64>() / weak.len() as f64;
    if prerequisite_score >= mastery {
        return mastery;
    }

    (mastery + PREREQUISITE_WEIGHT * prerequisite_score) / (1.0 + PREREQUISITE_WEIGHT)
}
