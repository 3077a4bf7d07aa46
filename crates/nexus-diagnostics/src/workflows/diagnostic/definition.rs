use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::domain::{ChaptersSelection, DiagnosticSubmission};

/// Definition used when a submission names neither a key nor a discipline.
pub const DEFAULT_DEFINITION_KEY: &str = "maths-premiere-p2";

/// Weight applied to a domain the policy does not list (or lists at zero).
pub const FALLBACK_DOMAIN_WEIGHT: f64 = 0.10;

const BUILTIN_DEFINITIONS: [(&str, &str); 4] = [
    (
        "maths-premiere-p2.toml",
        include_str!("../../../definitions/maths-premiere-p2.toml"),
    ),
    (
        "maths-terminale-p2.toml",
        include_str!("../../../definitions/maths-terminale-p2.toml"),
    ),
    (
        "nsi-premiere-p2.toml",
        include_str!("../../../definitions/nsi-premiere-p2.toml"),
    ),
    (
        "nsi-terminale-p2.toml",
        include_str!("../../../definitions/nsi-terminale-p2.toml"),
    ),
];

/// Readiness floor and risk ceiling for one recommendation tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Threshold {
    pub readiness: u8,
    pub risk: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub confirmed: Threshold,
    pub conditional: Threshold,
}

/// Domain weights and decision thresholds driving the scoring engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    pub domain_weights: BTreeMap<String, f64>,
    pub thresholds: Thresholds,
}

impl ScoringPolicy {
    pub fn weight_for(&self, domain: &str) -> f64 {
        match self.domain_weights.get(domain) {
            Some(weight) if *weight > 0.0 => *weight,
            _ => FALLBACK_DOMAIN_WEIGHT,
        }
    }
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        let domain_weights = [
            ("analysis", 0.30),
            ("algebra", 0.25),
            ("geometry", 0.20),
            ("probabilities", 0.15),
            ("python", 0.10),
        ]
        .into_iter()
        .map(|(domain, weight)| (domain.to_string(), weight))
        .collect();

        Self {
            domain_weights,
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
}

/// A programme chapter and the skills it introduces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterDefinition {
    pub chapter_id: String,
    pub chapter_label: String,
    #[serde(default)]
    pub description: String,
    pub domain_id: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub rag_topics: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrerequisiteLevel {
    Core,
    Recommended,
}

/// Links a skill to its chapter and flags it as a prerequisite for later work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillMeta {
    pub skill_id: String,
    pub chapter_id: String,
    #[serde(default)]
    pub prerequisite: bool,
    #[serde(default)]
    pub prerequisite_level: Option<PrerequisiteLevel>,
}

impl SkillMeta {
    pub fn is_core_prerequisite(&self) -> bool {
        self.prerequisite && self.prerequisite_level == Some(PrerequisiteLevel::Core)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamFormat {
    /// Minutes.
    pub duration: u16,
    pub calculator_allowed: bool,
    pub structure: String,
    pub total_points: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    Maths,
    Nsi,
    Physique,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Premiere,
    Terminale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Pallier1,
    Pallier2,
}

/// Versioned questionnaire definition: one track, level and stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticDefinition {
    pub key: String,
    pub version: String,
    pub label: String,
    pub track: Track,
    pub level: Level,
    pub stage: Stage,
    pub scoring_policy: ScoringPolicy,
    #[serde(default)]
    pub chapters: Vec<ChapterDefinition>,
    #[serde(default)]
    pub skill_meta: Vec<SkillMeta>,
    #[serde(default)]
    pub exam_format: Option<ExamFormat>,
    #[serde(default)]
    pub risk_factors: Vec<String>,
}

impl DiagnosticDefinition {
    pub fn from_toml(source: &str, origin: &str) -> Result<Self, DefinitionError> {
        let definition: DiagnosticDefinition =
            toml::from_str(source).map_err(|source| DefinitionError::Parse {
                origin: origin.to_string(),
                source,
            })?;
        definition.validate()?;
        Ok(definition)
    }

    pub fn chapter(&self, chapter_id: &str) -> Option<&ChapterDefinition> {
        self.chapters
            .iter()
            .find(|chapter| chapter.chapter_id == chapter_id)
    }

    pub fn validate(&self) -> Result<(), DefinitionError> {
        let invalid = |reason: String| DefinitionError::Invalid {
            key: self.key.clone(),
            reason,
        };

        if self.key.trim().is_empty() {
            return Err(invalid("key must not be empty".to_string()));
        }

        for (domain, weight) in &self.scoring_policy.domain_weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(invalid(format!("weight for domain '{domain}' must be >= 0")));
            }
        }

        let thresholds = self.scoring_policy.thresholds;
        if thresholds.conditional.readiness > thresholds.confirmed.readiness {
            return Err(invalid(
                "conditional readiness threshold exceeds confirmed threshold".to_string(),
            ));
        }

        let mut chapter_ids = BTreeSet::new();
        for chapter in &self.chapters {
            if !chapter_ids.insert(chapter.chapter_id.as_str()) {
                return Err(invalid(format!("duplicate chapter '{}'", chapter.chapter_id)));
            }
        }

        if let Some(meta) = self
            .skill_meta
            .iter()
            .find(|meta| !chapter_ids.contains(meta.chapter_id.as_str()))
        {
            return Err(invalid(format!(
                "skill '{}' references unknown chapter '{}'",
                meta.skill_id, meta.chapter_id
            )));
        }

        Ok(())
    }
}

/// Definition loading and lookup failures.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("unknown diagnostic definition '{0}'")]
    Unknown(String),
    #[error("failed to parse definition {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("definition '{key}' is invalid: {reason}")]
    Invalid { key: String, reason: String },
    #[error("failed to read definition file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Keyed set of diagnostic definitions available to the service.
#[derive(Debug, Clone, Default)]
pub struct DefinitionRegistry {
    definitions: BTreeMap<String, DiagnosticDefinition>,
}

impl DefinitionRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the definitions shipped in the crate.
    pub fn builtin() -> Result<Self, DefinitionError> {
        let mut registry = Self::empty();
        for (origin, source) in BUILTIN_DEFINITIONS {
            registry.insert(DiagnosticDefinition::from_toml(source, origin)?);
        }
        Ok(registry)
    }

    /// Load every `*.toml` file in `directory`, overriding definitions with the same key.
    pub fn load_dir(&mut self, directory: &Path) -> Result<usize, DefinitionError> {
        let io_error = |path: &Path, source| DefinitionError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(directory).map_err(|source| io_error(directory, source))? {
            let path = entry.map_err(|source| io_error(directory, source))?.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("toml") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in &paths {
            let source = fs::read_to_string(path).map_err(|source| io_error(path, source))?;
            let definition =
                DiagnosticDefinition::from_toml(&source, &path.display().to_string())?;
            debug!(key = %definition.key, path = %path.display(), "loaded diagnostic definition");
            self.insert(definition);
        }

        info!(
            directory = %directory.display(),
            count = paths.len(),
            "loaded extra diagnostic definitions"
        );
        Ok(paths.len())
    }

    pub fn insert(&mut self, definition: DiagnosticDefinition) -> Option<DiagnosticDefinition> {
        self.definitions.insert(definition.key.clone(), definition)
    }

    pub fn get(&self, key: &str) -> Option<&DiagnosticDefinition> {
        self.definitions.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Pick the definition a submission should be scored against.
    ///
    /// An explicit key wins; otherwise discipline and level form `<discipline>-<level>-p2`,
    /// falling back to the default maths première definition.
    pub fn resolve_for(
        &self,
        submission: &DiagnosticSubmission,
    ) -> Result<&DiagnosticDefinition, DefinitionError> {
        let key = match (&submission.definition_key, &submission.discipline, &submission.level) {
            (Some(key), _, _) => key.trim().to_string(),
            (None, Some(discipline), Some(level)) => format!(
                "{}-{}-p2",
                discipline.trim().to_ascii_lowercase(),
                level.trim().to_ascii_lowercase()
            ),
            _ => DEFAULT_DEFINITION_KEY.to_string(),
        };

        self.get(&key).ok_or(DefinitionError::Unknown(key))
    }
}

/// Complete the student's chapter selection against the definition.
///
/// Every definition chapter that is neither seen nor in progress is marked not yet covered;
/// duplicated ids are dropped while the submitted order is kept.
pub fn resolve_chapters_selection(
    submission: &DiagnosticSubmission,
    definition: &DiagnosticDefinition,
) -> ChaptersSelection {
    let submitted = submission.chapters.clone().unwrap_or_default();
    let selected = dedup(submitted.selected);
    let in_progress: Vec<String> = dedup(submitted.in_progress)
        .into_iter()
        .filter(|id| !selected.contains(id))
        .collect();

    let not_yet = definition
        .chapters
        .iter()
        .map(|chapter| chapter.chapter_id.clone())
        .filter(|id| !selected.contains(id) && !in_progress.contains(id))
        .collect();

    ChaptersSelection {
        selected,
        in_progress,
        not_yet,
    }
}

/// Skills the questionnaire should ask about for this selection.
///
/// Seen and in-progress chapters contribute all their skills; not-yet chapters only
/// contribute their core prerequisites.
pub fn visible_skill_ids(
    selection: &ChaptersSelection,
    definition: &DiagnosticDefinition,
) -> Vec<String> {
    let mut visible = Vec::new();
    let mut seen = BTreeSet::new();

    for chapter in &definition.chapters {
        if selection.is_seen_or_in_progress(&chapter.chapter_id) {
            for skill in &chapter.skills {
                if seen.insert(skill.as_str()) {
                    visible.push(skill.clone());
                }
            }
        } else if selection.is_not_yet(&chapter.chapter_id) {
            for meta in definition
                .skill_meta
                .iter()
                .filter(|meta| meta.chapter_id == chapter.chapter_id && meta.is_core_prerequisite())
            {
                if seen.insert(meta.skill_id.as_str()) {
                    visible.push(meta.skill_id.clone());
                }
            }
        }
    }

    visible
}

fn dedup(ids: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::diagnostic::tests::common::submission_with_chapters;

    fn registry() -> DefinitionRegistry {
        DefinitionRegistry::builtin().expect("builtin definitions parse")
    }

    #[test]
    fn builtin_registry_ships_four_pallier2_definitions() {
        let registry = registry();
        let keys: Vec<&str> = registry.keys().collect();
        assert_eq!(
            keys,
            vec![
                "maths-premiere-p2",
                "maths-terminale-p2",
                "nsi-premiere-p2",
                "nsi-terminale-p2"
            ]
        );

        let maths = registry.get("maths-premiere-p2").expect("maths premiere");
        assert_eq!(maths.track, Track::Maths);
        assert_eq!(maths.level, Level::Premiere);
        assert_eq!(maths.stage, Stage::Pallier2);
        assert_eq!(maths.scoring_policy.weight_for("algebra"), 0.22);
        assert_eq!(maths.scoring_policy.thresholds.confirmed.readiness, 60);
        assert!(!maths.chapters.is_empty());
    }

    #[test]
    fn builtin_weights_sum_to_one() {
        let registry = registry();
        for key in registry.keys() {
            let definition = registry.get(key).expect("listed key");
            let total: f64 = definition.scoring_policy.domain_weights.values().sum();
            assert!((total - 1.0).abs() < 1e-9, "{key} weights sum to {total}");
        }
    }

    #[test]
    fn unknown_or_zero_weight_falls_back() {
        let mut policy = ScoringPolicy::default();
        policy.domain_weights.insert("python".to_string(), 0.0);
        assert_eq!(policy.weight_for("python"), FALLBACK_DOMAIN_WEIGHT);
        assert_eq!(policy.weight_for("astronomy"), FALLBACK_DOMAIN_WEIGHT);
        assert_eq!(policy.weight_for("analysis"), 0.30);
    }

    #[test]
    fn rejects_skill_meta_pointing_at_missing_chapter() {
        let source = r#"
            key = "broken"
            version = "v0"
            label = "Broken"
            track = "maths"
            level = "premiere"
            stage = "pallier2"

            [scoring_policy.domain_weights]
            algebra = 1.0

            [scoring_policy.thresholds.confirmed]
            readiness = 60
            risk = 55

            [scoring_policy.thresholds.conditional]
            readiness = 48
            risk = 70

            [[skill_meta]]
            skill_id = "alg1"
            chapter_id = "nowhere"
            prerequisite = true
            prerequisite_level = "core"
        "#;

        match DiagnosticDefinition::from_toml(source, "inline") {
            Err(DefinitionError::Invalid { key, reason }) => {
                assert_eq!(key, "broken");
                assert!(reason.contains("nowhere"));
            }
            other => panic!("expected invalid definition, got {other:?}"),
        }
    }

    #[test]
    fn reports_toml_errors_with_origin() {
        let err = DiagnosticDefinition::from_toml("key = ", "bad.toml").expect_err("parse fails");
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn not_yet_is_everything_not_selected() {
        let registry = registry();
        let definition = registry.get("maths-premiere-p2").expect("definition");
        let first = definition.chapters[0].chapter_id.clone();
        let second = definition.chapters[1].chapter_id.clone();

        let submission = submission_with_chapters(ChaptersSelection {
            selected: vec![first.clone(), first.clone()],
            in_progress: vec![second.clone(), first.clone()],
            not_yet: Vec::new(),
        });

        let selection = resolve_chapters_selection(&submission, definition);
        assert_eq!(selection.selected, vec![first.clone()]);
        assert_eq!(selection.in_progress, vec![second.clone()]);
        assert_eq!(selection.not_yet.len(), definition.chapters.len() - 2);
        assert!(!selection.not_yet.contains(&first));
    }

    #[test]
    fn visible_skills_include_core_prerequisites_of_future_chapters() {
        let registry = registry();
        let definition = registry.get("maths-premiere-p2").expect("definition");
        let selection = ChaptersSelection {
            selected: Vec::new(),
            in_progress: Vec::new(),
            not_yet: definition
                .chapters
                .iter()
                .map(|chapter| chapter.chapter_id.clone())
                .collect(),
        };

        let visible = visible_skill_ids(&selection, definition);
        let core: Vec<String> = definition
            .skill_meta
            .iter()
            .filter(|meta| meta.is_core_prerequisite())
            .map(|meta| meta.skill_id.clone())
            .collect();
        assert!(!core.is_empty());
        assert_eq!(visible.len(), core.len());
        assert!(core.iter().all(|skill| visible.contains(skill)));
    }

    #[test]
    fn resolves_definition_from_discipline_and_level() {
        let registry = registry();
        let mut submission = submission_with_chapters(ChaptersSelection::default());
        submission.definition_key = None;
        submission.discipline = Some("NSI".to_string());
        submission.level = Some("terminale".to_string());
        let definition = registry.resolve_for(&submission).expect("nsi terminale");
        assert_eq!(definition.key, "nsi-terminale-p2");

        submission.discipline = None;
        let definition = registry.resolve_for(&submission).expect("default");
        assert_eq!(definition.key, DEFAULT_DEFINITION_KEY);

        submission.definition_key = Some("physique-terminale-p2".to_string());
        match registry.resolve_for(&submission) {
            Err(DefinitionError::Unknown(key)) => assert_eq!(key, "physique-terminale-p2"),
            other => panic!("expected unknown definition, got {other:?}"),
        }
    }
}
