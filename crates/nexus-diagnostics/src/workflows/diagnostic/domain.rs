use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Identifier wrapper for stored diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DiagnosticId(pub String);

impl fmt::Display for DiagnosticId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the student places a skill in their school year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillStatus {
    Studied,
    InProgress,
    NotStudied,
    Unknown,
}

/// One self-assessed skill line from the questionnaire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetencyItem {
    pub skill_id: String,
    pub skill_label: String,
    pub status: SkillStatus,
    /// 0 (not acquired) to 4 (mastered).
    pub mastery: Option<u8>,
    /// 0 to 3.
    #[serde(default)]
    pub confidence: Option<u8>,
    /// 0 (fluent) to 4 (blocked).
    #[serde(default)]
    pub friction: Option<u8>,
    #[serde(default)]
    pub error_types: Vec<String>,
    #[serde(default)]
    pub evidence: String,
}

impl CompetencyItem {
    /// Counts toward mastery: actually studied and rated.
    pub fn is_evaluated(&self) -> bool {
        !matches!(self.status, SkillStatus::NotStudied | SkillStatus::Unknown)
            && self.mastery.is_some()
    }

    pub fn high_friction(&self) -> bool {
        self.friction.map(|friction| friction >= 3).unwrap_or(false)
    }
}

/// Competencies grouped by domain, in the order the questionnaire submitted them.
///
/// Domain keys are owned by the diagnostic definition, so they are kept as free-form
/// strings and iteration order follows the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Competencies(Vec<(String, Vec<CompetencyItem>)>);

impl Competencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a domain, replacing the items if the key was already present.
    pub fn insert(&mut self, domain: impl Into<String>, items: Vec<CompetencyItem>) {
        let domain = domain.into();
        match self.0.iter_mut().find(|(key, _)| *key == domain) {
            Some((_, existing)) => *existing = items,
            None => self.0.push((domain, items)),
        }
    }

    pub fn get(&self, domain: &str) -> Option<&[CompetencyItem]> {
        self.0
            .iter()
            .find(|(key, _)| key == domain)
            .map(|(_, items)| items.as_slice())
    }

    pub fn domains(&self) -> impl Iterator<Item = (&str, &[CompetencyItem])> {
        self.0
            .iter()
            .map(|(key, items)| (key.as_str(), items.as_slice()))
    }

    /// Every item tagged with its domain key.
    pub fn items(&self) -> impl Iterator<Item = (&str, &CompetencyItem)> {
        self.domains()
            .flat_map(|(domain, items)| items.iter().map(move |item| (domain, item)))
    }

    pub fn find_skill(&self, skill_id: &str) -> Option<(&str, &CompetencyItem)> {
        self.items().find(|(_, item)| item.skill_id == skill_id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<S: Into<String>> FromIterator<(S, Vec<CompetencyItem>)> for Competencies {
    fn from_iter<T: IntoIterator<Item = (S, Vec<CompetencyItem>)>>(iter: T) -> Self {
        let mut competencies = Competencies::new();
        for (domain, items) in iter {
            competencies.insert(domain, items);
        }
        competencies
    }
}

impl Serialize for Competencies {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (domain, items) in &self.0 {
            map.serialize_entry(domain, items)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Competencies {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CompetenciesVisitor;

        impl<'de> Visitor<'de> for CompetenciesVisitor {
            type Value = Competencies;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of domain keys to competency lists")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Self::Value, M::Error> {
                let mut competencies = Competencies::new();
                // Optional domains may be sent as null by the form.
                while let Some((domain, items)) =
                    access.next_entry::<String, Option<Vec<CompetencyItem>>>()?
                {
                    if let Some(items) = items {
                        competencies.insert(domain, items);
                    }
                }
                Ok(competencies)
            }
        }

        deserializer.deserialize_map(CompetenciesVisitor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiniTest {
    /// Correct answers out of 6.
    pub score: u8,
    pub time_used_minutes: u16,
    #[serde(default)]
    pub completed_in_time: Option<bool>,
}

impl MiniTest {
    pub const MAX_SCORE: u8 = 6;

    pub fn finished_in_time(&self) -> bool {
        self.completed_in_time.unwrap_or(false)
    }
}

/// Self ratings on a 0 to 4 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelfRatings {
    pub speed_no_calc: u8,
    pub calc_reliability: u8,
    pub redaction: u8,
    pub justifications: u8,
    pub stress: u8,
}

impl SelfRatings {
    pub fn values(&self) -> [u8; 5] {
        [
            self.speed_no_calc,
            self.calc_reliability,
            self.redaction,
            self.justifications,
            self.stress,
        ]
    }
}

/// How the student said the mini test felt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feeling {
    Panic,
    Ok,
    Neutral,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSignals {
    #[serde(default)]
    pub hardest_items: Vec<u8>,
    #[serde(default)]
    pub dominant_error_type: Option<String>,
    #[serde(default)]
    pub verified_answers: Option<bool>,
    #[serde(default)]
    pub feeling: Option<String>,
}

impl ExamSignals {
    pub fn feeling(&self) -> Feeling {
        match self.feeling.as_deref() {
            Some("panic") => Feeling::Panic,
            Some("ok") => Feeling::Ok,
            _ => Feeling::Neutral,
        }
    }

    pub fn answers_verified(&self) -> bool {
        self.verified_answers.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamPrep {
    pub mini_test: MiniTest,
    pub self_ratings: SelfRatings,
    #[serde(default)]
    pub signals: ExamSignals,
    #[serde(default)]
    pub main_risk: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub city: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolContext {
    #[serde(default)]
    pub establishment: Option<String>,
    #[serde(default)]
    pub math_track: Option<String>,
    #[serde(default)]
    pub class_size: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    #[serde(default)]
    pub general_average: Option<String>,
    #[serde(default)]
    pub math_average: Option<String>,
    #[serde(default)]
    pub last_test_score: Option<String>,
    #[serde(default)]
    pub class_ranking: Option<String>,
}

impl Performance {
    /// Declared subject average out of 20, when it parses.
    pub fn parsed_math_average(&self) -> Option<f64> {
        self.math_average
            .as_deref()
            .and_then(parse_leading_number)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Methodology {
    #[serde(default)]
    pub learning_style: Option<String>,
    #[serde(default)]
    pub problem_reflex: Option<String>,
    #[serde(default)]
    pub weekly_work: Option<String>,
    #[serde(default)]
    pub max_concentration: Option<String>,
    #[serde(default)]
    pub error_types: Vec<String>,
}

impl Methodology {
    pub fn weekly_hours(&self) -> Option<f64> {
        self.weekly_work.as_deref().and_then(parse_leading_number)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ambition {
    #[serde(default)]
    pub target_mention: Option<String>,
    #[serde(default)]
    pub post_bac: Option<String>,
}

/// Chapters of the programme as the student reported them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChaptersSelection {
    #[serde(default)]
    pub selected: Vec<String>,
    #[serde(default)]
    pub in_progress: Vec<String>,
    #[serde(default)]
    pub not_yet: Vec<String>,
}

impl ChaptersSelection {
    pub fn is_seen_or_in_progress(&self, chapter_id: &str) -> bool {
        self.selected.iter().any(|id| id == chapter_id)
            || self.in_progress.iter().any(|id| id == chapter_id)
    }

    pub fn is_not_yet(&self, chapter_id: &str) -> bool {
        self.not_yet.iter().any(|id| id == chapter_id)
    }
}

/// Raw questionnaire payload as posted by the pre-stage form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticSubmission {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub definition_key: Option<String>,
    #[serde(default)]
    pub discipline: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    pub identity: Identity,
    #[serde(default)]
    pub school_context: SchoolContext,
    #[serde(default)]
    pub performance: Performance,
    #[serde(default)]
    pub chapters: Option<ChaptersSelection>,
    pub competencies: Competencies,
    pub exam_prep: ExamPrep,
    #[serde(default)]
    pub methodology: Methodology,
    #[serde(default)]
    pub ambition: Ambition,
}

/// Validated submission bound to the definition it will be scored against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticProfile {
    pub diagnostic_id: DiagnosticId,
    pub definition_key: String,
    pub definition_version: String,
    pub submission: DiagnosticSubmission,
    /// `None` when the questionnaire carried no chapter selection.
    pub chapters: Option<ChaptersSelection>,
    pub received_at: DateTime<Utc>,
}

/// Pipeline status tracked for every stored diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticStatus {
    Received,
    Validated,
    Scored,
    Failed,
}

impl DiagnosticStatus {
    pub const fn label(self) -> &'static str {
        match self {
            DiagnosticStatus::Received => "RECEIVED",
            DiagnosticStatus::Validated => "VALIDATED",
            DiagnosticStatus::Scored => "SCORED",
            DiagnosticStatus::Failed => "FAILED",
        }
    }
}

/// Form fields are free text ("12,5", "3h", ".5 h"); keep the leading number.
fn parse_leading_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let mut seen_separator = false;
    let end = trimmed
        .char_indices()
        .find(|(index, ch)| match *ch {
            '0'..='9' => false,
            '-' => *index > 0,
            '.' | ',' if !seen_separator => {
                seen_separator = true;
                false
            }
            _ => true,
        })
        .map(|(index, _)| index)
        .unwrap_or(trimmed.len());
    let number = trimmed[..end].replace(',', ".");
    number.parse::<f64>().ok().filter(|value| value.is_finite())
}
