//! Pre-stage diagnostic intake, scoring, and staff reporting.
//!
//! A questionnaire is validated against the definition it targets, stored, scored by the
//! [`ScoringEngine`] and exposed through [`diagnostic_router`]. Definitions carry the
//! domain weights, decision thresholds, and chapter map that drive the engine.

pub mod definition;
pub mod domain;
pub(crate) mod intake;
pub mod render;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use definition::{
    resolve_chapters_selection, visible_skill_ids, ChapterDefinition, DefinitionError,
    DefinitionRegistry, DiagnosticDefinition, ExamFormat, Level, PrerequisiteLevel,
    ScoringPolicy, SkillMeta, Stage, Threshold, Thresholds, Track, DEFAULT_DEFINITION_KEY,
};
pub use domain::{
    Ambition, ChaptersSelection, Competencies, CompetencyItem, DiagnosticId, DiagnosticProfile,
    DiagnosticStatus, DiagnosticSubmission, ExamPrep, ExamSignals, Feeling, Identity,
    Methodology, MiniTest, Performance, SchoolContext, SelfRatings, SkillStatus,
};
pub use intake::IntakeViolation;
pub use render::{render_staff_report, RenderContext};
pub use repository::{
    DiagnosticRecord, DiagnosticRepository, DiagnosticStatusView, NotifyError, RepositoryError,
    ScoringNotice, ScoringNotifier,
};
pub use router::diagnostic_router;
pub use scoring::{Recommendation, ScoringEngine, ScoringOutcome, TrustLevel};
pub use service::{DiagnosticService, DiagnosticServiceError, SubmitReceipt};
