use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{DiagnosticId, DiagnosticProfile, DiagnosticStatus};
use super::scoring::{Recommendation, ScoringOutcome, TrustLevel};

/// Repository record containing the profile, scoring outcome, and status metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub profile: DiagnosticProfile,
    pub status: DiagnosticStatus,
    pub outcome: Option<ScoringOutcome>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub failure: Option<String>,
}

impl DiagnosticRecord {
    pub fn id(&self) -> &DiagnosticId {
        &self.profile.diagnostic_id
    }

    pub fn student_email(&self) -> &str {
        &self.profile.submission.identity.email
    }

    pub fn status_view(&self) -> DiagnosticStatusView {
        DiagnosticStatusView {
            diagnostic_id: self.profile.diagnostic_id.clone(),
            status: self.status.label(),
            definition_key: self.profile.definition_key.clone(),
            recommendation: self.outcome.as_ref().map(|outcome| outcome.recommendation),
            recommendation_message: self
                .outcome
                .as_ref()
                .map(|outcome| outcome.recommendation_message.clone()),
            readiness_score: self.outcome.as_ref().map(|outcome| outcome.readiness_score),
            trust_level: self.outcome.as_ref().map(|outcome| outcome.trust_level),
        }
    }
}

/// Storage abstraction so the service module can be exercised in isolation.
pub trait DiagnosticRepository: Send + Sync {
    fn insert(&self, record: DiagnosticRecord) -> Result<DiagnosticRecord, RepositoryError>;
    fn update(&self, record: DiagnosticRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &DiagnosticId) -> Result<Option<DiagnosticRecord>, RepositoryError>;
    /// Newest first.
    fn recent(&self, limit: usize) -> Result<Vec<DiagnosticRecord>, RepositoryError>;
    /// Latest record for this student received at or after `since`.
    fn find_recent_by_email(
        &self,
        email: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<DiagnosticRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook used to ask staff to follow up on a scored diagnostic.
pub trait ScoringNotifier: Send + Sync {
    fn notify(&self, notice: ScoringNotice) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringNotice {
    pub template: String,
    pub diagnostic_id: DiagnosticId,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Sanitized representation of a diagnostic's exposed status.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticStatusView {
    pub diagnostic_id: DiagnosticId,
    pub status: &'static str,
    pub definition_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<Recommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readiness_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust_level: Option<TrustLevel>,
}
