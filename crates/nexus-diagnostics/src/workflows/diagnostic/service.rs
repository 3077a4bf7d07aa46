use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, instrument, warn};

use super::definition::{DefinitionError, DefinitionRegistry};
use super::domain::{DiagnosticId, DiagnosticStatus, DiagnosticSubmission};
use super::intake::{IntakeGuard, IntakeViolation};
use super::render::{render_staff_report, RenderContext};
use super::repository::{
    DiagnosticRecord, DiagnosticRepository, RepositoryError, ScoringNotice,
    ScoringNotifier,
};
use super::scoring::{ScoringEngine, ScoringOutcome};

/// Window in which a second submission from the same e-mail returns the first one.
pub const DUPLICATE_WINDOW_MINUTES: i64 = 5;

/// Service composing the intake guard, definitions, repository, and scoring engine.
pub struct DiagnosticService<R, N> {
    guard: Arc<IntakeGuard>,
    definitions: Arc<DefinitionRegistry>,
    repository: Arc<R>,
    notifier: Arc<N>,
}

static DIAGNOSTIC_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_diagnostic_id() -> DiagnosticId {
    let id = DIAGNOSTIC_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    DiagnosticId(format!("diag-{id:06}"))
}

/// Result of an intake: the stored record and whether it was an earlier submission.
#[derive(Debug, Clone)]
pub struct SubmitReceipt {
    pub record: DiagnosticRecord,
    pub duplicate: bool,
}

impl<R, N> DiagnosticService<R, N>
where
    R: DiagnosticRepository + 'static,
    N: ScoringNotifier + 'static,
{
    pub fn new(definitions: Arc<DefinitionRegistry>, repository: Arc<R>, notifier: Arc<N>) -> Self {
        Self {
            guard: Arc::new(IntakeGuard),
            definitions,
            repository,
            notifier,
        }
    }

    pub fn definitions(&self) -> &DefinitionRegistry {
        &self.definitions
    }

    /// Validate and store a questionnaire, leaving it in the `Validated` state.
    pub fn submit(
        &self,
        submission: DiagnosticSubmission,
    ) -> Result<SubmitReceipt, DiagnosticServiceError> {
        self.submit_at(submission, Utc::now())
    }

    #[instrument(skip_all, fields(definition_key = ?submission.definition_key))]
    pub(crate) fn submit_at(
        &self,
        submission: DiagnosticSubmission,
        now: DateTime<Utc>,
    ) -> Result<SubmitReceipt, DiagnosticServiceError> {
        let definition = self.definitions.resolve_for(&submission)?;
        let profile =
            self.guard
                .profile_from_submission(next_diagnostic_id(), submission, definition, now)?;

        let since = now - Duration::minutes(DUPLICATE_WINDOW_MINUTES);
        if let Some(existing) = self
            .repository
            .find_recent_by_email(&profile.submission.identity.email, since)?
        {
            info!(diagnostic_id = %existing.id(), "duplicate submission blocked");
            return Ok(SubmitReceipt {
                record: existing,
                duplicate: true,
            });
        }

        let record = DiagnosticRecord {
            profile,
            status: DiagnosticStatus::Received,
            outcome: None,
            updated_at: now,
            failure: None,
        };
        let mut stored = self.repository.insert(record)?;

        stored.status = DiagnosticStatus::Validated;
        self.repository.update(stored.clone())?;

        info!(
            diagnostic_id = %stored.id(),
            definition_key = %stored.profile.definition_key,
            "diagnostic validated"
        );
        Ok(SubmitReceipt {
            record: stored,
            duplicate: false,
        })
    }

    /// Score a stored diagnostic against its definition and persist the outcome.
    #[instrument(skip_all, fields(diagnostic_id = %diagnostic_id))]
    pub fn score(
        &self,
        diagnostic_id: &DiagnosticId,
    ) -> Result<ScoringOutcome, DiagnosticServiceError> {
        let mut record = self
            .repository
            .fetch(diagnostic_id)?
            .ok_or(RepositoryError::NotFound)?;

        let Some(definition) = self.definitions.get(&record.profile.definition_key) else {
            let key = record.profile.definition_key.clone();
            warn!(definition_key = %key, "definition disappeared before scoring");
            record.status = DiagnosticStatus::Failed;
            record.failure = Some(format!("unknown definition {key}"));
            record.updated_at = Utc::now();
            self.repository.update(record)?;
            return Err(DefinitionError::Unknown(key).into());
        };

        let outcome =
            ScoringEngine::for_definition(definition).score_profile(&record.profile, definition);

        record.status = DiagnosticStatus::Scored;
        record.outcome = Some(outcome.clone());
        record.failure = None;
        record.updated_at = Utc::now();
        self.repository.update(record)?;

        info!(
            readiness = outcome.readiness_score,
            risk = outcome.risk_index,
            recommendation = outcome.recommendation.label(),
            trust = outcome.trust_level.label(),
            "diagnostic scored"
        );

        if outcome.needs_follow_up() {
            let mut details = BTreeMap::new();
            details.insert(
                "recommendation".to_string(),
                outcome.recommendation.label().to_string(),
            );
            details.insert(
                "trust_level".to_string(),
                outcome.trust_level.label().to_string(),
            );
            details.insert(
                "readiness_score".to_string(),
                outcome.readiness_score.to_string(),
            );
            // Outcome is already stored; delivery failures are only logged.
            if let Err(err) = self.notifier.notify(ScoringNotice {
                template: "diagnostic_follow_up".to_string(),
                diagnostic_id: diagnostic_id.clone(),
                details,
            }) {
                warn!(error = %err, "staff follow-up notice not delivered");
            }
        }

        Ok(outcome)
    }

    /// Intake and scoring in one step, as the questionnaire endpoint does.
    ///
    /// Duplicates are returned as stored, without scoring them again.
    pub fn submit_and_score(
        &self,
        submission: DiagnosticSubmission,
    ) -> Result<SubmitReceipt, DiagnosticServiceError> {
        let receipt = self.submit(submission)?;
        if receipt.duplicate {
            return Ok(receipt);
        }

        self.score(receipt.record.id())?;
        let record = self.get(receipt.record.id())?;
        Ok(SubmitReceipt {
            record,
            duplicate: false,
        })
    }

    /// Fetch a diagnostic and current status for API responses.
    pub fn get(
        &self,
        diagnostic_id: &DiagnosticId,
    ) -> Result<DiagnosticRecord, DiagnosticServiceError> {
        let record = self
            .repository
            .fetch(diagnostic_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    /// Staff Markdown report, available once the diagnostic is scored.
    pub fn staff_report(
        &self,
        diagnostic_id: &DiagnosticId,
    ) -> Result<String, DiagnosticServiceError> {
        let record = self.get(diagnostic_id)?;
        let outcome = record
            .outcome
            .as_ref()
            .ok_or_else(|| DiagnosticServiceError::NotScored(diagnostic_id.clone()))?;

        let mut context = RenderContext::from_submission(&record.profile.submission);
        if let Some(definition) = self.definitions.get(&record.profile.definition_key) {
            context = context.with_definition_label(definition.label.clone());
        }
        Ok(render_staff_report(outcome, &context))
    }
}

/// Error raised by the diagnostic service.
#[derive(Debug, thiserror::Error)]
pub enum DiagnosticServiceError {
    #[error(transparent)]
    Intake(#[from] IntakeViolation),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    UnknownDefinition(#[from] DefinitionError),
    #[error("diagnostic {0} has not been scored yet")]
    NotScored(DiagnosticId),
}
