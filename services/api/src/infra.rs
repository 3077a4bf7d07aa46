use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use nexus_diagnostics::config::DefinitionsConfig;
use nexus_diagnostics::workflows::diagnostic::{
    DefinitionError, DefinitionRegistry, DiagnosticId, DiagnosticRecord, DiagnosticRepository,
    NotifyError, RepositoryError, ScoringNotice, ScoringNotifier,
};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::warn;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryDiagnosticRepository {
    records: Arc<Mutex<HashMap<DiagnosticId, DiagnosticRecord>>>,
}

impl DiagnosticRepository for InMemoryDiagnosticRepository {
    fn insert(&self, record: DiagnosticRecord) -> Result<DiagnosticRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(record.id()) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id().clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: DiagnosticRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(record.id()) {
            guard.insert(record.id().clone(), record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &DiagnosticId) -> Result<Option<DiagnosticRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<DiagnosticRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut records: Vec<DiagnosticRecord> = guard.values().cloned().collect();
        records.sort_by(|a, b| b.profile.received_at.cmp(&a.profile.received_at));
        records.truncate(limit);
        Ok(records)
    }

    fn find_recent_by_email(
        &self,
        email: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<DiagnosticRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.student_email().eq_ignore_ascii_case(email))
            .filter(|record| record.profile.received_at >= since)
            .max_by_key(|record| record.profile.received_at)
            .cloned())
    }
}

/// Follow-up notices go to the log until a mail relay is wired in.
#[derive(Default, Clone)]
pub(crate) struct LoggingNotifier {
    sent: Arc<Mutex<Vec<ScoringNotice>>>,
}

impl ScoringNotifier for LoggingNotifier {
    fn notify(&self, notice: ScoringNotice) -> Result<(), NotifyError> {
        warn!(
            template = %notice.template,
            diagnostic_id = %notice.diagnostic_id,
            details = ?notice.details,
            "staff follow-up requested"
        );
        let mut guard = self.sent.lock().expect("notifier mutex poisoned");
        guard.push(notice);
        Ok(())
    }
}

#[cfg(test)]
impl LoggingNotifier {
    pub(crate) fn sent(&self) -> Vec<ScoringNotice> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }
}

/// Built-in definitions, overlaid with any TOML files from the configured directory.
pub(crate) fn load_registry(
    config: &DefinitionsConfig,
) -> Result<DefinitionRegistry, DefinitionError> {
    let mut registry = DefinitionRegistry::builtin()?;
    if let Some(directory) = config.directory.as_deref() {
        registry.load_dir(directory)?;
    }
    Ok(registry)
}

pub(crate) fn parse_score(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .trim()
        .replace(',', ".")
        .parse()
        .map_err(|err| format!("failed to parse '{raw}' as a score ({err})"))?;
    if (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("score {value} is outside 0..=100"))
    }
}
