use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tracing::error;

use super::domain::{DiagnosticId, DiagnosticSubmission};
use super::repository::{DiagnosticRepository, RepositoryError, ScoringNotifier};
use super::service::{DiagnosticService, DiagnosticServiceError};

/// Router builder exposing questionnaire intake, status, and staff report endpoints.
pub fn diagnostic_router<R, N>(service: Arc<DiagnosticService<R, N>>) -> Router
where
    R: DiagnosticRepository + 'static,
    N: ScoringNotifier + 'static,
{
    Router::new()
        .route("/api/v1/diagnostics", post(submit_handler::<R, N>))
        .route(
            "/api/v1/diagnostics/:diagnostic_id",
            get(status_handler::<R, N>),
        )
        .route(
            "/api/v1/diagnostics/:diagnostic_id/report",
            get(report_handler::<R, N>),
        )
        .with_state(service)
}

pub(crate) async fn submit_handler<R, N>(
    State(service): State<Arc<DiagnosticService<R, N>>>,
    axum::Json(submission): axum::Json<DiagnosticSubmission>,
) -> Response
where
    R: DiagnosticRepository + 'static,
    N: ScoringNotifier + 'static,
{
    match service.submit_and_score(submission) {
        Ok(receipt) if receipt.duplicate => {
            let payload = json!({
                "duplicate": true,
                "diagnostic": receipt.record.status_view(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Ok(receipt) => {
            let view = receipt.record.status_view();
            (StatusCode::ACCEPTED, axum::Json(view)).into_response()
        }
        Err(DiagnosticServiceError::Intake(violation)) => {
            let payload = json!({
                "error": violation.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(DiagnosticServiceError::UnknownDefinition(definition_error)) => {
            let payload = json!({
                "error": definition_error.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(DiagnosticServiceError::Repository(RepositoryError::Conflict)) => {
            let payload = json!({
                "error": "diagnostic already exists",
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(other) => internal_error(other),
    }
}

pub(crate) async fn status_handler<R, N>(
    State(service): State<Arc<DiagnosticService<R, N>>>,
    Path(diagnostic_id): Path<String>,
) -> Response
where
    R: DiagnosticRepository + 'static,
    N: ScoringNotifier + 'static,
{
    let id = DiagnosticId(diagnostic_id);
    match service.get(&id) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(DiagnosticServiceError::Repository(RepositoryError::NotFound)) => not_found(&id),
        Err(other) => internal_error(other),
    }
}

pub(crate) async fn report_handler<R, N>(
    State(service): State<Arc<DiagnosticService<R, N>>>,
    Path(diagnostic_id): Path<String>,
) -> Response
where
    R: DiagnosticRepository + 'static,
    N: ScoringNotifier + 'static,
{
    let id = DiagnosticId(diagnostic_id);
    match service.staff_report(&id) {
        Ok(markdown) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
            markdown,
        )
            .into_response(),
        Err(DiagnosticServiceError::Repository(RepositoryError::NotFound))
        | Err(DiagnosticServiceError::NotScored(_)) => not_found(&id),
        Err(other) => internal_error(other),
    }
}

fn not_found(id: &DiagnosticId) -> Response {
    let payload = json!({
        "diagnostic_id": id.0,
        "error": "diagnostic not found",
    });
    (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
}

fn internal_error(cause: DiagnosticServiceError) -> Response {
    error!(error = %cause, "diagnostic request failed");
    let payload = json!({
        "error": cause.to_string(),
    });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
}
