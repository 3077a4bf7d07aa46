use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use nexus_diagnostics::workflows::diagnostic::{
    diagnostic_router, DiagnosticRepository, DiagnosticService, ScoringNotifier,
};
use nexus_diagnostics::workflows::ssn::projection::{self, PredictionResult};
use nexus_diagnostics::workflows::ssn::{
    compute_percentile, compute_ssn, raw_composite, CohortStats, SsnComponents, SsnResult,
    SsnWeights,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct SsnRequest {
    pub(crate) disciplinary: f64,
    #[serde(default)]
    pub(crate) methodology: Option<f64>,
    #[serde(default)]
    pub(crate) rigor: Option<f64>,
    /// Raw composites of the comparison cohort.
    #[serde(default)]
    pub(crate) cohort: Vec<f64>,
    /// Earlier SSN values, oldest first.
    #[serde(default)]
    pub(crate) history: Vec<f64>,
    #[serde(default)]
    pub(crate) weekly_hours: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SsnReport {
    pub(crate) result: SsnResult,
    pub(crate) percentile: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) projection: Option<PredictionResult>,
}

pub(crate) fn with_diagnostic_routes<R, N>(service: Arc<DiagnosticService<R, N>>) -> axum::Router
where
    R: DiagnosticRepository + 'static,
    N: ScoringNotifier + 'static,
{
    diagnostic_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/ssn", axum::routing::post(ssn_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn ssn_endpoint(Json(payload): Json<SsnRequest>) -> impl IntoResponse {
    let out_of_range = [Some(payload.disciplinary), payload.methodology, payload.rigor]
        .into_iter()
        .flatten()
        .any(|score| !(0.0..=100.0).contains(&score));
    if out_of_range {
        let body = json!({ "error": "component scores must lie within 0..=100" });
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response();
    }

    (StatusCode::OK, Json(build_ssn_report(payload))).into_response()
}

/// Standardise against the cohort, then project from the history extended with the new SSN.
pub(crate) fn build_ssn_report(request: SsnRequest) -> SsnReport {
    let components = SsnComponents::new(request.disciplinary, request.methodology, request.rigor);
    let cohort = CohortStats::from_scores(&request.cohort);
    let result = compute_ssn(components, cohort);
    let percentile = compute_percentile(
        raw_composite(&components, &SsnWeights::default()),
        &request.cohort,
    );

    let mut history = request.history;
    history.push(f64::from(result.ssn));
    let projection = if history.len() > 1 {
        projection::predict(&history, request.weekly_hours, request.methodology)
    } else {
        None
    };

    SsnReport {
        result,
        percentile,
        projection,
    }
}
