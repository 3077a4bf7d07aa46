use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use tower::ServiceExt;

use super::common::*;
use crate::workflows::diagnostic::domain::DiagnosticSubmission;
use crate::workflows::diagnostic::{diagnostic_router, DiagnosticService};

fn post_submission(submission: &DiagnosticSubmission) -> Request<Body> {
    Request::post("/api/v1/diagnostics")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::to_vec(submission).expect("serialize submission"),
        ))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request")
}

fn app() -> Router {
    let (service, _repository, _notifier) = build_service();
    router_with_service(service)
}

#[tokio::test]
async fn submit_route_scores_and_returns_status() {
    let response = app()
        .oneshot(post_submission(&submission()))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "SCORED");
    assert_eq!(payload["definition_key"], "maths-premiere-p2");
    assert_eq!(payload["recommendation"], "Pallier2_confirmed");
    assert_eq!(payload["readiness_score"], 75);
    assert_eq!(payload["trust_level"], "green");
}

#[tokio::test]
async fn repeated_submission_is_flagged_as_duplicate() {
    let router = app();

    let first = router
        .clone()
        .oneshot(post_submission(&submission()))
        .await
        .expect("first response");
    assert_eq!(first.status(), StatusCode::ACCEPTED);
    let first = read_json_body(first).await;

    let second = router
        .oneshot(post_submission(&submission()))
        .await
        .expect("second response");
    assert_eq!(second.status(), StatusCode::OK);
    let second = read_json_body(second).await;
    assert_eq!(second["duplicate"], true);
    assert_eq!(
        second["diagnostic"]["diagnostic_id"],
        first["diagnostic_id"]
    );
}

#[tokio::test]
async fn invalid_submission_is_unprocessable() {
    let mut invalid = submission();
    invalid.identity.phone = "12".to_string();

    let response = app()
        .oneshot(post_submission(&invalid))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload["error"],
        "identity field phone is missing or malformed"
    );
}

#[tokio::test]
async fn unknown_definition_is_unprocessable() {
    let mut unknown = submission();
    unknown.definition_key = Some("physique-terminale-p2".to_string());

    let response = app()
        .oneshot(post_submission(&unknown))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload["error"],
        "unknown diagnostic definition 'physique-terminale-p2'"
    );
}

#[tokio::test]
async fn conflicting_insert_returns_conflict() {
    let service = DiagnosticService::new(
        registry(),
        Arc::new(ConflictRepository),
        Arc::new(MemoryNotifier::default()),
    );
    let router = diagnostic_router(Arc::new(service));

    let response = router
        .oneshot(post_submission(&submission()))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "diagnostic already exists");
}

#[tokio::test]
async fn repository_outage_is_internal_error() {
    let service = DiagnosticService::new(
        registry(),
        Arc::new(UnavailableRepository),
        Arc::new(MemoryNotifier::default()),
    );
    let router = diagnostic_router(Arc::new(service));

    let response = router
        .oneshot(post_submission(&submission()))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "repository unavailable: database offline");
}

#[tokio::test]
async fn malformed_json_is_rejected_by_extractor() {
    let request = Request::post("/api/v1/diagnostics")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"identity": {}}"#))
        .expect("request");

    let response = app().oneshot(request).await.expect("router response");
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn status_route_reports_missing_diagnostic() {
    let response = app()
        .oneshot(get("/api/v1/diagnostics/diag-unknown"))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert_eq!(payload["diagnostic_id"], "diag-unknown");
    assert_eq!(payload["error"], "diagnostic not found");
}

#[tokio::test]
async fn status_route_returns_stored_view() {
    let (service, _repository, _notifier) = build_service();
    let receipt = service.submit(submission()).expect("stored");
    let id = receipt.record.id().0.clone();
    let router = router_with_service(service);

    let response = router
        .oneshot(get(&format!("/api/v1/diagnostics/{id}")))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["diagnostic_id"], id.as_str());
    assert_eq!(payload["status"], "VALIDATED");
    assert!(payload.get("readiness_score").is_none());
}

#[tokio::test]
async fn report_route_serves_markdown_once_scored() {
    let (service, _repository, _notifier) = build_service();
    let pending = service.submit(struggling_submission()).expect("stored");
    let scored = service.submit_and_score(submission()).expect("scored");
    let pending_id = pending.record.id().0.clone();
    let scored_id = scored.record.id().0.clone();
    let router = router_with_service(service);

    let response = router
        .clone()
        .oneshot(get(&format!("/api/v1/diagnostics/{pending_id}/report")))
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = router
        .oneshot(get(&format!("/api/v1/diagnostics/{scored_id}/report")))
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("text/markdown; charset=utf-8")
    );
    let report = read_text_body(response).await;
    assert!(report.contains("# Fiche pédagogique"));
    assert!(report.contains("Inès Haddad"));
}
