use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::diagnostic::{DefinitionError, DiagnosticServiceError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Definition(DefinitionError),
    Json(serde_json::Error),
    Diagnostic(DiagnosticServiceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Definition(err) => write!(f, "definition error: {}", err),
            AppError::Json(err) => write!(f, "invalid questionnaire payload: {}", err),
            AppError::Diagnostic(err) => write!(f, "diagnostic error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Definition(err) => Some(err),
            AppError::Json(err) => Some(err),
            AppError::Diagnostic(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Json(_) | AppError::Definition(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Diagnostic(DiagnosticServiceError::Intake(_))
            | AppError::Diagnostic(DiagnosticServiceError::UnknownDefinition(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Diagnostic(DiagnosticServiceError::NotScored(_)) => StatusCode::NOT_FOUND,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Diagnostic(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<DefinitionError> for AppError {
    fn from(value: DefinitionError) -> Self {
        Self::Definition(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<DiagnosticServiceError> for AppError {
    fn from(value: DiagnosticServiceError) -> Self {
        Self::Diagnostic(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::diagnostic::{DiagnosticId, IntakeViolation};

    #[test]
    fn intake_errors_are_unprocessable() {
        let err: AppError =
            DiagnosticServiceError::Intake(IntakeViolation::MiniTestOutOfRange(9)).into();
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn unscored_reports_are_not_found() {
        let err: AppError =
            DiagnosticServiceError::NotScored(DiagnosticId("diag-000042".to_string())).into();
        assert!(err.to_string().contains("diag-000042"));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn infrastructure_errors_are_internal() {
        let err: AppError = ConfigError::InvalidPort.into();
        assert_eq!(err.to_string(), "configuration error: APP_PORT must be a valid u16");
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
