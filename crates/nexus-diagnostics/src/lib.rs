//! Diagnostic scoring and readiness classification for the Nexus tutoring platform.
//!
//! The [`workflows::diagnostic`] pipeline validates a pre-stage questionnaire, scores it
//! against a versioned [`workflows::diagnostic::DiagnosticDefinition`] and exposes the
//! outcome through a repository-backed service and an axum router. The
//! [`workflows::ssn`] module standardises headline scores against a cohort.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
