use crate::infra::{load_registry, parse_score, InMemoryDiagnosticRepository, LoggingNotifier};
use crate::routes::{build_ssn_report, SsnReport, SsnRequest};
use clap::Args;
use nexus_diagnostics::config::AppConfig;
use nexus_diagnostics::error::AppError;
use nexus_diagnostics::workflows::diagnostic::{
    render::domain_label, DiagnosticService, DiagnosticSubmission, ScoringOutcome,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Questionnaire payload as posted by the pre-stage form (JSON)
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Score against this definition key instead of the one in the payload
    #[arg(long)]
    pub(crate) definition: Option<String>,
    /// Print the staff Markdown report instead of the JSON outcome
    #[arg(long)]
    pub(crate) report: bool,
}

#[derive(Args, Debug)]
pub(crate) struct SsnArgs {
    /// Disciplinary score on a 0-100 scale
    #[arg(long, value_parser = parse_score)]
    pub(crate) disciplinary: f64,
    /// Methodology score (neutral 50 when omitted)
    #[arg(long, value_parser = parse_score)]
    pub(crate) methodology: Option<f64>,
    /// Rigor score (neutral 50 when omitted)
    #[arg(long, value_parser = parse_score)]
    pub(crate) rigor: Option<f64>,
    /// Raw composite of a cohort member; repeat for each student
    #[arg(long, value_parser = parse_score)]
    pub(crate) cohort: Vec<f64>,
    /// Earlier SSN values, oldest first; repeat for each assessment
    #[arg(long, value_parser = parse_score)]
    pub(crate) history: Vec<f64>,
    /// Weekly hours of personal work used by the projection
    #[arg(long)]
    pub(crate) weekly_hours: Option<f64>,
    /// Print JSON instead of a text summary
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs {
        input,
        definition,
        report,
    } = args;

    let raw = std::fs::read_to_string(&input)?;
    let mut submission: DiagnosticSubmission = serde_json::from_str(&raw)?;
    if let Some(key) = definition {
        submission.definition_key = Some(key);
    }

    let config = AppConfig::load()?;
    let registry = load_registry(&config.definitions)?;
    let service = DiagnosticService::new(
        Arc::new(registry),
        Arc::new(InMemoryDiagnosticRepository::default()),
        Arc::new(LoggingNotifier::default()),
    );

    let receipt = service.submit_and_score(submission)?;
    if report {
        println!("{}", service.staff_report(receipt.record.id())?);
        return Ok(());
    }

    match receipt.record.outcome.as_ref() {
        Some(outcome) => {
            println!("{}", serde_json::to_string_pretty(outcome)?);
            eprintln!("{}", outcome_summary(outcome));
        }
        None => eprintln!(
            "diagnostic {} stored without outcome ({})",
            receipt.record.id(),
            receipt.record.status.label()
        ),
    }
    Ok(())
}

pub(crate) fn run_ssn(args: SsnArgs) -> Result<(), AppError> {
    let json = args.json;
    let report = build_ssn_report(SsnRequest {
        disciplinary: args.disciplinary,
        methodology: args.methodology,
        rigor: args.rigor,
        cohort: args.cohort,
        history: args.history,
        weekly_hours: args.weekly_hours,
    });

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_ssn_report(&report));
    }
    Ok(())
}

pub(crate) fn run_definitions() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let registry = load_registry(&config.definitions)?;

    println!("Diagnostic definitions ({})", registry.len());
    for key in registry.keys() {
        if let Some(definition) = registry.get(key) {
            println!(
                "- {key} [{}] {} : {} chapitres",
                definition.version,
                definition.label,
                definition.chapters.len()
            );
        }
    }
    Ok(())
}

fn outcome_summary(outcome: &ScoringOutcome) -> String {
    let weakest = outcome
        .domain_scores
        .iter()
        .filter(|ds| ds.is_active())
        .min_by_key(|ds| ds.score)
        .map(|ds| format!("{} ({}%)", domain_label(&ds.domain), ds.score))
        .unwrap_or_else(|| "-".to_string());

    format!(
        "readiness {}/100, risk {}/100, {} (trust {} {}), weakest domain: {weakest}",
        outcome.readiness_score,
        outcome.risk_index,
        outcome.recommendation.label(),
        outcome.trust_score,
        outcome.trust_level.label()
    )
}

fn render_ssn_report(report: &SsnReport) -> String {
    let mut lines = vec![
        format!(
            "SSN {}/100 ({}) from raw composite {:.1}",
            report.result.ssn,
            report.result.level.label(),
            report.result.raw_composite
        ),
        format!(
            "Cohort: {} student(s), mean {:.1}, std {:.1}, percentile {}",
            report.result.cohort.sample_size,
            report.result.cohort.mean,
            report.result.cohort.std,
            report.percentile
        ),
    ];

    match &report.projection {
        Some(projection) => lines.push(format!(
            "Projection ({}): {:.1} with {}% confidence",
            projection.model_version, projection.ssn_projected, projection.confidence
        )),
        None => lines.push("Projection: no history".to_string()),
    }

    let mut rendered = lines.join("\n");
    rendered.push('\n');
    rendered
}
