use crate::commands::{run_definitions, run_score, run_ssn, ScoreArgs, SsnArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use nexus_diagnostics::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Nexus Diagnostics",
    about = "Score pre-stage diagnostics and serve the diagnostics API",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score a questionnaire JSON file and print the outcome
    Score(ScoreArgs),
    /// Compute a standardised score and optional projection
    Ssn(SsnArgs),
    /// List the diagnostic definitions available to the scorer
    Definitions,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Score(args) => run_score(args),
        Command::Ssn(args) => run_ssn(args),
        Command::Definitions => run_definitions(),
    }
}
