use crate::report::{run_evaluate, run_requirements, EvaluateArgs, RequirementsArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use visa_eval::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Visa Eligibility Evaluator",
    about = "Evaluate visa applications and serve the eligibility API from the command line",
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
    /// Evaluate one application read from a JSON file and print the decision
    Evaluate(EvaluateArgs),
    /// List the documents an applicant must submit for a visa track
    Requirements(RequirementsArgs),
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
        Command::Evaluate(args) => run_evaluate(args),
        Command::Requirements(args) => run_requirements(args),
    }
}
