use crate::demo::{run_demo, DemoArgs};
use crate::infra::load_catalog;
use crate::server;
use case_sim::error::AppError;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Clinical Case Simulator",
    about = "Serve or demonstrate the clinical case simulation engine from the command line",
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
    /// Inspect the reference catalog
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },
    /// Play a scripted case end to end and print the transcript
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// Validate a catalog file (or the built-in catalog) and print a summary
    Check(CatalogCheckArgs),
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

#[derive(Args, Debug)]
struct CatalogCheckArgs {
    /// JSON catalog to validate; the built-in catalog is checked when omitted
    #[arg(long)]
    path: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Catalog {
            command: CatalogCommand::Check(args),
        } => check_catalog(args),
        Command::Demo(args) => run_demo(args).await,
    }
}

fn check_catalog(args: CatalogCheckArgs) -> Result<(), AppError> {
    let catalog = load_catalog(args.path.as_deref())?;
    let source = args
        .path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "built-in".to_string());

    println!("Catalog ({source}) is valid");
    println!("  Disorders:  {}", catalog.disorders().len());
    println!("  Treatments: {}", catalog.treatments().len());
    println!("  Tests:      {}", catalog.tests().len());
    for disorder in catalog.disorders() {
        println!(
            "  - {} ({}): {} symptoms, {} criteria",
            disorder.id,
            disorder.name,
            disorder.symptoms.len(),
            disorder.criteria_count
        );
    }
    Ok(())
}
