//! Strata CLI - Command-line interface for the Strata migration generator.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use strata_cli::cli::{Cli, Command};
use strata_cli::commands;
use strata_cli::error::CliResult;
use strata_cli::output;

#[tokio::main]
async fn main() {
    // Run the CLI and handle errors
    if let Err(e) = run().await {
        output::newline();
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    // Parse CLI arguments
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Run the appropriate command
    match cli.command {
        Command::Init(args) => commands::init::run(args).await,
        Command::Diff(args) => commands::diff::run(args).await,
        Command::Generate(args) => commands::generate::run(args).await,
        Command::Create(args) => commands::create::run(args).await,
        Command::Validate(args) => commands::validate::run(args).await,
        Command::Up(args) => commands::migrate::run_up(args).await,
        Command::Down(args) => commands::migrate::run_down(args).await,
        Command::Status => commands::status::run().await,
        Command::History => commands::history::run().await,
    }
}

/// Log to stderr; `RUST_LOG` overrides the level chosen by `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
