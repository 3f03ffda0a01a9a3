use clap::Parser;
use g74_cli::cli::{Cli, Commands};
use g74_cli::common::load_config;
use std::io;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG directives refine the --log-level default
    let filter = EnvFilter::builder()
        .with_default_directive(cli.log_level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let result = load_config(cli.config.as_deref()).and_then(|config| match &cli.command {
        Commands::Fault(args) => commands::fault::handle(args, &config),
        Commands::Infeed(args) => commands::infeed::handle(args, &config),
        Commands::ParseReport(args) => commands::parse_report::handle(args, &config),
        Commands::Config => commands::config::handle(&config),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
