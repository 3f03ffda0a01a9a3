use clap::{Args, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

use crate::common::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "g74", author, version, about = "Breaker duty studies with embedded load fault infeed", long_about = None)]
pub struct Cli {
    /// Set the logging level (RUST_LOG directives take precedence)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    /// Study configuration (TOML); defaults to the infeed standard's values
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a two-pass transient fault study through an external engine
    Fault(FaultArgs),
    /// Show the equivalent machines a case gets at a fault time
    Infeed(InfeedArgs),
    /// Parse a single breaker duty report
    ParseReport(ParseReportArgs),
    /// Print the effective study configuration as TOML
    Config,
}

#[derive(Args, Debug)]
pub struct FaultArgs {
    /// JSON case snapshot of the network model
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub case: PathBuf,
    /// Engine executable that runs one breaker duty calculation
    #[arg(long, value_hint = ValueHint::ExecutablePath)]
    pub engine: PathBuf,
    /// Extra argument passed to the engine before the request arguments (repeatable)
    #[arg(long = "engine-arg", allow_hyphen_values = true)]
    pub engine_args: Vec<String>,
    /// Fault clearance times in seconds, comma separated
    #[arg(long, value_delimiter = ',', required = true)]
    pub times: Vec<f64>,
    /// Buses to fault, comma separated (default: every bus)
    #[arg(long, value_delimiter = ',')]
    pub buses: Vec<usize>,
    /// Buses whose load is connected at HV, comma separated
    #[arg(long, value_delimiter = ',')]
    pub hv_buses: Vec<usize>,
    /// Directory engine reports are written to
    #[arg(long, default_value = "g74-work", value_hint = ValueHint::DirPath)]
    pub work_dir: PathBuf,
    /// Keep report files and engine case snapshots after the study
    #[arg(long)]
    pub keep_reports: bool,
    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
    /// Output path ("-" for stdout)
    #[arg(short, long, default_value = "-")]
    pub out: String,
    /// Save the model, including equivalent machines, as a case snapshot
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub save_case: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct InfeedArgs {
    /// JSON case snapshot of the network model
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub case: PathBuf,
    /// Fault time in seconds
    #[arg(long, default_value_t = 0.0)]
    pub time: f64,
    /// Buses whose load is connected at HV, comma separated
    #[arg(long, value_delimiter = ',')]
    pub hv_buses: Vec<usize>,
    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct ParseReportArgs {
    /// Report file written by the engine
    #[arg(value_hint = ValueHint::FilePath)]
    pub report: PathBuf,
    /// Fault time the report was produced for, in seconds
    #[arg(long, default_value_t = 0.0)]
    pub fault_time: f64,
    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_fault_arguments() {
        let cli = Cli::parse_from([
            "g74", "fault", "--case", "case.json", "--engine", "bkdy", "--times", "0.06,0.1",
            "--buses", "1301,1302", "--engine-arg", "--quiet",
        ]);
        match cli.command {
            Commands::Fault(args) => {
                assert_eq!(args.times, vec![0.06, 0.1]);
                assert_eq!(args.buses, vec![1301, 1302]);
                assert_eq!(args.engine_args, vec!["--quiet".to_string()]);
                assert!(!args.keep_reports);
                assert_eq!(args.format, OutputFormat::Table);
                assert_eq!(args.out, "-");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
