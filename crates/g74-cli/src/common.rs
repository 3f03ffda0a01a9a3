//! Shared CLI types and helpers.

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use g74_algo::StudyConfig;
use g74_core::{Diagnostics, Network};
use g74_io::load_network;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Output format for result tables.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable aligned table
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
    /// Comma-separated values
    Csv,
}

/// Output destination that can be a file path or stdout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputDest {
    File(PathBuf),
    /// Specified as "-"
    Stdout,
}

impl OutputDest {
    pub fn parse(s: &str) -> Self {
        if s == "-" {
            Self::Stdout
        } else {
            Self::File(PathBuf::from(s))
        }
    }

    pub fn writer(&self) -> Result<Box<dyn Write>> {
        match self {
            Self::Stdout => Ok(Box::new(io::stdout())),
            Self::File(path) => {
                let file = File::create(path)
                    .with_context(|| format!("creating output file {}", path.display()))?;
                Ok(Box::new(BufWriter::new(file)))
            }
        }
    }
}

/// Configuration from `--config`, or the defaults.
pub fn load_config(path: Option<&Path>) -> Result<StudyConfig> {
    match path {
        Some(path) => StudyConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(StudyConfig::default()),
    }
}

/// Load a case snapshot and reject models a study cannot run on.
///
/// Validation warnings are logged; any validation error fails the load.
pub fn load_case(path: &Path) -> Result<Network> {
    let network =
        load_network(path).with_context(|| format!("loading case {}", path.display()))?;

    let mut diag = Diagnostics::new();
    network.validate_into(&mut diag);
    for issue in diag.warnings() {
        warn!("{}", issue);
    }
    if diag.error_count() > 0 {
        let problems: Vec<String> = diag.errors().map(|i| i.to_string()).collect();
        bail!("case {} is not usable: {}", path.display(), problems.join("; "));
    }
    Ok(network)
}

pub fn write_json<T: Serialize>(value: &T, mut writer: impl Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, value).context("serializing JSON output")?;
    writeln!(writer)?;
    Ok(())
}

/// Format an optional float cell
pub fn cell(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{:.*}", precision, v))
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_dest_parse() {
        assert_eq!(OutputDest::parse("-"), OutputDest::Stdout);
        assert_eq!(
            OutputDest::parse("out.csv"),
            OutputDest::File(PathBuf::from("out.csv"))
        );
    }

    #[test]
    fn test_cell() {
        assert_eq!(cell(Some(1.23456), 3), "1.235");
        assert_eq!(cell(None, 3), "-");
    }

    #[test]
    fn test_load_case_rejects_dangling_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("case.json");
        std::fs::write(
            &path,
            r#"{
                "buses": [{ "id": 1, "name": "A", "base_kv": 11.0, "voltage_pu": 1.0 }],
                "loads": [{ "id": 1, "bus": 7, "apparent_power": 2.0 }]
            }"#,
        )
        .unwrap();

        let err = load_case(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Load references missing bus 7"));
    }

    #[test]
    fn test_default_config_without_path() {
        assert_eq!(load_config(None).unwrap(), StudyConfig::default());
    }
}
