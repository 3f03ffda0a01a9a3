use std::io::{self, Write};

use anyhow::{Context, Result};
use g74_algo::StudyConfig;
use g74_cli::cli::ParseReportArgs;
use g74_cli::common::{cell, write_json, OutputFormat};
use g74_core::Seconds;
use g74_io::report::{ReportField, ReportParser, ReportRecord, ReportTable};
use tabwriter::TabWriter;
use tracing::{info, warn};

pub fn handle(args: &ParseReportArgs, config: &StudyConfig) -> Result<()> {
    let parser = ReportParser::new(config.report.current_unit);
    let table = parser
        .parse_file(&args.report, Seconds(args.fault_time))
        .with_context(|| format!("parsing report {}", args.report.display()))?;
    info!(
        "Parsed {} buses from {}",
        table.records.len(),
        args.report.display()
    );

    let stdout = io::stdout();
    match args.format {
        OutputFormat::Json => write_json(&table, stdout.lock())?,
        OutputFormat::Table => write_records(&table, "\t", stdout.lock())?,
        OutputFormat::Csv => write_records(&table, ",", stdout.lock())?,
    }

    let unreliable = table.unreliable_buses();
    if !unreliable.is_empty() {
        let list: Vec<String> = unreliable.iter().map(|b| b.to_string()).collect();
        warn!("Unreliable results at buses {}", list.join(", "));
    }
    Ok(())
}

fn write_records(table: &ReportTable, separator: &str, writer: impl Write) -> Result<()> {
    let unit = table.unit.label();
    let mut tw = TabWriter::new(writer);
    let header = [
        "Bus".to_string(),
        format!("Ik'' ({unit})"),
        format!("Ib sym ({unit})"),
        format!("DC ({unit})"),
        format!("Ip ({unit})"),
        "R".to_string(),
        "X".to_string(),
        "Unreliable".to_string(),
    ];
    writeln!(tw, "{}", header.join(separator))?;
    for (bus, record) in &table.records {
        let cells = [
            bus.to_string(),
            cell(raw(record, ReportField::IkInitial), 4),
            cell(raw(record, ReportField::IbSym), 4),
            format!("{:.4}", record.dc()),
            format!("{:.4}", record.peak()),
            cell(raw(record, ReportField::R), 5),
            cell(raw(record, ReportField::X), 5),
            if record.is_unreliable() { "yes" } else { "" }.to_string(),
        ];
        writeln!(tw, "{}", cells.join(separator))?;
    }
    tw.flush()?;
    Ok(())
}

/// Value as read, `None` when the report did not carry the field
fn raw(record: &ReportRecord, field: ReportField) -> Option<f64> {
    record.values.get(&field).copied()
}
