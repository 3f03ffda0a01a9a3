use std::io::Write;
use std::time::Instant;

use anyhow::{Context, Result};
use g74_algo::{StudyConfig, StudyRequest, TransientStudyRunner};
use g74_cli::cli::FaultArgs;
use g74_cli::common::{load_case, write_json, OutputDest, OutputFormat};
use g74_core::{BusId, FaultStudyResult, Seconds};
use g74_io::{export, CaseSnapshot, CommandEngine};
use tabwriter::TabWriter;
use tracing::{info, warn};

pub fn handle(args: &FaultArgs, config: &StudyConfig) -> Result<()> {
    let start = Instant::now();
    let network = load_case(&args.case)?;
    info!("Loaded case {}: {}", args.case.display(), network.stats());

    let mut engine =
        CommandEngine::new(network, args.engine.clone()).with_args(args.engine_args.iter().cloned());
    if args.keep_reports {
        engine = engine.keep_cases();
    }
    let mut runner = TransientStudyRunner::new(engine, config.clone());

    let times = args.times.iter().map(|&t| Seconds(t)).collect();
    let mut request = StudyRequest::new(times, &args.work_dir)
        .with_hv_buses(args.hv_buses.iter().map(|&b| BusId::new(b)));
    if !args.buses.is_empty() {
        request = request.with_buses(args.buses.iter().map(|&b| BusId::new(b)).collect());
    }
    if args.keep_reports {
        request = request.keep_reports();
    }

    let result = runner.run(&request).context("running fault study")?;

    let dest = OutputDest::parse(&args.out);
    let mut writer = dest.writer()?;
    match args.format {
        OutputFormat::Table => write_table(&result, &mut writer)?,
        OutputFormat::Csv => export::write_csv(&result, &mut writer).context("writing CSV")?,
        OutputFormat::Json => write_json(&result, &mut writer)?,
    }
    writer.flush()?;

    if let Some(path) = &args.save_case {
        CaseSnapshot::from_network(runner.engine().network())
            .write_json(path)
            .with_context(|| format!("saving case {}", path.display()))?;
        info!("Saved case with equivalent machines to {}", path.display());
    }

    if result.diagnostics.has_issues() {
        warn!("Study finished with {}", result.diagnostics.summary());
    }
    info!(
        "Fault study of {} buses at {} fault times completed in {:.2} s",
        result.rows.len(),
        result.fault_times.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn write_table(result: &FaultStudyResult, writer: impl Write) -> Result<()> {
    let mut tw = TabWriter::new(writer);
    writeln!(tw, "{}", export::headers(result).join("\t"))?;
    for row in &result.rows {
        let mut cells = vec![
            row.bus.to_string(),
            row.name.clone(),
            format!("{:.1}", row.nominal_kv.value()),
            format!("{:.3}", row.prefault_pu.value()),
        ];
        for series in &row.series {
            cells.extend(series.values.iter().map(|v| {
                if v.unreliable {
                    format!("{:.3}*", v.value)
                } else {
                    format!("{:.3}", v.value)
                }
            }));
        }
        cells.push(if result.is_unreliable(row.bus) { "yes" } else { "" }.to_string());
        writeln!(tw, "{}", cells.join("\t"))?;
    }
    tw.flush()?;
    Ok(())
}
