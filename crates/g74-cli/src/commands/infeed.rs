use std::collections::BTreeSet;
use std::io::{self, Write};

use anyhow::{Context, Result};
use g74_algo::{EquivalentMachine, InfeedModel, StudyConfig};
use g74_cli::cli::InfeedArgs;
use g74_cli::common::{load_case, write_json, OutputFormat};
use g74_core::{BusId, Diagnostics, Seconds};
use tabwriter::TabWriter;
use tracing::warn;

pub fn handle(args: &InfeedArgs, config: &StudyConfig) -> Result<()> {
    config.validate().context("invalid study configuration")?;
    let network = load_case(&args.case)?;

    let hv_buses: BTreeSet<BusId> = args.hv_buses.iter().map(|&b| BusId::new(b)).collect();
    let mut diagnostics = Diagnostics::new();
    let mut infeed = InfeedModel::from_model(&network, config, &hv_buses, &mut diagnostics);
    infeed.update(Seconds(args.time));

    let machines: Vec<&EquivalentMachine> = infeed.machines().collect();
    let stdout = io::stdout();
    match args.format {
        OutputFormat::Json => write_json(&machines, stdout.lock())?,
        OutputFormat::Table | OutputFormat::Csv => {
            let separator = if args.format == OutputFormat::Csv { "," } else { "\t" };
            write_machines(&machines, separator, stdout.lock())?
        }
    }

    for issue in diagnostics.warnings() {
        warn!("{}", issue);
    }
    Ok(())
}

fn write_machines(machines: &[&EquivalentMachine], separator: &str, writer: impl Write) -> Result<()> {
    let mut tw = TabWriter::new(writer);
    let header = [
        "Bus", "Tier", "HV", "Load (MVA)", "Nominal (kV)", "MBASE", "R", "X''", "TX R", "TX X",
    ];
    writeln!(tw, "{}", header.join(separator))?;
    for m in machines {
        let cells = [
            m.bus.to_string(),
            m.tier.to_string(),
            if m.hv_connected { "yes" } else { "no" }.to_string(),
            format!("{:.3}", m.connected_load.value()),
            format!("{:.1}", m.nominal_kv.value()),
            format!("{:.3}", m.mbase.value()),
            format!("{:.5}", m.r_positive),
            format!("{:.5}", m.x_subtransient),
            format!("{:.3}", m.transformer_r),
            format!("{:.3}", m.transformer_x),
        ];
        writeln!(tw, "{}", cells.join(separator))?;
    }
    tw.flush()?;
    Ok(())
}
