//! Export of the combined study result.
//!
//! CSV has one row per bus. Columns are the busbar data followed by each fault
//! time's fields, then an unreliable flag.

use std::io::Write;

use g74_core::{FaultStudyResult, G74Error, G74Result};

/// Header of a fault time column, e.g. `0.06 s | Ib sym (kA)`
pub fn column_header(fault_time: f64, label: &str) -> String {
    format!("{} s | {}", fault_time, label)
}

/// All CSV header cells in order
pub fn headers(result: &FaultStudyResult) -> Vec<String> {
    let mut headers = vec![
        "Bus".to_string(),
        "Name".to_string(),
        "Nominal (kV)".to_string(),
        "Pre-fault Voltage (p.u.)".to_string(),
    ];
    headers.extend(
        result
            .columns()
            .into_iter()
            .map(|(t, field)| column_header(t.value(), &field.label(result.unit))),
    );
    headers.push("Unreliable".to_string());
    headers
}

pub fn write_csv<W: Write>(result: &FaultStudyResult, writer: W) -> G74Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(headers(result)).map_err(csv_error)?;

    for row in &result.rows {
        let mut record = vec![
            row.bus.to_string(),
            row.name.clone(),
            format!("{:.3}", row.nominal_kv.value()),
            format!("{:.4}", row.prefault_pu.value()),
        ];
        for series in &row.series {
            record.extend(series.values.iter().map(|v| format!("{:.4}", v.value)));
        }
        record.push(result.is_unreliable(row.bus).to_string());
        wtr.write_record(&record).map_err(csv_error)?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(result: &FaultStudyResult, writer: W) -> G74Result<()> {
    serde_json::to_writer_pretty(writer, result)
        .map_err(|e| G74Error::Parse(format!("serializing result: {e}")))
}

fn csv_error(err: csv::Error) -> G74Error {
    G74Error::Parse(format!("writing CSV: {err}"))
}
