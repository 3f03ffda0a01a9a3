//! Breaker duty report parsing.
//!
//! The external engine writes one text report per fault time. After a
//! [`START_MARKER`] line, each faulted bus is a section: a line carrying the bus
//! number, a `FAULT CURRENT` line and a `THEVENIN IMPEDANCE` line that closes the
//! section.
//!
//! ```text
//!  FAULTED BUS   ...
//!    1301 [SUBSTN A    33.000]
//!   FAULT CURRENT   9450.3  -80.25   8123.4  -80.11   1520.7   8264.6  23010.5
//!   THEVENIN IMPEDANCE  0.01234  0.12345  1.0000  10.00   1480.2   8255.1  22874.9
//! ```
//!
//! Overflowed values (`*********`, `Infinity`, `NaN`) read as 0.0 and are recorded
//! on the bus record so callers can flag the bus instead of trusting the zero.

pub mod artifact;
pub mod layout;
pub mod tokens;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use g74_core::{
    BusId, CurrentUnit, DiagnosticIssue, Diagnostics, G74Error, G74Result, Seconds, Severity,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

pub use artifact::BreakerDutyReport;
pub use layout::{Column, LineType, ReportField, START_MARKER};
pub use tokens::{extract_values, has_overflow_marker, ExtractedValues};

static BUS_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("bus number pattern"));

/// Raw values for one faulted bus.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportRecord {
    pub values: BTreeMap<ReportField, f64>,
    /// Fields read from an overflow token or missing from a short line
    pub overflowed: BTreeSet<ReportField>,
}

impl ReportRecord {
    /// Field value, 0.0 when the report did not carry it
    pub fn get(&self, field: ReportField) -> f64 {
        self.values.get(&field).copied().unwrap_or(0.0)
    }

    pub fn is_overflowed(&self, field: ReportField) -> bool {
        self.overflowed.contains(&field)
    }

    /// Peak make current: the larger of the sum-of-DC and X/R methods.
    pub fn peak(&self) -> f64 {
        self.get(ReportField::IpSum).max(self.get(ReportField::IpXOverR))
    }

    /// DC component: the larger of the sum-of-DC and X/R methods.
    pub fn dc(&self) -> f64 {
        self.get(ReportField::DcSum).max(self.get(ReportField::DcXOverR))
    }

    /// Both peak methods overflowed, so [`Self::peak`] is not a real value
    pub fn peak_overflowed(&self) -> bool {
        self.is_overflowed(ReportField::IpSum) && self.is_overflowed(ReportField::IpXOverR)
    }

    /// Both DC methods overflowed, so [`Self::dc`] is not a real value
    pub fn dc_overflowed(&self) -> bool {
        self.is_overflowed(ReportField::DcSum) && self.is_overflowed(ReportField::DcXOverR)
    }

    /// True when any value overflowed or the Thevenin reactance is negative
    pub fn is_unreliable(&self) -> bool {
        !self.overflowed.is_empty() || self.has_negative_reactance()
    }

    pub fn has_negative_reactance(&self) -> bool {
        self.get(ReportField::X) < 0.0
    }
}

/// Parsed contents of one report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportTable {
    pub fault_time: Seconds,
    pub unit: CurrentUnit,
    pub records: BTreeMap<BusId, ReportRecord>,
    /// Overflow and negative reactance notices raised while parsing
    pub diagnostics: Diagnostics,
}

impl ReportTable {
    pub fn record(&self, bus: BusId) -> Option<&ReportRecord> {
        self.records.get(&bus)
    }

    pub fn buses(&self) -> impl Iterator<Item = BusId> + '_ {
        self.records.keys().copied()
    }

    /// Buses whose record cannot be trusted
    pub fn unreliable_buses(&self) -> BTreeSet<BusId> {
        self.records
            .iter()
            .filter(|(_, r)| r.is_unreliable())
            .map(|(bus, _)| *bus)
            .collect()
    }
}

/// Reads breaker duty reports into [`ReportTable`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportParser {
    unit: CurrentUnit,
}

impl ReportParser {
    pub fn new(unit: CurrentUnit) -> Self {
        Self { unit }
    }

    pub fn unit(&self) -> CurrentUnit {
        self.unit
    }

    pub fn parse_file(&self, path: &Path, fault_time: Seconds) -> G74Result<ReportTable> {
        // Reports may carry stray non-UTF-8 bytes from the engine's console encoding
        let bytes = fs::read(path)?;
        let content = String::from_utf8_lossy(&bytes);
        debug!(path = %path.display(), "parsing breaker duty report");
        self.parse_str(&content, fault_time)
    }

    pub fn parse_str(&self, content: &str, fault_time: Seconds) -> G74Result<ReportTable> {
        self.parse_lines(content.lines(), fault_time)
    }

    /// Parse report lines.
    ///
    /// Fails with [`G74Error::ReportFormat`] when a data line has the wrong token
    /// count and carries no overflow marker.
    pub fn parse_lines<'a, I>(&self, lines: I, fault_time: Seconds) -> G74Result<ReportTable>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut table = ReportTable {
            fault_time,
            unit: self.unit,
            records: BTreeMap::new(),
            diagnostics: Diagnostics::new(),
        };
        let mut started = false;
        let mut bus: Option<BusId> = None;

        for (idx, line) in lines.into_iter().enumerate() {
            let line_no = idx + 1;

            if line.contains(START_MARKER) {
                started = true;
                continue;
            }
            if !started {
                continue;
            }

            let Some(current) = bus else {
                if let Some(m) = BUS_NUMBER.find(line) {
                    let number: usize = m
                        .as_str()
                        .parse()
                        .map_err(|_| G74Error::Parse(format!("bus number at line {line_no}")))?;
                    // Bus 0 never names a faulted bus
                    if number != 0 {
                        bus = Some(BusId::new(number));
                    }
                }
                continue;
            };

            let Some(line_type) = LineType::detect(line) else {
                continue;
            };

            let extracted = extract_values(line);
            let tolerated = has_overflow_marker(line) || !extracted.overflowed.is_empty();
            if extracted.len() != line_type.expected_len() && !tolerated {
                return Err(G74Error::ReportFormat {
                    line: line_no,
                    expected: line_type.expected_len(),
                    found: extracted.len(),
                });
            }

            let record = table.records.entry(current).or_default();
            self.apply_columns(record, line_type, &extracted);

            if !extracted.overflowed.is_empty() || extracted.len() < line_type.expected_len() {
                warn!(
                    bus = current.value(),
                    line = line_no,
                    "overflow in {} line, affected values set to 0.0",
                    line_type.marker()
                );
                table.diagnostics.add(
                    DiagnosticIssue::new(
                        Severity::Warning,
                        "report",
                        format!("Overflow in {} line; values set to 0.0", line_type.marker()),
                    )
                    .with_line(line_no)
                    .with_entity(format!("Bus {}", current)),
                );
            }

            if line_type.ends_section() {
                if record.has_negative_reactance() {
                    warn!(
                        bus = current.value(),
                        x = record.get(ReportField::X),
                        "negative Thevenin reactance, results for this bus are unreliable"
                    );
                    table.diagnostics.add_warning_at_line(
                        "report",
                        &format!("Negative Thevenin reactance at bus {}", current),
                        line_no,
                    );
                }
                bus = None;
            }
        }

        debug!(
            buses = table.records.len(),
            fault_time = fault_time.value(),
            "report parsed"
        );
        Ok(table)
    }

    fn apply_columns(&self, record: &mut ReportRecord, line_type: LineType, extracted: &ExtractedValues) {
        for column in line_type.columns() {
            let raw = extracted.at(column.position);
            let value = if column.scaled {
                self.unit.convert_from_amps(raw)
            } else {
                raw
            };
            record.values.insert(column.field, value);
            if extracted.is_overflowed(column.position) || column.position >= extracted.len() {
                record.overflowed.insert(column.field);
            } else {
                record.overflowed.remove(&column.field);
            }
        }
    }
}
