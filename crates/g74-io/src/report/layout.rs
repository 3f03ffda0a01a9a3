//! Field layout of breaker duty report lines.
//!
//! Each line type maps report fields to positional token indices. Positions are
//! a contract with the engine's output format; the parser only consults this
//! table and never special-cases a field.

use serde::Serialize;

/// Marker that precedes the first bus section of a report
pub const START_MARKER: &str = "FAULTED BUS";

/// A raw field read from a report line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ReportField {
    /// Initial symmetrical current Ik''
    IkInitial,
    /// Symmetrical breaking current
    IbSym,
    /// DC component from the sum of contributing DC components
    DcSum,
    /// Asymmetrical breaking current from the sum of DC components
    IbAsymSum,
    /// Peak make current from the sum of DC components
    IpSum,
    /// Thevenin resistance (p.u. on system base)
    R,
    /// Thevenin reactance (p.u. on system base)
    X,
    /// Pre-fault voltage (p.u.)
    VPrefault,
    /// DC component from the Thevenin X/R ratio
    DcXOverR,
    /// Asymmetrical breaking current from the Thevenin X/R ratio
    IbAsymXOverR,
    /// Peak make current from the Thevenin X/R ratio
    IpXOverR,
}

impl ReportField {
    pub fn name(self) -> &'static str {
        match self {
            ReportField::IkInitial => "Ik''",
            ReportField::IbSym => "Ib sym",
            ReportField::DcSum => "DC sum of DC",
            ReportField::IbAsymSum => "Ib asym sum of DC",
            ReportField::IpSum => "Ip sum of DC",
            ReportField::R => "R",
            ReportField::X => "X",
            ReportField::VPrefault => "V pre-fault",
            ReportField::DcXOverR => "DC X/R method",
            ReportField::IbAsymXOverR => "Ib asym X/R method",
            ReportField::IpXOverR => "Ip X/R method",
        }
    }
}

/// Where a field sits on its line and whether it is a current to convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub field: ReportField,
    pub position: usize,
    /// Divide by the current unit divisor
    pub scaled: bool,
}

const fn col(field: ReportField, position: usize, scaled: bool) -> Column {
    Column {
        field,
        position,
        scaled,
    }
}

const FAULT_CURRENT_COLUMNS: [Column; 5] = [
    col(ReportField::IkInitial, 0, true),
    col(ReportField::IbSym, 2, true),
    col(ReportField::DcSum, 4, true),
    col(ReportField::IbAsymSum, 5, true),
    col(ReportField::IpSum, 6, true),
];

const THEVENIN_IMPEDANCE_COLUMNS: [Column; 6] = [
    col(ReportField::R, 0, false),
    col(ReportField::X, 1, false),
    col(ReportField::VPrefault, 2, false),
    col(ReportField::DcXOverR, 4, true),
    col(ReportField::IbAsymXOverR, 5, true),
    col(ReportField::IpXOverR, 6, true),
];

/// Data line types inside a bus section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineType {
    FaultCurrent,
    TheveninImpedance,
}

impl LineType {
    pub const ALL: [LineType; 2] = [LineType::FaultCurrent, LineType::TheveninImpedance];

    /// Text that identifies the line type
    pub const fn marker(self) -> &'static str {
        match self {
            LineType::FaultCurrent => "FAULT CURRENT",
            LineType::TheveninImpedance => "THEVENIN IMPEDANCE",
        }
    }

    /// Number of numeric tokens a well-formed line carries
    pub const fn expected_len(self) -> usize {
        7
    }

    pub fn columns(self) -> &'static [Column] {
        match self {
            LineType::FaultCurrent => &FAULT_CURRENT_COLUMNS,
            LineType::TheveninImpedance => &THEVENIN_IMPEDANCE_COLUMNS,
        }
    }

    /// Thevenin impedance closes a bus section
    pub const fn ends_section(self) -> bool {
        matches!(self, LineType::TheveninImpedance)
    }

    pub fn detect(line: &str) -> Option<LineType> {
        Self::ALL.into_iter().find(|t| line.contains(t.marker()))
    }
}
