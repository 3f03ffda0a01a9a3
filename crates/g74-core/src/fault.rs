//! Combined result of a breaker duty study.
//!
//! One [`BusResult`] per faulted busbar, each holding one [`FaultTimeSeries`]
//! per requested fault clearance time. Which fields a series exposes depends on
//! how its fault time is classified (see [`FaultTimeClass::fields`]).

use std::collections::BTreeSet;

use serde::Serialize;

use crate::diagnostics::Diagnostics;
use crate::units::{CurrentUnit, Kilovolts, PerUnit, Seconds};
use crate::BusId;

/// Classification of a fault clearance time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultTimeClass {
    /// Fault inception (the minimal fault time)
    Minimal,
    /// The time peak make current is assessed at
    Peak,
    Other,
}

impl FaultTimeClass {
    /// Output fields for a fault time of this class, in column order
    pub fn fields(self) -> &'static [ResultField] {
        use ResultField::*;
        match self {
            FaultTimeClass::Minimal => &[IkInitial, IbSym, IbAsym, Dc, X, R, XOverR],
            FaultTimeClass::Peak => &[Ip, IbSym, IbAsym, Dc],
            FaultTimeClass::Other => &[IbSym, IbAsym, Dc],
        }
    }
}

/// A column of the combined result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ResultField {
    /// Initial symmetrical short-circuit current Ik''
    IkInitial,
    /// Peak make current
    Ip,
    /// Symmetrical breaking current
    IbSym,
    /// Asymmetrical breaking current
    IbAsym,
    /// DC component
    Dc,
    /// Thevenin reactance (p.u. on system base)
    X,
    /// Thevenin resistance (p.u. on system base)
    R,
    XOverR,
}

impl ResultField {
    pub fn name(self) -> &'static str {
        match self {
            ResultField::IkInitial => "Ik''",
            ResultField::Ip => "Ip",
            ResultField::IbSym => "Ib sym",
            ResultField::IbAsym => "Ib asym",
            ResultField::Dc => "DC",
            ResultField::X => "X",
            ResultField::R => "R",
            ResultField::XOverR => "X/R",
        }
    }

    /// Whether the field is a physical current
    pub fn is_current(self) -> bool {
        !matches!(self, ResultField::X | ResultField::R | ResultField::XOverR)
    }

    /// Column label including the unit, e.g. `Ib sym (kA)`
    pub fn label(self, unit: CurrentUnit) -> String {
        match self {
            ResultField::XOverR => self.name().to_string(),
            ResultField::X | ResultField::R => format!("{} (pu)", self.name()),
            _ => format!("{} ({})", self.name(), unit.label()),
        }
    }
}

impl std::fmt::Display for ResultField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldValue {
    pub field: ResultField,
    pub value: f64,
    /// Value was coerced from an overflow sentinel or derived from one
    pub unreliable: bool,
}

/// Values for one bus at one fault clearance time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaultTimeSeries {
    pub fault_time: Seconds,
    pub class: FaultTimeClass,
    pub values: Vec<FieldValue>,
}

impl FaultTimeSeries {
    pub fn get(&self, field: ResultField) -> Option<&FieldValue> {
        self.values.iter().find(|v| v.field == field)
    }

    pub fn value(&self, field: ResultField) -> Option<f64> {
        self.get(field).map(|v| v.value)
    }

    /// Fields present in this series
    pub fn fields(&self) -> Vec<ResultField> {
        self.values.iter().map(|v| v.field).collect()
    }
}

/// One output row: a busbar and its series across all fault times.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusResult {
    pub bus: BusId,
    pub name: String,
    pub nominal_kv: Kilovolts,
    pub prefault_pu: PerUnit,
    pub series: Vec<FaultTimeSeries>,
}

impl BusResult {
    pub fn at(&self, fault_time: Seconds) -> Option<&FaultTimeSeries> {
        self.series
            .iter()
            .find(|s| s.fault_time.approx_eq(fault_time))
    }
}

/// Result of a complete study.
#[derive(Debug, Clone, Serialize)]
pub struct FaultStudyResult {
    /// Unit physical currents are expressed in
    pub unit: CurrentUnit,
    /// Fault times actually studied (requested plus injected), ascending
    pub fault_times: Vec<Seconds>,
    pub rows: Vec<BusResult>,
    /// Buses whose values are not trustworthy for at least one fault time
    pub unreliable: BTreeSet<BusId>,
    pub diagnostics: Diagnostics,
}

impl FaultStudyResult {
    pub fn row(&self, bus: BusId) -> Option<&BusResult> {
        self.rows.iter().find(|r| r.bus == bus)
    }

    /// Look up a single value
    pub fn value(&self, bus: BusId, fault_time: Seconds, field: ResultField) -> Option<f64> {
        self.row(bus)?.at(fault_time)?.value(field)
    }

    pub fn is_unreliable(&self, bus: BusId) -> bool {
        self.unreliable.contains(&bus)
    }

    /// All output columns in table order
    pub fn columns(&self) -> Vec<(Seconds, ResultField)> {
        self.rows
            .first()
            .map(|row| {
                row.series
                    .iter()
                    .flat_map(|s| s.fields().into_iter().map(move |f| (s.fault_time, f)))
                    .collect()
            })
            .unwrap_or_default()
    }
}
