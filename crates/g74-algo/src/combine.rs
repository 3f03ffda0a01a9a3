//! Merging the initial and decrement passes into one result.
//!
//! Everything defined relative to fault inception (Ik'', peak, DC, R, X) comes
//! from the initial pass. Only the symmetrical breaking current comes from the
//! decrement pass, where machine reactances have decayed to the fault time.
//! The asymmetrical breaking current is recomputed from the two:
//!
//! ```text
//! Ib_asym = sqrt((sqrt(2) * Ib_sym)^2 / 2 + DC^2)
//! ```

use std::collections::{BTreeMap, BTreeSet};

use g74_core::{
    Bus, BusId, BusResult, CurrentUnit, Diagnostics, FaultStudyResult, FaultTimeClass,
    FaultTimeSeries, FieldValue, Kilovolts, PerUnit, ResultField, Seconds,
};
use g74_io::report::{ReportField, ReportRecord, ReportTable};
use tracing::{debug, warn};

use crate::schedule::FaultSchedule;

/// Asymmetrical breaking current from its symmetrical and DC parts.
pub fn asymmetrical_current(ib_sym: f64, dc: f64) -> f64 {
    let peak_ac = std::f64::consts::SQRT_2 * ib_sym;
    (peak_ac * peak_ac / 2.0 + dc * dc).sqrt()
}

/// Combines per-fault-time report tables of both passes.
#[derive(Debug, Clone, Copy)]
pub struct ResultCombiner<'a> {
    schedule: &'a FaultSchedule,
    unit: CurrentUnit,
}

impl<'a> ResultCombiner<'a> {
    pub fn new(schedule: &'a FaultSchedule, unit: CurrentUnit) -> Self {
        Self { schedule, unit }
    }

    /// Build the study result.
    ///
    /// Rows cover every bus present in any initial-pass report, ordered by bus
    /// number. `buses` supplies the descriptive columns. Report diagnostics are
    /// merged into `diagnostics`.
    pub fn combine(
        &self,
        initial: &[ReportTable],
        decrement: &[ReportTable],
        buses: &[Bus],
        mut diagnostics: Diagnostics,
    ) -> FaultStudyResult {
        let initial = index_by_time(initial);
        let decrement = index_by_time(decrement);

        let mut unreliable = BTreeSet::new();
        let mut faulted = BTreeSet::new();
        for table in initial.values().chain(decrement.values()) {
            unreliable.extend(table.unreliable_buses());
            faulted.extend(table.buses());
            diagnostics.merge(table.diagnostics.clone());
        }

        let minimal = self.schedule.minimal_time();
        let descriptions: BTreeMap<BusId, &Bus> = buses.iter().map(|b| (b.id, b)).collect();
        let missing = ReportRecord::default();

        let mut rows = Vec::with_capacity(faulted.len());
        for bus in faulted {
            let mut series = Vec::with_capacity(self.schedule.len());
            for (t, class) in self.schedule.iter() {
                let init = lookup(&initial, t, bus);
                let decr = lookup(&decrement, t, bus);
                if init.is_none() || decr.is_none() {
                    let message = format!("No result for bus {} at {:.4} s in one of the passes", bus, t.value());
                    warn!("{}", message);
                    diagnostics.add_warning_with_entity("combine", &message, &format!("Bus {}", bus));
                    unreliable.insert(bus);
                }
                let init = init.unwrap_or(&missing);
                let decr = decr.unwrap_or(&missing);
                let base = minimal
                    .and_then(|m| lookup(&initial, m, bus))
                    .unwrap_or(init);

                let values = class_values(class, init, decr, base);
                if values.iter().any(|v| v.field == ResultField::XOverR && v.unreliable) {
                    unreliable.insert(bus);
                }
                series.push(FaultTimeSeries {
                    fault_time: t,
                    class,
                    values,
                });
            }

            let (name, nominal_kv, prefault_pu) = match descriptions.get(&bus) {
                Some(b) => (b.name.clone(), b.base_kv, b.voltage_pu),
                None => (String::new(), Kilovolts::default(), PerUnit::default()),
            };
            rows.push(BusResult {
                bus,
                name,
                nominal_kv,
                prefault_pu,
                series,
            });
        }

        debug!(
            rows = rows.len(),
            fault_times = self.schedule.len(),
            unreliable = unreliable.len(),
            "pass results combined"
        );

        FaultStudyResult {
            unit: self.unit,
            fault_times: self.schedule.times().to_vec(),
            rows,
            unreliable,
            diagnostics,
        }
    }
}

fn index_by_time(tables: &[ReportTable]) -> BTreeMap<i64, &ReportTable> {
    tables.iter().map(|t| (t.fault_time.to_steps(), t)).collect()
}

fn lookup<'t>(
    tables: &BTreeMap<i64, &'t ReportTable>,
    t: Seconds,
    bus: BusId,
) -> Option<&'t ReportRecord> {
    tables.get(&t.to_steps()).and_then(|table| table.record(bus))
}

/// Field values for one bus at one fault time.
///
/// `init` and `decr` are the bus records of the two passes at this time;
/// `base` is the initial-pass record at the minimal time, used for X/R.
fn class_values(
    class: FaultTimeClass,
    init: &ReportRecord,
    decr: &ReportRecord,
    base: &ReportRecord,
) -> Vec<FieldValue> {
    let raw = |record: &ReportRecord, field: ReportField| {
        (record.get(field), record.is_overflowed(field))
    };

    let ib_sym = raw(decr, ReportField::IbSym);
    let dc = (init.dc(), init.dc_overflowed());

    class
        .fields()
        .iter()
        .map(|&field| {
            let (value, unreliable) = match field {
                ResultField::IkInitial => raw(init, ReportField::IkInitial),
                ResultField::Ip => (init.peak(), init.peak_overflowed()),
                ResultField::IbSym => ib_sym,
                ResultField::IbAsym => (asymmetrical_current(ib_sym.0, dc.0), ib_sym.1 || dc.1),
                ResultField::Dc => dc,
                ResultField::X => {
                    let (x, overflowed) = raw(init, ReportField::X);
                    (x, overflowed || x < 0.0)
                }
                ResultField::R => raw(init, ReportField::R),
                ResultField::XOverR => x_over_r(base),
            };
            FieldValue {
                field,
                value,
                unreliable,
            }
        })
        .collect()
}

fn x_over_r(record: &ReportRecord) -> (f64, bool) {
    let (x, r) = (record.get(ReportField::X), record.get(ReportField::R));
    let inputs_bad = record.is_overflowed(ReportField::X)
        || record.is_overflowed(ReportField::R)
        || x < 0.0;
    if r == 0.0 {
        (0.0, true)
    } else {
        (x / r, inputs_bad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FaultTimeConfig;
    use g74_io::report::ReportParser;

    fn report(lines: &[(usize, &str, &str)]) -> String {
        let mut text = String::from(" FAULTED BUS\n");
        for (bus, current, impedance) in lines {
            text.push_str(&format!("   {} [BUS {}  11.000]\n", bus, bus));
            text.push_str(&format!("  FAULT CURRENT  {}\n", current));
            text.push_str(&format!("  THEVENIN IMPEDANCE  {}\n", impedance));
        }
        text
    }

    fn table(t: f64, lines: &[(usize, &str, &str)]) -> ReportTable {
        ReportParser::new(CurrentUnit::Kiloamps)
            .parse_str(&report(lines), Seconds(t))
            .unwrap()
    }

    fn schedule() -> FaultSchedule {
        let times = [Seconds(0.0001), Seconds(0.01), Seconds(0.06)];
        FaultSchedule::build(&times, &FaultTimeConfig::default(), &mut Diagnostics::new())
    }

    const IMPEDANCE: &str = "0.02000  0.20000  1.0000  10.00   900.0   5100.0  12500.0";

    fn initial() -> Vec<ReportTable> {
        [0.0001, 0.01, 0.06]
            .iter()
            .map(|&t| {
                table(
                    t,
                    &[(7, "5000.0  -84.29   4800.0  -84.20    700.0   4850.0  12400.0", IMPEDANCE)],
                )
            })
            .collect()
    }

    fn decrement() -> Vec<ReportTable> {
        [(0.0001, "4800.0"), (0.01, "4500.0"), (0.06, "3000.0")]
            .iter()
            .map(|&(t, ib)| {
                let current = format!("5000.0  -84.29   {}  -84.20    100.0   4000.0  11000.0", ib);
                table(t, &[(7, &current, IMPEDANCE)])
            })
            .collect()
    }

    #[test]
    fn test_asymmetrical_current() {
        assert!((asymmetrical_current(3.0, 0.5) - 3.041_381).abs() < 1e-6);
        assert_eq!(asymmetrical_current(4.0, 0.0), 4.0);
    }

    #[test]
    fn test_ib_sym_from_decrement_rest_from_initial() {
        let schedule = schedule();
        let result = ResultCombiner::new(&schedule, CurrentUnit::Kiloamps).combine(
            &initial(),
            &decrement(),
            &[],
            Diagnostics::new(),
        );
        let bus = BusId::new(7);

        assert_eq!(result.value(bus, Seconds(0.06), ResultField::IbSym), Some(3.0));
        // DC from the initial pass: max(0.7, 0.9)
        let dc = result.value(bus, Seconds(0.06), ResultField::Dc).unwrap();
        assert!((dc - 0.9).abs() < 1e-12);
        let asym = result.value(bus, Seconds(0.06), ResultField::IbAsym).unwrap();
        assert!((asym - asymmetrical_current(3.0, 0.9)).abs() < 1e-12);

        // Peak from the initial pass: max(12.4, 12.5)
        assert_eq!(result.value(bus, Seconds(0.01), ResultField::Ip), Some(12.5));
        assert_eq!(result.value(bus, Seconds(0.0001), ResultField::IkInitial), Some(5.0));
        let xr = result.value(bus, Seconds(0.0001), ResultField::XOverR).unwrap();
        assert!((xr - 10.0).abs() < 1e-9);
        assert!(result.unreliable.is_empty());
    }

    #[test]
    fn test_column_sets() {
        let schedule = schedule();
        let result = ResultCombiner::new(&schedule, CurrentUnit::Kiloamps).combine(
            &initial(),
            &decrement(),
            &[],
            Diagnostics::new(),
        );
        let row = result.row(BusId::new(7)).unwrap();
        assert_eq!(row.series.len(), 3);
        assert_eq!(row.series[0].fields(), FaultTimeClass::Minimal.fields());
        assert_eq!(row.series[1].fields(), FaultTimeClass::Peak.fields());
        assert_eq!(row.series[2].fields(), FaultTimeClass::Other.fields());
        assert_eq!(result.columns().len(), 14);
    }

    #[test]
    fn test_zero_resistance_flags_bus() {
        let schedule = schedule();
        let zero_r = "0.00000  0.20000  1.0000  10.00   900.0   5100.0  12500.0";
        let initial: Vec<_> = [0.0001, 0.01, 0.06]
            .iter()
            .map(|&t| {
                table(
                    t,
                    &[(7, "5000.0  -84.29   4800.0  -84.20    700.0   4850.0  12400.0", zero_r)],
                )
            })
            .collect();
        let result = ResultCombiner::new(&schedule, CurrentUnit::Kiloamps).combine(
            &initial,
            &decrement(),
            &[],
            Diagnostics::new(),
        );

        let series = result.row(BusId::new(7)).unwrap().at(Seconds(0.0001)).unwrap();
        let xr = series.get(ResultField::XOverR).unwrap();
        assert_eq!(xr.value, 0.0);
        assert!(xr.unreliable);
        assert!(result.is_unreliable(BusId::new(7)));
    }

    #[test]
    fn test_overflow_in_decrement_pass_flags_bus() {
        let schedule = schedule();
        let mut decrement = decrement();
        decrement[2] = table(
            0.06,
            &[(7, "5000.0  -84.29   *********  -84.20    100.0   4000.0  11000.0", IMPEDANCE)],
        );
        let result = ResultCombiner::new(&schedule, CurrentUnit::Kiloamps).combine(
            &initial(),
            &decrement,
            &[],
            Diagnostics::new(),
        );

        let series = result.row(BusId::new(7)).unwrap().at(Seconds(0.06)).unwrap();
        let ib = series.get(ResultField::IbSym).unwrap();
        assert_eq!(ib.value, 0.0);
        assert!(ib.unreliable);
        assert!(series.get(ResultField::IbAsym).unwrap().unreliable);
        assert!(result.is_unreliable(BusId::new(7)));
        assert!(result.diagnostics.warning_count() >= 1);
    }

    #[test]
    fn test_bus_description_columns() {
        let schedule = schedule();
        let buses = vec![Bus {
            id: BusId::new(7),
            name: "GRID T1".to_string(),
            base_kv: Kilovolts(11.0),
            voltage_pu: PerUnit(1.02),
            ..Bus::default()
        }];
        let result = ResultCombiner::new(&schedule, CurrentUnit::Kiloamps).combine(
            &initial(),
            &decrement(),
            &buses,
            Diagnostics::new(),
        );
        let row = result.row(BusId::new(7)).unwrap();
        assert_eq!(row.name, "GRID T1");
        assert_eq!(row.nominal_kv, Kilovolts(11.0));
        assert_eq!(row.prefault_pu, PerUnit(1.02));
    }
}
