//! Equivalent machines for embedded load.
//!
//! Motors and small generation embedded in distribution load feed fault current
//! for the first few cycles of a fault. The infeed standard represents that
//! contribution as one synchronous machine per load bus, rated from the
//! connected load and decaying with a single time constant:
//!
//! ```text
//! X(t) = X''                          t <= t_min
//! X(t) = 1 / ((1 / X'') * e^(-t/T))   otherwise
//! ```
//!
//! Buses above the tier threshold use the unit impedance directly (tier A).
//! Buses at or below it sit behind a step-down transformer whose series R/X is
//! taken off the source impedance (tier B).
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeSet;
//! use g74_algo::config::StudyConfig;
//! use g74_algo::infeed::{InfeedModel, VoltageTier};
//! use g74_core::{Bus, BusId, Diagnostics, Kilovolts, Load, LoadId, MegavoltAmperes, Seconds};
//!
//! let buses = vec![Bus { id: BusId::new(1), base_kv: Kilovolts(11.0), ..Bus::default() }];
//! let loads = vec![Load::new(LoadId::new(1), BusId::new(1), MegavoltAmperes(5.0))];
//!
//! let mut diag = Diagnostics::new();
//! let mut infeed = InfeedModel::from_snapshot(
//!     &buses, &loads, &StudyConfig::default(), &BTreeSet::new(), &mut diag,
//! );
//! let machine = infeed.machine(BusId::new(1)).unwrap();
//! assert_eq!(machine.tier, VoltageTier::B);
//! assert!((machine.mbase.value() - 5.8).abs() < 1e-9);
//!
//! let x0 = infeed.machine(BusId::new(1)).unwrap().x_subtransient;
//! infeed.update(Seconds(0.06));
//! assert!(infeed.machine(BusId::new(1)).unwrap().x_subtransient > x0);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use g74_core::{
    Bus, BusId, BusType, Diagnostics, G74Error, Kilovolts, Load, Machine, MegavoltAmperes,
    NetworkModel, Seconds,
};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::config::{InfeedConfig, StudyConfig};

/// Summed load within this margin of `min_load_mva` counts as equal to it
const LOAD_TOLERANCE_MVA: f64 = 1e-9;

/// Voltage tier of an equivalent machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VoltageTier {
    /// Above the tier threshold; no series transformer
    A,
    /// At or below the tier threshold; behind a step-down transformer
    B,
}

impl VoltageTier {
    pub fn for_voltage(nominal: Kilovolts, threshold: Kilovolts) -> Self {
        if nominal > threshold {
            VoltageTier::A
        } else {
            VoltageTier::B
        }
    }
}

impl std::fmt::Display for VoltageTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoltageTier::A => f.write_str("A"),
            VoltageTier::B => f.write_str("B"),
        }
    }
}

/// Per-unit impedances (machine base) shared by every machine of a tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TierTemplate {
    pub tier: VoltageTier,
    pub r_positive: f64,
    pub x_subtransient: f64,
    pub zero_sequence: f64,
    pub transformer_r: f64,
    pub transformer_x: f64,
    pub mva_multiplier: f64,
}

impl TierTemplate {
    pub fn derive(config: &InfeedConfig, tier: VoltageTier) -> Self {
        let (r_unit, x_unit) = unit_impedance(config.x_over_r);
        let (transformer_r, transformer_x, mva_multiplier) = match tier {
            VoltageTier::A => (0.0, 0.0, config.tier_a_mva_multiplier),
            VoltageTier::B => (
                config.transformer_r,
                config.transformer_x,
                config.tier_b_mva_multiplier,
            ),
        };
        Self {
            tier,
            r_positive: r_unit - transformer_r,
            x_subtransient: x_unit - transformer_x,
            zero_sequence: config.zero_sequence_impedance,
            transformer_r,
            transformer_x,
            mva_multiplier,
        }
    }
}

/// R and X of a unit impedance with the given X/R ratio.
pub fn unit_impedance(x_over_r: f64) -> (f64, f64) {
    let r = (1.0 / (1.0 + x_over_r * x_over_r)).sqrt();
    (r, (1.0 - r * r).sqrt())
}

/// Source reactance `t` seconds after fault inception.
pub fn decayed_reactance(x_subtransient: f64, t: Seconds, time_constant: Seconds, minimal: Seconds) -> f64 {
    if t <= minimal {
        x_subtransient
    } else {
        1.0 / ((1.0 / x_subtransient) * (-t.value() / time_constant.value()).exp())
    }
}

/// One equivalent machine and the load it represents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquivalentMachine {
    pub bus: BusId,
    pub tier: VoltageTier,
    /// Bus was designated HV connected by the caller
    pub hv_connected: bool,
    pub connected_load: MegavoltAmperes,
    pub nominal_kv: Kilovolts,
    pub mbase: MegavoltAmperes,
    pub r_positive: f64,
    pub x_subtransient: f64,
    pub x_transient: f64,
    pub x_synchronous: f64,
    pub r_negative: f64,
    pub x_negative: f64,
    pub r_zero: f64,
    pub x_zero: f64,
    pub transformer_r: f64,
    pub transformer_x: f64,
    pub r_source: f64,
    pub x_source: f64,
}

impl EquivalentMachine {
    fn from_template(
        bus: &Bus,
        connected_load: MegavoltAmperes,
        hv_connected: bool,
        template: &TierTemplate,
    ) -> Self {
        Self {
            bus: bus.id,
            tier: template.tier,
            hv_connected,
            connected_load,
            nominal_kv: bus.base_kv,
            mbase: connected_load * template.mva_multiplier,
            r_positive: template.r_positive,
            x_subtransient: template.x_subtransient,
            x_transient: template.x_subtransient,
            x_synchronous: template.x_subtransient,
            r_negative: template.r_positive,
            x_negative: template.x_subtransient,
            r_zero: template.zero_sequence,
            x_zero: template.zero_sequence,
            transformer_r: template.transformer_r,
            transformer_x: template.transformer_x,
            r_source: template.r_positive,
            x_source: template.x_subtransient,
        }
    }

    /// Machine record as written into the network model: in service, no
    /// dispatch.
    pub fn to_machine(&self, id: &str) -> Machine {
        Machine {
            in_service: true,
            mbase: self.mbase,
            p_mw: 0.0,
            q_mvar: 0.0,
            r_positive: self.r_positive,
            x_subtransient: self.x_subtransient,
            x_transient: self.x_transient,
            x_synchronous: self.x_synchronous,
            r_negative: self.r_negative,
            x_negative: self.x_negative,
            r_zero: self.r_zero,
            x_zero: self.x_zero,
            transformer_r: self.transformer_r,
            transformer_x: self.transformer_x,
            r_source: self.r_source,
            x_source: self.x_source,
            ..Machine::new(self.bus, id)
        }
    }
}

/// Equivalent machines for every qualifying load bus of a study.
#[derive(Debug, Clone)]
pub struct InfeedModel {
    config: InfeedConfig,
    minimal: Seconds,
    tier_a: TierTemplate,
    machines: BTreeMap<BusId, EquivalentMachine>,
    bus_types: BTreeMap<BusId, BusType>,
    /// Buses whose machine could not be written; reported once
    failed: BTreeSet<BusId>,
    fault_time: Seconds,
}

impl InfeedModel {
    /// Derive machine parameters from a model snapshot.
    ///
    /// Load is summed per bus over in-service loads; buses need strictly more
    /// than `min_load_mva` to qualify. `hv_buses` marks machines as HV
    /// connected; designated buses without load are reported and skipped.
    pub fn from_snapshot(
        buses: &[Bus],
        loads: &[Load],
        config: &StudyConfig,
        hv_buses: &BTreeSet<BusId>,
        diag: &mut Diagnostics,
    ) -> Self {
        let infeed = config.infeed.clone();
        let tier_a = TierTemplate::derive(&infeed, VoltageTier::A);
        let tier_b = TierTemplate::derive(&infeed, VoltageTier::B);

        let by_id: BTreeMap<BusId, &Bus> = buses.iter().map(|b| (b.id, b)).collect();

        let mut connected: BTreeMap<BusId, MegavoltAmperes> = BTreeMap::new();
        for load in loads.iter().filter(|l| l.status) {
            let total = connected.entry(load.bus).or_default();
            *total = *total + load.apparent_power;
        }

        let mut machines = BTreeMap::new();
        let mut above_bound = Vec::new();
        for (bus_id, load) in connected {
            if load.value() <= infeed.min_load_mva + LOAD_TOLERANCE_MVA {
                continue;
            }
            let Some(bus) = by_id.get(&bus_id) else {
                debug!(bus = %bus_id, "load references a bus missing from the snapshot");
                continue;
            };
            if bus.bus_type == BusType::Isolated {
                debug!(bus = %bus_id, "isolated bus takes no part in the fault calculation");
                continue;
            }
            if bus.base_kv > infeed.upper_bound() {
                above_bound.push((bus_id, load, bus.base_kv));
            }
            let template = match VoltageTier::for_voltage(bus.base_kv, infeed.tier_threshold()) {
                VoltageTier::A => &tier_a,
                VoltageTier::B => &tier_b,
            };
            let machine =
                EquivalentMachine::from_template(bus, load, hv_buses.contains(&bus_id), template);
            machines.insert(bus_id, machine);
        }

        if !above_bound.is_empty() {
            let listing: Vec<String> = above_bound
                .iter()
                .map(|(bus, load, kv)| format!("{:.2} MVA at bus {} ({:.1} kV)", load.value(), bus, kv.value()))
                .collect();
            warn!(
                "{} load buses are above {} kV, outside the range the infeed standard documents; \
                 tier A parameters assumed: {}",
                above_bound.len(),
                infeed.upper_bound_kv,
                listing.join(", ")
            );
            for (bus, _, kv) in &above_bound {
                diag.add_warning_with_entity(
                    "infeed",
                    &format!(
                        "Nominal voltage {:.1} kV above {} kV, tier A parameters assumed",
                        kv.value(),
                        infeed.upper_bound_kv
                    ),
                    &format!("Bus {}", bus),
                );
            }
        }

        let missing_hv: Vec<String> = hv_buses
            .iter()
            .filter(|bus| !machines.contains_key(*bus))
            .map(|bus| bus.to_string())
            .collect();
        if !missing_hv.is_empty() {
            let message = format!(
                "HV connected load listed at buses with no modelled load, no infeed added: {}",
                missing_hv.join(", ")
            );
            warn!("{}", message);
            diag.add_warning("infeed", &message);
        }

        debug!(
            machines = machines.len(),
            "equivalent machine parameters derived from connected load"
        );

        Self {
            minimal: config.times.minimal(),
            tier_a,
            config: infeed,
            machines,
            bus_types: buses.iter().map(|b| (b.id, b.bus_type)).collect(),
            failed: BTreeSet::new(),
            fault_time: Seconds::ZERO,
        }
    }

    /// Derive machine parameters from the current state of a model.
    pub fn from_model<M: NetworkModel + ?Sized>(
        model: &M,
        config: &StudyConfig,
        hv_buses: &BTreeSet<BusId>,
        diag: &mut Diagnostics,
    ) -> Self {
        Self::from_snapshot(
            &model.bus_snapshot(),
            &model.load_snapshot(),
            config,
            hv_buses,
            diag,
        )
    }

    pub fn machines(&self) -> impl Iterator<Item = &EquivalentMachine> {
        self.machines.values()
    }

    pub fn machine(&self, bus: BusId) -> Option<&EquivalentMachine> {
        self.machines.get(&bus)
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    /// Fault time the current reactances correspond to
    pub fn fault_time(&self) -> Seconds {
        self.fault_time
    }

    /// Tier A source reactance at `t`, before any transformer is taken off.
    pub fn reactance_at(&self, t: Seconds) -> f64 {
        decayed_reactance(
            self.tier_a.x_subtransient,
            t,
            self.config.time_constant(),
            self.minimal,
        )
    }

    /// Set the subtransient, transient and synchronous reactance of every
    /// machine for fault time `t`. Always recomputed from the template.
    pub fn update(&mut self, t: Seconds) {
        let x = self.reactance_at(t);
        for machine in self.machines.values_mut() {
            let value = x - machine.transformer_x;
            machine.x_subtransient = value;
            machine.x_transient = value;
            machine.x_synchronous = value;
        }
        self.fault_time = t;
        debug!(
            fault_time = t.value(),
            x_subtransient = self.tier_a.x_subtransient,
            time_constant = self.config.time_constant_s,
            x = x,
            "equivalent machine reactance updated"
        );
    }

    /// Write every machine into the model, promoting load buses to generator
    /// buses first. A bus whose write fails is logged and left without infeed.
    ///
    /// Returns the number of machines written.
    pub fn apply<M: NetworkModel + ?Sized>(&mut self, model: &mut M, diag: &mut Diagnostics) -> usize {
        let mut written = 0;
        for machine in self.machines.values() {
            let bus = machine.bus;
            match write_equivalent(model, machine, &self.config.machine_id, &mut self.bus_types) {
                Ok(()) => {
                    written += 1;
                    debug!(bus = %bus, id = %self.config.machine_id, "equivalent machine written");
                }
                Err(err) => {
                    error!(
                        "Failed to add the equivalent machine for embedded load at bus {}: {}",
                        bus, err
                    );
                    if self.failed.insert(bus) {
                        diag.add_error_with_entity("infeed", &err.to_string(), &format!("Bus {}", bus));
                    }
                }
            }
        }
        written
    }

    /// [`InfeedModel::update`] followed by [`InfeedModel::apply`].
    pub fn set_fault_time<M: NetworkModel + ?Sized>(
        &mut self,
        t: Seconds,
        model: &mut M,
        diag: &mut Diagnostics,
    ) -> usize {
        self.update(t);
        self.apply(model, diag)
    }
}

fn write_equivalent<M: NetworkModel + ?Sized>(
    model: &mut M,
    machine: &EquivalentMachine,
    id: &str,
    bus_types: &mut BTreeMap<BusId, BusType>,
) -> Result<(), G74Error> {
    let bus = machine.bus;
    let to_model_error = |status: g74_core::RoutineStatus| G74Error::ModelWrite {
        bus,
        routine: status.routine,
        code: status.code,
    };

    if !bus_types.get(&bus).copied().unwrap_or_default().is_generator_capable() {
        model
            .set_bus_type(bus, BusType::Generator)
            .map_err(to_model_error)?;
        bus_types.insert(bus, BusType::Generator);
    }
    model
        .write_machine(&machine.to_machine(id))
        .map_err(to_model_error)
}
