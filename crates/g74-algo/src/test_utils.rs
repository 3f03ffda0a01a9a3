//! In-memory engine for exercising studies without an external program.
//!
//! [`ScriptedEngine`] keeps the model as a [`Network`] and answers breaker duty
//! requests by writing a synthetic report. Fault currents grow with the
//! `mbase / X''` of every in-service machine, so reports change when the
//! equivalent machines are updated between runs.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;

use g74_core::{
    BreakerDutyRequest, Bus, BusId, BusType, FaultEngine, Load, Machine, MegavoltAmperes, Network,
    NetworkModel, RoutineStatus, Seconds,
};

/// Current contributed by the grid alone, in amps
const GRID_CURRENT_A: f64 = 4000.0;
/// Amps per MVA of machine rating per unit of inverse reactance
const MACHINE_SCALE: f64 = 100.0;
const DC_TIME_CONSTANT_S: f64 = 0.03;

/// One breaker duty call and the machines present when it ran.
#[derive(Debug, Clone)]
pub struct RecordedRun {
    pub request: BreakerDutyRequest,
    pub machines: Vec<Machine>,
}

#[derive(Debug, Clone)]
pub struct ScriptedEngine {
    network: Network,
    runs: Vec<RecordedRun>,
    fail_at: Option<Seconds>,
    overflow_buses: BTreeSet<BusId>,
    refused_buses: BTreeSet<BusId>,
}

impl ScriptedEngine {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            runs: Vec::new(),
            fail_at: None,
            overflow_buses: BTreeSet::new(),
            refused_buses: BTreeSet::new(),
        }
    }

    /// Return status 2 for the first run at this fault time
    pub fn fail_at(mut self, fault_time: Seconds) -> Self {
        self.fail_at = Some(fault_time);
        self
    }

    /// Report the symmetrical breaking current of this bus as asterisks
    pub fn overflow_at(mut self, bus: BusId) -> Self {
        self.overflow_buses.insert(bus);
        self
    }

    /// Refuse machine writes at this bus
    pub fn refuse_machines_at(mut self, bus: BusId) -> Self {
        self.refused_buses.insert(bus);
        self
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn runs(&self) -> &[RecordedRun] {
        &self.runs
    }

    fn fault_current(&self) -> f64 {
        let infeed: f64 = self
            .network
            .machines()
            .iter()
            .filter(|m| m.in_service && m.x_subtransient > 0.0)
            .map(|m| MACHINE_SCALE * m.mbase.value() / m.x_subtransient)
            .sum();
        GRID_CURRENT_A + infeed
    }

    fn report(&self, request: &BreakerDutyRequest) -> String {
        let ib = self.fault_current();
        let t = request.fault_time.value();
        let dc = std::f64::consts::SQRT_2 * ib * (-t / DC_TIME_CONSTANT_S).exp();
        let x = 0.25 * GRID_CURRENT_A / ib;
        let r = x / 10.0;

        let buses: Vec<Bus> = match &request.buses {
            Some(ids) => ids
                .iter()
                .filter_map(|id| self.network.bus(*id).cloned())
                .collect(),
            None => self.network.bus_snapshot(),
        };

        let mut text = String::new();
        let _ = writeln!(text, " BREAKER DUTY CURRENTS AT {:.4} SECONDS", t);
        let _ = writeln!(
            text,
            " FAULTED BUS     FAULT CURRENT     IK''    IB SYM    DC    IB ASYM    IP"
        );
        for bus in buses {
            let ib_sym = if self.overflow_buses.contains(&bus.id) {
                "*********".to_string()
            } else {
                format!("{:.1}", ib)
            };
            let _ = writeln!(text, "   {} [{:<12}{:.3}]", bus.id, bus.name, bus.base_kv.value());
            let _ = writeln!(
                text,
                "  FAULT CURRENT   {:.1}  -84.29   {}  -84.20   {:.1}   {:.1}   {:.1}",
                ib,
                ib_sym,
                dc,
                (ib * ib + dc * dc).sqrt(),
                2.55 * ib
            );
            let _ = writeln!(
                text,
                "  THEVENIN IMPEDANCE  {:.5}  {:.5}  {:.4}  10.00   {:.1}   {:.1}   {:.1}",
                r,
                x,
                bus.voltage_pu.value(),
                0.98 * dc,
                (ib * ib + 0.96 * dc * dc).sqrt(),
                2.5 * ib
            );
        }
        text
    }
}

impl NetworkModel for ScriptedEngine {
    fn system_base_mva(&self) -> MegavoltAmperes {
        self.network.system_base_mva()
    }

    fn bus_snapshot(&self) -> Vec<Bus> {
        self.network.bus_snapshot()
    }

    fn load_snapshot(&self) -> Vec<Load> {
        self.network.load_snapshot()
    }

    fn machine_snapshot(&self) -> Vec<Machine> {
        self.network.machine_snapshot()
    }

    fn set_bus_type(&mut self, bus: BusId, bus_type: BusType) -> Result<(), RoutineStatus> {
        self.network.set_bus_type(bus, bus_type)
    }

    fn write_machine(&mut self, machine: &Machine) -> Result<(), RoutineStatus> {
        if self.refused_buses.contains(&machine.bus) {
            return Err(RoutineStatus::new("machine_data", 4));
        }
        self.network.write_machine(machine)
    }
}

impl FaultEngine for ScriptedEngine {
    fn breaker_duty(&mut self, request: &BreakerDutyRequest) -> Result<(), RoutineStatus> {
        if let Some(t) = self.fail_at {
            if t.approx_eq(request.fault_time) {
                self.fail_at = None;
                return Err(RoutineStatus::new("breaker_duty", 2));
            }
        }
        fs::write(&request.report, self.report(request))
            .map_err(|_| RoutineStatus::new("breaker_duty", 5))?;
        self.runs.push(RecordedRun {
            request: request.clone(),
            machines: self.network.machine_snapshot(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use g74_core::Kilovolts;

    #[test]
    fn test_clone_keeps_model_and_runs() {
        let mut network = Network::new();
        network.add_bus(Bus {
            id: BusId::new(1),
            base_kv: Kilovolts(11.0),
            ..Bus::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let mut engine = ScriptedEngine::new(network);
        engine
            .breaker_duty(&BreakerDutyRequest {
                fault_time: Seconds(0.06),
                buses: None,
                report: dir.path().join("r.txt"),
            })
            .unwrap();

        let mut copy = engine.clone();
        assert_eq!(copy.runs().len(), 1);
        assert_eq!(copy.network().buses().len(), 1);

        copy.set_bus_type(BusId::new(1), BusType::Generator).unwrap();
        assert_eq!(engine.network().buses()[0].bus_type, BusType::Load);
        assert_eq!(copy.runs()[0].request.report, dir.path().join("r.txt"));
    }
}
