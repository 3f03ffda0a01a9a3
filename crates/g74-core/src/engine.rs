//! Boundary between a fault study and the external simulation engine.
//!
//! The short-circuit solution itself happens outside this workspace. A study
//! only needs to read a snapshot of the model, write machine data into it and
//! ask for a breaker duty calculation that leaves a report file behind.
//! [`NetworkModel`] and [`FaultEngine`] describe exactly that surface.

use std::path::PathBuf;

use thiserror::Error;

use crate::units::{MegavoltAmperes, Seconds};
use crate::{Bus, BusId, BusType, Load, Machine, Network, Node};

/// Non-zero status returned by an engine routine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{routine} returned status {code}")]
pub struct RoutineStatus {
    pub routine: String,
    pub code: i32,
}

impl RoutineStatus {
    pub fn new(routine: impl Into<String>, code: i32) -> Self {
        Self {
            routine: routine.into(),
            code,
        }
    }
}

/// Read and write access to the network model held by the engine.
pub trait NetworkModel {
    /// System MVA base the engine reports impedances on
    fn system_base_mva(&self) -> MegavoltAmperes;

    fn bus_snapshot(&self) -> Vec<Bus>;

    fn load_snapshot(&self) -> Vec<Load>;

    fn machine_snapshot(&self) -> Vec<Machine>;

    fn set_bus_type(&mut self, bus: BusId, bus_type: BusType) -> Result<(), RoutineStatus>;

    /// Create the machine if no machine with the same bus and id exists, otherwise
    /// overwrite its data.
    fn write_machine(&mut self, machine: &Machine) -> Result<(), RoutineStatus>;
}

/// One breaker duty run.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakerDutyRequest {
    /// Fault clearance time the engine decrements currents to
    pub fault_time: Seconds,
    /// Faulted buses; `None` faults every bus in the model
    pub buses: Option<Vec<BusId>>,
    /// Where the engine writes its report
    pub report: PathBuf,
}

/// External engine able to run a breaker duty calculation.
///
/// Engines hold single-writer state: one calculation at a time against one model.
pub trait FaultEngine: NetworkModel {
    fn breaker_duty(&mut self, request: &BreakerDutyRequest) -> Result<(), RoutineStatus>;
}

impl NetworkModel for Network {
    fn system_base_mva(&self) -> MegavoltAmperes {
        self.base_mva
    }

    fn bus_snapshot(&self) -> Vec<Bus> {
        self.buses().into_iter().cloned().collect()
    }

    fn load_snapshot(&self) -> Vec<Load> {
        self.loads().into_iter().cloned().collect()
    }

    fn machine_snapshot(&self) -> Vec<Machine> {
        self.machines().into_iter().cloned().collect()
    }

    fn set_bus_type(&mut self, bus: BusId, bus_type: BusType) -> Result<(), RoutineStatus> {
        let target = self
            .bus_mut(bus)
            .ok_or_else(|| RoutineStatus::new("bus_data", 1))?;
        target.bus_type = bus_type;
        Ok(())
    }

    fn write_machine(&mut self, machine: &Machine) -> Result<(), RoutineStatus> {
        if self.bus_index(machine.bus).is_none() {
            return Err(RoutineStatus::new("machine_data", 1));
        }
        match self.machine_mut(machine.bus, &machine.id) {
            Some(existing) => *existing = machine.clone(),
            None => {
                self.graph.add_node(Node::Machine(machine.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Kilovolts;

    fn network() -> Network {
        let mut network = Network::new();
        network.add_bus(Bus {
            id: BusId::new(10),
            base_kv: Kilovolts(11.0),
            ..Bus::default()
        });
        network
    }

    #[test]
    fn test_write_machine_upserts() {
        let mut network = network();
        let mut machine = Machine::new(BusId::new(10), "LD");
        machine.x_subtransient = 0.9;
        network.write_machine(&machine).unwrap();

        machine.x_subtransient = 1.2;
        network.write_machine(&machine).unwrap();

        let machines = network.machine_snapshot();
        assert_eq!(machines.len(), 1);
        assert_eq!(machines[0].x_subtransient, 1.2);
    }

    #[test]
    fn test_write_machine_unknown_bus() {
        let mut network = network();
        let err = network
            .write_machine(&Machine::new(BusId::new(11), "LD"))
            .unwrap_err();
        assert_eq!(err.code, 1);
        assert_eq!(err.to_string(), "machine_data returned status 1");
    }

    #[test]
    fn test_set_bus_type() {
        let mut network = network();
        network
            .set_bus_type(BusId::new(10), BusType::Generator)
            .unwrap();
        assert_eq!(
            network.bus(BusId::new(10)).unwrap().bus_type,
            BusType::Generator
        );
        assert!(network.set_bus_type(BusId::new(99), BusType::Generator).is_err());
    }
}
