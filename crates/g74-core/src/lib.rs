//! # g74-core: Network model for fault infeed studies
//!
//! Provides the data structures a breaker duty study reads and mutates:
//! busbars, loads, machines (including the equivalent machines that represent
//! embedded generation and motor load), and the branches that connect busbars.
//!
//! Networks are stored as an **undirected graph**:
//! - **Nodes**: Buses, Loads, Machines
//! - **Edges**: Branches
//!
//! ## Quick Start
//!
//! ```rust
//! use g74_core::*;
//!
//! let mut network = Network::new();
//!
//! network.add_bus(Bus {
//!     id: BusId::new(1301),
//!     name: "SUBSTN A".to_string(),
//!     base_kv: Kilovolts(33.0),
//!     ..Bus::default()
//! });
//! network.add_bus(Bus {
//!     id: BusId::new(1302),
//!     name: "SUBSTN B".to_string(),
//!     base_kv: Kilovolts(11.0),
//!     ..Bus::default()
//! });
//!
//! network.add_load(Load::new(LoadId::new(1), BusId::new(1302), MegavoltAmperes(4.2)));
//! network
//!     .add_branch(Branch::new(BranchId::new(1), BusId::new(1301), BusId::new(1302), 0.01, 0.1))
//!     .unwrap();
//!
//! assert_eq!(network.stats().total_load_mva, 4.2);
//! ```
//!
//! ## Modules
//!
//! - [`units`] - Unit newtypes (MVA, kV, per-unit, seconds, current unit)
//! - [`engine`] - Boundary traits for the network model and the external fault engine
//! - [`fault`] - Combined study result types
//! - [`diagnostics`] - Recoverable issues collected during a study
//! - [`error`] - Unified error type

use petgraph::{prelude::*, Undirected};
use serde::{Deserialize, Serialize};

pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod fault;
pub mod units;

pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use engine::{BreakerDutyRequest, FaultEngine, NetworkModel, RoutineStatus};
pub use error::{G74Error, G74Result};
pub use fault::{
    BusResult, FaultStudyResult, FaultTimeClass, FaultTimeSeries, FieldValue, ResultField,
};
pub use petgraph::graph::NodeIndex;
pub use units::{CurrentUnit, Kilovolts, MegavoltAmperes, PerUnit, Seconds};

// Newtype wrappers for IDs for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadId(usize);

impl BusId {
    #[inline]
    pub fn new(value: usize) -> Self {
        BusId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for BusId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl BranchId {
    #[inline]
    pub fn new(value: usize) -> Self {
        BranchId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl LoadId {
    #[inline]
    pub fn new(value: usize) -> Self {
        LoadId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

/// Bus type as used by the external engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusType {
    /// Load bus (no generator connected)
    #[default]
    Load,
    /// Generator bus
    Generator,
    /// Swing bus
    Swing,
    /// Disconnected bus
    Isolated,
}

impl BusType {
    /// True when a machine at this bus takes part in a fault calculation
    pub fn is_generator_capable(self) -> bool {
        matches!(self, BusType::Generator | BusType::Swing)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bus {
    pub id: BusId,
    pub name: String,
    /// Nominal voltage in kilovolts
    pub base_kv: Kilovolts,
    /// Pre-fault voltage magnitude in per-unit
    pub voltage_pu: PerUnit,
    #[serde(default)]
    pub bus_type: BusType,
    #[serde(default)]
    pub area_id: Option<i64>,
    #[serde(default)]
    pub zone_id: Option<i64>,
}

impl Default for Bus {
    fn default() -> Self {
        Self {
            id: BusId(0),
            name: String::new(),
            base_kv: Kilovolts(0.0),
            voltage_pu: PerUnit::ONE,
            bus_type: BusType::Load,
            area_id: None,
            zone_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    #[serde(default)]
    pub name: String,
    pub from_bus: BusId,
    pub to_bus: BusId,
    /// Series resistance (per-unit)
    pub resistance: f64,
    /// Series reactance (per-unit)
    pub reactance: f64,
    #[serde(default = "default_in_service")]
    pub status: bool,
}

impl Branch {
    pub fn new(id: BranchId, from_bus: BusId, to_bus: BusId, resistance: f64, reactance: f64) -> Self {
        Self {
            id,
            name: format!("Branch {}-{}", from_bus, to_bus),
            from_bus,
            to_bus,
            resistance,
            reactance,
            status: true,
        }
    }
}

/// A load connected at a bus, summarised as apparent power.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Load {
    pub id: LoadId,
    #[serde(default)]
    pub name: String,
    pub bus: BusId,
    /// Connected apparent power
    pub apparent_power: MegavoltAmperes,
    #[serde(default = "default_in_service")]
    pub status: bool,
}

impl Load {
    pub fn new(id: LoadId, bus: BusId, apparent_power: MegavoltAmperes) -> Self {
        Self {
            id,
            name: format!("Load {}", id.value()),
            bus,
            apparent_power,
            status: true,
        }
    }
}

/// Machine data as the fault engine sees it.
///
/// Impedances are per-unit on the machine's own `mbase`. The engine uses the
/// subtransient reactance for breaker duty; transient and synchronous values
/// are carried so the full machine record can be written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    pub bus: BusId,
    /// Machine identifier, unique per bus
    pub id: String,
    #[serde(default = "default_in_service")]
    pub in_service: bool,
    /// Machine MVA base
    pub mbase: MegavoltAmperes,
    #[serde(default)]
    pub p_mw: f64,
    #[serde(default)]
    pub q_mvar: f64,
    pub r_positive: f64,
    pub x_subtransient: f64,
    pub x_transient: f64,
    pub x_synchronous: f64,
    pub r_negative: f64,
    pub x_negative: f64,
    pub r_zero: f64,
    pub x_zero: f64,
    /// Step-up transformer series impedance (zero when none)
    #[serde(default)]
    pub transformer_r: f64,
    #[serde(default)]
    pub transformer_x: f64,
    /// Source impedance used by the engine's machine model
    pub r_source: f64,
    pub x_source: f64,
}

impl Machine {
    /// In-service machine with zero impedances and a 100 MVA base.
    pub fn new(bus: BusId, id: impl Into<String>) -> Self {
        Self {
            bus,
            id: id.into(),
            in_service: true,
            mbase: MegavoltAmperes(100.0),
            p_mw: 0.0,
            q_mvar: 0.0,
            r_positive: 0.0,
            x_subtransient: 0.0,
            x_transient: 0.0,
            x_synchronous: 0.0,
            r_negative: 0.0,
            x_negative: 0.0,
            r_zero: 0.0,
            x_zero: 0.0,
            transformer_r: 0.0,
            transformer_x: 0.0,
            r_source: 0.0,
            x_source: 0.0,
        }
    }

    /// Label used in diagnostics
    pub fn label(&self) -> String {
        format!("Machine {} at bus {}", self.id, self.bus)
    }
}

fn default_in_service() -> bool {
    true
}

#[derive(Debug, Clone)]
pub enum Node {
    Bus(Bus),
    Load(Load),
    Machine(Machine),
}

#[derive(Debug, Clone)]
pub enum Edge {
    Branch(Branch),
}

/// The network model a study runs against
#[derive(Debug, Clone)]
pub struct Network {
    pub graph: Graph<Node, Edge, Undirected>,
    /// System MVA base that Thevenin impedances are reported on
    pub base_mva: MegavoltAmperes,
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl Network {
    pub fn new() -> Self {
        Self {
            graph: Graph::new_undirected(),
            base_mva: MegavoltAmperes(100.0),
        }
    }

    pub fn add_bus(&mut self, bus: Bus) -> NodeIndex {
        self.graph.add_node(Node::Bus(bus))
    }

    pub fn add_load(&mut self, load: Load) -> NodeIndex {
        self.graph.add_node(Node::Load(load))
    }

    pub fn add_machine(&mut self, machine: Machine) -> NodeIndex {
        self.graph.add_node(Node::Machine(machine))
    }

    /// Connect two existing buses. Both ends must already be in the model.
    pub fn add_branch(&mut self, branch: Branch) -> G74Result<EdgeIndex> {
        let from = self
            .bus_index(branch.from_bus)
            .ok_or(G74Error::UnknownBus(branch.from_bus))?;
        let to = self
            .bus_index(branch.to_bus)
            .ok_or(G74Error::UnknownBus(branch.to_bus))?;
        Ok(self.graph.add_edge(from, to, Edge::Branch(branch)))
    }

    pub fn bus_index(&self, id: BusId) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .find(|&idx| matches!(&self.graph[idx], Node::Bus(b) if b.id == id))
    }

    pub fn bus(&self, id: BusId) -> Option<&Bus> {
        self.bus_index(id).and_then(|idx| match &self.graph[idx] {
            Node::Bus(b) => Some(b),
            _ => None,
        })
    }

    pub fn bus_mut(&mut self, id: BusId) -> Option<&mut Bus> {
        let idx = self.bus_index(id)?;
        match &mut self.graph[idx] {
            Node::Bus(b) => Some(b),
            _ => None,
        }
    }

    /// Find a machine by bus and identifier
    pub fn machine_mut(&mut self, bus: BusId, id: &str) -> Option<&mut Machine> {
        self.graph.node_weights_mut().find_map(|n| match n {
            Node::Machine(m) if m.bus == bus && m.id == id => Some(m),
            _ => None,
        })
    }

    pub fn buses(&self) -> Vec<&Bus> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Bus(b) => Some(b),
                _ => None,
            })
            .collect()
    }

    pub fn loads(&self) -> Vec<&Load> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Load(l) => Some(l),
                _ => None,
            })
            .collect()
    }

    pub fn machines(&self) -> Vec<&Machine> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Machine(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    pub fn branches(&self) -> Vec<&Branch> {
        self.graph
            .edge_weights()
            .map(|e| match e {
                Edge::Branch(b) => b,
            })
            .collect()
    }

    /// Compute basic statistics about the network
    pub fn stats(&self) -> NetworkStats {
        let mut stats = NetworkStats::default();

        for node in self.graph.node_weights() {
            match node {
                Node::Bus(_) => stats.num_buses += 1,
                Node::Load(l) => {
                    stats.num_loads += 1;
                    if l.status {
                        stats.total_load_mva += l.apparent_power.value();
                    }
                }
                Node::Machine(m) => {
                    stats.num_machines += 1;
                    if m.in_service {
                        stats.total_machine_mva += m.mbase.value();
                    }
                }
            }
        }

        stats.num_branches = self.graph.edge_count();
        stats
    }

    /// Check the model for problems that would make a fault study meaningless.
    pub fn validate_into(&self, diag: &mut Diagnostics) {
        let stats = self.stats();

        if stats.num_buses == 0 {
            diag.add_error("structure", "Network has no buses");
            return;
        }

        if self.base_mva.value() <= 0.0 {
            diag.add_error(
                "structure",
                &format!("System base must be positive, got {}", self.base_mva),
            );
        }

        let mut seen = std::collections::BTreeSet::new();
        for bus in self.buses() {
            if !seen.insert(bus.id) {
                diag.add_error_with_entity(
                    "structure",
                    "Duplicate bus number",
                    &format!("Bus {}", bus.id),
                );
            }
        }

        for load in self.loads() {
            if !seen.contains(&load.bus) {
                diag.add_error_with_entity(
                    "reference",
                    &format!("Load references missing bus {}", load.bus),
                    &load.name,
                );
            }
        }

        for machine in self.machines() {
            if !seen.contains(&machine.bus) {
                diag.add_error_with_entity(
                    "reference",
                    "Machine references missing bus",
                    &machine.label(),
                );
            }
        }

        if stats.total_load_mva.abs() < 1e-9 {
            diag.add_warning(
                "structure",
                "Network has no connected load; no embedded infeed will be modelled",
            );
        }
    }
}

/// Statistics about a network's size
#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkStats {
    pub num_buses: usize,
    pub num_loads: usize,
    pub num_machines: usize,
    pub num_branches: usize,
    pub total_load_mva: f64,
    pub total_machine_mva: f64,
}

impl std::fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} buses, {} branches, {} loads ({:.2} MVA), {} machines ({:.2} MVA)",
            self.num_buses,
            self.num_branches,
            self.num_loads,
            self.total_load_mva,
            self.num_machines,
            self.total_machine_mva
        )
    }
}

impl Node {
    /// Returns a human-readable label for the node.
    pub fn label(&self) -> String {
        match self {
            Node::Bus(bus) => bus.name.clone(),
            Node::Load(load) => load.name.clone(),
            Node::Machine(machine) => machine.label(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_bus_network() -> Network {
        let mut network = Network::new();
        network.add_bus(Bus {
            id: BusId(1301),
            name: "SUBSTN A".to_string(),
            base_kv: Kilovolts(33.0),
            ..Bus::default()
        });
        network.add_bus(Bus {
            id: BusId(1302),
            name: "SUBSTN B".to_string(),
            base_kv: Kilovolts(11.0),
            ..Bus::default()
        });
        network
            .add_branch(Branch::new(BranchId(1), BusId(1301), BusId(1302), 0.01, 0.1))
            .unwrap();
        network
    }

    #[test]
    fn test_network_creation() {
        let network = two_bus_network();

        assert_eq!(network.graph.node_count(), 2);
        assert_eq!(network.graph.edge_count(), 1);
        assert_eq!(network.bus(BusId(1301)).unwrap().name, "SUBSTN A");
        assert!(network.bus(BusId(9)).is_none());
    }

    #[test]
    fn test_branch_to_missing_bus() {
        let mut network = two_bus_network();
        let err = network
            .add_branch(Branch::new(BranchId(2), BusId(1301), BusId(99), 0.0, 0.1))
            .unwrap_err();
        assert!(matches!(err, G74Error::UnknownBus(b) if b == BusId(99)));
    }

    #[test]
    fn test_network_validation_empty() {
        let network = Network::new();
        let mut diag = Diagnostics::new();
        network.validate_into(&mut diag);
        assert!(diag.errors().any(|i| i.message.contains("no buses")));
    }

    #[test]
    fn test_network_validation_references() {
        let mut network = two_bus_network();
        network.add_load(Load::new(LoadId(1), BusId(77), MegavoltAmperes(1.0)));
        network.add_machine(Machine::new(BusId(78), "1"));

        let mut diag = Diagnostics::new();
        network.validate_into(&mut diag);
        assert_eq!(diag.issues_by_category("reference").count(), 2);
    }

    #[test]
    fn test_network_validation_no_load() {
        let network = two_bus_network();
        let mut diag = Diagnostics::new();
        network.validate_into(&mut diag);
        assert!(!diag.has_errors());
        assert!(diag.warnings().any(|i| i.message.contains("no connected load")));
    }

    #[test]
    fn test_network_stats() {
        let mut network = two_bus_network();
        network.add_load(Load::new(LoadId(1), BusId(1302), MegavoltAmperes(4.0)));
        let mut machine = Machine::new(BusId(1301), "1");
        machine.mbase = MegavoltAmperes(20.0);
        network.add_machine(machine);

        let stats = network.stats();
        assert_eq!(stats.num_buses, 2);
        assert_eq!(stats.num_loads, 1);
        assert_eq!(stats.num_machines, 1);
        assert_eq!(stats.num_branches, 1);
        assert!((stats.total_load_mva - 4.0).abs() < 1e-12);
        assert!((stats.total_machine_mva - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_generator_capable_bus_types() {
        assert!(!BusType::Load.is_generator_capable());
        assert!(!BusType::Isolated.is_generator_capable());
        assert!(BusType::Generator.is_generator_capable());
        assert!(BusType::Swing.is_generator_capable());
    }

    #[test]
    fn test_machine_lookup() {
        let mut network = two_bus_network();
        network.add_machine(Machine::new(BusId(1301), "LD"));
        assert!(network.machine_mut(BusId(1301), "LD").is_some());
        assert!(network.machine_mut(BusId(1301), "1").is_none());
    }
}
