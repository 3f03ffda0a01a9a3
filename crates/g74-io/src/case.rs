//! JSON case snapshots.
//!
//! A snapshot is the whole network model in one serde document. It is the
//! hand-off format to an external engine process and the input format of the
//! command line tool.

use std::fs;
use std::path::Path;

use g74_core::{Branch, Bus, G74Error, G74Result, Load, Machine, MegavoltAmperes, Network};
use serde::{Deserialize, Serialize};

fn default_base_mva() -> MegavoltAmperes {
    MegavoltAmperes(100.0)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseSnapshot {
    #[serde(default = "default_base_mva")]
    pub base_mva: MegavoltAmperes,
    pub buses: Vec<Bus>,
    #[serde(default)]
    pub loads: Vec<Load>,
    #[serde(default)]
    pub machines: Vec<Machine>,
    #[serde(default)]
    pub branches: Vec<Branch>,
}

impl CaseSnapshot {
    pub fn from_network(network: &Network) -> Self {
        Self {
            base_mva: network.base_mva,
            buses: network.buses().into_iter().cloned().collect(),
            loads: network.loads().into_iter().cloned().collect(),
            machines: network.machines().into_iter().cloned().collect(),
            branches: network.branches().into_iter().cloned().collect(),
        }
    }

    /// Build a network. Branches must reference buses in the snapshot.
    pub fn into_network(self) -> G74Result<Network> {
        let mut network = Network::new();
        network.base_mva = self.base_mva;
        for bus in self.buses {
            network.add_bus(bus);
        }
        for load in self.loads {
            network.add_load(load);
        }
        for machine in self.machines {
            network.add_machine(machine);
        }
        for branch in self.branches {
            network.add_branch(branch)?;
        }
        Ok(network)
    }

    pub fn from_json_str(content: &str) -> G74Result<Self> {
        serde_json::from_str(content).map_err(|e| G74Error::Parse(format!("case snapshot: {e}")))
    }

    pub fn to_json_string(&self) -> G74Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| G74Error::Parse(format!("case snapshot: {e}")))
    }

    pub fn read_json(path: &Path) -> G74Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn write_json(&self, path: &Path) -> G74Result<()> {
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}

/// Load a network from a JSON case snapshot file
pub fn load_network(path: &Path) -> G74Result<Network> {
    CaseSnapshot::read_json(path)?.into_network()
}
