//! Fault engine backed by an external executable.
//!
//! For each breaker duty request the current model is written as a JSON case
//! snapshot next to the requested report path, then the executable runs as
//!
//! ```text
//! <program> [args..] --case <case.json> --fault-time <seconds> --report <report> [--buses 1301,1302]
//! ```
//!
//! and must leave the report file behind. Any non-zero exit status fails the run.
//! The snapshot is removed once the executable exits unless
//! [`CommandEngine::keep_cases`] was set.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use g74_core::{
    BreakerDutyRequest, Bus, BusId, BusType, FaultEngine, Load, Machine, MegavoltAmperes, Network,
    NetworkModel, RoutineStatus,
};
use tracing::{debug, error, warn};

use crate::case::CaseSnapshot;

const ROUTINE: &str = "breaker_duty";

/// Exit code used when the process could not be started or was killed
const NO_EXIT_CODE: i32 = -1;

#[derive(Debug)]
pub struct CommandEngine {
    network: Network,
    program: PathBuf,
    args: Vec<String>,
    keep_cases: bool,
}

impl CommandEngine {
    pub fn new(network: Network, program: impl Into<PathBuf>) -> Self {
        Self {
            network,
            program: program.into(),
            args: Vec::new(),
            keep_cases: false,
        }
    }

    /// Extra arguments placed before the request arguments
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Leave each case snapshot next to its report after the run
    pub fn keep_cases(mut self) -> Self {
        self.keep_cases = true;
        self
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn into_network(self) -> Network {
        self.network
    }

    /// Case snapshot path for a report path
    pub fn case_path(report: &Path) -> PathBuf {
        report.with_extension("case.json")
    }

    fn command(&self, request: &BreakerDutyRequest, case: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--case")
            .arg(case)
            .arg("--fault-time")
            .arg(request.fault_time.value().to_string())
            .arg("--report")
            .arg(&request.report);
        if let Some(buses) = &request.buses {
            let list = buses
                .iter()
                .map(BusId::to_string)
                .collect::<Vec<_>>()
                .join(",");
            cmd.arg("--buses").arg(list);
        }
        cmd
    }

    fn run_program(&self, request: &BreakerDutyRequest, case: &Path) -> Result<(), RoutineStatus> {
        let mut cmd = self.command(request, case);
        debug!(command = ?cmd, "running fault engine");

        let status = cmd.status().map_err(|e| {
            error!(program = %self.program.display(), "failed to start fault engine: {e}");
            RoutineStatus::new(ROUTINE, NO_EXIT_CODE)
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(RoutineStatus::new(
                ROUTINE,
                status.code().unwrap_or(NO_EXIT_CODE),
            ))
        }
    }
}

impl NetworkModel for CommandEngine {
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
        self.network.write_machine(machine)
    }
}

impl FaultEngine for CommandEngine {
    fn breaker_duty(&mut self, request: &BreakerDutyRequest) -> Result<(), RoutineStatus> {
        let case = Self::case_path(&request.report);
        CaseSnapshot::from_network(&self.network)
            .write_json(&case)
            .map_err(|e| {
                error!(case = %case.display(), "writing case snapshot failed: {e}");
                RoutineStatus::new("case_snapshot", NO_EXIT_CODE)
            })?;

        let outcome = self.run_program(request, &case);
        if !self.keep_cases {
            if let Err(e) = fs::remove_file(&case) {
                warn!(case = %case.display(), "could not remove case snapshot: {e}");
            }
        }
        outcome
    }
}
