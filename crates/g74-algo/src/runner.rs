//! Two-pass transient fault study.
//!
//! The engine's breaker duty method decrements the AC contribution of machines
//! but derives peak make and DC current from the same machine data. To get all
//! quantities relative to fault inception while still decaying the embedded
//! load infeed, every fault time runs twice:
//!
//! 1. **Initial pass**: equivalent machines at their t = 0 reactance. Ik'',
//!    peak, DC, R and X come from here.
//! 2. **Decrement pass**: equivalent machines at the reactance for the actual
//!    fault time. Only Ib sym comes from here.
//!
//! The passes are then merged by [`ResultCombiner`].

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use g74_core::{
    BreakerDutyRequest, BusId, Diagnostics, FaultEngine, FaultStudyResult, G74Error, G74Result,
    Seconds,
};
use g74_io::report::{BreakerDutyReport, ReportParser, ReportTable};
use tracing::{debug, error, info, warn};

use crate::combine::ResultCombiner;
use crate::config::StudyConfig;
use crate::infeed::InfeedModel;
use crate::machines::prepare_machines;
use crate::schedule::FaultSchedule;

/// What the caller wants studied.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyRequest {
    pub fault_times: Vec<Seconds>,
    /// Buses to fault; `None` faults every bus
    pub buses: Option<Vec<BusId>>,
    /// Buses whose load is connected at HV
    pub hv_buses: BTreeSet<BusId>,
    /// Remove report files once parsed
    pub delete_reports: bool,
    /// Directory reports are written to
    pub work_dir: PathBuf,
}

impl StudyRequest {
    pub fn new(fault_times: Vec<Seconds>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            fault_times,
            buses: None,
            hv_buses: BTreeSet::new(),
            delete_reports: true,
            work_dir: work_dir.into(),
        }
    }

    pub fn with_buses(mut self, buses: Vec<BusId>) -> Self {
        self.buses = Some(buses);
        self
    }

    pub fn with_hv_buses(mut self, hv_buses: impl IntoIterator<Item = BusId>) -> Self {
        self.hv_buses = hv_buses.into_iter().collect();
        self
    }

    pub fn keep_reports(mut self) -> Self {
        self.delete_reports = false;
        self
    }
}

/// The two calculation passes of a study.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Initial,
    Decrement,
}

impl Pass {
    pub fn file_stem(self) -> &'static str {
        match self {
            Pass::Initial => "fault_ik_init",
            Pass::Decrement => "fault_ik_decr",
        }
    }

    /// Report file for this pass at fault time `t`
    pub fn report_path(self, dir: &Path, t: Seconds) -> PathBuf {
        dir.join(format!("{}{:.5}.txt", self.file_stem(), t.value()))
    }

    fn purpose(self) -> &'static str {
        match self {
            Pass::Initial => "DC decay",
            Pass::Decrement => "the decremented AC component",
        }
    }
}

/// Parsed reports of one pass, in schedule order.
#[derive(Debug, Clone)]
pub struct PassResult {
    pub pass: Pass,
    pub tables: Vec<ReportTable>,
}

/// Runs studies against one engine.
pub struct TransientStudyRunner<E: FaultEngine> {
    engine: E,
    config: StudyConfig,
    parser: ReportParser,
}

impl<E: FaultEngine> TransientStudyRunner<E> {
    pub fn new(engine: E, config: StudyConfig) -> Self {
        let parser = ReportParser::new(config.report.current_unit);
        Self {
            engine,
            config,
            parser,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }

    pub fn config(&self) -> &StudyConfig {
        &self.config
    }

    /// Run a complete study.
    ///
    /// Fails on an unknown target bus (before any engine call), on an engine
    /// error for any fault time, and on unreadable reports. Machine write
    /// failures and overflowed values are recovered and show up in the
    /// result's diagnostics and unreliable set.
    pub fn run(&mut self, request: &StudyRequest) -> G74Result<FaultStudyResult> {
        let mut diag = Diagnostics::new();
        self.check_system_base(&mut diag);

        let buses = self.engine.bus_snapshot();
        if let Some(targets) = &request.buses {
            let known: BTreeSet<BusId> = buses.iter().map(|b| b.id).collect();
            if let Some(unknown) = targets.iter().find(|b| !known.contains(b)) {
                return Err(G74Error::UnknownBus(*unknown));
            }
            debug!(buses = ?targets, "target buses for fault analysis");
        } else {
            info!("No target buses given, every bus will be faulted");
        }

        prepare_machines(&mut self.engine, &self.config.machines, &mut diag);
        let mut infeed =
            InfeedModel::from_model(&self.engine, &self.config, &request.hv_buses, &mut diag);
        let schedule = FaultSchedule::build(&request.fault_times, &self.config.times, &mut diag);
        fs::create_dir_all(&request.work_dir)?;

        infeed.set_fault_time(Seconds::ZERO, &mut self.engine, &mut diag);
        let initial = self.run_pass(Pass::Initial, &schedule, request, &mut infeed, &mut diag)?;
        let decrement = self.run_pass(Pass::Decrement, &schedule, request, &mut infeed, &mut diag)?;

        let result = ResultCombiner::new(&schedule, self.config.report.current_unit).combine(
            &initial.tables,
            &decrement.tables,
            &buses,
            diag,
        );

        if !result.unreliable.is_empty() {
            let listing: Vec<String> = result.unreliable.iter().map(|b| b.to_string()).collect();
            warn!(
                "Fault currents at the following buses are unreliable and should not be used: {}",
                listing.join(", ")
            );
        }
        Ok(result)
    }

    /// One engine run per scheduled time. The decrement pass updates the
    /// equivalent machines before each run; the initial pass keeps them at
    /// inception. Each report is parsed (and deleted, if requested) before the
    /// next run starts.
    pub fn run_pass(
        &mut self,
        pass: Pass,
        schedule: &FaultSchedule,
        request: &StudyRequest,
        infeed: &mut InfeedModel,
        diag: &mut Diagnostics,
    ) -> G74Result<PassResult> {
        let mut tables = Vec::with_capacity(schedule.len());

        for &t in schedule.times() {
            if pass == Pass::Decrement {
                infeed.set_fault_time(t, &mut self.engine, diag);
            }

            let started = Instant::now();
            info!(
                "Calculating fault current {:.2} s after fault application to determine {}",
                t.value(),
                pass.purpose()
            );
            let duty = BreakerDutyRequest {
                fault_time: t,
                buses: request.buses.clone(),
                report: pass.report_path(&request.work_dir, t),
            };
            self.engine.breaker_duty(&duty).map_err(|status| {
                error!(
                    fault_time = t.value(),
                    "breaker duty calculation failed: {}", status
                );
                G74Error::EngineCalculation {
                    fault_time: t,
                    routine: status.routine,
                    code: status.code,
                }
            })?;
            info!(
                "Fault currents {:.2} s after application completed in {:.2} s",
                t.value(),
                started.elapsed().as_secs_f64()
            );

            let mut report = BreakerDutyReport::new(duty.report, t);
            tables.push(report.process(&self.parser, request.delete_reports)?.clone());
        }
        Ok(PassResult { pass, tables })
    }

    fn check_system_base(&self, diag: &mut Diagnostics) {
        let base = self.engine.system_base_mva().value();
        let expected = self.config.report.expected_base_mva;
        if (base - expected).abs() > f64::EPSILON {
            let message = format!(
                "System base is {:.1} MVA but results are expected on a {:.1} MVA base",
                base, expected
            );
            error!("{}", message);
            diag.add_error("model", &message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_paths() {
        let dir = Path::new("/tmp/study");
        assert_eq!(
            Pass::Initial.report_path(dir, Seconds(0.06)),
            PathBuf::from("/tmp/study/fault_ik_init0.06000.txt")
        );
        assert_eq!(
            Pass::Decrement.report_path(dir, Seconds(0.0001)),
            PathBuf::from("/tmp/study/fault_ik_decr0.00010.txt")
        );
    }

    #[test]
    fn test_request_builder() {
        let request = StudyRequest::new(vec![Seconds(0.06)], "work")
            .with_buses(vec![BusId::new(1)])
            .with_hv_buses([BusId::new(2)])
            .keep_reports();
        assert_eq!(request.buses, Some(vec![BusId::new(1)]));
        assert!(request.hv_buses.contains(&BusId::new(2)));
        assert!(!request.delete_reports);
    }
}
