//! # g74-algo: Transient fault studies with embedded load infeed
//!
//! - [`infeed`] - Equivalent machines for embedded load and their decay with time
//! - [`runner`] - Two-pass breaker duty study driven through a [`g74_core::FaultEngine`]
//! - [`combine`] - Merging both passes into the final result table
//! - [`schedule`] - Fault times studied and their classification
//! - [`machines`] - Fixes to existing machine data before a study
//! - [`config`] - TOML study configuration
//!
//! ## Example
//!
//! ```no_run
//! use g74_algo::{StudyConfig, StudyRequest, TransientStudyRunner};
//! use g74_core::Seconds;
//! use g74_io::{load_network, CommandEngine};
//! use std::path::Path;
//!
//! let network = load_network(Path::new("case.json"))?;
//! let engine = CommandEngine::new(network, "bkdy-engine");
//! let mut runner = TransientStudyRunner::new(engine, StudyConfig::default());
//!
//! let request = StudyRequest::new(vec![Seconds(0.0001), Seconds(0.01), Seconds(0.06)], "work");
//! let result = runner.run(&request)?;
//! println!("{} buses, {} unreliable", result.rows.len(), result.unreliable.len());
//! # Ok::<(), g74_core::G74Error>(())
//! ```

pub mod combine;
pub mod config;
pub mod infeed;
pub mod machines;
pub mod runner;
pub mod schedule;
pub mod test_utils;

pub use combine::{asymmetrical_current, ResultCombiner};
pub use config::{FaultTimeConfig, InfeedConfig, MachineDataConfig, ReportConfig, StudyConfig};
pub use infeed::{EquivalentMachine, InfeedModel, TierTemplate, VoltageTier};
pub use machines::{prepare_machines, MachineDataFixes};
pub use runner::{Pass, PassResult, StudyRequest, TransientStudyRunner};
pub use schedule::FaultSchedule;
