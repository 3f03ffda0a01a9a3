//! # g74-io: Report parsing and case I/O
//!
//! - [`report`] - Breaker duty report parser and report file lifecycle
//! - [`case`] - JSON case snapshots of the network model
//! - [`export`] - CSV and JSON export of combined study results
//! - [`engine`] - [`g74_core::FaultEngine`] backed by an external executable
//!
//! ## Quick Start
//!
//! ```rust
//! use g74_core::{BusId, CurrentUnit, Seconds};
//! use g74_io::report::ReportParser;
//!
//! let report = " FAULTED BUS\n   17 [B17  11.000]\n\
//!   FAULT CURRENT   5210.0  -78.40   4900.5  -78.30    610.2   4938.3  12044.7\n\
//!   THEVENIN IMPEDANCE  0.02468  0.24690  0.9950  10.00    640.8   4941.6  12101.2\n";
//!
//! let table = ReportParser::new(CurrentUnit::Kiloamps)
//!     .parse_str(report, Seconds(0.01))
//!     .unwrap();
//! let record = table.record(BusId::new(17)).unwrap();
//! assert!((record.peak() - 12.1012).abs() < 1e-9);
//! ```

pub mod case;
pub mod engine;
pub mod export;
pub mod report;

pub use case::{load_network, CaseSnapshot};
pub use engine::CommandEngine;
pub use report::{BreakerDutyReport, ReportParser, ReportRecord, ReportTable};
