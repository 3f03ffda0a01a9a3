//! Unified error type for fault studies
//!
//! Every library crate in the workspace returns [`G74Error`]. Per-bus problems
//! that a study recovers from (numeric overflow in a report, a failed machine
//! write) are carried as diagnostics and unreliable flags instead.
//!
//! # Example
//!
//! ```
//! use g74_core::{BusId, G74Error, G74Result};
//!
//! fn check_target(known: &[BusId], bus: BusId) -> G74Result<()> {
//!     if known.contains(&bus) {
//!         Ok(())
//!     } else {
//!         Err(G74Error::UnknownBus(bus))
//!     }
//! }
//!
//! assert!(check_target(&[BusId::new(1301)], BusId::new(1301)).is_ok());
//! assert!(check_target(&[BusId::new(1301)], BusId::new(7)).is_err());
//! ```

use crate::units::Seconds;
use crate::BusId;
use thiserror::Error;

/// Unified error type for all fault study operations.
#[derive(Error, Debug)]
pub enum G74Error {
    /// I/O errors (report files, case snapshots, config files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A report line held the wrong number of values and no overflow sentinel
    /// explains the difference. Usually means the engine's output layout changed.
    #[error("Report format error at line {line}: expected {expected} values, found {found}")]
    ReportFormat {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// The report file was deleted after its first parse
    #[error("Report for fault time {fault_time} was deleted and cannot be parsed again")]
    ReportDeleted { fault_time: Seconds },

    /// The external engine returned a non-zero status for a fault time
    #[error("Fault calculation at {fault_time} failed: {routine} returned status {code}")]
    EngineCalculation {
        fault_time: Seconds,
        routine: String,
        code: i32,
    },

    /// Writing machine data into the network model failed
    #[error("Writing machine data at bus {bus} failed: {routine} returned status {code}")]
    ModelWrite {
        bus: BusId,
        routine: String,
        code: i32,
    },

    /// A requested bus is not present in the network model
    #[error("Bus {0} is not in the network model")]
    UnknownBus(BusId),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convenience type alias for Results using G74Error.
pub type G74Result<T> = Result<T, G74Error>;

impl From<String> for G74Error {
    fn from(s: String) -> Self {
        G74Error::Parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = G74Error::ReportFormat {
            line: 12,
            expected: 7,
            found: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("line 12"));
        assert!(msg.contains("expected 7"));
        assert!(msg.contains("found 5"));
    }

    #[test]
    fn test_engine_error_display() {
        let err = G74Error::EngineCalculation {
            fault_time: Seconds(0.06),
            routine: "breaker_duty".into(),
            code: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("breaker_duty"));
        assert!(msg.contains("status 3"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "report missing");
        let err: G74Error = io_err.into();
        assert!(matches!(err, G74Error::Io(_)));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> G74Result<()> {
            Err(G74Error::UnknownBus(BusId::new(42)))
        }

        fn outer() -> G74Result<()> {
            inner()?;
            Ok(())
        }

        let err = outer().unwrap_err();
        assert_eq!(err.to_string(), "Bus 42 is not in the network model");
    }
}
