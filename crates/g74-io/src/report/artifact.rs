//! Lifecycle of a report file written by the engine.
//!
//! A report is read once. With deletion enabled the file is removed right after
//! a successful parse; the parsed table stays cached on the artefact. Parsing a
//! deleted report again is an error rather than a silent empty result.

use std::fs;
use std::path::{Path, PathBuf};

use g74_core::{G74Error, G74Result, Seconds};
use tracing::{debug, error};

use super::{ReportParser, ReportTable};

#[derive(Debug, Clone)]
pub struct BreakerDutyReport {
    path: Option<PathBuf>,
    fault_time: Seconds,
    table: Option<ReportTable>,
}

impl BreakerDutyReport {
    pub fn new(path: impl Into<PathBuf>, fault_time: Seconds) -> Self {
        Self {
            path: Some(path.into()),
            fault_time,
            table: None,
        }
    }

    pub fn fault_time(&self) -> Seconds {
        self.fault_time
    }

    /// File location, `None` once deleted
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_deleted(&self) -> bool {
        self.path.is_none()
    }

    /// Table from the last successful parse
    pub fn table(&self) -> Option<&ReportTable> {
        self.table.as_ref()
    }

    /// Parse the report file, optionally deleting it afterwards.
    pub fn process(&mut self, parser: &ReportParser, delete: bool) -> G74Result<&ReportTable> {
        let Some(path) = self.path.clone() else {
            error!(
                fault_time = self.fault_time.value(),
                "report already deleted, refusing to parse again"
            );
            return Err(G74Error::ReportDeleted {
                fault_time: self.fault_time,
            });
        };

        let table = parser.parse_file(&path, self.fault_time)?;

        if delete {
            fs::remove_file(&path)?;
            debug!(path = %path.display(), "report deleted after parse");
            self.path = None;
        }

        Ok(&*self.table.insert(table))
    }
}
