//! Diagnostics collected while a fault study runs.
//!
//! Many problems in a breaker duty study are recoverable: an overflow sentinel
//! in one bus section, a machine that could not be written, a bus above the
//! voltage range the infeed standard documents. These are collected here so the
//! caller can see them next to the result instead of only in the log.
//!
//! # Example
//!
//! ```
//! use g74_core::diagnostics::Diagnostics;
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning_with_entity("infeed", "Nominal voltage above documented range", "Bus 400");
//! diag.add_error("model", "System base is 50 MVA, expected 100 MVA");
//!
//! assert_eq!(diag.warning_count(), 1);
//! assert_eq!(diag.error_count(), 1);
//! assert_eq!(diag.summary(), "1 warning, 1 error");
//! ```

use serde::Serialize;

/// Severity level for diagnostic issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Study continued with an assumption or a coerced value
    Warning,
    /// Part of the study was skipped (e.g., a machine write failed)
    Error,
}

/// A single diagnostic issue
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    /// Category for grouping (e.g., "report", "infeed", "model", "schedule")
    pub category: String,
    pub message: String,
    /// Line in the report file the issue came from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Entity reference (e.g., "Bus 1301", "Machine LD at bus 1301")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl DiagnosticIssue {
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            line: None,
            entity: None,
        }
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

impl std::fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };

        write!(f, "[{}:{}] {}", severity, self.category, self.message)?;

        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }
        if let Some(line) = self.line {
            write!(f, " at line {}", line)?;
        }

        Ok(())
    }
}

/// Collection of diagnostic issues for one study
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, issue: DiagnosticIssue) {
        self.issues.push(issue);
    }

    pub fn add_warning(&mut self, category: &str, message: &str) {
        self.add(DiagnosticIssue::new(Severity::Warning, category, message));
    }

    /// Add a warning tied to a report line
    pub fn add_warning_at_line(&mut self, category: &str, message: &str, line: usize) {
        self.add(DiagnosticIssue::new(Severity::Warning, category, message).with_line(line));
    }

    pub fn add_warning_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.add(DiagnosticIssue::new(Severity::Warning, category, message).with_entity(entity));
    }

    pub fn add_error(&mut self, category: &str, message: &str) {
        self.add(DiagnosticIssue::new(Severity::Error, category, message));
    }

    pub fn add_error_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.add(DiagnosticIssue::new(Severity::Error, category, message).with_entity(entity));
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn issues_by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.category == category)
    }

    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
    }

    /// Merge another diagnostics into this one
    pub fn merge(&mut self, other: Diagnostics) {
        self.issues.extend(other.issues);
    }

    pub fn summary(&self) -> String {
        fn plural(n: usize, word: &str) -> String {
            format!("{} {}{}", n, word, if n == 1 { "" } else { "s" })
        }

        match (self.warning_count(), self.error_count()) {
            (0, 0) => "No issues".to_string(),
            (w, 0) => plural(w, "warning"),
            (0, e) => plural(e, "error"),
            (w, e) => format!("{}, {}", plural(w, "warning"), plural(e, "error")),
        }
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Diagnostics: {}", self.summary())?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}
