//! Core types shared by the reduction and aggregation stages.
//!
//! - [`Table`] / [`Cell`]: the positional tabular output of every aggregator
//! - [`Report`]: one table plus the [`Diagnostic`]s produced while building it
//! - [`ReportKind`]: the fixed set of reports and their sheet names
//! - [`SchemaError`]: raised when a raw record does not match the expected shape

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Tables
// ============================================================================

/// One value in a report row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Int(i) => write!(f, "{}", i),
            // Debug keeps the fractional part: 4.0 renders as "4.0", not "4".
            Cell::Float(x) => write!(f, "{:?}", x),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<usize> for Cell {
    fn from(value: usize) -> Self {
        Cell::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

/// Header plus positionally aligned data rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new<I, S>(header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a data row, fitted to the header width: short rows are padded
    /// with empty text and surplus cells are dropped.
    pub fn push(&mut self, mut row: Vec<Cell>) {
        row.resize(self.header.len(), Cell::Text(String::new()));
        self.rows.push(row);
    }

    /// Finds the data row whose first cell is the text `key`.
    pub fn row(&self, key: &str) -> Option<&[Cell]> {
        self.rows
            .iter()
            .find(|r| matches!(r.first(), Some(Cell::Text(k)) if k == key))
            .map(Vec::as_slice)
    }

    /// Looks up the cell under `column` in the row keyed by `key`.
    pub fn cell(&self, key: &str, column: &str) -> Option<&Cell> {
        let col = self.header.iter().position(|h| h == column)?;
        self.row(key)?.get(col)
    }

    /// Header followed by data rows, every cell rendered as text.
    pub fn records(&self) -> Vec<Vec<String>> {
        std::iter::once(self.header.clone())
            .chain(
                self.rows
                    .iter()
                    .map(|r| r.iter().map(ToString::to_string).collect()),
            )
            .collect()
    }
}

// ============================================================================
// Reports
// ============================================================================

/// The reports this crate can build, in workbook order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReportKind {
    Overview,
    RepoFullOverview,
    RepoShortOverview,
    CompareOrgVsRepo,
    Languages,
    LanguageSummary,
}

impl ReportKind {
    pub const ALL: [ReportKind; 6] = [
        ReportKind::Overview,
        ReportKind::RepoFullOverview,
        ReportKind::RepoShortOverview,
        ReportKind::CompareOrgVsRepo,
        ReportKind::Languages,
        ReportKind::LanguageSummary,
    ];

    /// Sheet (or CSV file stem) the report is written to.
    pub fn sheet_name(self) -> &'static str {
        match self {
            ReportKind::Overview => "Overview",
            ReportKind::RepoFullOverview => "ARepos",
            ReportKind::RepoShortOverview => "AReposShort",
            ReportKind::CompareOrgVsRepo => "CompareOrgVsRepo",
            ReportKind::Languages => "Languages",
            ReportKind::LanguageSummary => "LanguageSummary",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sheet_name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown report '{0}'")]
pub struct UnknownReport(pub String);

impl FromStr for ReportKind {
    type Err = UnknownReport;

    /// Accepts sheet names, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportKind::ALL
            .into_iter()
            .find(|k| k.sheet_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownReport(s.to_string()))
    }
}

/// Something worth telling the operator about while building a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Diagnostic {
    /// Repository left out of a report that only covers active repositories.
    SkippedArchived { repository: String },

    /// State outside open/fixed/dismissed, counted as dismissed.
    UnknownState {
        repository: String,
        alert: u64,
        state: String,
    },

    /// Severity outside critical/high/medium/low, not counted.
    UnknownSeverity {
        repository: String,
        alert: u64,
        severity: String,
    },
}

impl Diagnostic {
    /// Diagnostics that may hide miscounts rather than plain bookkeeping.
    pub fn is_warning(&self) -> bool {
        !matches!(self, Diagnostic::SkippedArchived { .. })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::SkippedArchived { repository } => {
                write!(f, "{}: archived, skipped", repository)
            }
            Diagnostic::UnknownState {
                repository,
                alert,
                state,
            } => write!(
                f,
                "{}: alert {} has unknown state '{}', counted as dismissed",
                repository, alert, state
            ),
            Diagnostic::UnknownSeverity {
                repository,
                alert,
                severity,
            } => write!(
                f,
                "{}: alert {} has unknown severity '{}', not counted",
                repository, alert, severity
            ),
        }
    }
}

/// Output of one aggregator run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub kind: ReportKind,
    pub table: Table,
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    pub fn new(kind: ReportKind, table: Table) -> Self {
        Self {
            kind,
            table,
            diagnostics: Vec::new(),
        }
    }

    pub fn sheet_name(&self) -> &'static str {
        self.kind.sheet_name()
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// A raw record does not have the shape the reducers expect.
///
/// Always fatal: a missing field means the upstream contract changed and
/// every derived count would be silently wrong.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Record could not be decoded into its typed form
    #[error("{record}: {source}")]
    Malformed {
        record: String,
        #[source]
        source: serde_json::Error,
    },

    /// A required field is absent
    #[error("{record}: missing required field '{field}'")]
    MissingField { record: String, field: &'static str },

    /// A timestamp field is not RFC 3339
    #[error("{record}: invalid timestamp in '{field}': '{value}'")]
    InvalidTimestamp {
        record: String,
        field: &'static str,
        value: String,
    },
}
