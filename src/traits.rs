use crate::analyze::traits::Report;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to read snapshot '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Snapshot '{path}' is not valid JSON: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Snapshot '{path}' has the wrong shape: expected {expected}")]
    Shape { path: String, expected: &'static str },
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("Workbook task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Provides the raw snapshots persisted by the fetch layer.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Ungrouped organisation-wide alert feed.
    async fn load_org_alerts(&self) -> Result<Vec<Value>, SourceError>;

    /// Repository records keyed by repository identifier, in document order.
    async fn load_repositories(&self) -> Result<Map<String, Value>, SourceError>;
}

/// Receives finished reports, one per sheet.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn write(&self, report: &Report) -> Result<(), SinkError>;

    /// Called once after the last report. Sinks that buffer flush here.
    async fn finish(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Wall-clock used to age open alerts.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
