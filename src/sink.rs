//! Report sinks: one CSV file per sheet, a single XLSX or JSON workbook, or
//! memory.

use async_trait::async_trait;
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::info;

use crate::analyze::traits::{Cell, Report};
use crate::traits::{ReportSink, SinkError};

/// Renders the header and every row as CSV.
pub fn render_csv(report: &Report) -> Result<Vec<u8>, SinkError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in report.table.records() {
        writer.write_record(&record)?;
    }
    writer
        .into_inner()
        .map_err(|e| SinkError::Io(e.into_error()))
}

/// Writes `<dir>/<sheet>.csv` for every report.
#[derive(Debug, Clone)]
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, report: &Report) -> PathBuf {
        self.dir.join(format!("{}.csv", report.sheet_name()))
    }
}

#[async_trait]
impl ReportSink for CsvSink {
    async fn write(&self, report: &Report) -> Result<(), SinkError> {
        let bytes = render_csv(report)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(report);
        tokio::fs::write(&path, bytes).await?;
        info!(path = %path.display(), rows = report.table.rows.len(), "CSV data written");
        Ok(())
    }
}

/// Collects every report into one JSON object keyed by sheet name and
/// writes it on [`ReportSink::finish`].
///
/// Each sheet is an array of rows with the header as row 0.
#[derive(Debug)]
pub struct JsonSink {
    path: PathBuf,
    sheets: Mutex<Map<String, Value>>,
}

impl JsonSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sheets: Mutex::new(Map::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ReportSink for JsonSink {
    async fn write(&self, report: &Report) -> Result<(), SinkError> {
        let mut rows = vec![serde_json::to_value(&report.table.header)?];
        for row in &report.table.rows {
            rows.push(serde_json::to_value(row)?);
        }
        self.sheets
            .lock()
            .await
            .insert(report.sheet_name().to_string(), Value::Array(rows));
        Ok(())
    }

    async fn finish(&self) -> Result<(), SinkError> {
        let sheets = self.sheets.lock().await;
        let bytes = serde_json::to_vec_pretty(&*sheets)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, bytes).await?;
        info!(path = %self.path.display(), sheets = sheets.len(), "JSON workbook written");
        Ok(())
    }
}

fn write_sheet(sheet: &mut Worksheet, report: &Report) -> Result<(), XlsxError> {
    sheet.set_name(report.sheet_name())?;
    for (col, title) in (0u16..).zip(&report.table.header) {
        sheet.write_string(0, col, title.as_str())?;
    }
    for (row, cells) in (1u32..).zip(&report.table.rows) {
        for (col, cell) in (0u16..).zip(cells) {
            match cell {
                Cell::Text(s) => sheet.write_string(row, col, s.as_str())?,
                Cell::Bool(b) => sheet.write_boolean(row, col, *b)?,
                Cell::Int(i) => sheet.write_number(row, col, *i as f64)?,
                Cell::Float(x) => sheet.write_number(row, col, *x)?,
            };
        }
    }
    Ok(())
}

/// Renders reports as one workbook, one worksheet per report in write order.
pub fn render_xlsx(reports: &[Report]) -> Result<Vec<u8>, SinkError> {
    let mut workbook = Workbook::new();
    for report in reports {
        write_sheet(workbook.add_worksheet(), report)?;
    }
    Ok(workbook.save_to_buffer()?)
}

/// Collects every report and writes a single `.xlsx` workbook on
/// [`ReportSink::finish`]. Header goes in row 0; booleans and numbers are
/// written as native cell types.
#[derive(Debug)]
pub struct XlsxSink {
    path: PathBuf,
    reports: Mutex<Vec<Report>>,
}

impl XlsxSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            reports: Mutex::new(Vec::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ReportSink for XlsxSink {
    async fn write(&self, report: &Report) -> Result<(), SinkError> {
        let mut reports = self.reports.lock().await;
        // A sheet name may appear only once per workbook.
        reports.retain(|r| r.kind != report.kind);
        reports.push(report.clone());
        Ok(())
    }

    async fn finish(&self) -> Result<(), SinkError> {
        let reports = self.reports.lock().await.clone();
        let sheets = reports.len();
        let bytes = tokio::task::spawn_blocking(move || render_xlsx(&reports)).await??;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, bytes).await?;
        info!(path = %self.path.display(), sheets, "XLSX workbook written");
        Ok(())
    }
}

/// Keeps reports in memory, mainly for embedding and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    reports: Mutex<Vec<Report>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn reports(&self) -> Vec<Report> {
        self.reports.lock().await.clone()
    }
}

#[async_trait]
impl ReportSink for MemorySink {
    async fn write(&self, report: &Report) -> Result<(), SinkError> {
        self.reports.lock().await.push(report.clone());
        Ok(())
    }
}
