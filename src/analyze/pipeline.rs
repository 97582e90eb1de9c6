//! Report pipeline executor.
//!
//! [`ReportPipeline`] runs four sequential stages (Load → Normalize →
//! Aggregate → Write) with:
//! - Async execution via `tokio`, CPU-bound stages on the blocking pool
//! - A configurable timeout per stage
//! - Structured logging via `tracing`, including aggregator diagnostics

use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::analyze::aggregators::AggregationInput;
use crate::analyze::reduce::{group_org_alerts, normalize_repositories};
use crate::analyze::traits::{Report, ReportKind, SchemaError};
use crate::model::{OrgAlertsByRepo, ReposByKey};
use crate::traits::{Clock, ReportSink, SinkError, SnapshotSource, SourceError, SystemClock};

// ============================================================================
// Pipeline Types
// ============================================================================

/// Statistics about one pipeline run.
#[derive(Debug, Default, Clone)]
pub struct PipelineStats {
    /// Time spent on the entire run (milliseconds)
    pub total_duration_ms: u64,

    /// Time spent reading both snapshots (milliseconds)
    pub load_duration_ms: u64,

    /// Time spent reducing and grouping records (milliseconds)
    pub normalize_duration_ms: u64,

    /// Time spent building reports (milliseconds)
    pub aggregate_duration_ms: u64,

    /// Time spent handing reports to the sink (milliseconds)
    pub write_duration_ms: u64,

    /// Repositories in the repository snapshot
    pub repositories: usize,

    /// Alerts in the organisation feed
    pub org_alerts: usize,

    /// Alerts across all repositories of the repository snapshot
    pub repo_alerts: usize,

    /// Data rows written across all reports (headers excluded)
    pub rows_written: usize,
}

/// What was written for one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub kind: ReportKind,
    pub rows: usize,
    pub warnings: usize,
}

#[derive(Debug)]
pub struct PipelineOutcome {
    pub reports: Vec<ReportSummary>,
    pub stats: PipelineStats,
}

// ============================================================================
// Pipeline Errors
// ============================================================================

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// Stage execution exceeded timeout
    #[error("Stage '{stage}' timed out after {timeout_secs}s")]
    StageTimeout { stage: &'static str, timeout_secs: u64 },

    /// Snapshot could not be loaded
    #[error("Load failed: {0}")]
    Source(#[from] SourceError),

    /// A raw record does not match the expected shape
    #[error("Schema violation: {0}")]
    Schema(#[from] SchemaError),

    /// Report could not be written
    #[error("Write failed: {0}")]
    Sink(#[from] SinkError),

    /// Blocking stage task panicked or was cancelled
    #[error("Stage '{stage}' task failed: {message}")]
    TaskJoin { stage: &'static str, message: String },
}

// ============================================================================
// Pipeline Executor
// ============================================================================

/// Loads snapshots from `S`, builds the selected reports and writes them to `K`.
///
/// # Example
///
/// ```ignore
/// use alert_harvester::{CsvSink, JsonSnapshotStore, ReportPipeline};
///
/// let store = JsonSnapshotStore::new("gh_org_dep_alerts.json", "gh_repo_data.json");
/// let outcome = ReportPipeline::new(store, CsvSink::new("report"))
///     .with_timeout(Duration::from_secs(60))
///     .execute()
///     .await?;
/// println!("{} rows", outcome.stats.rows_written);
/// ```
pub struct ReportPipeline<S, K>
where
    S: SnapshotSource,
    K: ReportSink,
{
    source: S,
    sink: K,
    clock: Arc<dyn Clock>,
    reports: Vec<ReportKind>,

    /// Timeout for each stage (default: 5 minutes)
    stage_timeout: Duration,
}

impl<S, K> ReportPipeline<S, K>
where
    S: SnapshotSource,
    K: ReportSink,
{
    /// Default configuration: all reports, system clock, 5 minute stage timeout.
    pub fn new(source: S, sink: K) -> Self {
        Self {
            source,
            sink,
            clock: Arc::new(SystemClock),
            reports: ReportKind::ALL.to_vec(),
            stage_timeout: Duration::from_secs(300),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    /// Replaces the clock used to age open alerts.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Restricts the run to `reports`, written in the order given.
    pub fn with_reports(mut self, reports: impl IntoIterator<Item = ReportKind>) -> Self {
        self.reports = reports.into_iter().collect();
        self
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    fn timed_out(&self, stage: &'static str) -> PipelineError {
        PipelineError::StageTimeout {
            stage,
            timeout_secs: self.stage_timeout.as_secs(),
        }
    }

    /// Runs every stage once.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if a stage times out, a snapshot cannot be
    /// read, any raw record violates the schema, or the sink fails. Nothing
    /// is written when loading or normalization fails.
    pub async fn execute(&self) -> Result<PipelineOutcome, PipelineError> {
        let start = Instant::now();
        let mut stats = PipelineStats::default();

        // ====================================================================
        // Stage 1: Load
        // ====================================================================

        info!("Starting load stage");
        let stage_start = Instant::now();

        let (org_feed, repo_document) = timeout(self.stage_timeout, async {
            let org_feed = self.source.load_org_alerts().await?;
            let repo_document = self.source.load_repositories().await?;
            Ok::<_, SourceError>((org_feed, repo_document))
        })
        .await
        .map_err(|_| self.timed_out("load"))??;

        stats.load_duration_ms = stage_start.elapsed().as_millis() as u64;
        stats.org_alerts = org_feed.len();
        info!(
            duration_ms = stats.load_duration_ms,
            org_alerts = org_feed.len(),
            repositories = repo_document.len(),
            "Load completed"
        );

        // ====================================================================
        // Stage 2: Normalize
        // ====================================================================

        info!("Starting normalize stage");
        let stage_start = Instant::now();

        let (org_alerts, repos) = timeout(
            self.stage_timeout,
            tokio::task::spawn_blocking(move || normalize(&org_feed, &repo_document)),
        )
        .await
        .map_err(|_| self.timed_out("normalize"))?
        .map_err(|e| PipelineError::TaskJoin {
            stage: "normalize",
            message: e.to_string(),
        })??;

        stats.normalize_duration_ms = stage_start.elapsed().as_millis() as u64;
        stats.repositories = repos.len();
        stats.repo_alerts = repos.values().map(|r| r.dependabot_alerts.len()).sum();
        info!(
            duration_ms = stats.normalize_duration_ms,
            repositories = stats.repositories,
            repo_alerts = stats.repo_alerts,
            grouped_repositories = org_alerts.len(),
            "Normalize completed"
        );

        // ====================================================================
        // Stage 3: Aggregate
        // ====================================================================

        let now = self.clock.now();
        info!(now = %now, reports = self.reports.len(), "Starting aggregate stage");
        let stage_start = Instant::now();

        let kinds = self.reports.clone();
        let reports = timeout(
            self.stage_timeout,
            tokio::task::spawn_blocking(move || {
                let input = AggregationInput {
                    repos: &repos,
                    org_alerts: &org_alerts,
                    now,
                };
                kinds.iter().map(|k| k.build(&input)).collect::<Vec<Report>>()
            }),
        )
        .await
        .map_err(|_| self.timed_out("aggregate"))?
        .map_err(|e| PipelineError::TaskJoin {
            stage: "aggregate",
            message: e.to_string(),
        })?;

        stats.aggregate_duration_ms = stage_start.elapsed().as_millis() as u64;
        for report in &reports {
            log_diagnostics(report);
        }
        info!(duration_ms = stats.aggregate_duration_ms, "Aggregate completed");

        // ====================================================================
        // Stage 4: Write
        // ====================================================================

        info!("Starting write stage");
        let stage_start = Instant::now();

        let summaries = timeout(self.stage_timeout, async {
            let mut summaries = Vec::with_capacity(reports.len());
            for report in &reports {
                self.sink.write(report).await?;
                summaries.push(ReportSummary {
                    kind: report.kind,
                    rows: report.table.rows.len(),
                    warnings: report.diagnostics.iter().filter(|d| d.is_warning()).count(),
                });
            }
            self.sink.finish().await?;
            Ok::<_, SinkError>(summaries)
        })
        .await
        .map_err(|_| self.timed_out("write"))??;

        stats.write_duration_ms = stage_start.elapsed().as_millis() as u64;
        stats.rows_written = summaries.iter().map(|s| s.rows).sum();
        stats.total_duration_ms = start.elapsed().as_millis() as u64;
        info!(
            duration_ms = stats.write_duration_ms,
            rows = stats.rows_written,
            total_ms = stats.total_duration_ms,
            "Write completed"
        );

        Ok(PipelineOutcome {
            reports: summaries,
            stats,
        })
    }
}

fn normalize(
    org_feed: &[Value],
    repo_document: &Map<String, Value>,
) -> Result<(OrgAlertsByRepo, ReposByKey), SchemaError> {
    Ok((group_org_alerts(org_feed)?, normalize_repositories(repo_document)?))
}

fn log_diagnostics(report: &Report) {
    for diagnostic in &report.diagnostics {
        if diagnostic.is_warning() {
            warn!(report = %report.kind, "{}", diagnostic);
        } else {
            debug!(report = %report.kind, "{}", diagnostic);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::stats::whole_days_between;
    use crate::analyze::traits::Cell;
    use crate::sink::MemorySink;
    use crate::traits::FixedClock;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    // In-memory snapshot source for testing
    struct MockSource {
        org_alerts: Value,
        repositories: Value,
        delay: Option<Duration>,
    }

    impl MockSource {
        fn new(org_alerts: Value, repositories: Value) -> Self {
            Self {
                org_alerts,
                repositories,
                delay: None,
            }
        }
    }

    #[async_trait]
    impl SnapshotSource for MockSource {
        async fn load_org_alerts(&self) -> Result<Vec<Value>, SourceError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.org_alerts.as_array().cloned().unwrap_or_default())
        }

        async fn load_repositories(&self) -> Result<Map<String, Value>, SourceError> {
            Ok(self.repositories.as_object().cloned().unwrap_or_default())
        }
    }

    fn open_critical_alert() -> Value {
        json!({
            "number": 1,
            "state": "open",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
            "dependency": { "package": { "name": "x", "ecosystem": "go" }, "scope": "runtime" },
            "security_advisory": { "ghsa_id": "GHSA-1" },
            "security_vulnerability": { "severity": "critical" },
            "url": "u"
        })
    }

    fn single_repo_snapshot() -> Value {
        json!({
            "org/a": {
                "full_name": "org/a",
                "archived": false,
                "disabled": false,
                "private": true,
                "url": "https://api.example.com/repos/org/a",
                "dependabot_enabled": true,
                "languages": { "Go": 100 },
                "dependabot_alerts": [open_critical_alert()]
            }
        })
    }

    fn org_feed() -> Value {
        let mut alert = open_critical_alert();
        alert["repository"] = json!({ "full_name": "org/a", "url": "https://api.example.com/repos/org/a" });
        json!([alert])
    }

    #[tokio::test]
    async fn test_pipeline_end_to_end() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let pipeline = ReportPipeline::new(
            MockSource::new(org_feed(), single_repo_snapshot()),
            MemorySink::new(),
        )
        .with_clock(FixedClock(now));

        let outcome = pipeline.execute().await.unwrap();
        assert_eq!(outcome.reports.len(), ReportKind::ALL.len());
        assert_eq!(outcome.stats.repositories, 1);
        assert_eq!(outcome.stats.org_alerts, 1);
        assert_eq!(outcome.stats.repo_alerts, 1);

        let reports = pipeline.sink().reports().await;
        let names: Vec<_> = reports.iter().map(|r| r.sheet_name()).collect();
        assert_eq!(
            names,
            vec!["Overview", "ARepos", "AReposShort", "CompareOrgVsRepo", "Languages", "LanguageSummary"]
        );

        let short = &reports[2].table;
        assert_eq!(short.cell("org/a", "dep_cri_open"), Some(&Cell::Int(1)));
        for column in ["dep_cri_dismissed", "dep_cri_fixed", "dep_hig_open", "dep_hig_dismissed", "dep_hig_fixed"] {
            assert_eq!(short.cell("org/a", column), Some(&Cell::Int(0)), "{}", column);
        }

        let days = whole_days_between(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), now);
        assert_eq!(days, 60);
        let full = &reports[1].table;
        assert_eq!(full.cell("org/a", "dep_cri_open"), Some(&Cell::Int(1)));
        for column in full.header.iter().filter(|h| h.starts_with("dep_") && *h != "dep_cri_open") {
            assert_eq!(full.cell("org/a", column), Some(&Cell::Int(0)), "{}", column);
        }
        assert_eq!(
            full.header.iter().filter(|h| h.starts_with("dep_")).count(),
            12
        );
        assert_eq!(full.cell("org/a", "open_cri_max"), Some(&Cell::Int(days)));
        assert_eq!(full.cell("org/a", "open_cri_avg"), Some(&Cell::Float(days as f64)));

        let compare = &reports[3].table;
        assert_eq!(compare.cell("org/a", "org_dep_alerts"), Some(&Cell::Int(1)));
        assert_eq!(outcome.stats.rows_written, 8 + 1 + 1 + 1 + 1 + 1);
    }

    #[tokio::test]
    async fn test_pipeline_selected_reports() {
        let pipeline = ReportPipeline::new(
            MockSource::new(json!([]), single_repo_snapshot()),
            MemorySink::new(),
        )
        .with_reports([ReportKind::LanguageSummary, ReportKind::Overview]);

        let outcome = pipeline.execute().await.unwrap();
        let kinds: Vec<_> = outcome.reports.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![ReportKind::LanguageSummary, ReportKind::Overview]);
    }

    #[tokio::test]
    async fn test_pipeline_schema_violation_writes_nothing() {
        let mut repos = single_repo_snapshot();
        repos["org/a"]["dependabot_alerts"][0]
            .as_object_mut()
            .unwrap()
            .remove("dependency");
        let pipeline = ReportPipeline::new(MockSource::new(json!([]), repos), MemorySink::new());

        let err = pipeline.execute().await.unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));
        assert!(err.to_string().contains("org/a"));
        assert!(pipeline.sink().reports().await.is_empty());
    }

    #[tokio::test]
    async fn test_pipeline_load_timeout() {
        let mut source = MockSource::new(json!([]), json!({}));
        source.delay = Some(Duration::from_millis(200));
        let pipeline =
            ReportPipeline::new(source, MemorySink::new()).with_timeout(Duration::from_millis(10));

        let err = pipeline.execute().await.unwrap_err();
        assert!(matches!(err, PipelineError::StageTimeout { stage: "load", .. }));
    }
}
