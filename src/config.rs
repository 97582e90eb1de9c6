//! Configuration discovery and effective settings resolution.
//!
//! Reads `alert-harvester.toml` (or the file given with `--config`) and
//! merges it with CLI flags into an [`Effective`] config.
//! Defaults:
//! - `input.org_alerts`: `gh_org_dep_alerts.json`
//! - `input.repositories`: `gh_repo_data.json`
//! - `output.dir`: `.`
//! - `output.format`: `csv`
//! - `output.reports`: all, in workbook order
//! - `pipeline.timeout_secs`: 300
//!
//! Overrides precedence: CLI > config file > defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::analyze::traits::{ReportKind, UnknownReport};
use crate::cli::ReportArgs;

pub const DEFAULT_CONFIG_FILE: &str = "alert-harvester.toml";
pub const DEFAULT_ORG_ALERTS: &str = "gh_org_dep_alerts.json";
pub const DEFAULT_REPOSITORIES: &str = "gh_repo_data.json";
pub const JSON_WORKBOOK_FILE: &str = "gh_report.json";
pub const XLSX_WORKBOOK_FILE: &str = "gh_report.xlsx";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Config '{path}' is not valid TOML: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error(transparent)]
    UnknownReport(#[from] UnknownReport),
    #[error("unknown output format '{0}' (expected csv, xlsx or json)")]
    UnknownFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Xlsx,
    Json,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "xlsx" => Ok(OutputFormat::Xlsx),
            "json" => Ok(OutputFormat::Json),
            _ => Err(ConfigError::UnknownFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct InputCfg {
    pub org_alerts: Option<PathBuf>,
    pub repositories: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct OutputCfg {
    pub dir: Option<PathBuf>,
    pub format: Option<String>,
    pub reports: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct PipelineCfg {
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `alert-harvester.toml`.
pub struct HarvesterConfig {
    #[serde(default)]
    pub input: InputCfg,
    #[serde(default)]
    pub output: OutputCfg,
    #[serde(default)]
    pub pipeline: PipelineCfg,
}

#[derive(Debug, Clone, PartialEq)]
/// Fully-resolved settings used by the `report` command.
pub struct Effective {
    pub org_alerts: PathBuf,
    pub repositories: PathBuf,
    pub out_dir: PathBuf,
    pub format: OutputFormat,
    pub reports: Vec<ReportKind>,
    pub timeout: Duration,
}

impl Effective {
    /// JSON workbook location when `format` is JSON.
    pub fn json_workbook(&self) -> PathBuf {
        self.out_dir.join(JSON_WORKBOOK_FILE)
    }

    /// XLSX workbook location when `format` is XLSX.
    pub fn xlsx_workbook(&self) -> PathBuf {
        self.out_dir.join(XLSX_WORKBOOK_FILE)
    }
}

/// Load a config file.
pub fn load_config(path: &Path) -> Result<HarvesterConfig, ConfigError> {
    let display = path.display().to_string();
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: display.clone(),
        source,
    })?;
    toml::from_str(&s).map_err(|source| ConfigError::Parse {
        path: display,
        source,
    })
}

fn parse_reports(names: &[String]) -> Result<Vec<ReportKind>, ConfigError> {
    let mut reports = Vec::with_capacity(names.len());
    for name in names {
        let kind: ReportKind = name.parse()?;
        if !reports.contains(&kind) {
            reports.push(kind);
        }
    }
    Ok(reports)
}

/// Resolve [`Effective`] from CLI flags, the config file and defaults.
///
/// An explicit `--config` must exist; the default file in `cwd` is optional.
pub fn resolve_effective(args: &ReportArgs, cwd: &Path) -> Result<Effective, ConfigError> {
    let cfg = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            let default = cwd.join(DEFAULT_CONFIG_FILE);
            if default.exists() {
                load_config(&default)?
            } else {
                HarvesterConfig::default()
            }
        }
    };

    let org_alerts = args
        .org_alerts
        .clone()
        .or(cfg.input.org_alerts)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ORG_ALERTS));
    let repositories = args
        .repos
        .clone()
        .or(cfg.input.repositories)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_REPOSITORIES));
    let out_dir = args
        .out_dir
        .clone()
        .or(cfg.output.dir)
        .unwrap_or_else(|| PathBuf::from("."));

    let format = match args.format.as_deref().or(cfg.output.format.as_deref()) {
        Some(s) => s.parse()?,
        None => OutputFormat::Csv,
    };

    let reports = if !args.reports.is_empty() {
        parse_reports(&args.reports)?
    } else if let Some(names) = cfg.output.reports.as_ref() {
        parse_reports(names)?
    } else {
        ReportKind::ALL.to_vec()
    };

    let timeout_secs = args
        .timeout_secs
        .or(cfg.pipeline.timeout_secs)
        .unwrap_or(300);

    Ok(Effective {
        org_alerts,
        repositories,
        out_dir,
        format,
        reports,
        timeout: Duration::from_secs(timeout_secs),
    })
}
