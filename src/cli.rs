//! CLI argument parsing via `clap`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "alert-harvester",
    version,
    about = "Summarize dependency-alert snapshots into report tables",
    long_about = "Reads the organisation alert feed and per-repository snapshots written by the fetch step and derives the Overview, ARepos, AReposShort, CompareOrgVsRepo, Languages and LanguageSummary reports.\n\nConfiguration precedence: CLI > alert-harvester.toml > defaults.",
    after_help = "Examples:\n  alert-harvester report\n  alert-harvester report --org-alerts data/gh_org_dep_alerts.json --repos data/gh_repo_data.json --out-dir out\n  alert-harvester report --format xlsx --out-dir out\n  alert-harvester report --format json --report Overview --report ARepos",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version
    Version,
    /// Build reports from snapshots
    #[command(
        about = "Build reports",
        long_about = "Reduce both snapshots and write one table per report. CSV output writes <out-dir>/<Sheet>.csv; XLSX output writes <out-dir>/gh_report.xlsx with one worksheet per report; JSON output writes <out-dir>/gh_report.json."
    )]
    Report(ReportArgs),
}

#[derive(Args, Debug, Default, Clone)]
pub struct ReportArgs {
    #[arg(long, help = "Path to config file (default: ./alert-harvester.toml if present)")]
    pub config: Option<PathBuf>,
    #[arg(long, help = "Organisation alert feed (default: gh_org_dep_alerts.json)")]
    pub org_alerts: Option<PathBuf>,
    #[arg(long, help = "Repository snapshot (default: gh_repo_data.json)")]
    pub repos: Option<PathBuf>,
    #[arg(long, help = "Output directory (default: current dir)")]
    pub out_dir: Option<PathBuf>,
    #[arg(long, help = "Output format: csv|xlsx|json (default: csv)")]
    pub format: Option<String>,
    #[arg(long = "report", help = "Only build this report (sheet name); repeatable")]
    pub reports: Vec<String>,
    #[arg(long, help = "Per-stage timeout in seconds (default: 300)")]
    pub timeout_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_report_args() {
        let cli = Cli::try_parse_from([
            "alert-harvester",
            "-vv",
            "report",
            "--repos",
            "r.json",
            "--report",
            "Overview",
            "--report",
            "ARepos",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.cmd {
            Commands::Report(args) => {
                assert_eq!(args.repos, Some(PathBuf::from("r.json")));
                assert_eq!(args.reports, vec!["Overview", "ARepos"]);
                assert_eq!(args.format.as_deref(), Some("json"));
                assert!(args.org_alerts.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
