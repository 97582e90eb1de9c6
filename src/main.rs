//! alert-harvester binary entry point.

use alert_harvester::cli::{Cli, Commands, ReportArgs};
use alert_harvester::config::{self, ConfigError, Effective, OutputFormat};
use alert_harvester::{
    CsvSink, JsonSink, JsonSnapshotStore, PipelineError, PipelineOutcome, ReportPipeline,
    ReportSink, XlsxSink,
};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("cannot determine working directory: {0}")]
    Cwd(#[from] std::io::Error),
}

async fn run_pipeline<K: ReportSink>(
    eff: &Effective,
    sink: K,
) -> Result<PipelineOutcome, PipelineError> {
    let store = JsonSnapshotStore::new(&eff.org_alerts, &eff.repositories);
    ReportPipeline::new(store, sink)
        .with_timeout(eff.timeout)
        .with_reports(eff.reports.iter().copied())
        .execute()
        .await
}

async fn handle_report(args: ReportArgs) -> Result<(), AppError> {
    let cwd = std::env::current_dir()?;
    let eff = config::resolve_effective(&args, &cwd)?;
    info!(
        org_alerts = %eff.org_alerts.display(),
        repositories = %eff.repositories.display(),
        out_dir = %eff.out_dir.display(),
        "Building reports"
    );

    let outcome = match eff.format {
        OutputFormat::Csv => run_pipeline(&eff, CsvSink::new(&eff.out_dir)).await?,
        OutputFormat::Xlsx => run_pipeline(&eff, XlsxSink::new(eff.xlsx_workbook())).await?,
        OutputFormat::Json => run_pipeline(&eff, JsonSink::new(eff.json_workbook())).await?,
    };

    for summary in &outcome.reports {
        if summary.warnings > 0 {
            println!(
                "{}: {} rows ({} warnings)",
                summary.kind, summary.rows, summary.warnings
            );
        } else {
            println!("{}: {} rows", summary.kind, summary.rows);
        }
    }
    info!(total_ms = outcome.stats.total_duration_ms, "Done");
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Report(args) => handle_report(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let exit_code = match e {
            AppError::Config(_) => 2,
            _ => 1,
        };
        std::process::exit(exit_code);
    }
}
