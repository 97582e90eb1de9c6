pub mod analyze;
pub mod cli;
pub mod config;
pub mod model;
pub mod sink;
pub mod store;
pub mod traits;

// Re-export common types for convenience
pub use analyze::{
    Cell, Diagnostic, PipelineError, PipelineOutcome, PipelineStats, Report, ReportKind,
    ReportPipeline, ReportSummary, SchemaError, Table,
};
pub use model::*;
pub use sink::{CsvSink, JsonSink, MemorySink, XlsxSink};
pub use store::JsonSnapshotStore;
pub use traits::*;
