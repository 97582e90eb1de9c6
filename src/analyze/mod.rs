//! Analyze module - reduction of raw snapshots and report aggregation.
//!
//! - **Traits**: [`Table`], [`Report`], [`ReportKind`] and [`SchemaError`]
//! - **Reduce**: raw records → [`ReducedAlert`](crate::model::ReducedAlert) /
//!   [`ReducedRepository`](crate::model::ReducedRepository), org-feed grouping
//! - **Aggregators**: the six pure report builders
//! - **Stats**: max/average days open
//! - **Pipeline**: async executor via [`pipeline::ReportPipeline`]

pub mod aggregators;
pub mod pipeline;
pub mod reduce;
pub mod stats;
pub mod traits;

pub use traits::{Cell, Diagnostic, Report, ReportKind, SchemaError, Table, UnknownReport};

pub use pipeline::{PipelineError, PipelineOutcome, PipelineStats, ReportPipeline, ReportSummary};
