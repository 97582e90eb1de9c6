//! Report builders.
//!
//! Each aggregator is a pure function of the normalized collections. Reports
//! that describe active state skip archived repositories; [`overview`] and
//! [`compare_org_vs_repo`] count them instead.

mod alerts;
mod compare;
mod languages;
mod overview;

pub use alerts::{full_overview, short_overview};
pub use compare::compare_org_vs_repo;
pub use languages::{language_listing, language_summary};
pub use overview::overview;

use chrono::{DateTime, Utc};

use crate::analyze::traits::{Report, ReportKind};
use crate::model::{OrgAlertsByRepo, ReposByKey};

/// Read-only inputs shared by every aggregator of one run.
#[derive(Debug, Clone, Copy)]
pub struct AggregationInput<'a> {
    pub repos: &'a ReposByKey,
    pub org_alerts: &'a OrgAlertsByRepo,
    /// Stands in for `updated_at` of alerts that are still open.
    pub now: DateTime<Utc>,
}

impl ReportKind {
    /// Builds this report from `input`.
    pub fn build(self, input: &AggregationInput<'_>) -> Report {
        match self {
            ReportKind::Overview => overview(input.repos),
            ReportKind::RepoFullOverview => full_overview(input.repos, input.now),
            ReportKind::RepoShortOverview => short_overview(input.repos),
            ReportKind::CompareOrgVsRepo => compare_org_vs_repo(input.repos, input.org_alerts),
            ReportKind::Languages => language_listing(input.repos),
            ReportKind::LanguageSummary => language_summary(input.repos),
        }
    }
}
