//! Per-repository state × severity cross-tabulations.

use chrono::{DateTime, Utc};

use crate::analyze::stats::{max_and_avg, whole_days_between};
use crate::analyze::traits::{Cell, Diagnostic, Report, ReportKind, Table};
use crate::model::{ReducedAlert, ReducedRepository, ReposByKey, Severity, StateBucket};

/// Alert counts indexed by [`StateBucket`] then [`Severity`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct BucketCounts([[usize; 4]; 3]);

impl BucketCounts {
    fn add(&mut self, bucket: StateBucket, severity: Severity) {
        self.0[bucket as usize][severity as usize] += 1;
    }

    fn get(&self, bucket: StateBucket, severity: Severity) -> usize {
        self.0[bucket as usize][severity as usize]
    }
}

/// Counts `alerts` and records a diagnostic for every state or severity
/// that was bucketed by fallback.
fn tally(repo_key: &str, alerts: &[ReducedAlert], diagnostics: &mut Vec<Diagnostic>) -> BucketCounts {
    let mut counts = BucketCounts::default();
    for alert in alerts {
        if !StateBucket::is_known(&alert.state) {
            diagnostics.push(Diagnostic::UnknownState {
                repository: repo_key.to_string(),
                alert: alert.number,
                state: alert.state.clone(),
            });
        }
        match alert.severity_level() {
            Some(severity) => counts.add(alert.bucket(), severity),
            None => diagnostics.push(Diagnostic::UnknownSeverity {
                repository: repo_key.to_string(),
                alert: alert.number,
                severity: alert.severity.clone(),
            }),
        }
    }
    counts
}

fn count_columns(severities: &[Severity]) -> Vec<String> {
    severities
        .iter()
        .flat_map(|s| {
            StateBucket::ALL
                .iter()
                .map(move |b| format!("dep_{}_{}", s.column_tag(), b.as_str()))
        })
        .collect()
}

fn leading_cells(key: &str, repo: &ReducedRepository) -> Vec<Cell> {
    vec![key.into(), repo.private.into(), repo.dependabot_enabled.into()]
}

fn push_counts(row: &mut Vec<Cell>, counts: &BucketCounts, severities: &[Severity]) {
    for &severity in severities {
        for bucket in StateBucket::ALL {
            row.push(counts.get(bucket, severity).into());
        }
    }
}

/// Days an alert has been open. Open alerts are measured up to `now`,
/// everything else up to its last update.
fn days_open(alert: &ReducedAlert, now: DateTime<Utc>) -> i64 {
    let end = if alert.is_open() { now } else { alert.updated_at };
    whole_days_between(alert.created_at, end)
}

/// Critical and high alerts of active repositories, split by open/dismissed/fixed.
pub fn short_overview(repos: &ReposByKey) -> Report {
    const SEVERITIES: [Severity; 2] = [Severity::Critical, Severity::High];

    let mut header = vec!["repo".to_string(), "private".into(), "dependabot".into()];
    header.extend(count_columns(&SEVERITIES));
    let mut report = Report::new(ReportKind::RepoShortOverview, Table::new(header));

    for (key, repo) in repos.iter() {
        if repo.archived {
            report.diagnostics.push(Diagnostic::SkippedArchived {
                repository: key.to_string(),
            });
            continue;
        }
        let counts = tally(key, &repo.dependabot_alerts, &mut report.diagnostics);
        let mut row = leading_cells(key, repo);
        push_counts(&mut row, &counts, &SEVERITIES);
        report.table.push(row);
    }

    report
}

/// Every severity of active repositories split by state, plus max/avg days
/// open for critical and high alerts.
///
/// `now` replaces `updated_at` for alerts that are still open, so the same
/// snapshot gives different durations on different days.
pub fn full_overview(repos: &ReposByKey, now: DateTime<Utc>) -> Report {
    let mut header = vec!["full_name".to_string(), "private".into(), "dependabot".into()];
    header.extend(count_columns(&Severity::ALL));
    header.extend(
        ["open_cri_max", "open_cri_avg", "open_hig_max", "open_hig_avg"].map(String::from),
    );
    let mut report = Report::new(ReportKind::RepoFullOverview, Table::new(header));

    for (key, repo) in repos.iter() {
        if repo.archived {
            report.diagnostics.push(Diagnostic::SkippedArchived {
                repository: key.to_string(),
            });
            continue;
        }
        let counts = tally(key, &repo.dependabot_alerts, &mut report.diagnostics);

        let days_for = |severity: Severity| -> Vec<i64> {
            repo.dependabot_alerts
                .iter()
                .filter(|a| a.severity_level() == Some(severity))
                .map(|a| days_open(a, now))
                .collect()
        };
        let critical = max_and_avg(&days_for(Severity::Critical));
        let high = max_and_avg(&days_for(Severity::High));

        let mut row = leading_cells(key, repo);
        push_counts(&mut row, &counts, &Severity::ALL);
        row.extend([
            Cell::from(critical.max),
            Cell::from(critical.avg),
            Cell::from(high.max),
            Cell::from(high.avg),
        ]);
        report.table.push(row);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::aggregators::fixtures::{alert, at, repo};

    fn int(report: &Report, key: &str, column: &str) -> i64 {
        match report.table.cell(key, column) {
            Some(Cell::Int(v)) => *v,
            other => panic!("{}/{}: unexpected {:?}", key, column, other),
        }
    }

    fn count_sum(report: &Report, key: &str) -> i64 {
        report
            .table
            .header
            .iter()
            .filter(|h| h.starts_with("dep_"))
            .map(|h| int(report, key, h))
            .sum()
    }

    fn mixed_repos() -> ReposByKey {
        vec![
            (
                "org/a".to_string(),
                repo(
                    "org/a",
                    false,
                    vec![
                        alert("org/a", 1, "open", "critical"),
                        alert("org/a", 2, "fixed", "critical"),
                        alert("org/a", 3, "dismissed", "high"),
                        alert("org/a", 4, "open", "medium"),
                        alert("org/a", 5, "fixed", "low"),
                        alert("org/a", 6, "auto_dismissed", "high"),
                    ],
                ),
            ),
            (
                "org/old".to_string(),
                repo("org/old", true, vec![alert("org/old", 1, "open", "critical")]),
            ),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_short_overview_counts_critical_and_high() {
        let report = short_overview(&mixed_repos());

        assert_eq!(
            report.table.header,
            vec![
                "repo", "private", "dependabot",
                "dep_cri_open", "dep_cri_dismissed", "dep_cri_fixed",
                "dep_hig_open", "dep_hig_dismissed", "dep_hig_fixed",
            ]
        );
        assert_eq!(report.table.rows.len(), 1);
        assert!(report.table.row("org/old").is_none());

        assert_eq!(int(&report, "org/a", "dep_cri_open"), 1);
        assert_eq!(int(&report, "org/a", "dep_cri_fixed"), 1);
        assert_eq!(int(&report, "org/a", "dep_cri_dismissed"), 0);
        // "auto_dismissed" falls into dismissed.
        assert_eq!(int(&report, "org/a", "dep_hig_dismissed"), 2);
        assert_eq!(int(&report, "org/a", "dep_hig_open"), 0);

        // Medium and low are not part of the short overview.
        assert!(count_sum(&report, "org/a") <= 6);
        assert_eq!(count_sum(&report, "org/a"), 4);

        assert!(report.diagnostics.contains(&Diagnostic::SkippedArchived {
            repository: "org/old".to_string()
        }));
        assert!(report.diagnostics.contains(&Diagnostic::UnknownState {
            repository: "org/a".to_string(),
            alert: 6,
            state: "auto_dismissed".to_string(),
        }));
    }

    #[test]
    fn test_full_overview_drops_no_alert() {
        let report = full_overview(&mixed_repos(), at(2024, 2, 1));

        assert_eq!(report.table.header.len(), 3 + 12 + 4);
        assert_eq!(count_sum(&report, "org/a"), 6);
        assert_eq!(int(&report, "org/a", "dep_med_open"), 1);
        assert_eq!(int(&report, "org/a", "dep_low_fixed"), 1);
    }

    #[test]
    fn test_full_overview_days_open() {
        // Fixture alerts are created 2024-01-01 and updated 2024-01-11.
        let report = full_overview(&mixed_repos(), at(2024, 2, 1));

        // Critical: open alert runs to now (31 days), fixed runs to update (10 days).
        assert_eq!(int(&report, "org/a", "open_cri_max"), 31);
        assert_eq!(
            report.table.cell("org/a", "open_cri_avg"),
            Some(&Cell::Float(20.5))
        );
        // High: both closed, 10 days each.
        assert_eq!(int(&report, "org/a", "open_hig_max"), 10);
        assert_eq!(
            report.table.cell("org/a", "open_hig_avg"),
            Some(&Cell::Float(10.0))
        );
    }

    #[test]
    fn test_full_overview_without_alerts_is_zero() {
        let repos: ReposByKey = vec![("org/empty".to_string(), repo("org/empty", false, vec![]))]
            .into_iter()
            .collect();
        let report = full_overview(&repos, at(2024, 2, 1));

        assert_eq!(int(&report, "org/empty", "open_cri_max"), 0);
        assert_eq!(
            report.table.cell("org/empty", "open_hig_avg"),
            Some(&Cell::Float(0.0))
        );
        assert_eq!(count_sum(&report, "org/empty"), 0);
    }

    #[test]
    fn test_unknown_severity_is_reported_not_counted() {
        let repos: ReposByKey = vec![(
            "org/a".to_string(),
            repo("org/a", false, vec![alert("org/a", 1, "open", "moderate")]),
        )]
        .into_iter()
        .collect();
        let report = full_overview(&repos, at(2024, 2, 1));

        assert_eq!(count_sum(&report, "org/a"), 0);
        assert_eq!(
            report.diagnostics,
            vec![Diagnostic::UnknownSeverity {
                repository: "org/a".to_string(),
                alert: 1,
                severity: "moderate".to_string(),
            }]
        );
    }
}
