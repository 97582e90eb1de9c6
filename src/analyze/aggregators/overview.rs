use crate::analyze::traits::{Report, ReportKind, Table};
use crate::model::ReposByKey;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Counters {
    total: usize,
    archived: usize,
    private: usize,
    dependabot_enabled: usize,
    with_alerts: usize,
    with_open_alerts: usize,
}

/// Organisation-level counters, one `["repositories", label, value]` row each.
///
/// Archived repositories only contribute to `total` and `archived`; every
/// other counter looks at active repositories.
pub fn overview(repos: &ReposByKey) -> Report {
    let mut c = Counters::default();
    for repo in repos.values() {
        c.total += 1;
        if repo.archived {
            c.archived += 1;
            continue;
        }
        if repo.private {
            c.private += 1;
        }
        if repo.dependabot_enabled {
            c.dependabot_enabled += 1;
        }
        if !repo.dependabot_alerts.is_empty() {
            c.with_alerts += 1;
        }
        if repo.has_open_alerts() {
            c.with_open_alerts += 1;
        }
    }

    let active = c.total - c.archived;
    let public = active - c.private;

    let mut table = Table::new(["What", "Case", "Value"]);
    for (label, value) in [
        ("number of all", c.total),
        ("number of archived", c.archived),
        ("number of active", active),
        ("number of private", c.private),
        ("number of public", public),
        ("number of enabled dependabot", c.dependabot_enabled),
        ("number of repos with dependabot alerts", c.with_alerts),
        ("number of repos with open dependabot alerts", c.with_open_alerts),
    ] {
        table.push(vec!["repositories".into(), label.into(), value.into()]);
    }

    Report::new(ReportKind::Overview, table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::aggregators::fixtures::{alert, repo};
    use crate::analyze::traits::Cell;
    use crate::model::ReducedRepository;

    fn value(report: &Report, label: &str) -> i64 {
        let row = report
            .table
            .rows
            .iter()
            .find(|r| r[1] == Cell::from(label))
            .unwrap();
        match row[2] {
            Cell::Int(v) => v,
            ref other => panic!("unexpected cell {:?}", other),
        }
    }

    #[test]
    fn test_overview_counters() {
        let mut private_repo = repo("org/b", false, vec![alert("org/b", 1, "fixed", "low")]);
        private_repo.private = true;
        let repos: ReposByKey = vec![
            ("org/a".to_string(), repo("org/a", false, vec![alert("org/a", 1, "open", "high")])),
            ("org/b".to_string(), private_repo),
            ("org/c".to_string(), repo("org/c", false, vec![])),
            // Archived: open alerts and privacy do not count.
            ("org/old".to_string(), {
                let mut r = repo("org/old", true, vec![alert("org/old", 1, "open", "critical")]);
                r.private = true;
                r
            }),
        ]
        .into_iter()
        .collect();

        let report = overview(&repos);
        assert_eq!(report.table.header, vec!["What", "Case", "Value"]);
        assert_eq!(report.table.rows.len(), 8);
        assert!(report.table.rows.iter().all(|r| r[0] == Cell::from("repositories")));

        assert_eq!(value(&report, "number of all"), 4);
        assert_eq!(value(&report, "number of archived"), 1);
        assert_eq!(value(&report, "number of active"), 3);
        assert_eq!(value(&report, "number of private"), 1);
        assert_eq!(value(&report, "number of public"), 2);
        assert_eq!(value(&report, "number of enabled dependabot"), 2);
        assert_eq!(value(&report, "number of repos with dependabot alerts"), 2);
        assert_eq!(value(&report, "number of repos with open dependabot alerts"), 1);
    }

    #[test]
    fn test_overview_identities_hold_for_empty_input() {
        let repos: ReposByKey = Vec::<(String, ReducedRepository)>::new().into_iter().collect();
        let report = overview(&repos);
        assert_eq!(value(&report, "number of all"), 0);
        assert_eq!(
            value(&report, "number of active"),
            value(&report, "number of all") - value(&report, "number of archived")
        );
        assert_eq!(
            value(&report, "number of public"),
            value(&report, "number of active") - value(&report, "number of private")
        );
    }
}
