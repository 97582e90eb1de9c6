use crate::analyze::traits::{Report, ReportKind, Table};
use crate::model::{OrgAlertsByRepo, ReposByKey};

/// Per-repository alert count against the count seen in the organisation feed.
///
/// Covers every repository, archived or not. A repository missing from the
/// organisation feed has an organisation count of 0.
pub fn compare_org_vs_repo(repos: &ReposByKey, org_alerts: &OrgAlertsByRepo) -> Report {
    let mut table = Table::new([
        "full_name",
        "archived",
        "disabled",
        "private",
        "dep_enabled",
        "repo_dep_alerts",
        "org_dep_alerts",
    ]);

    for (key, repo) in repos.iter() {
        let org_count = org_alerts.get(key).map_or(0, Vec::len);
        table.push(vec![
            key.as_str().into(),
            repo.archived.into(),
            repo.disabled.into(),
            repo.private.into(),
            repo.dependabot_enabled.into(),
            repo.dependabot_alerts.len().into(),
            org_count.into(),
        ]);
    }

    Report::new(ReportKind::CompareOrgVsRepo, table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::aggregators::fixtures::{alert, repo};
    use crate::analyze::traits::Cell;

    #[test]
    fn test_compare_counts_both_sides() {
        let repos: ReposByKey = vec![
            (
                "org/a".to_string(),
                repo(
                    "org/a",
                    false,
                    vec![alert("org/a", 1, "open", "high"), alert("org/a", 2, "fixed", "low")],
                ),
            ),
            ("org/old".to_string(), repo("org/old", true, vec![])),
        ]
        .into_iter()
        .collect();
        let org_alerts: OrgAlertsByRepo = vec![
            ("org/a".to_string(), vec![alert("org/a", 1, "open", "high")]),
            ("org/unknown".to_string(), vec![alert("org/unknown", 9, "open", "low")]),
        ]
        .into_iter()
        .collect();

        let report = compare_org_vs_repo(&repos, &org_alerts);
        // Only repositories from the repository snapshot get a row.
        assert_eq!(report.table.rows.len(), 2);
        assert_eq!(report.table.cell("org/a", "repo_dep_alerts"), Some(&Cell::Int(2)));
        assert_eq!(report.table.cell("org/a", "org_dep_alerts"), Some(&Cell::Int(1)));
        assert_eq!(report.table.cell("org/old", "archived"), Some(&Cell::Bool(true)));
        assert_eq!(report.table.cell("org/old", "org_dep_alerts"), Some(&Cell::Int(0)));
        assert!(report.table.row("org/unknown").is_none());
    }
}
