use indexmap::IndexMap;
use std::collections::HashSet;

use crate::analyze::traits::{Cell, Diagnostic, Report, ReportKind, Table};
use crate::model::ReposByKey;

/// One row per (active repository, language) pair.
pub fn language_listing(repos: &ReposByKey) -> Report {
    let mut report = Report::new(ReportKind::Languages, Table::new(["full_name", "language"]));

    for (key, repo) in repos.iter() {
        if repo.archived {
            report.diagnostics.push(Diagnostic::SkippedArchived {
                repository: key.to_string(),
            });
            continue;
        }
        for language in &repo.languages {
            report
                .table
                .push(vec![key.as_str().into(), language.name.as_str().into()]);
        }
    }

    report
}

/// Number of active repositories using each language, in first-encounter order.
pub fn language_summary(repos: &ReposByKey) -> Report {
    let mut report = Report::new(
        ReportKind::LanguageSummary,
        Table::new(["language", "repo_count"]),
    );

    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for (key, repo) in repos.iter() {
        if repo.archived {
            report.diagnostics.push(Diagnostic::SkippedArchived {
                repository: key.to_string(),
            });
            continue;
        }
        // A repository counts once per language even if a name repeats.
        let mut seen = HashSet::new();
        for language in &repo.languages {
            if seen.insert(language.name.as_str()) {
                *counts.entry(language.name.as_str()).or_insert(0) += 1;
            }
        }
    }

    for (language, count) in counts.iter() {
        report.table.push(vec![Cell::from(*language), Cell::from(*count)]);
    }

    report
}
