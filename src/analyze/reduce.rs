//! Reduction of raw snapshot records into their normalized forms.
//!
//! Validation happens here and only here: aggregators assume every reduced
//! record is complete.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::analyze::traits::SchemaError;
use crate::model::{
    Language, OrgAlertsByRepo, RawAlert, RawLanguages, RawRepository, ReducedAlert,
    ReducedRepository, ReposByKey,
};

/// Where an alert came from, which decides how its repository is identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOrigin<'a> {
    /// Organisation-wide feed: the alert embeds its `repository` object.
    Organisation,
    /// Per-repository feed: the caller knows the repository identifier.
    Repository(&'a str),
}

fn decode<T: DeserializeOwned>(value: &Value, record: &str) -> Result<T, SchemaError> {
    T::deserialize(value).map_err(|source| SchemaError::Malformed {
        record: record.to_string(),
        source,
    })
}

fn parse_timestamp(
    value: &str,
    field: &'static str,
    record: &str,
) -> Result<DateTime<Utc>, SchemaError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| SchemaError::InvalidTimestamp {
            record: record.to_string(),
            field,
            value: value.to_string(),
        })
}

/// Reduces one typed alert.
///
/// `record` labels the alert in error messages.
pub fn reduce_alert(
    raw: &RawAlert,
    origin: AlertOrigin<'_>,
    record: &str,
) -> Result<ReducedAlert, SchemaError> {
    let repository_url = match (&raw.repository, &raw.url) {
        (Some(repo), _) => repo.url.clone(),
        (None, Some(url)) => url.clone(),
        (None, None) => {
            return Err(SchemaError::MissingField {
                record: record.to_string(),
                field: "url",
            })
        }
    };

    let repository_full_name = match origin {
        AlertOrigin::Repository(key) => key.to_string(),
        AlertOrigin::Organisation => match &raw.repository {
            Some(repo) => repo.full_name.clone(),
            None => {
                return Err(SchemaError::MissingField {
                    record: record.to_string(),
                    field: "repository.full_name",
                })
            }
        },
    };

    Ok(ReducedAlert {
        number: raw.number,
        state: raw.state.clone(),
        created_at: parse_timestamp(&raw.created_at, "created_at", record)?,
        updated_at: parse_timestamp(&raw.updated_at, "updated_at", record)?,
        package: raw.dependency.package.name.clone(),
        ecosystem: raw.dependency.package.ecosystem.clone(),
        scope: raw.dependency.scope.clone(),
        ghsa_id: raw.security_advisory.ghsa_id.clone(),
        severity: raw.security_vulnerability.severity.clone(),
        repository_url,
        repository_full_name,
    })
}

/// Decodes and reduces one alert given as a loose JSON value.
pub fn reduce_alert_value(
    value: &Value,
    origin: AlertOrigin<'_>,
    record: &str,
) -> Result<ReducedAlert, SchemaError> {
    let raw: RawAlert = decode(value, record)?;
    reduce_alert(&raw, origin, record)
}

/// Groups the organisation-wide feed by `repository.full_name`.
///
/// Keys appear in first-seen order and alerts keep feed order inside each
/// group. Duplicate entries in the feed are kept as duplicates.
pub fn group_org_alerts(feed: &[Value]) -> Result<OrgAlertsByRepo, SchemaError> {
    let mut grouped = OrgAlertsByRepo::new();
    for (i, value) in feed.iter().enumerate() {
        let record = format!("organisation alert #{}", i);
        let alert = reduce_alert_value(value, AlertOrigin::Organisation, &record)?;
        grouped
            .entry(alert.repository_full_name.clone())
            .or_default()
            .push(alert);
    }
    Ok(grouped)
}

fn reduce_languages(raw: &RawLanguages) -> Vec<Language> {
    match raw {
        RawLanguages::Weighted(map) => map
            .iter()
            .map(|(name, weight)| Language {
                name: name.clone(),
                weight: weight.as_f64(),
            })
            .collect(),
        RawLanguages::Names(names) => names
            .iter()
            .map(|name| Language {
                name: name.clone(),
                weight: None,
            })
            .collect(),
    }
}

/// Reduces one typed repository, threading `key` into each of its alerts.
pub fn normalize_repository(
    key: &str,
    raw: &RawRepository,
) -> Result<ReducedRepository, SchemaError> {
    let record = format!("repository '{}'", key);

    let dependabot_alerts = if raw.dependabot_enabled {
        let alerts = raw
            .dependabot_alerts
            .as_ref()
            .ok_or_else(|| SchemaError::MissingField {
                record: record.clone(),
                field: "dependabot_alerts",
            })?;
        alerts
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let alert_record = format!("{} alert #{}", record, i);
                reduce_alert_value(value, AlertOrigin::Repository(key), &alert_record)
            })
            .collect::<Result<Vec<_>, _>>()?
    } else {
        Vec::new()
    };

    Ok(ReducedRepository {
        full_name: raw.full_name.clone(),
        archived: raw.archived,
        disabled: raw.disabled,
        private: raw.private,
        url: raw.url.clone(),
        languages: reduce_languages(&raw.languages),
        dependabot_enabled: raw.dependabot_enabled,
        dependabot_alerts,
    })
}

/// Reduces the whole per-repository snapshot, keeping document order.
pub fn normalize_repositories(document: &Map<String, Value>) -> Result<ReposByKey, SchemaError> {
    document
        .iter()
        .map(|(key, value)| -> Result<(String, ReducedRepository), SchemaError> {
            let raw: RawRepository = decode(value, &format!("repository '{}'", key))?;
            Ok((key.clone(), normalize_repository(key, &raw)?))
        })
        .collect()
}
