//! Raw snapshot reader for the JSON files written by the fetch layer.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::traits::{SnapshotSource, SourceError};

/// Reads `gh_org_dep_alerts.json`-style and `gh_repo_data.json`-style files.
#[derive(Debug, Clone)]
pub struct JsonSnapshotStore {
    org_alerts: PathBuf,
    repositories: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(org_alerts: impl Into<PathBuf>, repositories: impl Into<PathBuf>) -> Self {
        Self {
            org_alerts: org_alerts.into(),
            repositories: repositories.into(),
        }
    }

    async fn read_json(path: &Path) -> Result<Value, SourceError> {
        let display = path.display().to_string();
        let bytes = tokio::fs::read(path).await.map_err(|source| SourceError::Io {
            path: display.clone(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| SourceError::Json {
            path: display,
            source,
        })
    }
}

#[async_trait]
impl SnapshotSource for JsonSnapshotStore {
    #[instrument(skip(self), fields(path = %self.org_alerts.display()))]
    async fn load_org_alerts(&self) -> Result<Vec<Value>, SourceError> {
        match Self::read_json(&self.org_alerts).await? {
            Value::Array(alerts) => {
                info!(count = alerts.len(), "Read organisation alerts");
                Ok(alerts)
            }
            _ => Err(SourceError::Shape {
                path: self.org_alerts.display().to_string(),
                expected: "an array of alerts",
            }),
        }
    }

    #[instrument(skip(self), fields(path = %self.repositories.display()))]
    async fn load_repositories(&self) -> Result<Map<String, Value>, SourceError> {
        match Self::read_json(&self.repositories).await? {
            Value::Object(repos) => {
                info!(count = repos.len(), "Read repositories");
                Ok(repos)
            }
            _ => Err(SourceError::Shape {
                path: self.repositories.display().to_string(),
                expected: "an object keyed by repository",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_loads_both_documents_in_order() {
        let dir = tempdir().unwrap();
        let alerts = dir.path().join("alerts.json");
        let repos = dir.path().join("repos.json");
        std::fs::write(&alerts, r#"[{"number": 1}, {"number": 2}]"#).unwrap();
        std::fs::write(&repos, r#"{"org/z": {}, "org/a": {}}"#).unwrap();

        let store = JsonSnapshotStore::new(&alerts, &repos);
        assert_eq!(store.load_org_alerts().await.unwrap().len(), 2);
        let loaded = store.load_repositories().await.unwrap();
        assert_eq!(loaded.keys().collect::<Vec<_>>(), vec!["org/z", "org/a"]);
    }

    #[tokio::test]
    async fn test_wrong_shape_and_missing_file() {
        let dir = tempdir().unwrap();
        let alerts = dir.path().join("alerts.json");
        std::fs::write(&alerts, r#"{"not": "a list"}"#).unwrap();

        let store = JsonSnapshotStore::new(&alerts, dir.path().join("missing.json"));
        assert!(matches!(
            store.load_org_alerts().await,
            Err(SourceError::Shape { .. })
        ));
        assert!(matches!(
            store.load_repositories().await,
            Err(SourceError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let dir = tempdir().unwrap();
        let repos = dir.path().join("repos.json");
        std::fs::write(&repos, "{ nope").unwrap();

        let store = JsonSnapshotStore::new(dir.path().join("a.json"), &repos);
        assert!(matches!(
            store.load_repositories().await,
            Err(SourceError::Json { .. })
        ));
    }
}
