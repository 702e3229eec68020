//! File-backed implementation of [`RuleStore`].

use std::path::{Path, PathBuf};

use serde_json::Value;

use adrules_app::ports::RuleStore;
use adrules_domain::error::RulesError;
use adrules_domain::rule::{Rule, RuleDocument, SCHEMA_VERSION};

use crate::error::JsonStoreError;

/// Stores the whole rule set as one JSON document.
///
/// A missing file reads as an empty rule set. A bare JSON array is accepted
/// as a legacy, unversioned document and is rewritten in the current format
/// on the next save.
#[derive(Debug, Clone)]
pub struct JsonFileRuleStore {
    path: PathBuf,
}

impl JsonFileRuleStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn load(&self) -> Result<Vec<Rule>, JsonStoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "rules file missing, starting empty");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(JsonStoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        decode(&bytes)
    }

    async fn save(&self, rules: &[Rule]) -> Result<(), JsonStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| JsonStoreError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let payload = serde_json::to_vec_pretty(&RuleDocument::new(rules.to_vec()))?;

        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, payload)
            .await
            .map_err(|source| JsonStoreError::Write {
                path: temp_path.clone(),
                source,
            })?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|source| JsonStoreError::Write {
                path: self.path.clone(),
                source,
            })?;

        tracing::debug!(path = %self.path.display(), count = rules.len(), "rules saved");
        Ok(())
    }
}

fn decode(bytes: &[u8]) -> Result<Vec<Rule>, JsonStoreError> {
    let value: Value = serde_json::from_slice(bytes)?;
    if value.is_array() {
        return Ok(serde_json::from_value(value)?);
    }

    let found = value
        .get("schema_version")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    if found > u64::from(SCHEMA_VERSION) {
        return Err(JsonStoreError::UnsupportedSchemaVersion {
            found,
            supported: SCHEMA_VERSION,
        });
    }

    let document: RuleDocument = serde_json::from_value(value)?;
    Ok(document.rules)
}

impl RuleStore for JsonFileRuleStore {
    async fn load_all(&self) -> Result<Vec<Rule>, RulesError> {
        Ok(self.load().await?)
    }

    async fn save_all(&self, rules: &[Rule]) -> Result<(), RulesError> {
        Ok(self.save(rules).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adrules_domain::id::RuleId;
    use adrules_domain::metric::Metric;
    use adrules_domain::rule::{Action, NewRule, Operator, Trigger};

    fn rule(name: &str) -> Rule {
        let new = NewRule::builder(
            name,
            "act_42",
            Trigger::Threshold {
                metric: Metric::Spend,
                operator: Operator::Greater,
                value: 100.0,
                check_interval_minutes: 30,
            },
        )
        .action(Action::Pause)
        .build();
        Rule::create(new, RuleId::new(), adrules_domain::time::now())
    }

    #[tokio::test]
    async fn should_return_empty_set_when_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileRuleStore::new(dir.path().join("rules.json"));

        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_load_saved_rules_when_reopened() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        let rules = vec![rule("one"), rule("two")];

        JsonFileRuleStore::new(&path).save_all(&rules).await.unwrap();
        let loaded = JsonFileRuleStore::new(&path).load_all().await.unwrap();

        assert_eq!(loaded, rules);
    }

    #[tokio::test]
    async fn should_write_versioned_document_when_saving() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileRuleStore::new(dir.path().join("rules.json"));

        store.save_all(&[rule("one")]).await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["schema_version"], 1);
        assert_eq!(value["rules"][0]["trigger"]["type"], "threshold");
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn should_create_parent_directory_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileRuleStore::new(dir.path().join("nested/data/rules.json"));

        store.save_all(&[rule("one")]).await.unwrap();

        assert_eq!(store.load_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_read_legacy_document_when_file_is_bare_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        let rules = vec![rule("legacy")];
        std::fs::write(&path, serde_json::to_vec(&rules).unwrap()).unwrap();

        let loaded = JsonFileRuleStore::new(&path).load_all().await.unwrap();

        assert_eq!(loaded, rules);
    }

    #[tokio::test]
    async fn should_fail_when_document_version_is_newer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"{"schema_version": 7, "rules": []}"#).unwrap();

        let err = JsonFileRuleStore::new(&path).load().await.unwrap_err();

        assert!(matches!(
            err,
            JsonStoreError::UnsupportedSchemaVersion { found: 7, .. }
        ));
    }

    #[tokio::test]
    async fn should_fail_when_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonFileRuleStore::new(&path).load_all().await.unwrap_err();

        assert!(matches!(err, RulesError::Persistence(_)));
    }

    #[tokio::test]
    async fn should_replace_previous_contents_when_saved_again() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileRuleStore::new(dir.path().join("rules.json"));
        store.save_all(&[rule("a"), rule("b")]).await.unwrap();

        store.save_all(&[]).await.unwrap();

        assert!(store.load_all().await.unwrap().is_empty());
    }
}
