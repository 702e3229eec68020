//! `SQLite` implementation of [`RuleStore`].

use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use adrules_app::ports::RuleStore;
use adrules_domain::account::AccountId;
use adrules_domain::error::RulesError;
use adrules_domain::id::RuleId;
use adrules_domain::rule::{Action, Conditions, Rule, SCHEMA_VERSION, Trigger};
use adrules_domain::time::Timestamp;

use crate::error::StorageError;

struct Wrapper {
    schema_version: i64,
    rule: Rule,
}

fn decode<E>(err: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(err))
}

fn parse_timestamp(value: &str) -> Result<Timestamp, sqlx::Error> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.to_utc())
        .map_err(decode)
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let schema_version: i64 = row.try_get("schema_version")?;
        let name: String = row.try_get("name")?;
        let account_id: String = row.try_get("account_id")?;
        let enabled: bool = row.try_get("enabled")?;
        let trigger_json: String = row.try_get("trigger_data")?;
        let conditions_json: String = row.try_get("conditions")?;
        let actions_json: String = row.try_get("actions")?;
        let created_at: String = row.try_get("created_at")?;
        let last_run_at: Option<String> = row.try_get("last_run_at")?;

        let id = RuleId::from_str(&id).map_err(decode)?;
        let trigger: Trigger = serde_json::from_str(&trigger_json).map_err(decode)?;
        let conditions: Conditions = serde_json::from_str(&conditions_json).map_err(decode)?;
        let actions: Vec<Action> = serde_json::from_str(&actions_json).map_err(decode)?;
        let created_at = parse_timestamp(&created_at)?;
        let last_run_at = last_run_at.as_deref().map(parse_timestamp).transpose()?;

        Ok(Self {
            schema_version,
            rule: Rule {
                id,
                name,
                account_id: AccountId::new(account_id),
                enabled,
                trigger,
                conditions,
                actions,
                created_at,
                last_run_at,
            },
        })
    }
}

/// `SQLite`-backed rule store.
///
/// Every save replaces the table contents inside one transaction, so a
/// failed save leaves the previous rule set intact.
pub struct SqliteRuleStore {
    pool: SqlitePool,
}

impl SqliteRuleStore {
    /// Create a new store backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn load(&self) -> Result<Vec<Rule>, StorageError> {
        let rows: Vec<Wrapper> = sqlx::query_as("SELECT * FROM rules ORDER BY position")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                if row.schema_version > i64::from(SCHEMA_VERSION) {
                    return Err(StorageError::UnsupportedSchemaVersion {
                        rule_id: row.rule.id.to_string(),
                        found: row.schema_version,
                        supported: SCHEMA_VERSION,
                    });
                }
                Ok(row.rule)
            })
            .collect()
    }

    async fn save(&self, rules: &[Rule]) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM rules").execute(&mut *tx).await?;

        for (position, rule) in rules.iter().enumerate() {
            let position = i64::try_from(position).unwrap_or(i64::MAX);
            let trigger_json = serde_json::to_string(&rule.trigger)?;
            let conditions_json = serde_json::to_string(&rule.conditions)?;
            let actions_json = serde_json::to_string(&rule.actions)?;

            sqlx::query(
                "INSERT INTO rules (id, position, schema_version, name, account_id, enabled, trigger_data, conditions, actions, created_at, last_run_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(rule.id.to_string())
            .bind(position)
            .bind(i64::from(SCHEMA_VERSION))
            .bind(&rule.name)
            .bind(rule.account_id.as_str())
            .bind(rule.enabled)
            .bind(&trigger_json)
            .bind(&conditions_json)
            .bind(&actions_json)
            .bind(rule.created_at.to_rfc3339())
            .bind(rule.last_run_at.map(|ts| ts.to_rfc3339()))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(count = rules.len(), "rules saved");
        Ok(())
    }
}

impl RuleStore for SqliteRuleStore {
    async fn load_all(&self) -> Result<Vec<Rule>, RulesError> {
        Ok(self.load().await?)
    }

    async fn save_all(&self, rules: &[Rule]) -> Result<(), RulesError> {
        Ok(self.save(rules).await?)
    }
}
