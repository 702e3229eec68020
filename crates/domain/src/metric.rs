//! Performance metrics reported by the ads provider.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A performance metric a threshold trigger can watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Spend,
    Impressions,
    Clicks,
    Reach,
    Ctr,
    Cpc,
    Cpm,
    Frequency,
    Conversions,
}

impl Metric {
    /// Name of the provider field this metric is read from.
    #[must_use]
    pub fn field_name(self) -> &'static str {
        match self {
            Self::Spend => "spend",
            Self::Impressions => "impressions",
            Self::Clicks => "clicks",
            Self::Reach => "reach",
            Self::Ctr => "ctr",
            Self::Cpc => "cpc",
            Self::Cpm => "cpm",
            Self::Frequency => "frequency",
            Self::Conversions => "conversions",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Object level a metric query is aggregated at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricLevel {
    Account,
    Campaign,
    Adset,
    Ad,
}

impl MetricLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Campaign => "campaign",
            Self::Adset => "adset",
            Self::Ad => "ad",
        }
    }
}

/// Reporting window of a metric query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateWindow {
    Today,
    Yesterday,
    #[serde(rename = "last_7d")]
    Last7Days,
    #[serde(rename = "last_30d")]
    Last30Days,
    Lifetime,
}

impl DateWindow {
    /// Provider `date_preset` value.
    #[must_use]
    pub fn as_preset(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Yesterday => "yesterday",
            Self::Last7Days => "last_7d",
            Self::Last30Days => "last_30d",
            Self::Lifetime => "maximum",
        }
    }
}

/// A metric request for one campaign or account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricQuery {
    /// Campaign id or (normalized) account id.
    pub object_id: String,
    pub level: MetricLevel,
    pub window: DateWindow,
    pub fields: Vec<Metric>,
}

impl MetricQuery {
    /// Today's value of a single metric for a campaign.
    #[must_use]
    pub fn campaign_today(campaign_id: impl Into<String>, metric: Metric) -> Self {
        Self {
            object_id: campaign_id.into(),
            level: MetricLevel::Campaign,
            window: DateWindow::Today,
            fields: vec![metric],
        }
    }
}

/// One row of metric values keyed by provider field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricRecord(BTreeMap<String, f64>);

impl MetricRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: f64) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: f64) {
        self.0.insert(field.into(), value);
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<f64> {
        self.0.get(field).copied()
    }

    #[must_use]
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        self.get(metric.field_name())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_read_metric_by_field_name() {
        let record = MetricRecord::new().with("spend", 12.5).with("ctr", 1.2);
        assert_eq!(record.metric(Metric::Spend), Some(12.5));
        assert_eq!(record.metric(Metric::Ctr), Some(1.2));
        assert_eq!(record.metric(Metric::Cpc), None);
    }

    #[test]
    fn should_build_campaign_today_query() {
        let query = MetricQuery::campaign_today("42", Metric::Cpm);
        assert_eq!(query.level, MetricLevel::Campaign);
        assert_eq!(query.window, DateWindow::Today);
        assert_eq!(query.fields, vec![Metric::Cpm]);
    }

    #[test]
    fn should_deserialize_metric_names() {
        let metric: Metric = serde_json::from_str("\"frequency\"").unwrap();
        assert_eq!(metric, Metric::Frequency);
        assert!(serde_json::from_str::<Metric>("\"cost\"").is_err());
    }

    #[test]
    fn should_map_windows_to_presets() {
        assert_eq!(DateWindow::Last7Days.as_preset(), "last_7d");
        assert_eq!(DateWindow::Lifetime.as_preset(), "maximum");
        let json = serde_json::to_string(&DateWindow::Last30Days).unwrap();
        assert_eq!(json, "\"last_30d\"");
    }
}
