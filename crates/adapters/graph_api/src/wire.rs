//! Provider payload shapes and their conversion into domain types.

use serde::Deserialize;
use serde_json::{Map, Value};

use adrules_domain::account::AccountId;
use adrules_domain::campaign::{Campaign, CampaignStatus};
use adrules_domain::metric::{Metric, MetricRecord};

use crate::error::GraphApiError;

/// Budgets are reported in cents (or the currency's minor unit).
const MINOR_UNITS_PER_MAJOR: f64 = 100.0;

#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

impl<T> Page<T> {
    pub fn next(&self) -> Option<&str> {
        self.paging.as_ref().and_then(|p| p.next.as_deref())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Paging {
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CampaignNode {
    pub id: Option<String>,
    pub name: Option<String>,
    pub effective_status: Option<String>,
    pub account_id: Option<String>,
    pub daily_budget: Option<Value>,
    pub insights: Option<Page<Map<String, Value>>>,
}

impl TryFrom<CampaignNode> for Campaign {
    type Error = GraphApiError;

    fn try_from(node: CampaignNode) -> Result<Self, Self::Error> {
        let id = node.id.ok_or(GraphApiError::MissingField("id"))?;
        let name = node.name.ok_or(GraphApiError::MissingField("name"))?;
        let status = node
            .effective_status
            .as_deref()
            .map(CampaignStatus::from_provider)
            .ok_or(GraphApiError::MissingField("effective_status"))?;

        let mut campaign = Campaign::new(id, name, status);
        campaign.account_id = node.account_id.map(AccountId::new);
        campaign.daily_budget = node
            .daily_budget
            .as_ref()
            .map(|v| number("daily_budget", v))
            .transpose()?
            .map(|minor| minor / MINOR_UNITS_PER_MAJOR);
        campaign.spend = node
            .insights
            .as_ref()
            .and_then(|page| page.data.first())
            .and_then(|row| row.get("spend"))
            .map(|v| number("spend", v))
            .transpose()?;
        Ok(campaign)
    }
}

/// Keep only the requested metrics of an insights row.
pub(crate) fn metric_record(
    row: &Map<String, Value>,
    fields: &[Metric],
) -> Result<MetricRecord, GraphApiError> {
    let mut record = MetricRecord::new();
    for metric in fields {
        let name = metric.field_name();
        if let Some(value) = row.get(name) {
            record.insert(name, number(name, value)?);
        }
    }
    Ok(record)
}

/// Numbers arrive either as JSON numbers or as decimal strings.
pub(crate) fn number(field: &str, value: &Value) -> Result<f64, GraphApiError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    };
    parsed.ok_or_else(|| GraphApiError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Extract `error.message` from a provider error body, falling back to the raw text.
pub(crate) fn error_message(body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => String::from_utf8_lossy(body).trim().to_string(),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateResponse {
    #[serde(default)]
    pub success: bool,
}
