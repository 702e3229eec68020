//! HTTP client implementing [`CampaignClient`].

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use adrules_app::ports::CampaignClient;
use adrules_domain::account::AccountId;
use adrules_domain::campaign::{Campaign, TargetStatus};
use adrules_domain::error::UpstreamError;
use adrules_domain::metric::{MetricQuery, MetricRecord};

use crate::error::GraphApiError;
use crate::wire::{self, CampaignNode, Page, UpdateResponse};

const CAMPAIGN_FIELDS: &str =
    "id,name,effective_status,account_id,daily_budget,insights.date_preset(today){spend}";

/// Connection settings for the Graph API.
#[derive(Debug, Clone)]
pub struct Config {
    /// e.g. `https://graph.facebook.com`
    pub base_url: String,
    /// e.g. `v19.0`
    pub api_version: String,
    pub access_token: String,
    /// Page size requested when listing campaigns.
    pub page_limit: u32,
    /// Per-request timeout enforced by the HTTP client.
    pub timeout: Duration,
}

impl Config {
    /// Build a [`GraphApiClient`] from this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GraphApiError::Setup`] if the HTTP client cannot be built.
    pub fn build(self) -> Result<GraphApiClient, GraphApiError> {
        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(GraphApiError::Setup)?;
        Ok(GraphApiClient { config: self, http })
    }
}

/// Campaign data client talking to a Graph-style ads API.
#[derive(Debug, Clone)]
pub struct GraphApiClient {
    config: Config,
    http: reqwest::Client,
}

impl GraphApiClient {
    fn url(&self, object: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.api_version,
            object
        )
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GraphApiError> {
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(GraphApiError::Api {
                status: status.as_u16(),
                message: wire::error_message(&body),
            });
        }
        Ok(serde_json::from_slice(&body)?)
    }

    async fn fetch_campaigns(&self, account_id: &AccountId) -> Result<Vec<Campaign>, GraphApiError> {
        let limit = self.config.page_limit.to_string();
        let first = self
            .http
            .get(self.url(&format!("{account_id}/campaigns")))
            .query(&[
                ("fields", CAMPAIGN_FIELDS),
                ("limit", limit.as_str()),
                ("access_token", self.config.access_token.as_str()),
            ])
            .send()
            .await?;
        let mut page: Page<CampaignNode> = Self::read(first).await?;

        let mut campaigns = Vec::new();
        loop {
            let next = page.next().map(ToString::to_string);
            for node in page.data {
                campaigns.push(Campaign::try_from(node)?);
            }
            let Some(next) = next else {
                break;
            };
            tracing::debug!(count = campaigns.len(), "fetching next campaign page");
            page = Self::read(self.http.get(next).send().await?).await?;
        }

        Ok(campaigns)
    }

    async fn fetch_metrics(&self, query: &MetricQuery) -> Result<Vec<MetricRecord>, GraphApiError> {
        let fields = query
            .fields
            .iter()
            .map(|m| m.field_name())
            .collect::<Vec<_>>()
            .join(",");
        let response = self
            .http
            .get(self.url(&format!("{}/insights", query.object_id)))
            .query(&[
                ("level", query.level.as_str()),
                ("date_preset", query.window.as_preset()),
                ("fields", fields.as_str()),
                ("access_token", self.config.access_token.as_str()),
            ])
            .send()
            .await?;
        let page: Page<Map<String, Value>> = Self::read(response).await?;

        page.data
            .iter()
            .map(|row| wire::metric_record(row, &query.fields))
            .collect()
    }

    async fn update_status(&self, campaign_id: &str, status: TargetStatus) -> Result<(), GraphApiError> {
        let response = self
            .http
            .post(self.url(campaign_id))
            .form(&[
                ("status", status.as_provider_str()),
                ("access_token", self.config.access_token.as_str()),
            ])
            .send()
            .await?;
        let outcome: UpdateResponse = Self::read(response).await?;
        if !outcome.success {
            return Err(GraphApiError::InvalidValue {
                field: "success".to_string(),
                value: "false".to_string(),
            });
        }
        Ok(())
    }
}

impl CampaignClient for GraphApiClient {
    #[tracing::instrument(skip_all, fields(account_id = %account_id))]
    async fn list_campaigns(&self, account_id: &AccountId) -> Result<Vec<Campaign>, UpstreamError> {
        let campaigns = self.fetch_campaigns(account_id).await?;
        tracing::debug!(count = campaigns.len(), "campaigns listed");
        Ok(campaigns)
    }

    #[tracing::instrument(skip_all, fields(object_id = %query.object_id))]
    async fn get_metrics(&self, query: MetricQuery) -> Result<Vec<MetricRecord>, UpstreamError> {
        Ok(self.fetch_metrics(&query).await?)
    }

    #[tracing::instrument(skip_all, fields(campaign_id = %campaign_id, status = %status))]
    async fn set_campaign_status(
        &self,
        campaign_id: &str,
        status: TargetStatus,
    ) -> Result<(), UpstreamError> {
        self.update_status(campaign_id, status).await?;
        tracing::info!(campaign_id, %status, "campaign status updated");
        Ok(())
    }
}
