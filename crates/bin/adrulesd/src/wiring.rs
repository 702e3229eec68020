//! Adapter selection.
//!
//! The engine is generic over its ports; the daemon picks implementations at
//! runtime, so each port gets an enum dispatching to the configured adapter.

use adrules_adapter_graph_api::GraphApiClient;
use adrules_adapter_storage_json::JsonFileRuleStore;
use adrules_adapter_storage_sqlite_sqlx::SqliteRuleStore;
use adrules_adapter_virtual::VirtualAccount;
use adrules_adapter_webhook::WebhookSender;
use adrules_app::ports::{CampaignClient, RuleStore};
use adrules_domain::account::AccountId;
use adrules_domain::campaign::{Campaign, TargetStatus};
use adrules_domain::error::{RulesError, UpstreamError};
use adrules_domain::metric::{MetricQuery, MetricRecord};
use adrules_domain::rule::Rule;

use crate::config::{CampaignSource, Config, StoreBackend};

pub enum AnyRuleStore {
    Sqlite(SqliteRuleStore),
    Json(JsonFileRuleStore),
}

impl RuleStore for AnyRuleStore {
    async fn load_all(&self) -> Result<Vec<Rule>, RulesError> {
        match self {
            Self::Sqlite(store) => store.load_all().await,
            Self::Json(store) => store.load_all().await,
        }
    }

    async fn save_all(&self, rules: &[Rule]) -> Result<(), RulesError> {
        match self {
            Self::Sqlite(store) => store.save_all(rules).await,
            Self::Json(store) => store.save_all(rules).await,
        }
    }
}

pub enum AnyCampaignClient {
    GraphApi(GraphApiClient),
    Virtual(VirtualAccount),
}

impl CampaignClient for AnyCampaignClient {
    async fn list_campaigns(&self, account_id: &AccountId) -> Result<Vec<Campaign>, UpstreamError> {
        match self {
            Self::GraphApi(client) => client.list_campaigns(account_id).await,
            Self::Virtual(client) => client.list_campaigns(account_id).await,
        }
    }

    async fn get_metrics(&self, query: MetricQuery) -> Result<Vec<MetricRecord>, UpstreamError> {
        match self {
            Self::GraphApi(client) => client.get_metrics(query).await,
            Self::Virtual(client) => client.get_metrics(query).await,
        }
    }

    async fn set_campaign_status(
        &self,
        campaign_id: &str,
        status: TargetStatus,
    ) -> Result<(), UpstreamError> {
        match self {
            Self::GraphApi(client) => client.set_campaign_status(campaign_id, status).await,
            Self::Virtual(client) => client.set_campaign_status(campaign_id, status).await,
        }
    }
}

/// Open the configured rule store, running migrations for `SQLite`.
///
/// # Errors
///
/// Returns the storage error when the database cannot be opened.
pub async fn rule_store(config: &Config) -> Result<AnyRuleStore, Box<dyn std::error::Error>> {
    match config.store.backend {
        StoreBackend::Sqlite => {
            let db = adrules_adapter_storage_sqlite_sqlx::Config::new(config.store.url.clone())
                .build()
                .await?;
            tracing::info!(url = %config.store.url, "using sqlite rule store");
            Ok(AnyRuleStore::Sqlite(SqliteRuleStore::new(db.pool().clone())))
        }
        StoreBackend::Json => {
            tracing::info!(path = %config.store.path.display(), "using json rule store");
            Ok(AnyRuleStore::Json(JsonFileRuleStore::new(&config.store.path)))
        }
    }
}

/// Build the configured campaign data client.
///
/// # Errors
///
/// Returns an error when the HTTP client cannot be built.
pub fn campaign_client(config: &Config) -> Result<AnyCampaignClient, Box<dyn std::error::Error>> {
    match config.campaigns.source {
        CampaignSource::GraphApi => {
            let client = adrules_adapter_graph_api::Config {
                base_url: config.graph_api.base_url.clone(),
                api_version: config.graph_api.api_version.clone(),
                access_token: config.graph_api.access_token.clone(),
                page_limit: config.graph_api.page_limit,
                timeout: config.upstream_timeout(),
            }
            .build()?;
            tracing::info!(base_url = %config.graph_api.base_url, "using graph api campaign source");
            Ok(AnyCampaignClient::GraphApi(client))
        }
        CampaignSource::Virtual => {
            let account = VirtualAccount::demo();
            tracing::info!(account_id = %account.account_id(), "using virtual campaign source");
            Ok(AnyCampaignClient::Virtual(account))
        }
    }
}

/// Build the webhook sender, or `None` when no URL is configured.
///
/// # Errors
///
/// Returns an error when the HTTP client cannot be built.
pub fn alert_sender(config: &Config) -> Result<Option<WebhookSender>, Box<dyn std::error::Error>> {
    let Some(url) = config.webhook_url() else {
        tracing::info!("no webhook configured, alerts disabled");
        return Ok(None);
    };
    let sender = adrules_adapter_webhook::Config {
        url: url.to_string(),
        username: config.alerts.username.clone(),
        timeout: config.upstream_timeout(),
    }
    .build()?;
    Ok(Some(sender))
}
