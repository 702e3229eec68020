//! Campaign client port: the ads provider as seen by the engine.

use std::future::Future;
use std::sync::Arc;

use adrules_domain::account::AccountId;
use adrules_domain::campaign::{Campaign, TargetStatus};
use adrules_domain::error::UpstreamError;
use adrules_domain::metric::{MetricQuery, MetricRecord};

/// Reads campaign state and performance metrics, and changes campaign status.
pub trait CampaignClient {
    /// List every campaign of `account_id` (already normalized by the caller).
    fn list_campaigns(
        &self,
        account_id: &AccountId,
    ) -> impl Future<Output = Result<Vec<Campaign>, UpstreamError>> + Send;

    /// Fetch metric records for a campaign or account.
    ///
    /// An object without delivery in the window yields an empty vector.
    fn get_metrics(
        &self,
        query: MetricQuery,
    ) -> impl Future<Output = Result<Vec<MetricRecord>, UpstreamError>> + Send;

    /// Set the delivery status of a campaign.
    fn set_campaign_status(
        &self,
        campaign_id: &str,
        status: TargetStatus,
    ) -> impl Future<Output = Result<(), UpstreamError>> + Send;
}

impl<T: CampaignClient + Send + Sync> CampaignClient for Arc<T> {
    fn list_campaigns(
        &self,
        account_id: &AccountId,
    ) -> impl Future<Output = Result<Vec<Campaign>, UpstreamError>> + Send {
        (**self).list_campaigns(account_id)
    }

    fn get_metrics(
        &self,
        query: MetricQuery,
    ) -> impl Future<Output = Result<Vec<MetricRecord>, UpstreamError>> + Send {
        (**self).get_metrics(query)
    }

    fn set_campaign_status(
        &self,
        campaign_id: &str,
        status: TargetStatus,
    ) -> impl Future<Output = Result<(), UpstreamError>> + Send {
        (**self).set_campaign_status(campaign_id, status)
    }
}
