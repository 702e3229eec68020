//! Rule evaluator: decides which campaigns a fire acts upon.

use std::time::Duration;

use adrules_domain::campaign::Campaign;
use adrules_domain::error::UpstreamError;
use adrules_domain::metric::{Metric, MetricQuery};
use adrules_domain::rule::{Rule, Threshold};

use crate::ports::CampaignClient;
use crate::upstream::{self, CAMPAIGN_CLIENT};

/// A campaign selected by a fire, with the reading that selected it.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggeredCampaign {
    pub campaign: Campaign,
    /// Metric reading for threshold rules.
    pub reading: Option<(Metric, f64)>,
}

/// Result of evaluating one rule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationOutcome {
    /// Campaigns listed for the rule's account.
    pub evaluated: usize,
    /// Campaigns that passed the static conditions.
    pub matched: usize,
    pub triggered: Vec<TriggeredCampaign>,
}

/// Evaluates rules against live campaign data.
pub struct Evaluator<'a, C> {
    client: &'a C,
    timeout: Duration,
}

impl<'a, C: CampaignClient> Evaluator<'a, C> {
    pub fn new(client: &'a C, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Select the campaigns `rule` should act upon.
    ///
    /// Campaigns are listed for the normalized account id; campaigns that
    /// report another owning account are ignored. For threshold rules each
    /// campaign passing the conditions is checked against today's metric
    /// value; a failed metric read excludes only that campaign.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] when the campaign list cannot be fetched.
    #[tracing::instrument(skip_all, fields(rule_id = %rule.id, rule_name = %rule.name))]
    pub async fn evaluate(&self, rule: &Rule) -> Result<EvaluationOutcome, UpstreamError> {
        let account = rule.account_id.normalized();
        let campaigns = upstream::bounded(
            CAMPAIGN_CLIENT,
            self.timeout,
            self.client.list_campaigns(&account),
        )
        .await?;

        let campaigns: Vec<Campaign> = campaigns
            .into_iter()
            .filter(|campaign| {
                campaign
                    .account_id
                    .as_ref()
                    .is_none_or(|owner| owner.matches(&account))
            })
            .collect();
        let evaluated = campaigns.len();

        let matching: Vec<Campaign> = campaigns
            .into_iter()
            .filter(|campaign| rule.conditions.matches(campaign))
            .collect();
        let matched = matching.len();

        let triggered = match rule.trigger.threshold() {
            None => matching
                .into_iter()
                .map(|campaign| TriggeredCampaign {
                    campaign,
                    reading: None,
                })
                .collect(),
            Some(threshold) => self.apply_threshold(matching, threshold).await,
        };

        tracing::debug!(evaluated, matched, triggered = triggered.len(), "rule evaluated");
        Ok(EvaluationOutcome {
            evaluated,
            matched,
            triggered,
        })
    }

    async fn apply_threshold(
        &self,
        campaigns: Vec<Campaign>,
        threshold: Threshold,
    ) -> Vec<TriggeredCampaign> {
        let mut triggered = Vec::new();
        for campaign in campaigns {
            match self.read_metric(&campaign.id, threshold.metric).await {
                Ok(value) if threshold.is_met_by(value) => {
                    triggered.push(TriggeredCampaign {
                        campaign,
                        reading: Some((threshold.metric, value)),
                    });
                }
                Ok(value) => {
                    tracing::debug!(
                        campaign_id = %campaign.id,
                        metric = %threshold.metric,
                        value,
                        "threshold not met"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        campaign_id = %campaign.id,
                        metric = %threshold.metric,
                        error = %err,
                        "metric read failed, campaign skipped"
                    );
                }
            }
        }
        triggered
    }

    /// Today's value of `metric` for a campaign. No records means no delivery.
    async fn read_metric(&self, campaign_id: &str, metric: Metric) -> Result<f64, UpstreamError> {
        let records = upstream::bounded(
            CAMPAIGN_CLIENT,
            self.timeout,
            self.client
                .get_metrics(MetricQuery::campaign_today(campaign_id, metric)),
        )
        .await?;

        match records.first() {
            None => Ok(0.0),
            Some(record) => record
                .metric(metric)
                .ok_or_else(|| UpstreamError::MissingField {
                    service: CAMPAIGN_CLIENT,
                    field: metric.field_name().to_string(),
                }),
        }
    }
}
