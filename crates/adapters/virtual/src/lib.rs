//! # adrules-adapter-virtual
//!
//! Simulated ad account for demo mode and end-to-end tests.
//!
//! ## Seeded campaigns
//!
//! | Campaign ID | Status | Today |
//! |-------------|--------|-------|
//! | `demo-1` | active | spend 48.00, CPC 0.20 |
//! | `demo-2` | active | spend 130.00, CPC 1.30 |
//! | `demo-3` | paused | no delivery |
//! | `demo-4` | archived | no delivery |
//!
//! Metrics can be changed at runtime with [`VirtualAccount::set_metric`], and
//! each provider operation can be made to fail with [`VirtualAccount::fail`].
//! Every call is recorded and can be inspected with [`VirtualAccount::calls`].
//!
//! ## Dependency rule
//!
//! Depends on `adrules-app` (port traits) and `adrules-domain` only.

mod seed;

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use adrules_app::ports::CampaignClient;
use adrules_domain::account::AccountId;
use adrules_domain::campaign::{Campaign, CampaignStatus, TargetStatus};
use adrules_domain::error::UpstreamError;
use adrules_domain::metric::{Metric, MetricQuery, MetricRecord};

/// Service name reported in [`UpstreamError`]s.
pub const SERVICE: &str = "virtual";

/// Account id of [`VirtualAccount::demo`].
pub const DEMO_ACCOUNT: &str = "act_1000";

/// Metrics that can be summed across campaigns for account-level queries.
const ADDITIVE: [Metric; 4] = [
    Metric::Spend,
    Metric::Impressions,
    Metric::Clicks,
    Metric::Conversions,
];

/// A provider operation, used for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListCampaigns,
    GetMetrics,
    SetStatus,
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListCampaigns(AccountId),
    GetMetrics(MetricQuery),
    SetStatus {
        campaign_id: String,
        status: TargetStatus,
    },
}

#[derive(Debug, Default)]
struct State {
    campaigns: Vec<Campaign>,
    metrics: HashMap<String, MetricRecord>,
    failing: HashSet<Operation>,
    calls: Vec<Call>,
}

/// In-memory ad account implementing [`CampaignClient`].
#[derive(Debug)]
pub struct VirtualAccount {
    account_id: AccountId,
    state: Mutex<State>,
}

impl Default for VirtualAccount {
    fn default() -> Self {
        Self::demo()
    }
}

impl VirtualAccount {
    /// An account with no campaigns.
    #[must_use]
    pub fn new(account_id: impl Into<AccountId>) -> Self {
        Self {
            account_id: account_id.into().normalized(),
            state: Mutex::new(State::default()),
        }
    }

    /// The demo account with its seeded campaigns.
    #[must_use]
    pub fn demo() -> Self {
        seed::campaigns()
            .into_iter()
            .fold(Self::new(DEMO_ACCOUNT), |account, seed| {
                let id = seed.campaign.id.clone();
                let account = account.with_campaign(seed.campaign);
                if let Some(record) = seed.today {
                    account.lock().metrics.insert(id, record);
                }
                account
            })
    }

    #[must_use]
    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    /// Add a campaign owned by this account.
    #[must_use]
    pub fn with_campaign(self, campaign: Campaign) -> Self {
        self.add_campaign(campaign);
        self
    }

    pub fn add_campaign(&self, mut campaign: Campaign) {
        campaign.account_id = Some(self.account_id.clone());
        let mut state = self.lock();
        state.campaigns.retain(|c| c.id != campaign.id);
        state.campaigns.push(campaign);
    }

    /// Set today's value of `metric` for a campaign. Setting spend also
    /// updates the spend reported when listing campaigns.
    pub fn set_metric(&self, campaign_id: &str, metric: Metric, value: f64) {
        let mut state = self.lock();
        if metric == Metric::Spend
            && let Some(campaign) = state.campaigns.iter_mut().find(|c| c.id == campaign_id)
        {
            campaign.spend = Some(value);
        }
        state
            .metrics
            .entry(campaign_id.to_string())
            .or_default()
            .insert(metric.field_name(), value);
    }

    /// Remove every metric of a campaign, as if it had no delivery today.
    pub fn clear_metrics(&self, campaign_id: &str) {
        self.lock().metrics.remove(campaign_id);
    }

    /// Make `operation` fail until [`recover`](Self::recover) is called.
    pub fn fail(&self, operation: Operation) {
        self.lock().failing.insert(operation);
    }

    pub fn recover(&self, operation: Operation) {
        self.lock().failing.remove(&operation);
    }

    #[must_use]
    pub fn campaign(&self, campaign_id: &str) -> Option<Campaign> {
        self.lock()
            .campaigns
            .iter()
            .find(|c| c.id == campaign_id)
            .cloned()
    }

    /// Every call received so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(state: &State, operation: Operation) -> Result<(), UpstreamError> {
        if state.failing.contains(&operation) {
            return Err(UpstreamError::Status {
                service: SERVICE,
                status: 503,
                message: format!("injected {operation:?} failure"),
            });
        }
        Ok(())
    }

    fn account_metrics(state: &State, fields: &[Metric]) -> Vec<MetricRecord> {
        let mut total = MetricRecord::new();
        for metric in fields.iter().filter(|m| ADDITIVE.contains(m)) {
            let sum: Option<f64> = state
                .metrics
                .values()
                .filter_map(|record| record.metric(*metric))
                .fold(None, |acc, value| Some(acc.unwrap_or(0.0) + value));
            if let Some(sum) = sum {
                total.insert(metric.field_name(), sum);
            }
        }
        if total.is_empty() {
            Vec::new()
        } else {
            vec![total]
        }
    }
}

fn not_found(object: &str) -> UpstreamError {
    UpstreamError::Status {
        service: SERVICE,
        status: 404,
        message: format!("unknown object {object}"),
    }
}

impl CampaignClient for VirtualAccount {
    async fn list_campaigns(&self, account_id: &AccountId) -> Result<Vec<Campaign>, UpstreamError> {
        let mut state = self.lock();
        state.calls.push(Call::ListCampaigns(account_id.clone()));
        Self::check(&state, Operation::ListCampaigns)?;

        if !account_id.matches(&self.account_id) {
            return Err(not_found(account_id.as_str()));
        }
        Ok(state.campaigns.clone())
    }

    async fn get_metrics(&self, query: MetricQuery) -> Result<Vec<MetricRecord>, UpstreamError> {
        let mut state = self.lock();
        state.calls.push(Call::GetMetrics(query.clone()));
        Self::check(&state, Operation::GetMetrics)?;

        if AccountId::new(query.object_id.as_str()).matches(&self.account_id) {
            return Ok(Self::account_metrics(&state, &query.fields));
        }
        if !state.campaigns.iter().any(|c| c.id == query.object_id) {
            return Err(not_found(&query.object_id));
        }

        let Some(record) = state.metrics.get(&query.object_id) else {
            return Ok(Vec::new());
        };
        let requested = query
            .fields
            .iter()
            .filter_map(|metric| record.metric(*metric).map(|v| (metric.field_name(), v)))
            .fold(MetricRecord::new(), |acc, (field, value)| acc.with(field, value));
        Ok(vec![requested])
    }

    async fn set_campaign_status(
        &self,
        campaign_id: &str,
        status: TargetStatus,
    ) -> Result<(), UpstreamError> {
        let mut state = self.lock();
        state.calls.push(Call::SetStatus {
            campaign_id: campaign_id.to_string(),
            status,
        });
        Self::check(&state, Operation::SetStatus)?;

        let campaign = state
            .campaigns
            .iter_mut()
            .find(|c| c.id == campaign_id)
            .ok_or_else(|| not_found(campaign_id))?;
        campaign.status = CampaignStatus::from(status);
        tracing::debug!(campaign_id, %status, "virtual campaign status changed");
        Ok(())
    }
}
