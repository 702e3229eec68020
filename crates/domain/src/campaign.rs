//! Campaign: the advertising object rules inspect and act upon.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::account::AccountId;

/// Delivery status of a campaign as reported by the ads provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Active,
    Paused,
    Archived,
    Deleted,
    /// Any provider status the engine does not act upon (in review, with issues, …).
    Other,
}

impl CampaignStatus {
    /// Map a provider status string (`ACTIVE`, `CAMPAIGN_PAUSED`, …).
    #[must_use]
    pub fn from_provider(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "ACTIVE" => Self::Active,
            "PAUSED" | "CAMPAIGN_PAUSED" => Self::Paused,
            "ARCHIVED" => Self::Archived,
            "DELETED" => Self::Deleted,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Archived => "archived",
            Self::Deleted => "deleted",
            Self::Other => "other",
        })
    }
}

/// Status an action may set on a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    Active,
    Paused,
}

impl TargetStatus {
    /// Provider wire value.
    #[must_use]
    pub fn as_provider_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Paused => "PAUSED",
        }
    }
}

impl From<TargetStatus> for CampaignStatus {
    fn from(value: TargetStatus) -> Self {
        match value {
            TargetStatus::Active => Self::Active,
            TargetStatus::Paused => Self::Paused,
        }
    }
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        CampaignStatus::from(*self).fmt(f)
    }
}

/// A campaign as listed for an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub status: CampaignStatus,
    /// Owning account, when the provider reports it.
    #[serde(default)]
    pub account_id: Option<AccountId>,
    /// Spend reported for the current day, in account currency.
    #[serde(default)]
    pub spend: Option<f64>,
    /// Daily budget in account currency.
    #[serde(default)]
    pub daily_budget: Option<f64>,
}

impl Campaign {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, status: CampaignStatus) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status,
            account_id: None,
            spend: None,
            daily_budget: None,
        }
    }

    #[must_use]
    pub fn with_spend(mut self, spend: f64) -> Self {
        self.spend = Some(spend);
        self
    }

    #[must_use]
    pub fn with_account(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }
}
