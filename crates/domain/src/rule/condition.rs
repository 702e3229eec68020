//! Conditions: static filters narrowing which campaigns a rule considers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::campaign::{Campaign, CampaignStatus};

/// Campaign status a rule is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    Active,
    Paused,
    Any,
}

impl StatusFilter {
    #[must_use]
    pub fn accepts(self, status: CampaignStatus) -> bool {
        match self {
            Self::Active => status == CampaignStatus::Active,
            Self::Paused => status == CampaignStatus::Paused,
            Self::Any => true,
        }
    }
}

/// Static campaign filter. Every configured sub-condition must hold; an
/// absent sub-condition imposes no constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conditions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusFilter>,
    /// Case-insensitive substring of the campaign name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_name_contains: Option<String>,
    /// Inclusive lower bound on today's spend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_spend: Option<f64>,
    /// Inclusive upper bound on today's spend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_spend: Option<f64>,
}

impl Conditions {
    /// Whether `campaign` passes every configured sub-condition.
    ///
    /// A campaign without reported spend counts as having spent nothing.
    #[must_use]
    pub fn matches(&self, campaign: &Campaign) -> bool {
        if self
            .status
            .is_some_and(|filter| !filter.accepts(campaign.status))
        {
            return false;
        }
        if self.campaign_name_contains.as_ref().is_some_and(|needle| {
            !campaign
                .name
                .to_lowercase()
                .contains(&needle.to_lowercase())
        }) {
            return false;
        }
        let spend = campaign.spend.unwrap_or(0.0);
        if self.min_spend.is_some_and(|min| spend < min) {
            return false;
        }
        if self.max_spend.is_some_and(|max| spend > max) {
            return false;
        }
        true
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Display for Conditions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(status) = self.status {
            parts.push(format!("status={status:?}").to_lowercase());
        }
        if let Some(needle) = &self.campaign_name_contains {
            parts.push(format!("name~{needle:?}"));
        }
        if let Some(min) = self.min_spend {
            parts.push(format!("spend>={min}"));
        }
        if let Some(max) = self.max_spend {
            parts.push(format!("spend<={max}"));
        }
        if parts.is_empty() {
            f.write_str("all campaigns")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}
