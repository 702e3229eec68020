//! Rule: trigger → condition → action definitions bound to an ad account.
//!
//! A [`Rule`] has a [`Trigger`] that determines when it is evaluated, static
//! [`Conditions`] narrowing the campaigns it considers, and an ordered list of
//! [`Action`]s applied to every triggered campaign.

mod action;
mod condition;
mod cron;
mod trigger;

pub use action::{Action, TemplateContext, render_template};
pub use condition::{Conditions, StatusFilter};
pub use self::cron::CronExpression;
pub use trigger::{FirePlan, Operator, Threshold, Trigger};

use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::error::ConfigurationError;
use crate::id::RuleId;
use crate::time::Timestamp;

/// Version written into every persisted [`RuleDocument`].
pub const SCHEMA_VERSION: u32 = 1;

/// A persisted automation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub name: String,
    pub account_id: AccountId,
    pub enabled: bool,
    pub trigger: Trigger,
    #[serde(default)]
    pub conditions: Conditions,
    pub actions: Vec<Action>,
    pub created_at: Timestamp,
    #[serde(default)]
    pub last_run_at: Option<Timestamp>,
}

impl Rule {
    /// Materialise a new rule with its assigned identity.
    #[must_use]
    pub fn create(new: NewRule, id: RuleId, created_at: Timestamp) -> Self {
        Self {
            id,
            name: new.name,
            account_id: new.account_id,
            enabled: new.enabled,
            trigger: new.trigger,
            conditions: new.conditions,
            actions: new.actions,
            created_at,
            last_run_at: None,
        }
    }

    /// Replace every user-editable field, keeping identity and run history.
    pub fn apply_edit(&mut self, edit: NewRule) {
        self.name = edit.name;
        self.account_id = edit.account_id;
        self.enabled = edit.enabled;
        self.trigger = edit.trigger;
        self.conditions = edit.conditions;
        self.actions = edit.actions;
    }

    /// Flip `enabled`, returning the new value.
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    /// Record an evaluation attempt. `last_run_at` never moves backwards.
    pub fn record_run(&mut self, at: Timestamp) {
        self.last_run_at = Some(match self.last_run_at {
            Some(previous) if previous > at => previous,
            _ => at,
        });
    }
}

/// A rule as submitted by a caller, before id and creation time are assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRule {
    pub name: String,
    pub account_id: AccountId,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub trigger: Trigger,
    #[serde(default)]
    pub conditions: Conditions,
    pub actions: Vec<Action>,
}

fn default_enabled() -> bool {
    true
}

impl NewRule {
    /// Create a builder for constructing a [`NewRule`].
    #[must_use]
    pub fn builder(
        name: impl Into<String>,
        account_id: impl Into<AccountId>,
        trigger: Trigger,
    ) -> RuleBuilder {
        RuleBuilder {
            rule: NewRule {
                name: name.into(),
                account_id: account_id.into(),
                enabled: true,
                trigger,
                conditions: Conditions::default(),
                actions: Vec::new(),
            },
        }
    }

    /// Reject numbers that cannot survive a store round trip.
    ///
    /// JSON has no representation for NaN or the infinities, so a rule
    /// holding one would be written as `null` and fail to load back.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::NonFiniteNumber`] naming the first
    /// offending field.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let threshold = self.trigger.threshold().map(|t| ("value", t.value));
        let spend = [
            self.conditions.min_spend.map(|v| ("min_spend", v)),
            self.conditions.max_spend.map(|v| ("max_spend", v)),
        ];
        let budgets = self.actions.iter().filter_map(|action| match action {
            Action::AdjustBudget { percent_change } => Some(("percent_change", *percent_change)),
            _ => None,
        });

        match threshold
            .into_iter()
            .chain(spend.into_iter().flatten())
            .chain(budgets)
            .find(|(_, value)| !value.is_finite())
        {
            Some((field, value)) => Err(ConfigurationError::NonFiniteNumber { field, value }),
            None => Ok(()),
        }
    }
}

/// Step-by-step builder for [`NewRule`].
#[derive(Debug)]
pub struct RuleBuilder {
    rule: NewRule,
}

impl RuleBuilder {
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.rule.enabled = enabled;
        self
    }

    #[must_use]
    pub fn conditions(mut self, conditions: Conditions) -> Self {
        self.rule.conditions = conditions;
        self
    }

    #[must_use]
    pub fn status(mut self, status: StatusFilter) -> Self {
        self.rule.conditions.status = Some(status);
        self
    }

    #[must_use]
    pub fn name_contains(mut self, needle: impl Into<String>) -> Self {
        self.rule.conditions.campaign_name_contains = Some(needle.into());
        self
    }

    #[must_use]
    pub fn spend_between(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.rule.conditions.min_spend = min;
        self.rule.conditions.max_spend = max;
        self
    }

    #[must_use]
    pub fn action(mut self, action: Action) -> Self {
        self.rule.actions.push(action);
        self
    }

    #[must_use]
    pub fn build(self) -> NewRule {
        self.rule
    }
}

/// The persisted form of the whole rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDocument {
    pub schema_version: u32,
    pub rules: Vec<Rule>,
}

impl RuleDocument {
    /// Wrap `rules` at the current [`SCHEMA_VERSION`].
    #[must_use]
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            rules,
        }
    }
}
