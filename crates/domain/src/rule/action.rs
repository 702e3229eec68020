//! Action: the effect applied to each triggered campaign.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::metric::Metric;

/// An operation executed once per triggered campaign, in declared order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Set the campaign status to paused.
    Pause,
    /// Set the campaign status to active.
    Resume,
    /// Send a notification rendered from `message`.
    Notify {
        /// Template; see [`render_template`] for placeholders.
        message: String,
    },
    /// Accepted and persisted but never executed.
    AdjustBudget { percent_change: f64 },
}

impl Action {
    /// Short name used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Notify { .. } => "notify",
            Self::AdjustBudget { .. } => "adjust_budget",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pause | Self::Resume => f.write_str(self.kind()),
            Self::Notify { message } => write!(f, "notify({message:?})"),
            Self::AdjustBudget { percent_change } => {
                write!(f, "adjust_budget({percent_change:+}%)")
            }
        }
    }
}

/// Values available to a notify template.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    pub rule_name: &'a str,
    pub campaign_name: &'a str,
    pub campaign_id: &'a str,
    /// Reading that triggered a threshold rule.
    pub metric: Option<(Metric, f64)>,
}

/// Substitute `{{campaign_name}}`, `{{campaign_id}}`, `{{rule_name}}`,
/// `{{metric}}` and `{{metric_value}}` in `template`.
///
/// The template is scanned once, so substituted text is never expanded
/// again. Metric placeholders render empty when there is no reading;
/// unknown placeholders are kept as written.
#[must_use]
pub fn render_template(template: &str, ctx: &TemplateContext<'_>) -> String {
    let (metric, value) = match ctx.metric {
        Some((metric, value)) => (metric.to_string(), format!("{value:.2}")),
        None => (String::new(), String::new()),
    };

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let replacement = match &after[..end] {
            "campaign_name" => Some(ctx.campaign_name),
            "campaign_id" => Some(ctx.campaign_id),
            "rule_name" => Some(ctx.rule_name),
            "metric" => Some(metric.as_str()),
            "metric_value" => Some(value.as_str()),
            _ => None,
        };
        match replacement {
            Some(text) => {
                out.push_str(text);
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
