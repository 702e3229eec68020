//! Trigger: when a rule is evaluated.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::cron::CronExpression;
use crate::error::ConfigurationError;
use crate::metric::Metric;

/// Describes what causes a rule to be evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Fires at calendar instants (e.g. `"0 9 * * 1-5"`).
    Schedule { cron_expression: String },
    /// Polls every `check_interval_minutes` and acts on campaigns whose
    /// metric satisfies the comparison.
    Threshold {
        metric: Metric,
        operator: Operator,
        value: f64,
        check_interval_minutes: i64,
    },
}

/// How the scheduler should fire a trigger.
#[derive(Debug, Clone)]
pub enum FirePlan {
    Calendar(CronExpression),
    Every(Duration),
}

impl Trigger {
    /// Validate the trigger and derive its fire plan.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] for an unparsable cron expression or a
    /// check interval below one minute.
    pub fn fire_plan(&self) -> Result<FirePlan, ConfigurationError> {
        match self {
            Self::Schedule { cron_expression } => {
                CronExpression::parse(cron_expression).map(FirePlan::Calendar)
            }
            Self::Threshold {
                check_interval_minutes,
                ..
            } => {
                let minutes = u64::try_from(*check_interval_minutes)
                    .ok()
                    .filter(|m| *m >= 1)
                    .ok_or(ConfigurationError::NonPositiveInterval {
                        minutes: *check_interval_minutes,
                    })?;
                Ok(FirePlan::Every(Duration::from_secs(
                    minutes.saturating_mul(60),
                )))
            }
        }
    }

    /// The metric comparison of a threshold trigger.
    #[must_use]
    pub fn threshold(&self) -> Option<Threshold> {
        match self {
            Self::Threshold {
                metric,
                operator,
                value,
                ..
            } => Some(Threshold {
                metric: *metric,
                operator: *operator,
                value: *value,
            }),
            Self::Schedule { .. } => None,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schedule { cron_expression } => write!(f, "schedule({cron_expression})"),
            Self::Threshold {
                metric,
                operator,
                value,
                check_interval_minutes,
            } => write!(
                f,
                "threshold({metric} {operator} {value} every {check_interval_minutes}m)"
            ),
        }
    }
}

/// Comparison applied between a metric reading and the threshold value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Greater,
    Less,
    Equal,
}

impl Operator {
    /// `Equal` is exact floating-point equality with no tolerance.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn compare(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Greater => lhs > rhs,
            Self::Less => lhs < rhs,
            Self::Equal => lhs == rhs,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Greater => ">",
            Self::Less => "<",
            Self::Equal => "==",
        })
    }
}

/// The metric half of a threshold trigger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    pub metric: Metric,
    pub operator: Operator,
    pub value: f64,
}

impl Threshold {
    #[must_use]
    pub fn is_met_by(&self, reading: f64) -> bool {
        self.operator.compare(reading, self.value)
    }
}
