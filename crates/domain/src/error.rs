//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`RulesError`]
//! via `#[from]` (or [`RulesError::persistence`] for storage adapters).

use std::time::Duration;

use crate::id::RuleId;

/// Boxed error used by adapters to hand their own error types across ports.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error crossing every port boundary.
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    /// A rule's trigger cannot be scheduled, or the rule holds a number
    /// that cannot be stored.
    ///
    /// When raised by a mutating engine operation with `rule_id` set, the
    /// rule has already been persisted. Without it, nothing was stored.
    #[error("invalid trigger configuration")]
    Configuration {
        rule_id: Option<RuleId>,
        #[source]
        source: ConfigurationError,
    },

    /// The campaign data provider or the alert sender failed.
    #[error("upstream service error")]
    Upstream(#[from] UpstreamError),

    /// Reading or writing the rule store failed.
    #[error("persistence error")]
    Persistence(#[source] BoxError),
}

impl RulesError {
    /// Wrap an adapter-specific storage error.
    pub fn persistence<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Persistence(Box::new(err))
    }

    /// Attach the id of the rule a configuration error belongs to.
    #[must_use]
    pub fn for_rule(self, id: RuleId) -> Self {
        match self {
            Self::Configuration { source, .. } => Self::Configuration {
                rule_id: Some(id),
                source,
            },
            other => other,
        }
    }
}

impl From<ConfigurationError> for RulesError {
    fn from(source: ConfigurationError) -> Self {
        Self::Configuration {
            rule_id: None,
            source,
        }
    }
}

/// A trigger that cannot be turned into a live schedule.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// The cron parser rejected the expression.
    #[error("invalid cron expression `{expression}`")]
    InvalidCron {
        expression: String,
        #[source]
        source: cron::error::Error,
    },

    /// Neither the 5-field nor the 6-field (seconds) form.
    #[error("cron expression `{expression}` has {fields} fields, expected 5 or 6")]
    CronFieldCount { expression: String, fields: usize },

    /// A day-of-week token outside `0-7` or an unsupported range form.
    #[error("cron expression `{expression}` has an invalid day-of-week `{token}`")]
    InvalidDayOfWeek { expression: String, token: String },

    /// Threshold polling interval below one minute.
    #[error("check interval must be at least 1 minute, got {minutes}")]
    NonPositiveInterval { minutes: i64 },

    /// NaN or an infinity where a finite number is required.
    #[error("`{field}` must be a finite number, got {value}")]
    NonFiniteNumber { field: &'static str, value: f64 },

    /// A calendar expression that matches no future instant.
    #[error("cron expression `{expression}` never fires")]
    NeverFires { expression: String },
}

/// Failure talking to the campaign data provider or the alert sender.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The call did not complete within the configured bound.
    #[error("{service} call timed out after {after:?}")]
    Timeout {
        service: &'static str,
        after: Duration,
    },

    /// The request could not be sent or the response could not be read.
    #[error("{service} request failed")]
    Transport {
        service: &'static str,
        #[source]
        source: BoxError,
    },

    /// The provider answered with an error status.
    #[error("{service} returned status {status}: {message}")]
    Status {
        service: &'static str,
        status: u16,
        message: String,
    },

    /// An expected field is absent from the response.
    #[error("{service} response is missing field `{field}`")]
    MissingField {
        service: &'static str,
        field: String,
    },

    /// A field is present but cannot be interpreted.
    #[error("{service} response has invalid `{field}`: {value}")]
    InvalidValue {
        service: &'static str,
        field: String,
        value: String,
    },
}
