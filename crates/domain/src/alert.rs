//! Alerts: structured notifications handed to the alert sender.

use serde::{Deserialize, Serialize};

/// What an alert is about; senders use it to pick presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Something crossed a threshold or needs attention.
    Alert,
    /// The engine changed a campaign.
    Action,
    /// Informational summary.
    Report,
}

/// A labelled value displayed alongside the alert message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertField {
    pub name: String,
    pub value: String,
}

/// A one-way notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub fields: Vec<AlertField>,
}

impl Alert {
    #[must_use]
    pub fn new(kind: AlertKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Append a labelled field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(AlertField {
            name: name.into(),
            value: value.into(),
        });
        self
    }
}
