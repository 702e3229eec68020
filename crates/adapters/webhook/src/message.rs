//! Embed-style webhook payload.

use serde::Serialize;

use adrules_domain::alert::{Alert, AlertKind};
use adrules_domain::time::Timestamp;

const TITLE_LIMIT: usize = 256;
const DESCRIPTION_LIMIT: usize = 4096;
const FIELD_NAME_LIMIT: usize = 256;
const FIELD_VALUE_LIMIT: usize = 1024;
const FIELD_COUNT_LIMIT: usize = 25;

#[derive(Debug, Serialize)]
pub(crate) struct WebhookMessage<'a> {
    pub username: &'a str,
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Embed colour for each alert kind.
pub(crate) fn color(kind: AlertKind) -> u32 {
    match kind {
        AlertKind::Alert => 0x00E7_4C3C,
        AlertKind::Action => 0x0034_98DB,
        AlertKind::Report => 0x002E_CC71,
    }
}

fn truncate(value: &str, limit: usize) -> String {
    match value.char_indices().nth(limit) {
        Some((end, _)) => value[..end].to_string(),
        None => value.to_string(),
    }
}

impl<'a> WebhookMessage<'a> {
    pub fn new(username: &'a str, alert: &Alert, at: Timestamp) -> Self {
        let fields = alert
            .fields
            .iter()
            .take(FIELD_COUNT_LIMIT)
            .map(|field| EmbedField {
                name: truncate(&field.name, FIELD_NAME_LIMIT),
                value: truncate(&field.value, FIELD_VALUE_LIMIT),
                inline: true,
            })
            .collect();

        Self {
            username,
            embeds: vec![Embed {
                title: truncate(&alert.title, TITLE_LIMIT),
                description: truncate(&alert.message, DESCRIPTION_LIMIT),
                color: color(alert.kind),
                fields,
                timestamp: at.to_rfc3339(),
            }],
        }
    }
}
