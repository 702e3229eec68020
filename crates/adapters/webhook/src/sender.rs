//! [`AlertSender`] posting to a chat webhook.

use std::time::Duration;

use adrules_app::ports::AlertSender;
use adrules_domain::alert::Alert;

use crate::error::WebhookError;
use crate::message::WebhookMessage;

/// Webhook settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub url: String,
    /// Display name of the posting bot.
    pub username: String,
    pub timeout: Duration,
}

impl Config {
    /// Build a [`WebhookSender`] from this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::Setup`] if the HTTP client cannot be built.
    pub fn build(self) -> Result<WebhookSender, WebhookError> {
        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(WebhookError::Setup)?;
        Ok(WebhookSender {
            url: self.url,
            username: self.username,
            http,
        })
    }
}

#[derive(Debug, Clone)]
pub struct WebhookSender {
    url: String,
    username: String,
    http: reqwest::Client,
}

impl WebhookSender {
    /// Post one alert.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError`] on transport failure or a non-success status.
    pub async fn post(&self, alert: &Alert) -> Result<(), WebhookError> {
        let message = WebhookMessage::new(&self.username, alert, adrules_domain::time::now());
        let response = self.http.post(&self.url).json(&message).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WebhookError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

impl AlertSender for WebhookSender {
    async fn send(&self, alert: Alert) {
        match self.post(&alert).await {
            Ok(()) => tracing::debug!(kind = ?alert.kind, title = %alert.title, "alert delivered"),
            Err(err) => {
                tracing::warn!(kind = ?alert.kind, title = %alert.title, error = %err, "failed to deliver alert");
            }
        }
    }
}
