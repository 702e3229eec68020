//! Webhook delivery errors. These never leave the adapter: the sender logs them.

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("failed to build http client")]
    Setup(#[source] reqwest::Error),

    #[error("webhook request failed")]
    Http(#[from] reqwest::Error),

    #[error("webhook returned status {status}: {body}")]
    Status { status: u16, body: String },
}
