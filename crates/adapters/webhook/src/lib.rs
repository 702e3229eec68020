//! # adrules-adapter-webhook
//!
//! Delivers alerts as embed messages to a chat webhook.
//!
//! ## Responsibilities
//! - Implement the `AlertSender` port defined in `adrules-app::ports`
//! - Render an [`Alert`](adrules_domain::alert::Alert) as a coloured embed
//! - Log and swallow delivery failures
//!
//! ## Dependency rule
//! Depends on `adrules-app` (for port traits) and `adrules-domain` (for domain types).

pub mod error;
mod message;
mod sender;

pub use error::WebhookError;
pub use sender::{Config, WebhookSender};
