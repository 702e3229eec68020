//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod alert_sender;
pub mod campaign_client;
pub mod rule_store;

pub use alert_sender::AlertSender;
pub use campaign_client::CampaignClient;
pub use rule_store::RuleStore;
