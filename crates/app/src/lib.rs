//! # adrules-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `RuleStore`: durable load/save of the whole rule set
//!   - `CampaignClient`: list campaigns, read metrics, set campaign status
//!   - `AlertSender`: best-effort one-way notifications
//! - Own the **Scheduler** (one live job per enabled rule)
//! - Evaluate rules against live campaign data and apply their actions
//! - Expose the **`RuleEngine`** facade, the only entry point callers use
//!
//! ## Dependency rule
//! Depends on `adrules-domain` only (plus `tokio` for tasks, timers and locks).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod engine;
pub mod evaluator;
pub mod executor;
pub mod ports;
pub mod scheduler;
mod upstream;

pub use engine::{EngineConfig, FireOutcome, FireReport, RuleEngine};
