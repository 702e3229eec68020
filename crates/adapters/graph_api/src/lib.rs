//! # adrules-adapter-graph-api
//!
//! Campaign data client for a Graph-style ads HTTP API.
//!
//! ## Responsibilities
//! - Implement the `CampaignClient` port defined in `adrules-app::ports`
//! - List campaigns of an account, following `paging.next` links
//! - Read insight metrics and change campaign delivery status
//! - Translate provider payloads (numeric strings, minor-unit budgets, error
//!   bodies) into domain types
//!
//! ## Dependency rule
//! Depends on `adrules-app` (for port traits) and `adrules-domain` (for domain types).

mod client;
pub mod error;
mod wire;

pub use client::{Config, GraphApiClient};
pub use error::GraphApiError;
