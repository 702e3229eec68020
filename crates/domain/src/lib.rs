//! # adrules-domain
//!
//! Pure domain model for the adrules campaign automation engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Rules** (trigger → condition → action definitions bound to an ad account)
//! - Define **Campaigns** and the **metric** records read from the ads provider
//! - Define **Alerts** (notifications handed to the alert sender)
//! - Contain all invariant enforcement and pure domain logic (condition
//!   matching, threshold comparison, cron parsing, message templating)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod account;
pub mod alert;
pub mod campaign;
pub mod metric;
pub mod rule;
