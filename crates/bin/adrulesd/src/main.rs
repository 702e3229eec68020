//! # adrulesd: adrules daemon
//!
//! Composition root that wires the adapters together and runs the engine.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Initialise logging
//! - Construct the configured rule store, campaign client and alert sender
//! - Start the rule engine
//! - Stop it on SIGTERM/SIGINT
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;
mod wiring;

use adrules_app::{EngineConfig, RuleEngine};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();

    let store = wiring::rule_store(&config).await?;
    let client = wiring::campaign_client(&config)?;
    let alerts = wiring::alert_sender(&config)?;

    let engine = RuleEngine::with_config(
        store,
        client,
        alerts,
        EngineConfig {
            upstream_timeout: config.upstream_timeout(),
        },
    );
    engine.start().await;
    tracing::info!(
        scheduled = engine.scheduled_rule_ids().len(),
        "adrulesd running"
    );

    shutdown_signal().await?;
    engine.stop().await;
    tracing::info!("adrulesd stopped");
    Ok(())
}

/// Resolve on Ctrl-C, or on SIGTERM where available.
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                tracing::info!("received Ctrl-C");
            }
            _ = terminate.recv() => tracing::info!("received SIGTERM"),
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        tracing::info!("received Ctrl-C");
        Ok(())
    }
}
