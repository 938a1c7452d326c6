//! Engine construction shared by the `chat` and `run` commands.

use std::sync::Arc;

use anyhow::Context;

use imo_assistant::RestAssistantClient;
use imo_domain::config::{Config, ConfigSeverity};
use imo_leads::create_sink;

use crate::runtime::{Engine, EngineOptions};

/// Validate config, build the assistant client and lead sink, and return
/// a wired [`Engine`] with its idle-session cleanup loop running.
pub fn build_engine(config: &Config) -> anyhow::Result<Arc<Engine>> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let error_count = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if error_count > 0 {
        anyhow::bail!("config validation failed with {error_count} error(s)");
    }

    // ── Assistant client ─────────────────────────────────────────────
    let provider = RestAssistantClient::new(&config.assistant)
        .context("initializing assistant client")?;
    tracing::info!(base_url = %config.assistant.base_url, "assistant client ready");

    // ── Lead sink ────────────────────────────────────────────────────
    let leads = create_sink(&config.leads).context("initializing lead sink")?;

    Ok(Arc::new(Engine::new(
        Arc::new(provider),
        leads,
        EngineOptions::from_config(config),
    )))
}
