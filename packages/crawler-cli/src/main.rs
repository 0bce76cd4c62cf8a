// Main entry point for the tournament deck crawler

mod config;

use anyhow::{Context, Result};
use deck_crawler::{CardIdentityTable, CrawlOrchestrator, HttpRenderer, RuleSet};
use std::collections::HashSet;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,deck_crawler=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting tournament deck crawl");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    let identity = match &config.identity_table {
        Some(path) => CardIdentityTable::from_path(path)
            .with_context(|| format!("Failed to load identity table from {}", path))?,
        None => CardIdentityTable::builtin(),
    };
    let rules = match &config.rule_set {
        Some(path) => RuleSet::from_path(path)
            .with_context(|| format!("Failed to load rule set from {}", path))?,
        None => RuleSet::standard(),
    };
    tracing::info!(
        identities = identity.len(),
        rules = rules.rules.len(),
        "Configuration loaded"
    );

    let orchestrator = CrawlOrchestrator::new(
        Arc::new(HttpRenderer::new()),
        Arc::new(identity),
        Arc::new(rules),
        config.crawl_config(),
    );

    // Run the crawl
    let (index, stats) = orchestrator
        .run(&HashSet::new())
        .await
        .context("Failed to reach the result listing")?;

    tracing::info!(
        targets = stats.targets,
        completed = stats.completed,
        failed = stats.failed,
        "Crawl finished"
    );

    // Archetype summary
    for (label, count) in index.summary() {
        println!("{:>4}  {}", count, label);
    }

    Ok(())
}
