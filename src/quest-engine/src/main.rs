//! Quest Engine — community engagement scoring and leveling service.
//!
//! Main entry point that initializes all subsystems and starts the server.

use clap::Parser;
use quest_api::server::build_state;
use quest_api::ApiServer;
use quest_core::config::AppConfig;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "quest-engine")]
#[command(about = "Community engagement scoring and leveling service")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "QUEST_ENGINE__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "QUEST_ENGINE__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Metrics port (overrides config)
    #[arg(long, env = "QUEST_ENGINE__METRICS__PORT")]
    metrics_port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quest_engine=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Quest Engine starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(port) = cli.metrics_port {
        config.metrics.port = port;
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        metrics_port = config.metrics.port,
        "Configuration loaded"
    );

    if config.integrations.apps.is_empty() {
        warn!("No integration credentials configured, accepting all source apps");
    }

    // Assemble the engine: store, level table, ledger, ingestor, queue,
    // rewards, leaderboard.
    let state = build_state(&config);

    // Start API server
    let api_server = ApiServer::new(config.clone(), state.clone());

    // Start metrics exporter
    if let Err(e) = api_server.start_metrics().await {
        error!(error = %e, "Failed to start metrics exporter");
    }

    // Spawn the window-counter maintenance task: ages activity out of
    // the weekly/monthly aggregates.
    let ledger = state.ledger.clone();
    let interval_secs = config.engagement.maintenance_interval_secs;
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(interval_secs.max(1)));
        loop {
            interval.tick().await;
            ledger.refresh_window_counters();
        }
    });

    info!("Quest Engine is ready to serve traffic");

    // Start HTTP server (blocks until shutdown)
    api_server.start_http().await?;

    Ok(())
}
