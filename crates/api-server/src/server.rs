//! API server — HTTP surface for webhooks, stats, rewards, and level admin.

use crate::rest::{self, AppState};
use axum::routing::{delete, get, post};
use axum::Router;
use quest_core::config::AppConfig;
use std::net::SocketAddr;
use std::time::Instant;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub struct ApiServer {
    config: AppConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: AppConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Build the application router. Exposed for tests.
    pub fn router(&self) -> Router {
        Router::new()
            // Event intake
            .route("/v1/webhooks", post(rest::handle_webhook))
            .route("/v1/events", post(rest::handle_event))
            // User-facing reads
            .route("/v1/users/:user_id", get(rest::get_user))
            .route("/v1/users/:user_id/engagement", get(rest::get_engagement))
            .route("/v1/users/:user_id/rewards", get(rest::get_user_rewards))
            .route("/v1/users/:user_id/discount", get(rest::get_discount))
            .route("/v1/rewards/claim", post(rest::claim_reward))
            .route("/v1/leaderboard", get(rest::get_leaderboard))
            // Level configuration
            .route(
                "/v1/levels",
                get(rest::list_levels)
                    .put(rest::put_levels)
                    .post(rest::add_level),
            )
            .route("/v1/levels/:level", delete(rest::delete_level))
            // Operational endpoints
            .route("/health", get(rest::health_check))
            .route("/ready", get(rest::readiness))
            .route("/live", get(rest::liveness))
            // Middleware
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Start the HTTP server (blocks until shutdown).
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = self.router();

        let addr = SocketAddr::new(
            self.config.api.host.parse()?,
            self.config.api.http_port,
        );

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics server on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        let handle = builder
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install_recorder()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");

        // Keep the handle alive
        std::mem::forget(handle);
        Ok(())
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// Assemble the default application state from configuration. Useful for
/// the binary and for integration tests.
pub fn build_state(config: &AppConfig) -> AppState {
    use quest_core::levels::LevelStore;
    use quest_ingest::{Ingestor, ScoringQueue};
    use quest_leaderboard::LeaderboardAggregator;
    use quest_ledger::{EngagementLedger, MemoryStore};
    use quest_rewards::RewardCatalog;
    use std::sync::Arc;

    let store = Arc::new(MemoryStore::new());
    let levels = Arc::new(LevelStore::default());
    let ledger = Arc::new(
        EngagementLedger::new(store.clone(), levels.clone())
            .with_clamped_display(config.engagement.clamp_display_totals),
    );
    let ingestor = Arc::new(Ingestor::new(ledger.clone()));
    let queue = Arc::new(ScoringQueue::new(
        ingestor.clone(),
        config.engagement.queue_capacity,
    ));
    let rewards = Arc::new(RewardCatalog::with_defaults());
    let leaderboard = Arc::new(LeaderboardAggregator::new(store));

    AppState {
        ledger,
        ingestor,
        queue,
        rewards,
        leaderboard,
        levels,
        integrations: config.integrations.clone(),
        node_id: config.node_id.clone(),
        start_time: Instant::now(),
    }
}
