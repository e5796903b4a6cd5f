use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

mod config;
mod dashboard;
mod db;
mod engine;
mod feeds;
mod stats;

use config::Config;
use dashboard::AppState;
use db::Database;
use engine::{Engine, ProjectionModel};
use feeds::{HltvMatches, MatchProvider, PrizePicksFeed, PropProvider, UnderdogFeed};
use stats::{PandaScoreStats, StatsProvider};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let feed_timeout = Duration::from_secs(config.feed_timeout_secs);

    // Open database
    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);

    // Prop feeds, one per DFS platform
    let prop_providers: Vec<Arc<dyn PropProvider>> = vec![
        Arc::new(PrizePicksFeed::new(&config.prizepicks_api_url, feed_timeout)?),
        Arc::new(UnderdogFeed::new(&config.underdog_api_url, feed_timeout)?),
    ];
    info!("Configured {} prop feed(s)", prop_providers.len());

    let match_provider: Arc<dyn MatchProvider> = Arc::new(HltvMatches::new(
        &config.hltv_api_url,
        config.hltv_api_key.clone(),
        feed_timeout,
    )?);

    // Real stats are opt-in; without a key the model runs on its static
    // rating table and sampled form.
    let stats_provider: Option<Arc<dyn StatsProvider>> = match &config.pandascore_api_key {
        Some(_) => {
            info!("PandaScore stats enabled");
            Some(Arc::new(PandaScoreStats::new(
                config.pandascore_api_key.clone(),
                feed_timeout,
            )?))
        }
        None => {
            info!("PandaScore stats disabled (no API key)");
            None
        }
    };

    let model = ProjectionModel::new(stats_provider);
    let engine = Arc::new(Engine::new(
        db,
        prop_providers,
        match_provider,
        model,
        feed_timeout,
    ));

    // First pass before serving traffic, so the dashboard has data
    if let Err(e) = engine.refresh().await {
        warn!("Initial refresh failed: {:#}", e);
    }

    // Periodic refresh task
    {
        let engine = Arc::clone(&engine);
        let interval_secs = config.refresh_interval_secs;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            interval.tick().await; // first tick fires immediately; already refreshed
            loop {
                interval.tick().await;
                if let Err(e) = engine.refresh().await {
                    error!("Scheduled refresh failed: {:#}", e);
                }
            }
        });
    }

    // Hourly line-history pruning task
    {
        let engine = Arc::clone(&engine);
        let retention_hours = config.history_retention_hours;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(3600));
            loop {
                interval.tick().await;
                engine.tracker().clear_old_history(retention_hours).await;
            }
        });
    }

    // Start the dashboard HTTP server
    let app = dashboard::router(AppState {
        engine: Arc::clone(&engine),
    });
    let addr: SocketAddr = config.dashboard_addr.parse()?;
    info!("Dashboard listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
