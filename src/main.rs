// Main entry point - Dependency injection, refresh driver and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use anyhow::Context;
use axum::{
    routing::{get, post, put},
    Router,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::broadcast;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use crate::application::announcer::AnnouncementSink;
use crate::application::monitor_service::MonitorService;
use crate::infrastructure::announcer::{CommandAnnouncer, LogAnnouncer};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::config::load_monitor_settings;
use crate::infrastructure::csv_feed::{CsvFeedRepository, FeedSource};
use crate::presentation::app_state::AppState;
use crate::presentation::events::stream_events;
use crate::presentation::handlers::{
    acknowledge, get_status, get_table, grant_audio, health_check, start, stop, update_config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_monitor_settings().context("Failed to load monitor settings")?;

    let repository = Arc::new(CsvFeedRepository::new(
        FeedSource::parse(&settings.feed.source),
        settings.feed.timestamp_format.clone(),
        Duration::from_secs(settings.feed.cache_ttl_secs),
        Duration::from_secs(settings.feed.request_timeout_secs.max(1)),
    )?);

    let announcer: Arc<dyn AnnouncementSink> =
        match CommandAnnouncer::from_command_line(&settings.audio.command) {
            Some(command) => Arc::new(command),
            None => Arc::new(LogAnnouncer),
        };

    let (events, _) = broadcast::channel(64);
    let monitor_service = MonitorService::new(
        repository,
        Arc::new(SystemClock),
        announcer,
        events,
        settings.monitor_options(),
    );

    let interval = Duration::from_secs(settings.refresh.interval_secs.max(1));
    tokio::spawn(monitor_service.clone().run(interval));

    let state = Arc::new(AppState { monitor_service });

    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/status", get(get_status))
        .route("/table", get(get_table))
        .route("/config", put(update_config))
        .route("/actions/start", post(start))
        .route("/actions/stop", post(stop))
        .route("/actions/acknowledge", post(acknowledge))
        .route("/actions/audio", post(grant_audio))
        .route("/events", get(stream_events))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = settings
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", settings.server.bind))?;
    tracing::info!(
        "Starting swing-monitor on {} (feed: {}, refresh every {:?})",
        addr,
        settings.feed.source,
        interval
    );

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
