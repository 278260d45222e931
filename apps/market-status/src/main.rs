//! Market Status Binary
//!
//! Starts the session tracker, the trade feed ingestion task, the holiday
//! refresh task, and the JSON API server.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin market-status
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `FINNHUB_TOKEN`: Finnhub API token
//!
//! ## Optional
//! - `MARKET_STATUS_API_PORT`: JSON API port (default: 8000)
//! - `MARKET_STATUS_HOLIDAY_REFRESH_SECS`: Holiday refresh interval (default: 21600)
//! - `MARKET_STATUS_RECONNECT_DELAY_INITIAL_MS`: Initial reconnect delay (default: 500)
//! - `MARKET_STATUS_RECONNECT_DELAY_MAX_SECS`: Maximum reconnect delay (default: 30)
//! - `MARKET_STATUS_RECONNECT_DELAY_MULTIPLIER`: Backoff multiplier (default: 2.0)
//! - `MARKET_STATUS_MAX_RECONNECT_ATTEMPTS`: Reconnect budget, 0 = unlimited (default: 0)
//! - `FINNHUB_EXCHANGE`: Exchange code for the holiday calendar (default: US)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use market_status::infrastructure::finnhub::{
    ReconnectConfig, StreamClientConfig, StreamEvent, TradeStreamClient,
};
use market_status::{
    ApiServer, ApiState, FeedStatus, FinnhubRestClient, HolidayCalendar, MARKET_TZ, ServiceConfig,
    SessionClock, TradeFeedCache, run_refresh_task,
};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Capacity of the stream event channel.
const STREAM_EVENT_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    load_dotenv();
    init_tracing();

    tracing::info!("Starting market status service");

    let config = ServiceConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Shared state: the two caches and the feed status flag.
    let calendar = Arc::new(HolidayCalendar::new());
    let trades = Arc::new(TradeFeedCache::new());
    let feed_status = Arc::new(FeedStatus::new());

    let rest = FinnhubRestClient::new(&config)?;

    // Trade stream client and the event pump that owns the cache writes.
    let (event_tx, event_rx) = mpsc::channel::<StreamEvent>(STREAM_EVENT_CAPACITY);
    let stream_config = StreamClientConfig::new(
        config.stream_url(),
        ReconnectConfig::from_websocket_settings(&config.websocket),
    );
    let stream_client = Arc::new(TradeStreamClient::new(
        stream_config,
        event_tx,
        shutdown_token.clone(),
    ));

    let pump_trades = Arc::clone(&trades);
    let pump_status = Arc::clone(&feed_status);
    tokio::spawn(async move {
        handle_stream_events(event_rx, pump_trades, pump_status).await;
    });

    tokio::spawn(async move {
        if let Err(e) = stream_client.run().await {
            tracing::error!(error = %e, "Trade stream client error");
        }
    });

    // Holiday refresh: once at startup (first tick is immediate), then on
    // the configured interval.
    tokio::spawn(run_refresh_task(
        Arc::clone(&calendar),
        rest.clone(),
        config.calendar.refresh_interval,
        shutdown_token.clone(),
    ));

    // JSON API server.
    let api_state = Arc::new(ApiState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        SessionClock::new(MARKET_TZ),
        Arc::clone(&calendar),
        Arc::clone(&trades),
        Arc::clone(&feed_status),
        rest,
    ));
    let api_server = ApiServer::new(config.server.api_port, api_state, shutdown_token.clone());

    tokio::spawn(async move {
        if let Err(e) = api_server.run().await {
            tracing::error!(error = %e, "API server error");
        }
    });

    tracing::info!("Market status service ready");

    await_shutdown(shutdown_token).await;

    tracing::info!("Market status service stopped");
    Ok(())
}

/// Apply stream events: the sole writer to the trade cache.
async fn handle_stream_events(
    mut rx: mpsc::Receiver<StreamEvent>,
    trades: Arc<TradeFeedCache>,
    feed_status: Arc<FeedStatus>,
) {
    while let Some(event) = rx.recv().await {
        match event {
            StreamEvent::Connected => {
                feed_status.set_connected(true);
                tracing::info!("Trade stream connected");
            }
            StreamEvent::Disconnected => {
                feed_status.set_connected(false);
                tracing::warn!("Trade stream disconnected");
            }
            StreamEvent::Reconnecting { attempt } => {
                feed_status.record_reconnect_attempt();
                tracing::info!(attempt, "Trade stream reconnecting");
            }
            StreamEvent::Trade(tick) => {
                feed_status.record_message();
                trades.insert(tick.into());
            }
            StreamEvent::Error(msg) => {
                feed_status.set_error(msg.clone());
                tracing::error!(error = %msg, "Trade stream error");
            }
        }
    }
}

/// Initialize tracing with an env-filter (RUST_LOG, default info).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Log the parsed configuration. The token never appears here.
fn log_config(config: &ServiceConfig) {
    tracing::info!(
        api_port = config.server.api_port,
        holiday_refresh_secs = config.calendar.refresh_interval.as_secs(),
        exchange = %config.calendar.exchange,
        "Configuration loaded"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
}
