//! JSON API Server
//!
//! Read-path HTTP endpoints over the shared service state.
//!
//! # Endpoints
//!
//! - `GET /api/time_status` - Current session state and next transition
//! - `GET /api/recent_holidays` - Earliest holiday on or after today
//! - `GET /api/last_trade?symbol=...` - Latest cached trade for a symbol
//! - `GET /api/quote?symbol=...` - Quote passthrough to the external source
//! - `GET /health` - Service health, feed status, and cache counters
//!
//! Session states are rendered through their localized labels here and only
//! here; everything upstream works with the `SessionState` enum.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::domain::calendar::HolidayEvent;
use crate::domain::session::{SessionClock, SessionError, compute_state};
use crate::domain::trades::{FeedStatus, TradeFeedCache, TradeRecord};
use crate::infrastructure::finnhub::{FinnhubRestClient, QuoteResponse};
use crate::infrastructure::holidays::HolidayCalendar;

/// Reference zone for the mirrored local time on the status endpoint.
pub const CHINA_TZ: Tz = chrono_tz::Asia::Shanghai;

/// Display format for local times: no seconds, with weekday.
const TIME_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M %A";

// =============================================================================
// Response Types
// =============================================================================

/// Response of `GET /api/time_status`.
#[derive(Debug, Clone, Serialize)]
pub struct TimeStatusResponse {
    /// US Eastern local time, `%Y-%m-%d %H:%M %A`.
    pub us_time: String,
    /// Beijing local time, same format.
    pub china_time: String,
    /// Localized label of the current session.
    pub current_state: &'static str,
    /// Localized label of the next session.
    pub next_state: &'static str,
    /// Non-negative seconds until the next transition.
    pub time_to_next_state_seconds: f64,
}

/// Response of `GET /api/recent_holidays`.
#[derive(Debug, Clone, Serialize)]
pub struct RecentHolidaysResponse {
    /// Earliest holiday on or after today, if the calendar knows one.
    pub upcoming_holiday: Option<HolidayEvent>,
}

/// Response of `GET /api/quote`.
#[derive(Debug, Clone, Serialize)]
pub struct QuoteSummary {
    /// Symbol the quote is for.
    pub symbol: String,
    /// Current price, if the source reported one.
    pub current_price: Option<Decimal>,
    /// Previous close, if the source reported one.
    pub previous_close: Option<Decimal>,
    /// Absolute change versus the previous close, 2 dp.
    pub change: Option<Decimal>,
    /// Percent change versus the previous close, 2 dp.
    pub percent_change: Option<Decimal>,
    /// Data source marker.
    pub source: &'static str,
}

impl QuoteSummary {
    /// Derive the change figures from a raw quote response.
    #[must_use]
    pub fn from_response(symbol: String, quote: &QuoteResponse) -> Self {
        let change = match (quote.current_price, quote.previous_close) {
            (Some(current), Some(previous)) => Some(current - previous),
            _ => None,
        };

        let percent_change = match (change, quote.previous_close) {
            (Some(change), Some(previous)) if !previous.is_zero() => {
                Some(change / previous * Decimal::ONE_HUNDRED)
            }
            (Some(_), Some(_)) => Some(Decimal::ZERO),
            _ => None,
        };

        Self {
            symbol,
            current_price: quote.current_price,
            previous_close: quote.previous_close,
            change: change.map(|d| d.round_dp(2)),
            percent_change: percent_change.map(|d| d.round_dp(2)),
            source: "REST",
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy" while the feed is connected, else "degraded".
    pub status: &'static str,
    /// Service version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Trade feed connection status.
    pub feed: FeedInfo,
    /// Holiday calendar status.
    pub holidays: CalendarInfo,
}

/// Trade feed status block.
#[derive(Debug, Clone, Serialize)]
pub struct FeedInfo {
    /// Whether the stream is currently connected.
    pub connected: bool,
    /// Messages ingested this process lifetime.
    pub messages_received: u64,
    /// Reconnect attempts since the last successful connection.
    pub reconnect_attempts: u32,
    /// Instant of the last successful connection.
    pub last_connected_at: Option<DateTime<Utc>>,
    /// Most recent feed error, if any.
    pub last_error: Option<String>,
    /// Symbols with at least one cached trade.
    pub symbols_cached: usize,
}

/// Holiday calendar status block.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarInfo {
    /// Number of known holiday entries.
    pub entries: usize,
    /// Instant of the last successful refresh.
    pub last_refreshed: Option<DateTime<Utc>>,
}

// =============================================================================
// Server State
// =============================================================================

/// Shared state for the API server.
pub struct ApiState {
    version: String,
    started_at: Instant,
    clock: SessionClock,
    calendar: Arc<HolidayCalendar>,
    trades: Arc<TradeFeedCache>,
    feed: Arc<FeedStatus>,
    rest: FinnhubRestClient,
}

impl ApiState {
    /// Create new API server state.
    #[must_use]
    pub fn new(
        version: String,
        clock: SessionClock,
        calendar: Arc<HolidayCalendar>,
        trades: Arc<TradeFeedCache>,
        feed: Arc<FeedStatus>,
        rest: FinnhubRestClient,
    ) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            clock,
            calendar,
            trades,
            feed,
            rest,
        }
    }
}

/// Create the Axum router with all endpoints.
#[must_use]
pub fn create_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/time_status", get(time_status_handler))
        .route("/api/recent_holidays", get(recent_holidays_handler))
        .route("/api/last_trade", get(last_trade_handler))
        .route("/api/quote", get(quote_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

// =============================================================================
// API Server
// =============================================================================

/// JSON API HTTP server.
pub struct ApiServer {
    port: u16,
    state: Arc<ApiState>,
    cancel: CancellationToken,
}

impl ApiServer {
    /// Create a new API server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<ApiState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the API server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `ApiServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), ApiServerError> {
        let app = create_router(self.state);

        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ApiServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| ApiServerError::ServerFailed(e.to_string()))?;

        tracing::info!("API server stopped");
        Ok(())
    }
}

/// API server errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn time_status_handler(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<TimeStatusResponse>, ApiError> {
    let now_us = state.clock.now();
    let now_cn = now_us.with_timezone(&CHINA_TZ);

    let schedule = state.calendar.snapshot();
    let snapshot = compute_state(&now_us, &schedule)?;

    Ok(Json(TimeStatusResponse {
        us_time: now_us.format(TIME_DISPLAY_FORMAT).to_string(),
        china_time: now_cn.format(TIME_DISPLAY_FORMAT).to_string(),
        current_state: snapshot.current.label(),
        next_state: snapshot.next.label(),
        time_to_next_state_seconds: snapshot.seconds_to_next,
    }))
}

async fn recent_holidays_handler(
    State(state): State<Arc<ApiState>>,
) -> Json<RecentHolidaysResponse> {
    let today = state.clock.now().date_naive();
    let upcoming_holiday = state.calendar.snapshot().upcoming_holiday(today).cloned();

    Json(RecentHolidaysResponse { upcoming_holiday })
}

/// Query parameters for the symbol-keyed endpoints.
#[derive(Debug, Deserialize)]
struct SymbolParams {
    symbol: String,
}

async fn last_trade_handler(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<SymbolParams>,
) -> Result<Json<TradeRecord>, ApiError> {
    state.trades.get(&params.symbol).map(Json).ok_or_else(|| {
        ApiError::not_found(format!("no trade observed for symbol {}", params.symbol))
    })
}

async fn quote_handler(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<SymbolParams>,
) -> Result<Json<QuoteSummary>, ApiError> {
    let quote = state.rest.quote(&params.symbol).await.map_err(|e| {
        tracing::warn!(symbol = %params.symbol, error = %e, "Quote fetch failed");
        ApiError::bad_gateway("failed to fetch quote")
    })?;

    Ok(Json(QuoteSummary::from_response(params.symbol, &quote)))
}

async fn health_handler(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    let connected = state.feed.is_connected();
    let schedule = state.calendar.snapshot();

    Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" },
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        feed: FeedInfo {
            connected,
            messages_received: state.feed.messages_received(),
            reconnect_attempts: state.feed.reconnect_attempts(),
            last_connected_at: state.feed.last_connected_at(),
            last_error: state.feed.last_error(),
            symbols_cached: state.trades.len(),
        },
        holidays: CalendarInfo {
            entries: schedule.len(),
            last_refreshed: state.calendar.last_refreshed(),
        },
    })
}

// =============================================================================
// Errors
// =============================================================================

/// Structured error payload returned to API callers.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// API error with an HTTP status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Create an internal server error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    /// Create a not-found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    /// Create an upstream-failure error.
    #[must_use]
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: message.into(),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(error: SessionError) -> Self {
        Self::internal(error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

// =============================================================================
// Tests
// =============================================================================
