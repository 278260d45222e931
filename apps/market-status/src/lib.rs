#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Market Status - US Equities Session & Trade Feed Service
//!
//! Tracks which trading session the US equities market is in, how long until
//! the next transition, and the latest trade per symbol from a streaming
//! feed, reconciling three time domains (market-local wall-clock, the
//! holiday calendar, and the live feed) into one low-latency read path.
//!
//! # Layers (inside -> outside)
//!
//! - **Domain**: Pure session and market-data logic
//!   - `calendar`: holiday schedule and trading-day arithmetic
//!   - `session`: the five-state session machine
//!   - `trades`: latest-trade cache and feed status
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `finnhub`: WebSocket trade stream and REST calls
//!   - `holidays`: refreshing holiday calendar service
//!   - `api`: JSON HTTP read endpoints
//!   - `config`: environment-driven configuration
//!
//! # Data Flow
//!
//! ```text
//! Finnhub trade WS ──► TradeStreamClient ──► TradeFeedCache ─┐
//!                                                            ├──► JSON API
//! Finnhub REST ──► periodic refresh ──► HolidayCalendar ─────┤
//!                                            │               │
//!                                            ▼               │
//!                              SessionStateMachine ──────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Pure session and market-data logic.
pub mod domain;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::calendar::{CalendarError, HolidayEvent, HolidaySchedule};
pub use domain::session::{
    MARKET_TZ, SessionClock, SessionError, SessionSnapshot, SessionState, compute_state,
};
pub use domain::trades::{FeedStatus, TradeFeedCache, TradeRecord};

// Infrastructure config
pub use infrastructure::config::{
    ApiToken, CalendarSettings, ConfigError, ServerSettings, ServiceConfig, WebSocketSettings,
};

// Finnhub adapters
pub use infrastructure::finnhub::{
    FinnhubRestClient, ReconnectConfig, RestError, StreamClientConfig, StreamError, StreamEvent,
    TradeStreamClient,
};

// Holiday calendar service
pub use infrastructure::holidays::{HolidayCalendar, run_refresh_task};

// API server
pub use infrastructure::api::{ApiServer, ApiServerError, ApiState, CHINA_TZ, create_router};
