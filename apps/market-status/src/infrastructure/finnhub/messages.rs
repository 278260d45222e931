//! Finnhub Wire Message Types
//!
//! Wire format types for the trade WebSocket stream and the REST endpoints.
//! Stream frames are JSON objects discriminated by a `type` field.
//!
//! # Frame Types
//!
//! - `trade`: batch of trade ticks
//! - `ping`: keepalive, no payload
//! - `error`: error description
//!
//! # References
//!
//! - [Trades websocket](https://finnhub.io/docs/api/websocket-trades)
//! - [Market holiday](https://finnhub.io/docs/api/market-holiday)
//! - [Quote](https://finnhub.io/docs/api/quote)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::calendar::HolidayEvent;
use crate::domain::trades::TradeRecord;

/// A decoded stream frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedMessage {
    /// Batch of trade ticks.
    Trade(TradeFrame),
    /// Keepalive from the server; acknowledged and dropped.
    Ping,
    /// Error reported by the server.
    Error(ErrorFrame),
}

/// A `trade` frame carrying one or more ticks.
///
/// # Wire Format (JSON)
/// ```json
/// {"type":"trade","data":[{"s":"AAPL","p":214.02,"t":1704067200000,"v":50}]}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeFrame {
    /// Frame type (always "trade").
    #[serde(rename = "type")]
    pub msg_type: String,

    /// Trade ticks in arrival order.
    #[serde(default)]
    pub data: Vec<TradeTick>,
}

/// One trade tick for one symbol.
///
/// `s` and `p` are required; a tick missing either is rejected at decode
/// time and never reaches the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeTick {
    /// Exchange-assigned symbol.
    #[serde(rename = "s")]
    pub symbol: String,

    /// Last price.
    #[serde(rename = "p")]
    pub price: Decimal,

    /// Volume traded.
    #[serde(rename = "v", default)]
    pub volume: Decimal,

    /// Exchange timestamp, milliseconds since the epoch.
    #[serde(rename = "t", with = "chrono::serde::ts_milliseconds")]
    pub event_time: DateTime<Utc>,
}

impl From<TradeTick> for TradeRecord {
    fn from(tick: TradeTick) -> Self {
        Self {
            symbol: tick.symbol,
            price: tick.price,
            volume: tick.volume,
            event_time: tick.event_time,
        }
    }
}

/// An `error` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorFrame {
    /// Frame type (always "error").
    #[serde(rename = "type")]
    pub msg_type: String,

    /// Error description.
    #[serde(default)]
    pub msg: String,
}

/// Response envelope of the market-holiday REST endpoint.
///
/// # Wire Format (JSON)
/// ```json
/// {"data":[{"eventName":"Christmas","atDate":"2025-12-25","tradingHour":""}],
///  "exchange":"US","timezone":"America/New_York"}
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HolidayResponse {
    /// Holiday events, one per date.
    #[serde(default)]
    pub data: Vec<HolidayEvent>,

    /// Exchange code the calendar applies to.
    #[serde(default)]
    pub exchange: String,
}

/// Response of the quote REST endpoint.
///
/// Only the fields the service consumes are modeled; Finnhub also sends
/// day-range and open figures which are ignored here.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct QuoteResponse {
    /// Current price.
    #[serde(rename = "c")]
    pub current_price: Option<Decimal>,

    /// Previous close price.
    #[serde(rename = "pc")]
    pub previous_close: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn trade_tick_decodes_wire_names() {
        let json = r#"{"s":"AAPL","p":214.02,"t":1704067200000,"v":50,"c":["1"]}"#;
        let tick: TradeTick = serde_json::from_str(json).unwrap();
        assert_eq!(tick.symbol, "AAPL");
        assert_eq!(tick.price, Decimal::new(21_402, 2));
        assert_eq!(tick.volume, Decimal::new(50, 0));
        assert_eq!(
            tick.event_time,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn trade_tick_requires_symbol_and_price() {
        let missing_price = r#"{"s":"AAPL","t":1704067200000}"#;
        assert!(serde_json::from_str::<TradeTick>(missing_price).is_err());

        let missing_symbol = r#"{"p":214.02,"t":1704067200000}"#;
        assert!(serde_json::from_str::<TradeTick>(missing_symbol).is_err());
    }

    #[test]
    fn trade_tick_volume_defaults_to_zero() {
        let json = r#"{"s":"BINANCE:BTCUSDT","p":43000.5,"t":1704067200000}"#;
        let tick: TradeTick = serde_json::from_str(json).unwrap();
        assert_eq!(tick.volume, Decimal::ZERO);
    }

    #[test]
    fn tick_converts_into_record() {
        let tick = TradeTick {
            symbol: "MSFT".to_string(),
            price: Decimal::new(43_012, 2),
            volume: Decimal::new(10, 0),
            event_time: Utc.with_ymd_and_hms(2025, 6, 2, 14, 0, 0).unwrap(),
        };

        let record = TradeRecord::from(tick.clone());
        assert_eq!(record.symbol, tick.symbol);
        assert_eq!(record.price, tick.price);
        assert_eq!(record.event_time, tick.event_time);
    }

    #[test]
    fn holiday_response_decodes_envelope() {
        let json = r#"{
            "data": [
                {"eventName": "Independence Day", "atDate": "2025-07-04", "tradingHour": ""},
                {"eventName": "Christmas Eve", "atDate": "2025-12-24", "tradingHour": "09:30-13:00"}
            ],
            "exchange": "US",
            "timezone": "America/New_York"
        }"#;

        let response: HolidayResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.exchange, "US");
        assert_eq!(response.data.len(), 2);
        assert!(response.data[0].is_full_day_closure());
        assert!(!response.data[1].is_full_day_closure());
    }

    #[test]
    fn quote_response_tolerates_missing_fields() {
        let full = r#"{"c":252.48,"d":1.2,"dp":0.47,"h":253.0,"l":249.3,"o":250.0,"pc":251.28,"t":1704067200}"#;
        let quote: QuoteResponse = serde_json::from_str(full).unwrap();
        assert_eq!(quote.current_price, Some(Decimal::new(25_248, 2)));
        assert_eq!(quote.previous_close, Some(Decimal::new(25_128, 2)));

        let empty = "{}";
        let quote: QuoteResponse = serde_json::from_str(empty).unwrap();
        assert!(quote.current_price.is_none());
        assert!(quote.previous_close.is_none());
    }
}
