//! Trade Feed Cache
//!
//! Latest-trade-per-symbol cache written by the feed ingestion task and read
//! by any number of concurrent request handlers. New records fully replace
//! the previous value for the same symbol, ordered by feed arrival.
//!
//! While the feed is disconnected the cache keeps serving the last-known
//! records; staleness is visible only through each record's own timestamp.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::Serialize;

/// The latest observed trade for one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradeRecord {
    /// Exchange-assigned symbol.
    pub symbol: String,
    /// Last trade price.
    pub price: Decimal,
    /// Trade volume.
    pub volume: Decimal,
    /// Exchange timestamp of the trade.
    pub event_time: DateTime<Utc>,
}

/// Concurrently-read map of symbol to latest trade.
///
/// The feed ingestion task is the sole writer; readers take the lock only
/// for the duration of a clone of one record.
#[derive(Debug, Default)]
pub struct TradeFeedCache {
    records: RwLock<HashMap<String, TradeRecord>>,
}

impl TradeFeedCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for `record.symbol`.
    pub fn insert(&self, record: TradeRecord) {
        self.records.write().insert(record.symbol.clone(), record);
    }

    /// The latest record for `symbol`, if any trade has been observed.
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<TradeRecord> {
        self.records.read().get(symbol).cloned()
    }

    /// Number of symbols with at least one observed trade.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// True iff no trade has been observed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

/// Connection status of the streaming feed, surfaced on the health endpoint.
///
/// Purely advisory: the read path never consults it.
#[derive(Debug, Default)]
pub struct FeedStatus {
    connected: AtomicBool,
    messages_received: AtomicU64,
    reconnect_attempts: AtomicU32,
    last_connected_at: RwLock<Option<DateTime<Utc>>>,
    last_error: RwLock<Option<String>>,
}

impl FeedStatus {
    /// Create a status block in the disconnected state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the feed connected or disconnected.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
        if connected {
            *self.last_connected_at.write() = Some(Utc::now());
            self.reconnect_attempts.store(0, Ordering::Relaxed);
            *self.last_error.write() = None;
        }
    }

    /// Record one ingested feed message.
    pub fn record_message(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one reconnection attempt.
    pub fn record_reconnect_attempt(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the most recent feed error.
    pub fn set_error(&self, message: String) {
        *self.last_error.write() = Some(message);
    }

    /// Whether the feed is currently connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Total feed messages ingested this process lifetime.
    #[must_use]
    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    /// Reconnect attempts since the last successful connection.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts.load(Ordering::Relaxed)
    }

    /// Instant of the last successful connection, if any.
    #[must_use]
    pub fn last_connected_at(&self) -> Option<DateTime<Utc>> {
        *self.last_connected_at.read()
    }

    /// Most recent feed error, if any since the last connection.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(symbol: &str, price: i64) -> TradeRecord {
        TradeRecord {
            symbol: symbol.to_string(),
            price: Decimal::new(price, 0),
            volume: Decimal::new(100, 0),
            event_time: Utc::now(),
        }
    }

    #[test]
    fn last_write_wins_per_symbol() {
        let cache = TradeFeedCache::new();
        cache.insert(record("AAPL", 100));
        cache.insert(record("AAPL", 101));

        let latest = cache.get("AAPL").unwrap();
        assert_eq!(latest.price, Decimal::new(101, 0));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn absent_symbol_reads_none() {
        let cache = TradeFeedCache::new();
        assert!(cache.get("MSFT").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn writes_to_one_symbol_do_not_disturb_another() {
        let cache = Arc::new(TradeFeedCache::new());
        cache.insert(record("MSFT", 430));

        let writer = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                for i in 0..1_000 {
                    cache.insert(record("AAPL", i));
                }
            })
        };

        // Readers concurrent with the writer always see the full MSFT record.
        for _ in 0..1_000 {
            let msft = cache.get("MSFT").unwrap();
            assert_eq!(msft.price, Decimal::new(430, 0));
            assert_eq!(msft.symbol, "MSFT");
        }

        writer.join().unwrap();
        assert_eq!(cache.get("AAPL").unwrap().price, Decimal::new(999, 0));
    }

    #[test]
    fn feed_status_reset_on_connect() {
        let status = FeedStatus::new();
        status.record_reconnect_attempt();
        status.record_reconnect_attempt();
        status.set_error("boom".to_string());
        assert_eq!(status.reconnect_attempts(), 2);
        assert!(status.last_error().is_some());

        status.set_connected(true);
        assert!(status.is_connected());
        assert_eq!(status.reconnect_attempts(), 0);
        assert!(status.last_error().is_none());
        assert!(status.last_connected_at().is_some());
    }

    #[test]
    fn feed_status_counts_messages() {
        let status = FeedStatus::new();
        status.record_message();
        status.record_message();
        assert_eq!(status.messages_received(), 2);
    }
}
