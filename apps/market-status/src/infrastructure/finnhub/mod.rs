//! Finnhub Adapters
//!
//! WebSocket and REST integrations with Finnhub:
//!
//! - `stream`: long-lived trade stream client with reconnect
//! - `codec`: typed JSON decode of stream frames
//! - `messages`: wire format types
//! - `reconnect`: exponential backoff policy
//! - `rest`: holiday calendar and quote REST calls

/// Typed JSON decode of stream frames.
pub mod codec;

/// Wire format types for stream frames and REST payloads.
pub mod messages;

/// Exponential backoff policy for the stream connection loop.
pub mod reconnect;

/// Holiday calendar and quote REST client.
pub mod rest;

/// Long-lived trade stream client.
pub mod stream;

pub use codec::{CodecError, JsonCodec};
pub use messages::{ErrorFrame, FeedMessage, QuoteResponse, TradeFrame, TradeTick};
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
pub use rest::{FinnhubRestClient, RestError};
pub use stream::{StreamClientConfig, StreamError, StreamEvent, TradeStreamClient};
