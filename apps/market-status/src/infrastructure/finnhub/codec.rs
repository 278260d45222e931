//! Stream Codec Module
//!
//! Typed decode step for inbound trade stream frames. Frames are JSON
//! objects discriminated by a `type` field; anything that fails to decode
//! is rejected here and never reaches the cache.

use super::messages::{ErrorFrame, FeedMessage, TradeFrame};

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame has no `type` discriminator.
    #[error("frame has no type field")]
    MissingKind,

    /// Unknown frame type.
    #[error("unknown frame type: {0}")]
    UnknownKind(String),
}

/// JSON codec for the trade stream.
#[derive(Debug, Default, Clone)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode one text frame into a [`FeedMessage`].
    ///
    /// # Errors
    ///
    /// Returns an error if JSON parsing fails, the `type` discriminator is
    /// missing, or the frame kind is not recognized.
    pub fn decode(&self, text: &str) -> Result<FeedMessage, CodecError> {
        let value: serde_json::Value = serde_json::from_str(text)?;

        let kind = value
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or(CodecError::MissingKind)?;

        match kind {
            "trade" => {
                let frame: TradeFrame = serde_json::from_value(value)?;
                Ok(FeedMessage::Trade(frame))
            }
            "ping" => Ok(FeedMessage::Ping),
            "error" => {
                let frame: ErrorFrame = serde_json::from_value(value)?;
                Ok(FeedMessage::Error(frame))
            }
            other => Err(CodecError::UnknownKind(other.to_string())),
        }
    }
}
