//! Unified error types for the PipeGuard engine.
//!
//! Expected outcomes of ingestion (invalid candidate, duplicate, pending
//! dwell confirmation) are *values*, reported through
//! [`Disposition`](crate::app::frames::Disposition), never errors.
//! `Error` is reserved for configuration, encoding and I/O failures.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible engine operation funnels into this type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration is invalid or could not be loaded.
    #[error("config: {0}")]
    Config(String),
    /// A frame could not be serialised.
    #[error("encode: {0}")]
    Encode(String),
    /// A subscriber sink rejected a frame.
    #[error("delivery: {0}")]
    Delivery(#[from] DeliveryError),
    /// Underlying I/O failure (config file, sink writer).
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = core::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Encode(e.to_string())
    }
}

impl From<postcard::Error> for Error {
    fn from(e: postcard::Error) -> Self {
        Self::Encode(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Subscriber delivery errors
// ---------------------------------------------------------------------------

/// Why a subscriber could not take a frame. Any variant unregisters the sink.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The receiving side has gone away.
    #[error("subscriber closed")]
    Closed,
    /// The subscriber's buffer is full; frames are never queued or retried.
    #[error("subscriber backlogged")]
    Backlogged,
    #[error("write failed: {0}")]
    Write(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Timestamp parse errors
// ---------------------------------------------------------------------------

/// A detection timestamp that could not be interpreted.
///
/// Never fatal: each consumer applies its own fallback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unparsable timestamp {raw:?}")]
pub struct TimestampError {
    pub raw: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_context() {
        let e = Error::Config("window_capacity must be positive".into());
        assert_eq!(e.to_string(), "config: window_capacity must be positive");

        let e: Error = DeliveryError::Closed.into();
        assert_eq!(e.to_string(), "delivery: subscriber closed");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let e: Error = io.into();
        assert!(matches!(e, Error::Io(_)));
    }
}
