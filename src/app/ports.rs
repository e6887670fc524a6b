//! Port traits: the hexagonal boundary between the engine and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ EngineHandle (domain)
//! ```
//!
//! Driven adapters (clocks, subscriber sinks, configuration stores) implement
//! these traits. The engine never reads the wall clock or touches a socket
//! directly, so everything is testable with in-memory adapters.
//!
//! ## Notes
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - **Subscriber** failures are final: the sink is dropped, never retried.

use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::error::{DeliveryError, Result};

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: wall clock → domain)
// ───────────────────────────────────────────────────────────────

/// Wall-clock source, read once at the start of each operation.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

// ───────────────────────────────────────────────────────────────
// Subscriber port (driven adapter: domain → push transport)
// ───────────────────────────────────────────────────────────────

/// Opaque push sink registered by the transport layer.
///
/// Receives already-encoded frames. Delivery is best effort and at most
/// once; any error unregisters the sink.
pub trait Subscriber: Send {
    fn deliver(&mut self, frame: &[u8]) -> core::result::Result<(), DeliveryError>;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists engine configuration.
///
/// Implementations MUST call [`EngineConfig::validate`] before persisting,
/// and reject out-of-range values rather than clamping them.
pub trait ConfigPort {
    /// Returns [`EngineConfig::default()`] when nothing is stored.
    fn load(&self) -> Result<EngineConfig>;

    fn save(&self, config: &EngineConfig) -> Result<()>;
}
