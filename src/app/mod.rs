//! Application core.
//!
//! [`engine::RiskEngine`] holds the domain logic and state; it is plain,
//! single-threaded and clock-free. [`handle::EngineHandle`] wraps it for
//! concurrent use and drives the broadcaster. All interaction with the
//! outside world happens through the traits in [`ports`].

pub mod engine;
pub mod frames;
pub mod handle;
pub mod ports;

pub use engine::RiskEngine;
pub use frames::{Disposition, FrameBody, StatusReport, SubmitReport};
pub use handle::EngineHandle;
