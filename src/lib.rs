//! PipeGuard risk engine library.
//!
//! Turns a noisy stream of debris detections from a fixed pipe camera into a
//! smoothed, bounded risk score, a discrete risk level and edge-triggered
//! alerts, pushed to subscribers.
//!
//! ```text
//!  Detector ──▶ submit ──▶ detection ──▶ analysis ──▶ risk ──▶ broadcast ──▶ subscribers
//!                              ▲                        ▲
//!                              └──── scheduler (decay) ─┘
//! ```

#![deny(unused_must_use)]

pub mod adapters;
pub mod analysis;
pub mod app;
pub mod broadcast;
pub mod config;
pub mod detection;
pub mod error;
pub mod risk;
pub mod scheduler;

pub use app::{EngineHandle, RiskEngine};
pub use config::EngineConfig;
pub use error::{Error, Result};
