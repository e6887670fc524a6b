//! Thread-safe engine handle.
//!
//! ```text
//!   producers ─┐                    ┌──────────────┐
//!   decay task ┼──▶ Mutex<RiskEngine> ──▶ Mutex<Broadcaster> ──▶ sinks
//!   readers ───┘    (one transition)    (hand-over-hand)
//! ```
//!
//! Every transition runs inside the engine lock. When it produces a frame,
//! the broadcaster lock is taken *before* the engine lock is released, so
//! frames reach subscribers in commit order while the next ingestion is
//! free to start. Lock order is always engine → broadcaster.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::engine::RiskEngine;
use super::frames::{FrameBody, RecentAlerts, RecentDetections, StatusReport, SubmitReport};
use super::ports::{Clock, Subscriber};
use crate::analysis::BlockageSnapshot;
use crate::broadcast::{Broadcaster, SubscriberId};
use crate::config::EngineConfig;
use crate::detection::DetectionReport;
use crate::error::Result;

struct Shared {
    engine: Mutex<RiskEngine>,
    broadcaster: Mutex<Broadcaster>,
    clock: Arc<dyn Clock>,
}

/// Cloneable, `Send + Sync` front door to the engine.
#[derive(Clone)]
pub struct EngineHandle {
    inner: Arc<Shared>,
}

impl EngineHandle {
    pub fn new(config: EngineConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let broadcaster = Broadcaster::new(config.wire_format);
        let engine = RiskEngine::new(config)?;
        Ok(Self {
            inner: Arc::new(Shared {
                engine: Mutex::new(engine),
                broadcaster: Mutex::new(broadcaster),
                clock,
            }),
        })
    }

    /// Run `f` under the engine lock and broadcast whatever frame it yields.
    fn transition<R>(
        &self,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut RiskEngine) -> (R, Option<FrameBody>),
    ) -> R {
        let mut engine = self.inner.engine.lock();
        let (result, frame) = f(&mut engine);
        if let Some(body) = frame {
            let mut broadcaster = self.inner.broadcaster.lock();
            drop(engine);
            broadcaster.broadcast(body, now);
        }
        result
    }

    fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    // ── Ingestion ─────────────────────────────────────────────

    pub fn submit(&self, report: DetectionReport) -> SubmitReport {
        let now = self.now();
        self.transition(now, |e| {
            let out = e.submit(report, now);
            (out.report, out.frame)
        })
    }

    /// One decay evaluation; `true` when the score moved.
    pub fn decay_tick(&self) -> bool {
        let now = self.now();
        self.transition(now, |e| {
            let out = e.decay_tick(now);
            (out.applied, out.frame)
        })
    }

    /// Clear everything back to baseline and tell subscribers.
    pub fn reset(&self) -> StatusReport {
        let now = self.now();
        self.transition(now, |e| {
            let frame = e.reset(now);
            (frame.status().clone(), Some(frame))
        })
    }

    // ── Reads ─────────────────────────────────────────────────

    pub fn status(&self) -> StatusReport {
        let now = self.now();
        self.inner.engine.lock().status(now)
    }

    pub fn blockage_analysis(&self) -> BlockageSnapshot {
        let now = self.now();
        self.inner.engine.lock().blockage_analysis(now)
    }

    pub fn recent_detections(&self, limit: usize) -> RecentDetections {
        self.inner.engine.lock().recent_detections(limit)
    }

    pub fn recent_alerts(&self, limit: usize) -> RecentAlerts {
        self.inner.engine.lock().recent_alerts(limit)
    }

    pub fn config(&self) -> EngineConfig {
        self.inner.engine.lock().config().clone()
    }

    // ── Subscribers ───────────────────────────────────────────

    /// Register a sink; it immediately receives one `initial` frame.
    pub fn subscribe(&self, sink: Box<dyn Subscriber>) -> Result<SubscriberId> {
        let now = self.now();
        let engine = self.inner.engine.lock();
        let initial = engine.initial_frame(now);
        let mut broadcaster = self.inner.broadcaster.lock();
        drop(engine);
        broadcaster.register(sink, initial, now)
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.inner.broadcaster.lock().unregister(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.broadcaster.lock().len()
    }
}
