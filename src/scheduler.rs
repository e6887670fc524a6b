//! Decay scheduler.
//!
//! Runs alongside ingestion and drives idle-time decay through the same
//! [`EngineHandle`] (and therefore the same lock) as every producer.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Writers of RiskState                    │
//! │                                                              │
//! │  ┌───────────────┐                     ┌──────────────────┐  │
//! │  │ submit()      │                     │ DecayScheduler   │  │
//! │  │ (producers)   │                     │ interval tick    │  │
//! │  └───────┬───────┘                     └────────┬─────────┘  │
//! │          │                                      │            │
//! │          ▼                                      ▼            │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │         EngineHandle (Mutex<RiskEngine>)               │  │
//! │  └───────────────────────┬────────────────────────────────┘  │
//! │                          ▼                                   │
//! │                     Broadcaster                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The loop is stopped through a `watch` channel; [`DecayTask::stop`]
//! waits for the current tick to finish.

use std::time::Duration;

use log::{debug, info, warn};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::watch;
use tokio::task::{self, JoinHandle};
use tokio::time::{self, MissedTickBehavior};

use crate::app::handle::EngineHandle;

/// Running decay loop.
pub struct DecayTask {
    stop: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl DecayTask {
    /// Signal the loop and wait for it to exit.
    pub async fn stop(self) {
        // Err only means the loop already ended.
        let _ = self.stop.send(true);
        if let Err(e) = self.join.await {
            warn!("decay task ended abnormally: {e}");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// One decay evaluation. The engine lock and sink writes block, so on a
/// multi-thread runtime the worker is handed off first.
fn tick(handle: &EngineHandle) -> bool {
    match Handle::current().runtime_flavor() {
        RuntimeFlavor::MultiThread => task::block_in_place(|| handle.decay_tick()),
        _ => handle.decay_tick(),
    }
}

pub struct DecayScheduler;

impl DecayScheduler {
    /// Spawn the loop on the current tokio runtime, ticking at the
    /// configured decay interval.
    pub fn spawn(handle: EngineHandle) -> DecayTask {
        let period = Duration::from_millis(handle.config().decay.interval_ms);
        Self::spawn_with_period(handle, period)
    }

    pub fn spawn_with_period(handle: EngineHandle, period: Duration) -> DecayTask {
        let (stop, mut stopped) = watch::channel(false);
        let join = tokio::spawn(async move {
            let mut ticker = time::interval_at(time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("decay scheduler started ({} ms)", period.as_millis());
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if tick(&handle) {
                            debug!("decay applied");
                        }
                    }
                    changed = stopped.changed() => {
                        if changed.is_err() || *stopped.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("decay scheduler stopped");
        });
        DecayTask { stop, join }
    }
}
