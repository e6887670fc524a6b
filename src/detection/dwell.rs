//! Dwell confirmation pre-filter.
//!
//! A detection is promoted only after its key (category + grid cell of the
//! box centre) has been seen continuously for `confirm_secs`.
//!
//! ```text
//!   first sighting ──▶ Pending ──(seen again ≥ confirm)──▶ Confirmed
//!                         │
//!                         └──(unrefreshed > expire)──▶ Expired
//! ```
//!
//! Expiry is applied lazily on every [`DwellFilter::observe`] and eagerly by
//! [`DwellFilter::sweep`], which the decay tick calls.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::debug;

use super::report::Detection;
use crate::config::DwellConfig;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DwellKey {
    category: String,
    cell: (i64, i64),
}

#[derive(Debug, Clone)]
struct PendingEntry {
    latest: Detection,
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
    sightings: u32,
}

/// Result of feeding one sighting through the filter.
#[derive(Debug, Clone, PartialEq)]
pub enum DwellOutcome {
    /// Held back until the key has dwelt long enough.
    Pending { sightings: u32 },
    /// Promoted; carries the most recent sighting.
    Confirmed(Detection),
}

#[derive(Debug, Clone)]
pub struct DwellFilter {
    config: DwellConfig,
    cell_px: f64,
    pending: HashMap<DwellKey, PendingEntry>,
}

fn secs_between(later: DateTime<Utc>, earlier: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 1000.0
}

impl DwellFilter {
    pub fn new(config: DwellConfig, cell_px: f64) -> Self {
        Self {
            config,
            cell_px,
            pending: HashMap::new(),
        }
    }

    fn key_of(&self, d: &Detection) -> DwellKey {
        let (cx, cy) = d.bbox().center();
        DwellKey {
            category: d.category().to_owned(),
            cell: (
                (cx as f64 / self.cell_px).floor() as i64,
                (cy as f64 / self.cell_px).floor() as i64,
            ),
        }
    }

    /// Register a sighting at wall-clock `now`.
    pub fn observe(&mut self, detection: Detection, now: DateTime<Utc>) -> DwellOutcome {
        self.sweep(now);
        let key = self.key_of(&detection);

        let Some(entry) = self.pending.get_mut(&key) else {
            debug!("dwell: pending {} at {:?}", key.category, key.cell);
            self.pending.insert(
                key,
                PendingEntry {
                    latest: detection,
                    first_seen: now,
                    last_seen: now,
                    sightings: 1,
                },
            );
            return DwellOutcome::Pending { sightings: 1 };
        };

        entry.sightings += 1;
        if secs_between(now, entry.first_seen) >= self.config.confirm_secs {
            debug!(
                "dwell: confirmed {} at {:?} after {} sightings",
                key.category, key.cell, entry.sightings
            );
            self.pending.remove(&key);
            return DwellOutcome::Confirmed(detection);
        }

        entry.latest = detection;
        entry.last_seen = now;
        DwellOutcome::Pending {
            sightings: entry.sightings,
        }
    }

    /// Drop entries unrefreshed for longer than `expire_secs`; returns how many.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let expire = self.config.expire_secs;
        let before = self.pending.len();
        self.pending.retain(|key, e| {
            let keep = secs_between(now, e.last_seen) <= expire;
            if !keep {
                debug!(
                    "dwell: expired {} at {:?} ({})",
                    key.category,
                    key.cell,
                    e.latest.timestamp()
                );
            }
            keep
        });
        before - self.pending.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
