//! Alerts and their bounded history.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::level::RiskLevel;
use crate::analysis::BlockageSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub level: RiskLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Score at the moment the alert was raised.
    pub score: f64,
}

impl Alert {
    pub fn new(
        level: RiskLevel,
        pipe_status: &str,
        blockage: &BlockageSnapshot,
        score: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let message = format!(
            "{} ({pipe_status}): coverage {:.1}%, flow restriction {}, volume {:.2} cm³, risk score {:.1}",
            level.as_str().to_uppercase(),
            blockage.coverage_pct,
            blockage.flow_restriction.as_str(),
            blockage.volume_cm3,
            score,
        );
        Self {
            level,
            message,
            timestamp,
            score,
        }
    }
}

/// FIFO of issued alerts; oldest dropped when full.
#[derive(Debug, Clone)]
pub struct AlertHistory {
    buf: VecDeque<Alert>,
    capacity: usize,
}

impl AlertHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, alert: Alert) {
        if self.buf.len() >= self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(alert);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Newest first.
    pub fn newest(&self, limit: usize) -> Vec<Alert> {
        self.buf.iter().rev().take(limit).cloned().collect()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}
