//! Level state machine.
//!
//! ```text
//!   ┌────────────────────────────────────────────────────────┐
//!   │  LevelTable (ascending lower bounds)                   │
//!   │  ┌──────────┬─────────────┬────────────────────────┐   │
//!   │  │ Level    │ lower bound │ pipe status            │   │
//!   │  ├──────────┼─────────────┼────────────────────────┤   │
//!   │  │ Safe     │ 0           │ normal flow            │   │
//!   │  │ Warning  │ warning     │ accumulation rising    │   │
//!   │  │ Caution  │ caution?    │ blockage risk rising   │   │
//!   │  │ Danger   │ danger      │ blockage likely        │   │
//!   │  └──────────┴─────────────┴────────────────────────┘   │
//!   └────────────────────────────────────────────────────────┘
//! ```
//!
//! The level is a pure function of the score. Only the previous level is
//! remembered, to detect edges. Entering any level other than the lowest
//! raises an alert; returning to the lowest level is silent.

use core::fmt;

use log::info;
use serde::Serialize;

use crate::config::LevelThresholds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Safe,
    Warning,
    Caution,
    Danger,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Warning => "warning",
            Self::Caution => "caution",
            Self::Danger => "danger",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the level table.
#[derive(Debug, Clone, Copy)]
pub struct LevelDescriptor {
    pub level: RiskLevel,
    pub lower_bound: f64,
    pub pipe_status: &'static str,
}

/// Build the table, lowest level first. Omits `Caution` when it has no bound.
pub fn build_level_table(t: &LevelThresholds) -> Vec<LevelDescriptor> {
    let mut table = vec![
        LevelDescriptor {
            level: RiskLevel::Safe,
            lower_bound: 0.0,
            pipe_status: "normal - free flow",
        },
        LevelDescriptor {
            level: RiskLevel::Warning,
            lower_bound: t.warning,
            pipe_status: "attention - accumulation rising",
        },
    ];
    if let Some(caution) = t.caution {
        table.push(LevelDescriptor {
            level: RiskLevel::Caution,
            lower_bound: caution,
            pipe_status: "caution - blockage risk rising",
        });
    }
    table.push(LevelDescriptor {
        level: RiskLevel::Danger,
        lower_bound: t.danger,
        pipe_status: "danger - blockage likely",
    });
    table
}

/// Result of evaluating a score against the previous level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelTransition {
    pub from: RiskLevel,
    pub to: RiskLevel,
}

impl LevelTransition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

#[derive(Debug, Clone)]
pub struct LevelMachine {
    table: Vec<LevelDescriptor>,
}

impl LevelMachine {
    pub fn new(thresholds: &LevelThresholds) -> Self {
        Self {
            table: build_level_table(thresholds),
        }
    }

    fn descriptor(&self, score: f64) -> &LevelDescriptor {
        self.table
            .iter()
            .rev()
            .find(|d| score >= d.lower_bound)
            .unwrap_or(&self.table[0])
    }

    pub fn level_for(&self, score: f64) -> RiskLevel {
        self.descriptor(score).level
    }

    pub fn lowest(&self) -> RiskLevel {
        self.table[0].level
    }

    pub fn pipe_status(&self, level: RiskLevel) -> &'static str {
        self.table
            .iter()
            .find(|d| d.level == level)
            .map_or("unknown", |d| d.pipe_status)
    }

    pub fn evaluate(&self, from: RiskLevel, score: f64) -> LevelTransition {
        LevelTransition {
            from,
            to: self.level_for(score),
        }
    }

    /// Alerts fire on entering any level other than the lowest.
    pub fn raises_alert(&self, t: &LevelTransition) -> bool {
        t.changed() && t.to != self.lowest()
    }

    pub fn log_transition(&self, t: &LevelTransition, score: f64) {
        if t.changed() {
            info!("LEVEL | {} -> {} (score {:.1})", t.from, t.to, score);
        }
    }
}
