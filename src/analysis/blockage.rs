//! Blockage estimator: grid aggregation of the trailing horizon into a
//! coverage / volume snapshot.
//!
//! Events with unparsable timestamps are kept in the slice rather than
//! dropped.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::grid::{self, Cell};
use super::{round_to, within_horizon};
use crate::config::EngineConfig;
use crate::detection::Detection;

/// Flow restriction band derived from coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowRestriction {
    Negligible,
    Minor,
    Moderate,
    Severe,
    Critical,
}

impl FlowRestriction {
    pub fn from_coverage(pct: f64) -> Self {
        match pct {
            p if p < 10.0 => Self::Negligible,
            p if p < 30.0 => Self::Minor,
            p if p < 60.0 => Self::Moderate,
            p if p < 80.0 => Self::Severe,
            _ => Self::Critical,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Negligible => "negligible",
            Self::Minor => "minor",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
            Self::Critical => "critical",
        }
    }
}

/// Per-cell aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellSummary {
    pub cell: Cell,
    pub count: usize,
    pub total_area: f64,
    pub max_confidence: f64,
    pub categories: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockageSnapshot {
    /// Estimated obstructed share of the cross-section, 0..=100 (0.1 precision).
    pub coverage_pct: f64,
    pub flow_restriction: FlowRestriction,
    /// Distinct occupied grid cells.
    pub accumulation_cells: usize,
    /// Debris volume estimate (cm³, 0.01 precision).
    pub volume_cm3: f64,
    /// Sum of reported areas (px²).
    pub total_area: f64,
    pub cells: Vec<CellSummary>,
}

impl BlockageSnapshot {
    pub fn empty() -> Self {
        Self {
            coverage_pct: 0.0,
            flow_restriction: FlowRestriction::Negligible,
            accumulation_cells: 0,
            volume_cm3: 0.0,
            total_area: 0.0,
            cells: Vec::new(),
        }
    }
}

/// Aggregate `events` (oldest first) seen within the analysis horizon.
pub fn estimate(events: &[&Detection], now: DateTime<Utc>, config: &EngineConfig) -> BlockageSnapshot {
    let g = &config.grid;
    let mut cells: BTreeMap<Cell, CellSummary> = BTreeMap::new();
    let mut total_area = 0.0;

    let slice = events
        .iter()
        .filter(|d| within_horizon(d, now, config.analysis_horizon_secs).unwrap_or(true));
    for d in slice {
        let key = grid::origin_cell(d.bbox(), g.cell_px);
        let c = cells.entry(key).or_insert_with(|| CellSummary {
            cell: key,
            count: 0,
            total_area: 0.0,
            max_confidence: 0.0,
            categories: BTreeSet::new(),
        });
        c.count += 1;
        c.total_area += d.area();
        c.max_confidence = c.max_confidence.max(d.confidence());
        if !c.categories.contains(d.category()) {
            c.categories.insert(d.category().to_owned());
        }
        total_area += d.area();
    }

    if cells.is_empty() {
        return BlockageSnapshot::empty();
    }

    let pipe_area = g.pipe_width_px * g.pipe_height_px;
    let coverage = (total_area / pipe_area * 100.0).clamp(0.0, 100.0);
    let volume = total_area / 10_000.0 * g.assumed_depth_cm;

    BlockageSnapshot {
        coverage_pct: round_to(coverage, 1),
        flow_restriction: FlowRestriction::from_coverage(coverage),
        accumulation_cells: cells.len(),
        volume_cm3: round_to(volume, 2),
        total_area,
        cells: cells.into_values().collect(),
    }
}
