//! Spatiotemporal pattern metrics.
//!
//! Events whose timestamps cannot be parsed contribute nothing here.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::grid::{self, Cell};
use super::{mean, round_to, within_horizon};
use crate::config::EngineConfig;
use crate::detection::Detection;

/// Cells need this many events before they count toward persistence.
const PERSISTENCE_MIN_EVENTS: usize = 3;
const PERSISTENCE_CAP: f64 = 10.0;
const CLUSTERING_CAP: f64 = 20.0;
/// Mean inter-arrival gap (minutes) at or beyond which intensity is zero.
const INTENSITY_HORIZON_MIN: f64 = 10.0;

/// All values rounded to two decimals; all zero on empty input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PatternMetrics {
    /// Share of window events inside the analysis horizon, 0..=100.
    pub accumulation_rate: f64,
    /// Recent events per occupied cell.
    pub concentration: f64,
    /// Mean dwell of busy cells (hours × count), 0..=10.
    pub persistence: f64,
    /// Count-weighted occupied-neighbour density, 0..=20.
    pub clustering: f64,
    /// Arrival tightness, 0..=10.
    pub temporal_intensity: f64,
}

/// Derive metrics from `events` (the full window, oldest first).
pub fn analyze(events: &[&Detection], now: DateTime<Utc>, config: &EngineConfig) -> PatternMetrics {
    if events.is_empty() {
        return PatternMetrics::default();
    }

    // (cell, parsed time) of every recent event
    let recent: Vec<(Cell, DateTime<Utc>)> = events
        .iter()
        .filter(|d| within_horizon(d, now, config.analysis_horizon_secs) == Some(true))
        .filter_map(|d| {
            let at = d.observed_at().ok()?;
            Some((grid::origin_cell(d.bbox(), config.grid.cell_px), at))
        })
        .collect();

    let accumulation_rate = recent.len() as f64 / events.len() as f64 * 100.0;

    let mut cells: BTreeMap<Cell, Vec<DateTime<Utc>>> = BTreeMap::new();
    for &(cell, at) in &recent {
        cells.entry(cell).or_default().push(at);
    }

    let concentration = if cells.is_empty() {
        0.0
    } else {
        recent.len() as f64 / cells.len() as f64
    };

    let persistence = mean(
        cells
            .values()
            .filter(|times| times.len() >= PERSISTENCE_MIN_EVENTS)
            .map(|times| {
                let first = times.iter().min().copied().unwrap_or(now);
                let last = times.iter().max().copied().unwrap_or(now);
                let span_h = (last - first).num_milliseconds() as f64 / 3_600_000.0;
                (span_h * times.len() as f64).min(PERSISTENCE_CAP)
            }),
    )
    .unwrap_or(0.0);

    let clustering = if cells.is_empty() {
        0.0
    } else {
        let weighted: usize = cells
            .iter()
            .map(|(&cell, times)| {
                grid::neighbours(cell).filter(|n| cells.contains_key(n)).count() * times.len()
            })
            .sum();
        (weighted as f64 / cells.len() as f64).min(CLUSTERING_CAP)
    };

    let temporal_intensity = {
        let mut times: Vec<DateTime<Utc>> = recent.iter().map(|&(_, t)| t).collect();
        times.sort_unstable();
        let gaps = times
            .windows(2)
            .map(|w| (w[1] - w[0]).num_milliseconds() as f64 / 60_000.0);
        match mean(gaps) {
            Some(gap) if gap < INTENSITY_HORIZON_MIN => (INTENSITY_HORIZON_MIN - gap).max(0.0),
            _ => 0.0,
        }
    };

    PatternMetrics {
        accumulation_rate: round_to(accumulation_rate, 2),
        concentration: round_to(concentration, 2),
        persistence: round_to(persistence, 2),
        clustering: round_to(clustering, 2),
        temporal_intensity: round_to(temporal_intensity, 2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{DetectionReport, Verdict, validate};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 10, 12, 0, 0).unwrap()
    }

    fn det(ts: &str, bbox: [i64; 4]) -> Detection {
        let r = DetectionReport {
            timestamp: ts.into(),
            category: "plastic_bag".into(),
            confidence: 0.9,
            bbox: bbox.to_vec(),
            area: 5000.0,
            location: "main_pipe".into(),
        };
        match validate(r, &EngineConfig::default()) {
            Verdict::Accept(d) => d,
            Verdict::Reject(r) => panic!("fixture rejected: {r}"),
        }
    }

    fn run(dets: &[Detection]) -> PatternMetrics {
        let refs: Vec<&Detection> = dets.iter().collect();
        analyze(&refs, now(), &EngineConfig::default())
    }

    #[test]
    fn empty_window_is_all_zero() {
        assert_eq!(run(&[]), PatternMetrics::default());
    }

    #[test]
    fn ten_events_over_five_cells() {
        let dets: Vec<Detection> = (0..10)
            .map(|i| {
                let k = i / 2;
                let ts = format!("2024-04-10T11:59:{:02}Z", i * 5);
                if i % 2 == 0 {
                    det(&ts, [100 * k, 0, 100 * k + 30, 30])
                } else {
                    det(&ts, [100 * k + 60, 60, 100 * k + 90, 90])
                }
            })
            .collect();
        let m = run(&dets);
        assert_eq!(m.accumulation_rate, 100.0);
        assert_eq!(m.concentration, 2.0);
        // Inner cells have 2 neighbours, edge cells 1: (1+2+2+2+1)*2/5
        assert_eq!(m.clustering, 3.2);
        // 5 s gaps → 10 - 0.0833
        assert_eq!(m.temporal_intensity, 9.92);
        assert_eq!(m.persistence, 0.0, "no cell reaches three events");
    }

    #[test]
    fn stale_and_unparsable_lower_accumulation() {
        let dets = [
            det("2024-04-10T11:59:00Z", [0, 0, 50, 50]),
            det("2024-04-10T09:00:00Z", [0, 0, 50, 50]),
            det("garbled", [0, 0, 50, 50]),
            det("2024-04-10T11:58:00Z", [0, 0, 50, 50]),
        ];
        let m = run(&dets);
        assert_eq!(m.accumulation_rate, 50.0);
        assert_eq!(m.concentration, 2.0);
        assert_eq!(m.temporal_intensity, 9.0);
    }

    #[test]
    fn persistence_for_busy_cell() {
        let dets = [
            det("2024-04-10T11:00:00Z", [0, 0, 50, 50]),
            det("2024-04-10T11:30:00Z", [0, 0, 50, 50]),
            det("2024-04-10T11:50:00Z", [0, 0, 50, 50]),
        ];
        let m = run(&dets);
        // 50 min span × 3 events = 2.5
        assert_eq!(m.persistence, 2.5);
        assert_eq!(m.temporal_intensity, 0.0, "25 min mean gap");
    }
}
