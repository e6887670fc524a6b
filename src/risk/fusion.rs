//! Risk fusion: component scores, directional delta and hysteresis.
//!
//! ```text
//!   physical (≤40) ┐
//!   environ. (≤30) ├─▶ Σ × severity weight ─▶ fused ─┐
//!   pattern  (≤20) │                                 ├─▶ next score
//!   reliab.  (≤10) ┘   delta × hysteresis gain ──────┘
//! ```
//!
//! The score moves from its previous value by the hysteresis-adjusted delta;
//! when the fused score is below the previous score it also caps the result.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analysis::{
    Assessment, BlockageSnapshot, EnvironmentFactors, PatternMetrics, categories, mean,
    within_horizon,
};
use crate::config::{DeltaConfig, EngineConfig, HysteresisConfig};
use crate::detection::Detection;

/// Idle minutes assumed when the window is empty.
const IDLE_MINUTES_EMPTY: f64 = 60.0;
/// Idle minutes assumed when the newest timestamp is unparsable.
const IDLE_MINUTES_UNPARSABLE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub physical: f64,
    pub environmental: f64,
    pub pattern: f64,
    pub reliability: f64,
    pub severity_weight: f64,
    /// Weighted sum, clamped to the score range.
    pub fused: f64,
}

pub struct FusionInputs<'a> {
    /// Whole window, oldest first.
    pub window: &'a [&'a Detection],
    pub blockage: &'a BlockageSnapshot,
    pub patterns: &'a PatternMetrics,
    pub assessment: &'a Assessment,
    pub environment: &'a EnvironmentFactors,
}

/// Combine the analyses into one bounded score.
pub fn fuse(inputs: &FusionInputs<'_>, config: &EngineConfig) -> ScoreBreakdown {
    let w = &config.weights;
    let b = inputs.blockage;
    let p = inputs.patterns;
    let a = inputs.assessment;

    let weighted: f64 = inputs
        .window
        .iter()
        .map(|d| d.confidence() * categories::weight(d.category()) * d.area() / 10_000.0)
        .sum();
    let count_bonus = (2.0 * inputs.window.len() as f64).min(15.0);
    let physical = (b.coverage_pct * 0.5
        + weighted * 0.3
        + b.accumulation_cells as f64 * 0.1
        + count_bonus)
        .clamp(0.0, w.physical_max);

    let environmental = inputs.environment.score(w.environmental_max);

    let pattern = (p.accumulation_rate * 0.3
        + p.concentration * 0.3
        + p.persistence * 0.2
        + p.clustering * 0.1
        + p.temporal_intensity * 0.1)
        .clamp(0.0, w.pattern_max);

    let avg_conf = mean(inputs.window.iter().map(|d| d.confidence())).unwrap_or(0.0);
    let confidence_score = if avg_conf > 0.7 {
        ((avg_conf - 0.7) * 20.0).min(10.0)
    } else {
        0.0
    };
    let reliability =
        (confidence_score * (1.0 - a.false_positive_probability)).clamp(0.0, w.reliability_max);

    let severity_weight = a.severity.weight();
    let fused = ((physical + environmental + pattern + reliability) * severity_weight)
        .clamp(0.0, config.score_cap);

    ScoreBreakdown {
        physical,
        environmental,
        pattern,
        reliability,
        severity_weight,
        fused,
    }
}

/// Minutes since the newest event in `window`.
pub fn idle_minutes(window: &[&Detection], now: DateTime<Utc>) -> f64 {
    match window.last().map(|d| d.observed_at()) {
        None => IDLE_MINUTES_EMPTY,
        Some(Err(_)) => IDLE_MINUTES_UNPARSABLE,
        Some(Ok(at)) => ((now - at).num_milliseconds() as f64 / 60_000.0).max(0.0),
    }
}

/// Raw directional delta before hysteresis.
///
/// Decays with idle time when nothing is recent, otherwise rises with the
/// number and confidence of recent arrivals among the newest `sample` events.
pub fn directional_delta(
    window: &[&Detection],
    score: f64,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> f64 {
    let d: &DeltaConfig = &config.delta;
    if window.is_empty() {
        return -(d.empty_decay_per_min * idle_minutes(window, now)).min(score);
    }

    let tail = &window[window.len().saturating_sub(config.assessor_sample)..];
    let recent: Vec<f64> = tail
        .iter()
        .filter(|e| within_horizon(e, now, config.recent_horizon_secs) == Some(true))
        .map(|e| e.confidence())
        .collect();

    match mean(recent.iter().copied()) {
        None => -(d.stale_decay_per_min * idle_minutes(window, now)).min(score),
        Some(avg) => (recent.len() as f64 * d.increase_per_detection * avg).min(d.increase_cap),
    }
}

/// Amplify drops and damp rises.
pub fn apply_hysteresis(delta: f64, h: &HysteresisConfig) -> f64 {
    if delta < 0.0 {
        delta * h.decrease_gain
    } else {
        delta * h.increase_gain
    }
}

/// Next score from the previous one, the adjusted delta and the fused score.
pub fn next_score(previous: f64, adjusted_delta: f64, fused: f64, cap: f64) -> f64 {
    let moved = (previous + adjusted_delta).clamp(0.0, cap);
    if fused < previous {
        moved.min(fused).max(0.0)
    } else {
        moved
    }
}
