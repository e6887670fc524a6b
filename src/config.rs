//! Engine configuration parameters
//!
//! All tunable parameters for the PipeGuard risk engine.
//! Values can be overridden from a JSON file through a
//! [`ConfigPort`](crate::app::ports::ConfigPort); any field missing from the
//! file keeps its default, so partial overrides are fine.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // --- Validation ---
    /// Candidates below this detector confidence are rejected
    pub min_confidence: f64,
    /// Candidates below this reported area (px²) are rejected
    pub min_area: f64,

    // --- Buffers ---
    /// Detection window capacity (oldest evicted on overflow)
    pub window_capacity: usize,
    /// Alert history capacity
    pub alert_capacity: usize,

    // --- Pre-filters ---
    pub dedup: DedupConfig,
    pub dwell: DwellConfig,

    // --- Geometry & horizons ---
    pub grid: GridConfig,
    /// Trailing slice used by the blockage and pattern analyses (seconds)
    pub analysis_horizon_secs: u32,
    /// "Recent arrival" horizon for fusion delta and assessor (seconds)
    pub recent_horizon_secs: u32,
    /// How many of the newest detections the assessor inspects
    pub assessor_sample: usize,

    // --- Scoring ---
    pub weights: WeightEnvelope,
    pub delta: DeltaConfig,
    pub hysteresis: HysteresisConfig,
    pub levels: LevelThresholds,
    /// Upper bound of the risk score
    pub score_cap: f64,
    /// Minimum absolute score change that counts as a broadcast-worthy change
    pub significant_change: f64,
    /// Offset applied to the clock when deriving month / hour-of-day
    pub utc_offset_minutes: i32,

    // --- Decay ---
    pub decay: DecayConfig,

    // --- Fan-out ---
    pub wire_format: WireFormat,
    /// Detections included in a subscriber's initial frame
    pub initial_detections: usize,
    /// Alerts included in a subscriber's initial frame
    pub initial_alerts: usize,

    // --- Logging ---
    /// Host runner log level (`PIPEGUARD_LOG` overrides)
    pub log_level: String,
}

/// Duplicate suppression against the newest window entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Number of newest window entries inspected
    pub suffix: usize,
    /// Center distance (px) below which two boxes are the same object
    pub distance_px: f64,
    /// Time gap (seconds) below which two sightings are the same object
    pub window_secs: f64,
}

/// Optional dwell confirmation ahead of the deduplicator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DwellConfig {
    pub enabled: bool,
    /// Continuous presence required before promotion (seconds)
    pub confirm_secs: f64,
    /// Pending entries unrefreshed for longer than this expire (seconds)
    pub expire_secs: f64,
}

/// Fixed viewpoint geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Side of one accumulation cell (px)
    pub cell_px: f64,
    /// Visible pipe cross-section width (px)
    pub pipe_width_px: f64,
    /// Visible pipe cross-section height (px)
    pub pipe_height_px: f64,
    /// Assumed debris depth for the volume estimate (cm)
    pub assumed_depth_cm: f64,
}

/// Upper bound of each fused-score component, in score points.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightEnvelope {
    pub physical_max: f64,
    pub environmental_max: f64,
    pub pattern_max: f64,
    pub reliability_max: f64,
}

/// Directional delta rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeltaConfig {
    /// Decay per idle minute when the window is empty
    pub empty_decay_per_min: f64,
    /// Decay per idle minute when nothing arrived within the recent horizon
    pub stale_decay_per_min: f64,
    /// Increase per recent detection (scaled by mean confidence)
    pub increase_per_detection: f64,
    /// Cap on a single increase
    pub increase_cap: f64,
}

/// Asymmetric gains applied to the directional delta.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HysteresisConfig {
    /// Multiplier for negative deltas (> 1 amplifies recovery)
    pub decrease_gain: f64,
    /// Multiplier for positive deltas (< 1 damps escalation)
    pub increase_gain: f64,
}

/// Lower score bounds of each level above `Safe`.
///
/// Setting `caution` to `None` yields the three-level variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelThresholds {
    pub warning: f64,
    pub caution: Option<f64>,
    pub danger: f64,
}

/// Idle-time decay performed by the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    /// Tick period (milliseconds)
    pub interval_ms: u64,
    /// Fixed decrement per qualifying tick
    pub step: f64,
    /// Idle time after the newest detection before decay starts (seconds)
    pub idle_secs: f64,
    /// With detections still windowed, decay only while the score is above this
    pub floor: f64,
}

/// Encoding used for outbound frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    Json,
    Postcard,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            // Validation
            min_confidence: 0.4,
            min_area: 1000.0,

            // Buffers
            window_capacity: 100,
            alert_capacity: 50,

            // Pre-filters
            dedup: DedupConfig::default(),
            dwell: DwellConfig::default(),

            // Geometry & horizons
            grid: GridConfig::default(),
            analysis_horizon_secs: 3600, // 1 h
            recent_horizon_secs: 300,    // 5 min
            assessor_sample: 10,

            // Scoring
            weights: WeightEnvelope::default(),
            delta: DeltaConfig::default(),
            hysteresis: HysteresisConfig::default(),
            levels: LevelThresholds::default(),
            score_cap: 100.0,
            significant_change: 5.0,
            utc_offset_minutes: 0,

            // Decay
            decay: DecayConfig::default(),

            // Fan-out
            wire_format: WireFormat::Json,
            initial_detections: 5,
            initial_alerts: 3,

            // Logging
            log_level: "info".into(),
        }
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            suffix: 5,
            distance_px: 50.0,
            window_secs: 10.0,
        }
    }
}

impl Default for DwellConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            confirm_secs: 2.0,
            expire_secs: 5.0,
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_px: 100.0,
            pipe_width_px: 640.0,
            pipe_height_px: 480.0,
            assumed_depth_cm: 5.0,
        }
    }
}

impl Default for WeightEnvelope {
    fn default() -> Self {
        Self {
            physical_max: 40.0,
            environmental_max: 30.0,
            pattern_max: 20.0,
            reliability_max: 10.0,
        }
    }
}

impl Default for DeltaConfig {
    fn default() -> Self {
        Self {
            empty_decay_per_min: 1.5,
            stale_decay_per_min: 1.0,
            increase_per_detection: 2.0,
            increase_cap: 8.0,
        }
    }
}

impl Default for HysteresisConfig {
    fn default() -> Self {
        Self {
            decrease_gain: 1.5,
            increase_gain: 0.5,
        }
    }
}

impl Default for LevelThresholds {
    fn default() -> Self {
        Self {
            warning: 26.0,
            caution: Some(51.0),
            danger: 76.0,
        }
    }
}

impl LevelThresholds {
    /// Three-band variant: safe / warning / danger.
    pub fn three_level() -> Self {
        Self {
            warning: 40.0,
            caution: None,
            danger: 70.0,
        }
    }
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5000,
            step: 1.0,
            idle_secs: 30.0,
            floor: 5.0,
        }
    }
}

impl EngineConfig {
    /// Range-check every field that could break an invariant downstream.
    pub fn validate(&self) -> Result<()> {
        fn check(ok: bool, msg: &'static str) -> Result<()> {
            if ok {
                Ok(())
            } else {
                Err(Error::Config(msg.into()))
            }
        }

        check(
            (0.0..=1.0).contains(&self.min_confidence),
            "min_confidence must be within [0, 1]",
        )?;
        check(self.min_area >= 0.0, "min_area must be non-negative")?;
        check(self.window_capacity > 0, "window_capacity must be positive")?;
        check(self.alert_capacity > 0, "alert_capacity must be positive")?;
        check(self.dedup.distance_px >= 0.0, "dedup.distance_px must be non-negative")?;
        check(self.dedup.window_secs >= 0.0, "dedup.window_secs must be non-negative")?;
        check(
            self.dwell.confirm_secs >= 0.0 && self.dwell.expire_secs > 0.0,
            "dwell timings must be positive",
        )?;
        check(self.grid.cell_px > 0.0, "grid.cell_px must be positive")?;
        check(
            self.grid.pipe_width_px > 0.0 && self.grid.pipe_height_px > 0.0,
            "pipe dimensions must be positive",
        )?;
        check(self.score_cap > 0.0, "score_cap must be positive")?;
        check(
            self.hysteresis.decrease_gain > 0.0 && self.hysteresis.increase_gain > 0.0,
            "hysteresis gains must be positive",
        )?;
        check(self.decay.interval_ms > 0, "decay.interval_ms must be positive")?;
        check(self.decay.step > 0.0, "decay.step must be positive")?;

        let l = &self.levels;
        let ordered = match l.caution {
            Some(c) => 0.0 < l.warning && l.warning < c && c < l.danger,
            None => 0.0 < l.warning && l.warning < l.danger,
        };
        check(ordered, "level thresholds must be strictly increasing")?;
        check(l.danger <= self.score_cap, "danger threshold exceeds score_cap")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = EngineConfig::default();
        assert!(c.validate().is_ok());
        assert!(c.min_confidence > 0.0 && c.min_confidence < 1.0);
        assert!(c.recent_horizon_secs < c.analysis_horizon_secs);
        assert!(c.decay.floor < c.levels.warning);
    }

    #[test]
    fn envelope_sums_to_score_range() {
        let w = WeightEnvelope::default();
        let total = w.physical_max + w.environmental_max + w.pattern_max + w.reliability_max;
        assert!((total - EngineConfig::default().score_cap).abs() < 1e-9);
    }

    #[test]
    fn hysteresis_favours_recovery() {
        let h = HysteresisConfig::default();
        assert!(
            h.decrease_gain > 1.0 && h.increase_gain < 1.0,
            "drops must be amplified and rises damped"
        );
    }

    #[test]
    fn three_level_preset_validates() {
        let c = EngineConfig {
            levels: LevelThresholds::three_level(),
            ..EngineConfig::default()
        };
        assert!(c.validate().is_ok());
    }

    #[test]
    fn unordered_levels_are_rejected() {
        let mut c = EngineConfig::default();
        c.levels.caution = Some(10.0);
        assert!(matches!(c.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let c: EngineConfig =
            serde_json::from_str(r#"{ "min_area": 500.0, "levels": { "caution": null } }"#).unwrap();
        assert_eq!(c.min_area, 500.0);
        assert_eq!(c.window_capacity, 100);
        assert!(c.levels.caution.is_none());
        assert_eq!(c.levels.warning, 26.0);
    }

    #[test]
    fn postcard_roundtrip() {
        let c = EngineConfig::default();
        let bytes = postcard::to_allocvec(&c).unwrap();
        let c2: EngineConfig = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(c.window_capacity, c2.window_capacity);
        assert!((c.hysteresis.decrease_gain - c2.hysteresis.decrease_gain).abs() < 1e-9);
    }
}
