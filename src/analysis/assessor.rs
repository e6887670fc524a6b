//! Heuristic severity assessor.
//!
//! Independent banded contributions are summed into a `severity_score`,
//! which maps to an ordinal [`Severity`]:
//!
//! ```text
//!   coverage ─────────┐
//!   avg confidence ───┤  (low confidence subtracts)
//!   recent arrivals ──┤
//!   prone categories ─┼──▶ Σ severity_score ──▶ low | medium | high | critical
//!   occupied cells ───┤
//!   score momentum ───┤
//!   size trend ───────┘  (needs a long window)
//! ```
//!
//! Rule-based and deterministic; the same input always yields the same output.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use super::blockage::BlockageSnapshot;
use super::{categories, mean, within_horizon};
use crate::detection::Detection;

/// Window length needed before the size trend is considered (half vs half).
const SIZE_TREND_SAMPLES: usize = 30;

// ═══════════════════════════════════════════════════════════════
//  Output types
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 70.0 => Self::Critical,
            s if s >= 50.0 => Self::High,
            s if s >= 25.0 => Self::Medium,
            _ => Self::Low,
        }
    }

    /// Multiplier applied to the fused score.
    pub fn weight(self) -> f64 {
        match self {
            Self::Low => 0.3,
            Self::Medium => 0.6,
            Self::High => 0.9,
            Self::Critical => 1.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    RapidlyWorsening,
    Worsening,
    Stable,
    Improving,
    RapidlyImproving,
}

impl Trend {
    pub fn from_momentum(momentum: f64) -> Self {
        match momentum {
            m if m > 5.0 => Self::RapidlyWorsening,
            m if m > 2.0 => Self::Worsening,
            m if m < -5.0 => Self::RapidlyImproving,
            m if m < -2.0 => Self::Improving,
            _ => Self::Stable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
    ContactMaintenance,
    MonitorFlow,
    AdvanceCleaning,
    InspectCamera,
    CollectMoreData,
    ContinueMonitoring,
}

impl Recommendation {
    pub fn message(self) -> &'static str {
        match self {
            Self::ContactMaintenance => "Contact the maintenance team and request an inspection now.",
            Self::MonitorFlow => "Monitor water flow in this section.",
            Self::AdvanceCleaning => "Bring the scheduled cleaning forward.",
            Self::InspectCamera => "Inspect the camera lens to improve detection accuracy.",
            Self::CollectMoreData => "Collect more data to improve assessment accuracy.",
            Self::ContinueMonitoring => "Continue routine monitoring.",
        }
    }
}

impl Serialize for Recommendation {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.message())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Coverage,
    Confidence,
    RecentArrivals,
    ProneCategories,
    AccumulationCells,
    Momentum,
    SizeTrend,
}

/// One band that fired, with its signed score points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Contribution {
    pub factor: Factor,
    pub points: f64,
    pub note: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub severity: Severity,
    /// Sum of contributions, capped at 100 (may be negative).
    pub severity_score: f64,
    pub confidence_level: f64,
    pub rationale: String,
    pub false_positive_probability: f64,
    pub trend: Trend,
    pub recommendations: heapless::Vec<Recommendation, 5>,
    pub contributions: Vec<Contribution>,
}

impl Assessment {
    /// Assessment of an empty sample.
    pub fn quiet(momentum: f64) -> Self {
        let mut recommendations = heapless::Vec::new();
        let _ = recommendations.push(Recommendation::ContinueMonitoring);
        Self {
            severity: Severity::Low,
            severity_score: 0.0,
            confidence_level: 0.9,
            rationale: "No debris detected; the pipe is clear.".into(),
            false_positive_probability: 0.0,
            trend: Trend::from_momentum(momentum),
            recommendations,
            contributions: Vec::new(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Assessment
// ═══════════════════════════════════════════════════════════════

pub struct AssessorInput<'a> {
    /// Newest few events, oldest first.
    pub sample: &'a [&'a Detection],
    /// The whole window, oldest first (size trend only).
    pub history: &'a [&'a Detection],
    pub blockage: &'a BlockageSnapshot,
    /// Current score minus the score before the last transition.
    pub momentum: f64,
    pub now: DateTime<Utc>,
    pub recent_horizon_secs: u32,
}

fn band(out: &mut Vec<Contribution>, factor: Factor, bands: &[(bool, f64, &'static str)]) {
    if let Some(&(_, points, note)) = bands.iter().find(|(hit, _, _)| *hit) {
        out.push(Contribution { factor, points, note });
    }
}

pub fn assess(input: &AssessorInput<'_>) -> Assessment {
    let sample = input.sample;
    let Some(avg_conf) = mean(sample.iter().map(|d| d.confidence())) else {
        return Assessment::quiet(input.momentum);
    };
    let cov = input.blockage.coverage_pct;
    let mut c = Vec::new();

    band(&mut c, Factor::Coverage, &[
        (cov > 80.0, 40.0, "coverage above 80%"),
        (cov > 60.0, 25.0, "coverage above 60%"),
        (cov > 40.0, 10.0, "coverage above 40%"),
        (cov > 20.0, 5.0, "coverage above 20%"),
    ]);

    band(&mut c, Factor::Confidence, &[
        (avg_conf < 0.8, -15.0, "low detector confidence, likely false positives"),
        (avg_conf > 0.95, 8.0, "very high detector confidence"),
        (avg_conf > 0.85, 3.0, "high detector confidence"),
    ]);

    // Unparsable timestamps are skipped.
    let recent = sample
        .iter()
        .filter(|d| within_horizon(d, input.now, input.recent_horizon_secs) == Some(true))
        .count();
    band(&mut c, Factor::RecentArrivals, &[
        (recent >= 5, 25.0, "rapid accumulation in the last few minutes"),
        (recent >= 3, 15.0, "several recent arrivals"),
        (recent >= 1, 5.0, "recent activity"),
    ]);

    let prone = sample
        .iter()
        .filter(|d| categories::is_blockage_prone(d.category()))
        .count();
    band(&mut c, Factor::ProneCategories, &[
        (prone >= 5, 20.0, "many blockage-prone items"),
        (prone >= 3, 10.0, "several blockage-prone items"),
    ]);

    let cells = input.blockage.accumulation_cells;
    band(&mut c, Factor::AccumulationCells, &[
        (cells >= 8, 15.0, "debris spread over many cells"),
        (cells >= 5, 8.0, "debris over several cells"),
    ]);

    let m = input.momentum;
    band(&mut c, Factor::Momentum, &[
        (m > 10.0, 20.0, "risk rising fast"),
        (m > 5.0, 10.0, "risk rising"),
        (m < -10.0, -15.0, "risk falling fast"),
        (m < -5.0, -8.0, "risk falling"),
    ]);

    if let Some((recent_avg, older_avg)) = size_trend(input.history) {
        band(&mut c, Factor::SizeTrend, &[
            (recent_avg > older_avg * 2.0, 15.0, "debris size growing fast"),
            (recent_avg > older_avg * 1.5, 8.0, "debris size growing"),
            (recent_avg < older_avg * 0.3, -10.0, "debris size shrinking fast"),
            (recent_avg < older_avg * 0.5, -5.0, "debris size shrinking"),
        ]);
    }

    let severity_score = c.iter().map(|x| x.points).sum::<f64>().min(100.0);
    let severity = Severity::from_score(severity_score);

    let mut fp: f64 = if avg_conf < 0.8 { 0.4 } else { 0.0 };
    if sample.len() < 5 {
        fp += 0.3;
    }
    if sample.len() < 3 {
        fp += 0.2;
    }

    let mut recommendations: heapless::Vec<Recommendation, 5> = heapless::Vec::new();
    let mut recommend = |r| {
        let _ = recommendations.push(r);
    };
    if severity >= Severity::High {
        recommend(Recommendation::ContactMaintenance);
        recommend(Recommendation::MonitorFlow);
    }
    if cov > 30.0 {
        recommend(Recommendation::AdvanceCleaning);
    }
    if avg_conf < 0.7 {
        recommend(Recommendation::InspectCamera);
    }
    if sample.len() < 5 {
        recommend(Recommendation::CollectMoreData);
    }

    Assessment {
        severity,
        severity_score,
        confidence_level: avg_conf.min(0.95),
        rationale: rationale(severity, m, &c),
        false_positive_probability: fp,
        trend: Trend::from_momentum(m),
        recommendations,
        contributions: c,
    }
}

/// Mean area of the newest half vs the preceding half of the last
/// [`SIZE_TREND_SAMPLES`] events.
fn size_trend(history: &[&Detection]) -> Option<(f64, f64)> {
    let n = history.len();
    if n < SIZE_TREND_SAMPLES {
        return None;
    }
    let half = SIZE_TREND_SAMPLES / 2;
    let older = mean(history[n - 2 * half..n - half].iter().map(|d| d.area()))?;
    let recent = mean(history[n - half..].iter().map(|d| d.area()))?;
    Some((recent, older))
}

fn rationale(severity: Severity, momentum: f64, contributions: &[Contribution]) -> String {
    let base = match severity {
        Severity::Critical if momentum > 10.0 => {
            "Multiple risk factors combine into a critical situation, and risk is rising fast."
        }
        Severity::Critical => "Multiple risk factors combine into a critical situation.",
        Severity::High if momentum > 5.0 => "Several risk factors confirmed; risk is trending up.",
        Severity::High => "Several risk factors confirmed.",
        Severity::Medium if momentum < -5.0 => {
            "Some risk factors need attention, though risk is trending down."
        }
        Severity::Medium => "Some risk factors need attention.",
        Severity::Low if momentum < -10.0 => "Indicators are within safe range and risk is falling fast.",
        Severity::Low if momentum < -5.0 => "Indicators are within safe range and risk is falling.",
        Severity::Low => "Indicators are within safe range.",
    };
    let dominant = contributions
        .iter()
        .max_by(|a, b| a.points.abs().total_cmp(&b.points.abs()));
    match dominant {
        Some(d) => format!("{base} Dominant factor: {}.", d.note),
        None => base.to_owned(),
    }
}
