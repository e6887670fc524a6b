//! Derived analyses over a window snapshot.
//!
//! Every function here is pure: same events + same `now` ⇒ same output.
//!
//! ```text
//!   window ─┬─▶ blockage::estimate ──┐
//!           ├─▶ patterns::analyze ───┼─▶ assessor::assess ─▶ (fusion)
//!           └─▶ environment (clock) ─┘
//! ```

pub mod assessor;
pub mod blockage;
pub mod categories;
pub mod environment;
pub mod grid;
pub mod patterns;

use chrono::{DateTime, Utc};

use crate::detection::Detection;

pub use assessor::{Assessment, AssessorInput, Recommendation, Severity, Trend};
pub use blockage::{BlockageSnapshot, FlowRestriction};
pub use environment::EnvironmentFactors;
pub use patterns::PatternMetrics;

/// Whether `d` is no older than `horizon_secs` at `now`.
///
/// Future timestamps count as within. `None` when the timestamp is
/// unparsable; each caller picks its own fallback.
pub(crate) fn within_horizon(d: &Detection, now: DateTime<Utc>, horizon_secs: u32) -> Option<bool> {
    let at = d.observed_at().ok()?;
    Some((now - at).num_milliseconds() <= i64::from(horizon_secs) * 1000)
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let f = 10f64.powi(places);
    (value * f).round() / f
}

pub(crate) fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}
