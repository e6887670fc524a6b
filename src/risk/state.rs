//! The single process-wide risk state.

use serde::Serialize;

use super::level::RiskLevel;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskState {
    /// Always within `[0, score_cap]`.
    pub current_score: f64,
    /// Score before the most recent transition.
    pub previous_score: f64,
    pub current_level: RiskLevel,
    pub previous_level: RiskLevel,
    pub alerts_issued: u64,
    /// Timestamp of the last accepted detection, as reported.
    pub last_detection: Option<String>,
}

impl RiskState {
    pub fn baseline(lowest: RiskLevel) -> Self {
        Self {
            current_score: 0.0,
            previous_score: 0.0,
            current_level: lowest,
            previous_level: lowest,
            alerts_issued: 0,
            last_detection: None,
        }
    }

    /// Score movement of the most recent transition.
    pub fn momentum(&self) -> f64 {
        self.current_score - self.previous_score
    }

    /// Shift current into previous and install the new score and level.
    pub fn advance(&mut self, score: f64, level: RiskLevel) {
        self.previous_score = self.current_score;
        self.previous_level = self.current_level;
        self.current_score = score;
        self.current_level = level;
    }
}
