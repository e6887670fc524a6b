//! Outbound data shapes: status snapshots, submission results and
//! broadcast frames.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analysis::{Assessment, BlockageSnapshot, EnvironmentFactors, PatternMetrics};
use crate::config::WireFormat;
use crate::detection::Detection;
use crate::error::Result;
use crate::risk::{Alert, RiskLevel, ScoreBreakdown};

// ───────────────────────────────────────────────────────────────
// Status
// ───────────────────────────────────────────────────────────────

/// Full engine state at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub score: f64,
    pub level: RiskLevel,
    pub previous_score: f64,
    pub previous_level: RiskLevel,
    pub pipe_status: &'static str,
    pub alerts_issued: u64,
    pub total_detections: usize,
    pub last_detection: Option<String>,
    pub blockage: BlockageSnapshot,
    pub environment: EnvironmentFactors,
    /// Analyses from the most recent accepted detection.
    pub patterns: Option<PatternMetrics>,
    pub assessment: Option<Assessment>,
    pub breakdown: Option<ScoreBreakdown>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentDetections {
    /// Oldest first.
    pub detections: Vec<Detection>,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentAlerts {
    /// Newest first.
    pub alerts: Vec<Alert>,
    pub total: usize,
}

// ───────────────────────────────────────────────────────────────
// Submission
// ───────────────────────────────────────────────────────────────

/// What happened to a submitted candidate. None of these are errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Accepted,
    Rejected,
    Duplicate,
    /// Held by the dwell pre-filter.
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitReport {
    pub accepted: bool,
    pub disposition: Disposition,
    pub reason: Option<String>,
    pub score: f64,
    pub level: RiskLevel,
    pub significant_change: bool,
    pub alert_issued: bool,
}

// ───────────────────────────────────────────────────────────────
// Frames
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FrameBody {
    /// Sent once to a new subscriber.
    Initial {
        status: StatusReport,
        recent_detections: Vec<Detection>,
        recent_alerts: Vec<Alert>,
    },
    Detection {
        status: StatusReport,
        detection: Detection,
        alert: Option<Alert>,
    },
    AutoDecay {
        status: StatusReport,
        message: String,
    },
    Reset {
        status: StatusReport,
        message: String,
    },
}

impl FrameBody {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Initial { .. } => "initial",
            Self::Detection { .. } => "detection",
            Self::AutoDecay { .. } => "auto_decay",
            Self::Reset { .. } => "reset",
        }
    }

    pub fn status(&self) -> &StatusReport {
        match self {
            Self::Initial { status, .. }
            | Self::Detection { status, .. }
            | Self::AutoDecay { status, .. }
            | Self::Reset { status, .. } => status,
        }
    }
}

/// A sequenced frame ready for encoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub seq: u64,
    pub sent_at: DateTime<Utc>,
    pub body: FrameBody,
}

impl Frame {
    pub fn encode(&self, format: WireFormat) -> Result<Vec<u8>> {
        Ok(match format {
            WireFormat::Json => serde_json::to_vec(self)?,
            WireFormat::Postcard => postcard::to_allocvec(self)?,
        })
    }
}
