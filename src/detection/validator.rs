//! Candidate validation.
//!
//! Rejection is a normal, frequent outcome and is reported as a value.

use core::fmt;

use super::report::{BoundingBox, Detection, DetectionReport};
use crate::config::EngineConfig;

/// Why a candidate was refused.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    /// Confidence below the configured minimum (or not a number).
    LowConfidence { confidence: f64, min: f64 },
    /// Confidence above 1.0.
    ConfidenceOutOfRange { confidence: f64 },
    /// Area below the configured minimum (or not a number).
    SmallArea { area: f64, min: f64 },
    /// Box did not carry exactly four coordinates.
    MalformedBox { coords: usize },
    /// `x2 <= x1` or `y2 <= y1`.
    DegenerateBox,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LowConfidence { confidence, min } => {
                write!(f, "confidence {confidence:.2} below minimum {min:.2}")
            }
            Self::ConfidenceOutOfRange { confidence } => {
                write!(f, "confidence {confidence:.2} outside [0, 1]")
            }
            Self::SmallArea { area, min } => write!(f, "area {area:.0} below minimum {min:.0}"),
            Self::MalformedBox { coords } => write!(f, "bbox has {coords} coordinates, expected 4"),
            Self::DegenerateBox => write!(f, "bbox is degenerate"),
        }
    }
}

/// Outcome of [`validate`].
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accept(Detection),
    Reject(RejectReason),
}

/// Check a candidate against the confidence, area and geometry gates.
pub fn validate(report: DetectionReport, config: &EngineConfig) -> Verdict {
    let confidence = report.confidence;
    if confidence.is_nan() || confidence < config.min_confidence {
        return Verdict::Reject(RejectReason::LowConfidence {
            confidence,
            min: config.min_confidence,
        });
    }
    if confidence > 1.0 {
        return Verdict::Reject(RejectReason::ConfidenceOutOfRange { confidence });
    }
    if report.area.is_nan() || report.area < config.min_area {
        return Verdict::Reject(RejectReason::SmallArea {
            area: report.area,
            min: config.min_area,
        });
    }
    if report.bbox.len() != 4 {
        return Verdict::Reject(RejectReason::MalformedBox {
            coords: report.bbox.len(),
        });
    }
    match BoundingBox::from_coords(&report.bbox) {
        Some(bbox) => Verdict::Accept(Detection::new(report, bbox)),
        None => Verdict::Reject(RejectReason::DegenerateBox),
    }
}
