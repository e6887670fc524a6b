//! Detection records: the inbound wire shape and the accepted, immutable form.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::TimestampError;

fn default_location() -> String {
    "main_pipe".into()
}

/// A candidate event as reported by the upstream detector.
///
/// Nothing here is trusted; [`validate`](super::validator::validate) turns it
/// into a [`Detection`] or a rejection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    pub timestamp: String,
    #[serde(alias = "garbage_type")]
    pub category: String,
    pub confidence: f64,
    /// `[x1, y1, x2, y2]` in image pixels.
    pub bbox: Vec<i64>,
    /// Reported object area (px²).
    pub area: f64,
    #[serde(default = "default_location")]
    pub location: String,
}

// ---------------------------------------------------------------------------
// Bounding box
// ---------------------------------------------------------------------------

/// Axis-aligned box with `x2 > x1` and `y2 > y1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl BoundingBox {
    /// Build from exactly four coordinates, refusing degenerate boxes.
    pub fn from_coords(coords: &[i64]) -> Option<Self> {
        let &[x1, y1, x2, y2] = coords else {
            return None;
        };
        (x2 > x1 && y2 > y1).then_some(Self { x1, y1, x2, y2 })
    }

    /// Integer centre, rounded toward negative infinity.
    pub fn center(&self) -> (i64, i64) {
        ((self.x1 + self.x2).div_euclid(2), (self.y1 + self.y2).div_euclid(2))
    }

    pub fn center_distance(&self, other: &Self) -> f64 {
        let (ax, ay) = self.center();
        let (bx, by) = other.center();
        ((ax - bx) as f64).hypot((ay - by) as f64)
    }
}

impl Serialize for BoundingBox {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        [self.x1, self.y1, self.x2, self.y2].serialize(s)
    }
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Parse an ISO-8601 timestamp.
///
/// Offsets (including `Z`) are honoured; naive timestamps are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, TimestampError> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Ok(t.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|n| n.and_utc())
        .ok_or_else(|| TimestampError { raw: raw.to_owned() })
}

// ---------------------------------------------------------------------------
// Accepted detection
// ---------------------------------------------------------------------------

/// A validated event. Immutable once accepted into the window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    timestamp: String,
    category: String,
    confidence: f64,
    bbox: BoundingBox,
    area: f64,
    location: String,
    #[serde(skip)]
    observed_at: Result<DateTime<Utc>, TimestampError>,
}

impl Detection {
    pub(crate) fn new(report: DetectionReport, bbox: BoundingBox) -> Self {
        let observed_at = parse_timestamp(&report.timestamp);
        Self {
            timestamp: report.timestamp,
            category: report.category,
            confidence: report.confidence,
            bbox,
            area: report.area,
            location: report.location,
            observed_at,
        }
    }

    /// The timestamp exactly as reported.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Parsed timestamp; callers choose their own fallback on `Err`.
    pub fn observed_at(&self) -> Result<DateTime<Utc>, &TimestampError> {
        self.observed_at.as_ref().copied()
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn box_requires_four_ordered_coords() {
        assert!(BoundingBox::from_coords(&[0, 0, 10, 10]).is_some());
        assert!(BoundingBox::from_coords(&[0, 0, 10]).is_none());
        assert!(BoundingBox::from_coords(&[0, 0, 10, 10, 5]).is_none());
        assert!(BoundingBox::from_coords(&[10, 0, 10, 10]).is_none());
        assert!(BoundingBox::from_coords(&[0, 10, 10, 5]).is_none());
    }

    #[test]
    fn center_floors() {
        let b = BoundingBox::from_coords(&[0, 0, 5, 7]).unwrap();
        assert_eq!(b.center(), (2, 3));
        let b = BoundingBox::from_coords(&[-5, -5, 0, 0]).unwrap();
        assert_eq!(b.center(), (-3, -3));
    }

    #[test]
    fn timestamps_with_and_without_offset() {
        let want = Utc.with_ymd_and_hms(2024, 4, 10, 12, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-04-10T12:00:00Z").unwrap(), want);
        assert_eq!(parse_timestamp("2024-04-10T14:00:00+02:00").unwrap(), want);
        assert_eq!(parse_timestamp("2024-04-10T12:00:00").unwrap(), want);
        assert_eq!(parse_timestamp("2024-04-10 12:00:00.000").unwrap(), want);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn report_accepts_legacy_field_name() {
        let r: DetectionReport = serde_json::from_str(
            r#"{"timestamp":"2024-04-10T12:00:00Z","garbage_type":"plastic_bag",
                "confidence":0.9,"bbox":[0,0,50,100],"area":5000}"#,
        )
        .unwrap();
        assert_eq!(r.category, "plastic_bag");
        assert_eq!(r.location, "main_pipe");
    }

    #[test]
    fn detection_serialises_box_as_array() {
        let r = DetectionReport {
            timestamp: "bad".into(),
            category: "cloth".into(),
            confidence: 0.8,
            bbox: vec![1, 2, 3, 4],
            area: 1200.0,
            location: "main_pipe".into(),
        };
        let bbox = BoundingBox::from_coords(&r.bbox).unwrap();
        let d = Detection::new(r, bbox);
        assert!(d.observed_at().is_err());
        let v = serde_json::to_value(&d).unwrap();
        assert_eq!(v["bbox"], serde_json::json!([1, 2, 3, 4]));
        assert!(v.get("observed_at").is_none());
    }
}
