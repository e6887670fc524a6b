//! Ingestion front end: validation, dwell confirmation, deduplication and
//! the detection window.
//!
//! ```text
//!  DetectionReport ──▶ validate ──▶ [DwellFilter] ──▶ find_duplicate ──▶ DetectionWindow
//!                         │               │                  │
//!                      Reject          Pending           Duplicate
//! ```

pub mod dedup;
pub mod dwell;
pub mod report;
pub mod validator;
pub mod window;

pub use dedup::find_duplicate;
pub use dwell::{DwellFilter, DwellOutcome};
pub use report::{BoundingBox, Detection, DetectionReport, parse_timestamp};
pub use validator::{RejectReason, Verdict, validate};
pub use window::DetectionWindow;
