//! Duplicate suppression.
//!
//! Only the newest few window entries are inspected; an object re-reported
//! after it has scrolled out of that suffix is counted again.

use super::report::Detection;
use crate::config::DedupConfig;

/// Return the window entry `candidate` re-observes, if any.
///
/// A match needs the same category, a centre within `distance_px` and a
/// time gap under `window_secs`. A candidate with an unparsable timestamp is
/// never a duplicate; entries with unparsable timestamps are skipped.
pub fn find_duplicate<'a>(
    candidate: &Detection,
    recent: impl IntoIterator<Item = &'a Detection>,
    config: &DedupConfig,
) -> Option<&'a Detection> {
    let at = candidate.observed_at().ok()?;
    recent.into_iter().find(|entry| {
        let Ok(seen) = entry.observed_at() else {
            return false;
        };
        let gap = (at - seen).num_milliseconds().abs() as f64 / 1000.0;
        gap < config.window_secs
            && entry.category() == candidate.category()
            && entry.bbox().center_distance(candidate.bbox()) < config.distance_px
    })
}
