//! Fuzz target: `RiskEngine::submit`
//!
//! Splits the input into JSON lines, feeds every line that parses as a
//! report into one engine and checks the score bounds after each step.
//!
//! cargo fuzz run fuzz_submit_report

#![no_main]

use chrono::{TimeZone, Utc};
use libfuzzer_sys::fuzz_target;
use pipeguard::detection::DetectionReport;
use pipeguard::{EngineConfig, RiskEngine};

fuzz_target!(|data: &[u8]| {
    let config = EngineConfig::default();
    let cap = config.score_cap;
    let mut engine = RiskEngine::new(config).unwrap();
    let now = Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap();

    for line in data.split(|b| *b == b'\n') {
        let Ok(report) = serde_json::from_slice::<DetectionReport>(line) else {
            continue;
        };
        let out = engine.submit(report, now);
        assert!((0.0..=cap).contains(&out.report.score));
    }
    let status = engine.status(now);
    assert!((0.0..=100.0).contains(&status.blockage.coverage_pct));
});
