//! End-to-end tests through [`EngineHandle`] with a manual clock and
//! channel subscribers.

use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Duration, TimeZone, Utc};
use pipeguard::adapters::{ChannelSink, ManualClock};
use pipeguard::analysis::FlowRestriction;
use pipeguard::app::Disposition;
use pipeguard::app::ports::Clock;
use pipeguard::detection::DetectionReport;
use pipeguard::risk::RiskLevel;
use pipeguard::{EngineConfig, EngineHandle};
use serde_json::Value;
use tokio::sync::mpsc;

// ── Fixtures ──────────────────────────────────────────────────

/// Spring midday: seasonal and time-of-day factors are neutral.
fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 10, 12, 0, 0).unwrap()
}

fn setup(config: EngineConfig) -> (EngineHandle, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(t0()));
    let handle = EngineHandle::new(config, clock.clone()).unwrap();
    (handle, clock)
}

fn report(at: DateTime<Utc>, bbox: [i64; 4]) -> DetectionReport {
    DetectionReport {
        timestamp: at.to_rfc3339(),
        category: "plastic_bag".into(),
        confidence: 0.9,
        bbox: bbox.to_vec(),
        area: 5000.0,
        location: "main_pipe".into(),
    }
}

/// Ten non-overlapping boxes, two per grid cell across five cells, 5 s apart.
fn spread_reports() -> Vec<DetectionReport> {
    (0..10)
        .map(|i| {
            let k = i / 2;
            let at = t0() - Duration::seconds(60) + Duration::seconds(5 * i);
            if i % 2 == 0 {
                report(at, [100 * k, 0, 100 * k + 30, 30])
            } else {
                report(at, [100 * k + 60, 60, 100 * k + 90, 90])
            }
        })
        .collect()
}

fn drain(rx: &mut mpsc::Receiver<Vec<u8>>) -> Vec<Value> {
    let mut frames = Vec::new();
    while let Ok(bytes) = rx.try_recv() {
        frames.push(serde_json::from_slice(&bytes).unwrap());
    }
    frames
}

// ── Scenarios ─────────────────────────────────────────────────

#[test]
fn empty_engine_status() {
    let (h, _) = setup(EngineConfig::default());
    let s = h.status();
    assert_eq!(s.score, 0.0);
    assert_eq!(s.level, RiskLevel::Safe);
    assert_eq!(s.blockage.coverage_pct, 0.0);
    assert_eq!(s.blockage.flow_restriction, FlowRestriction::Negligible);
    assert_eq!(s.total_detections, 0);
}

#[test]
fn single_event_is_accepted() {
    let (h, _) = setup(EngineConfig::default());
    let out = h.submit(report(t0(), [0, 0, 100, 50]));
    assert_eq!(out.disposition, Disposition::Accepted);
    assert!(out.accepted);
    assert!(out.score > 0.0);

    let s = h.status();
    assert_eq!(s.total_detections, 1);
    assert!(s.blockage.coverage_pct > 0.0);
}

#[test]
fn resubmission_is_duplicate() {
    let (h, clock) = setup(EngineConfig::default());
    let first = h.submit(report(t0(), [0, 0, 100, 50]));

    clock.advance(Duration::seconds(1));
    let again = h.submit(report(t0() + Duration::seconds(1), [0, 0, 100, 50]));
    assert_eq!(again.disposition, Disposition::Duplicate);
    assert!(!again.accepted);
    assert_eq!(again.score, first.score);
    assert_eq!(again.level, first.level);
    assert_eq!(h.status().total_detections, 1);
}

#[test]
fn distant_boxes_are_both_kept() {
    let (h, _) = setup(EngineConfig::default());
    h.submit(report(t0(), [0, 0, 100, 50]));
    let out = h.submit(report(t0(), [60, 0, 160, 50]));
    assert_eq!(out.disposition, Disposition::Accepted);
    assert_eq!(h.status().total_detections, 2);
}

#[test]
fn spread_accumulation_crosses_into_warning_once() {
    let (h, _) = setup(EngineConfig::default());
    let (sink, mut rx) = ChannelSink::new(64);
    h.subscribe(Box::new(sink)).unwrap();

    let mut alerts = 0;
    let mut last = 0.0;
    for r in spread_reports() {
        let out = h.submit(r);
        assert_eq!(out.disposition, Disposition::Accepted);
        assert!(out.score >= last, "score must rise monotonically here");
        last = out.score;
        alerts += usize::from(out.alert_issued);
    }

    let s = h.status();
    assert!(s.level >= RiskLevel::Warning, "ended at {:?} ({})", s.level, s.score);
    assert_eq!(alerts, 1);
    assert_eq!(h.recent_alerts(10).total, 1);
    assert_eq!(s.alerts_issued, 1);

    let p = s.patterns.unwrap();
    assert_eq!(p.accumulation_rate, 100.0);
    assert_eq!(p.concentration, 2.0);

    let frames = drain(&mut rx);
    assert_eq!(frames[0]["body"]["type"], "initial");
    let with_alert: Vec<&Value> = frames
        .iter()
        .filter(|f| !f["body"]["alert"].is_null() && f["body"]["type"] == "detection")
        .collect();
    assert_eq!(with_alert.len(), 1);
    assert_eq!(with_alert[0]["body"]["alert"]["level"], "warning");
}

#[test]
fn reset_is_idempotent_and_broadcast() {
    let (h, _) = setup(EngineConfig::default());
    for r in spread_reports() {
        h.submit(r);
    }
    let (sink, mut rx) = ChannelSink::new(16);
    h.subscribe(Box::new(sink)).unwrap();

    for _ in 0..2 {
        let s = h.reset();
        assert_eq!(s.score, 0.0);
        assert_eq!(s.level, RiskLevel::Safe);
        assert_eq!(h.recent_detections(100).total, 0);
        assert_eq!(h.recent_alerts(100).total, 0);
    }

    let kinds: Vec<Value> = drain(&mut rx)
        .into_iter()
        .map(|f| f["body"]["type"].clone())
        .collect();
    assert_eq!(kinds, ["initial", "reset", "reset"]);
}

#[test]
fn initial_frame_carries_recent_history() {
    let (h, _) = setup(EngineConfig::default());
    for r in spread_reports() {
        h.submit(r);
    }
    let (sink, mut rx) = ChannelSink::new(4);
    h.subscribe(Box::new(sink)).unwrap();
    let frames = drain(&mut rx);
    assert_eq!(frames.len(), 1);
    let body = &frames[0]["body"];
    assert_eq!(body["recent_detections"].as_array().unwrap().len(), 5);
    assert_eq!(body["recent_alerts"].as_array().unwrap().len(), 1);
    assert_eq!(body["status"]["total_detections"], 10);
}

#[test]
fn failing_subscriber_is_dropped_without_affecting_ingestion() {
    let (h, _) = setup(EngineConfig::default());
    let (sink, rx) = ChannelSink::new(4);
    h.subscribe(Box::new(sink)).unwrap();
    drop(rx);
    assert_eq!(h.subscriber_count(), 1);

    for r in spread_reports() {
        let out = h.submit(r);
        assert!(out.accepted);
    }
    assert_eq!(h.subscriber_count(), 0);
    assert_eq!(h.status().total_detections, 10);
}

#[test]
fn unsubscribe_stops_delivery() {
    let (h, _) = setup(EngineConfig::default());
    let (sink, mut rx) = ChannelSink::new(16);
    let id = h.subscribe(Box::new(sink)).unwrap();
    assert!(h.unsubscribe(id));
    h.reset();
    assert_eq!(drain(&mut rx).len(), 1, "only the initial frame");
}

#[test]
fn recent_reads_order() {
    let (h, _) = setup(EngineConfig::default());
    for r in spread_reports() {
        h.submit(r);
    }
    let d = h.recent_detections(3);
    assert_eq!(d.total, 10);
    let stamps: Vec<&str> = d.detections.iter().map(|d| d.timestamp()).collect();
    let mut sorted = stamps.clone();
    sorted.sort_unstable();
    assert_eq!(stamps, sorted, "oldest first");
    assert_eq!(d.detections.last().unwrap().bbox().x1, 460);
}

#[test]
fn decay_drops_level_silently() {
    let mut config = EngineConfig::default();
    config.decay.floor = 0.0;
    let (h, clock) = setup(config);
    for r in spread_reports() {
        h.submit(r);
    }
    assert_eq!(h.status().level, RiskLevel::Warning);
    let (sink, mut rx) = ChannelSink::new(64);
    h.subscribe(Box::new(sink)).unwrap();

    clock.advance(Duration::minutes(10));
    let mut ticks = 0;
    while h.status().level != RiskLevel::Safe {
        assert!(h.decay_tick());
        ticks += 1;
        assert!(ticks < 100);
    }
    assert_eq!(h.recent_alerts(10).total, 1, "decay never alerts");

    let frames = drain(&mut rx);
    let decays: Vec<&Value> = frames
        .iter()
        .filter(|f| f["body"]["type"] == "auto_decay")
        .collect();
    assert_eq!(decays.len(), 1, "broadcast only on the level change");
    assert_eq!(decays[0]["body"]["status"]["level"], "safe");
}

#[test]
fn decay_settles_at_the_floor_while_detections_remain() {
    let config = EngineConfig::default();
    let floor = config.decay.floor;
    let (h, clock) = setup(config);
    for r in spread_reports() {
        h.submit(r);
    }
    clock.advance(Duration::minutes(10));

    let mut ticks = 0;
    while h.decay_tick() {
        ticks += 1;
        assert!(ticks < 100);
    }
    let s = h.status();
    assert!(s.score <= floor && s.score > floor - 1.0, "settled at {}", s.score);
    assert_eq!(s.level, RiskLevel::Safe);
    assert_eq!(s.total_detections, 10);
    assert!(!h.decay_tick(), "no further decay below the floor");
}

#[test]
fn concurrent_producers_and_decay_share_one_state() {
    const THREADS: i64 = 8;
    const ROUNDS: i64 = 150;
    let config = EngineConfig::default();
    let cap = config.score_cap;
    let capacity = config.window_capacity;
    let alert_capacity = config.alert_capacity;
    let (h, clock) = setup(config);

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let h = h.clone();
            let clock = clock.clone();
            thread::spawn(move || {
                for i in 0..ROUNDS {
                    let x = (i * 37 + t * 83) % 600;
                    let y = (i * 11 + t * 53) % 440;
                    let out = h.submit(report(clock.now(), [x, y, x + 30, y + 30]));
                    assert!((0.0..=cap).contains(&out.score), "score {}", out.score);
                    if i % 10 == t % 10 {
                        clock.advance(Duration::seconds(40));
                        h.decay_tick();
                        let s = h.status();
                        assert!((0.0..=cap).contains(&s.score));
                        assert!(s.total_detections <= capacity);
                    }
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    let s = h.status();
    assert!((0.0..=cap).contains(&s.score));
    assert!(s.total_detections <= capacity);
    let held = h.recent_alerts(usize::MAX).total;
    assert_eq!(held, (s.alerts_issued as usize).min(alert_capacity));
}

#[test]
fn rejected_reports_have_reasons() {
    let (h, _) = setup(EngineConfig::default());
    let mut r = report(t0(), [0, 0, 100, 50]);
    r.area = 10.0;
    let out = h.submit(r);
    assert_eq!(out.disposition, Disposition::Rejected);
    assert!(out.reason.unwrap().contains("area"));

    let mut r = report(t0(), [0, 0, 100, 50]);
    r.bbox.truncate(3);
    assert_eq!(h.submit(r).disposition, Disposition::Rejected);
}
