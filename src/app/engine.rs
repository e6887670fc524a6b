//! Risk engine: the single-threaded core.
//!
//! [`RiskEngine`] owns the detection window, the risk state, the alert
//! history and the dwell table. It never reads a clock; every operation
//! receives `now` from the caller.
//!
//! ```text
//!  submit ──▶ validate ─▶ dwell ─▶ dedup ─▶ plan (pure) ─▶ commit ─▶ FrameBody?
//!                                            │
//!            blockage · patterns · assessor ─┴─ fusion · level · alert
//! ```
//!
//! Each ingestion is one all-or-nothing transition: the whole outcome is
//! planned against a prospective view of the window, then committed by plain
//! field assignment. Nothing can fail once the commit starts.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use super::frames::{
    Disposition, FrameBody, RecentAlerts, RecentDetections, StatusReport, SubmitReport,
};
use crate::analysis::{
    Assessment, AssessorInput, BlockageSnapshot, EnvironmentFactors, PatternMetrics, assessor,
    blockage, patterns,
};
use crate::config::EngineConfig;
use crate::detection::{
    Detection, DetectionReport, DetectionWindow, DwellFilter, DwellOutcome, Verdict,
    find_duplicate, validate,
};
use crate::error::Result;
use crate::risk::fusion::{self, FusionInputs};
use crate::risk::{Alert, AlertHistory, LevelMachine, RiskLevel, RiskState, ScoreBreakdown};

/// Analyses kept from the most recent accepted detection.
#[derive(Debug, Clone)]
struct LastAnalysis {
    patterns: PatternMetrics,
    assessment: Assessment,
    breakdown: ScoreBreakdown,
}

/// Everything an ingestion will change, computed before anything changes.
struct Plan {
    analysis: LastAnalysis,
    blockage: BlockageSnapshot,
    score: f64,
    level: RiskLevel,
    alert: Option<Alert>,
    significant: bool,
}

/// Result of [`RiskEngine::submit`].
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub report: SubmitReport,
    /// Frame to broadcast, if the transition warrants one.
    pub frame: Option<FrameBody>,
}

/// Result of [`RiskEngine::decay_tick`].
#[derive(Debug, Clone)]
pub struct DecayOutcome {
    pub applied: bool,
    pub level_changed: bool,
    /// Present only when the level changed.
    pub frame: Option<FrameBody>,
}

pub struct RiskEngine {
    config: EngineConfig,
    levels: LevelMachine,
    state: RiskState,
    window: DetectionWindow,
    alerts: AlertHistory,
    dwell: DwellFilter,
    last: Option<LastAnalysis>,
}

impl RiskEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let levels = LevelMachine::new(&config.levels);
        let state = RiskState::baseline(levels.lowest());
        Ok(Self {
            window: DetectionWindow::new(config.window_capacity),
            alerts: AlertHistory::new(config.alert_capacity),
            dwell: DwellFilter::new(config.dwell.clone(), config.grid.cell_px),
            state,
            levels,
            last: None,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &RiskState {
        &self.state
    }

    pub fn window(&self) -> &DetectionWindow {
        &self.window
    }

    pub fn pending_confirmations(&self) -> usize {
        self.dwell.pending_count()
    }

    // ── Ingestion ─────────────────────────────────────────────

    /// Run one candidate through the pipeline.
    pub fn submit(&mut self, report: DetectionReport, now: DateTime<Utc>) -> SubmitOutcome {
        let detection = match validate(report, &self.config) {
            Verdict::Accept(d) => d,
            Verdict::Reject(reason) => {
                debug!("rejected candidate: {reason}");
                return self.unchanged(Disposition::Rejected, Some(reason.to_string()));
            }
        };

        let detection = if self.config.dwell.enabled {
            match self.dwell.observe(detection, now) {
                DwellOutcome::Confirmed(d) => d,
                DwellOutcome::Pending { sightings } => {
                    return self.unchanged(
                        Disposition::Pending,
                        Some(format!("awaiting dwell confirmation ({sightings} sightings)")),
                    );
                }
            }
        } else {
            detection
        };

        let recent = self.window.suffix(self.config.dedup.suffix);
        if let Some(prior) = find_duplicate(&detection, recent, &self.config.dedup) {
            debug!(
                "duplicate {} at {:?} (matches {})",
                detection.category(),
                detection.bbox().center(),
                prior.timestamp()
            );
            return self.unchanged(Disposition::Duplicate, None);
        }

        let plan = self.plan(&detection, now);
        self.commit(detection, plan, now)
    }

    fn unchanged(&self, disposition: Disposition, reason: Option<String>) -> SubmitOutcome {
        SubmitOutcome {
            report: SubmitReport {
                accepted: false,
                disposition,
                reason,
                score: self.state.current_score,
                level: self.state.current_level,
                significant_change: false,
                alert_issued: false,
            },
            frame: None,
        }
    }

    /// Compute the whole transition without touching any state.
    fn plan(&self, candidate: &Detection, now: DateTime<Utc>) -> Plan {
        let cfg = &self.config;
        let view = self.window.with_candidate(candidate);
        let sample = &view[view.len().saturating_sub(cfg.assessor_sample)..];

        let blockage = blockage::estimate(&view, now, cfg);
        let patterns = patterns::analyze(&view, now, cfg);
        let assessment = assessor::assess(&AssessorInput {
            sample,
            history: &view,
            blockage: &blockage,
            momentum: self.state.momentum(),
            now,
            recent_horizon_secs: cfg.recent_horizon_secs,
        });
        let environment = EnvironmentFactors::at(now, cfg.utc_offset_minutes);
        let breakdown = fusion::fuse(
            &FusionInputs {
                window: &view,
                blockage: &blockage,
                patterns: &patterns,
                assessment: &assessment,
                environment: &environment,
            },
            cfg,
        );

        let previous = self.state.current_score;
        let delta = fusion::directional_delta(&view, previous, now, cfg);
        let adjusted = fusion::apply_hysteresis(delta, &cfg.hysteresis);
        let score = fusion::next_score(previous, adjusted, breakdown.fused, cfg.score_cap);

        let transition = self.levels.evaluate(self.state.current_level, score);
        let alert = self.levels.raises_alert(&transition).then(|| {
            Alert::new(
                transition.to,
                self.levels.pipe_status(transition.to),
                &blockage,
                score,
                now,
            )
        });
        let significant =
            (score - previous).abs() >= cfg.significant_change || transition.changed();

        debug!(
            "plan: delta {delta:+.2} (adj {adjusted:+.2}), fused {:.2}, score {previous:.2} -> {score:.2}",
            breakdown.fused
        );

        Plan {
            analysis: LastAnalysis {
                patterns,
                assessment,
                breakdown,
            },
            blockage,
            score,
            level: transition.to,
            alert,
            significant,
        }
    }

    fn commit(&mut self, detection: Detection, plan: Plan, now: DateTime<Utc>) -> SubmitOutcome {
        let from = self.state.current_level;
        self.state.advance(plan.score, plan.level);
        self.state.last_detection = Some(detection.timestamp().to_owned());
        self.window.push(detection.clone());
        self.last = Some(plan.analysis);

        info!(
            "accepted {} conf={:.2} area={:.0} | coverage {:.1}% | score {:.1} ({})",
            detection.category(),
            detection.confidence(),
            detection.area(),
            plan.blockage.coverage_pct,
            plan.score,
            plan.level,
        );
        self.levels.log_transition(
            &crate::risk::LevelTransition {
                from,
                to: plan.level,
            },
            plan.score,
        );

        if let Some(alert) = &plan.alert {
            self.state.alerts_issued += 1;
            self.alerts.push(alert.clone());
            warn!("ALERT | {}", alert.message);
        }

        let alert_issued = plan.alert.is_some();
        let frame = (plan.significant || alert_issued).then(|| FrameBody::Detection {
            status: self.status_with(plan.blockage, now),
            detection,
            alert: plan.alert,
        });

        SubmitOutcome {
            report: SubmitReport {
                accepted: true,
                disposition: Disposition::Accepted,
                reason: None,
                score: self.state.current_score,
                level: self.state.current_level,
                significant_change: plan.significant,
                alert_issued,
            },
            frame,
        }
    }

    // ── Decay ─────────────────────────────────────────────────

    /// One idle-decay evaluation. Never raises alerts.
    pub fn decay_tick(&mut self, now: DateTime<Utc>) -> DecayOutcome {
        let expired = self.dwell.sweep(now);
        if expired > 0 {
            debug!("dwell: {expired} pending entries expired");
        }

        let d = &self.config.decay;
        let score = self.state.current_score;
        let view: Vec<&Detection> = self.window.iter().collect();
        let idle_min = fusion::idle_minutes(&view, now);

        let due = if self.window.is_empty() {
            score > 0.0
        } else {
            idle_min * 60.0 >= d.idle_secs && score > d.floor
        };
        if !due {
            return DecayOutcome {
                applied: false,
                level_changed: false,
                frame: None,
            };
        }

        let next = (score - d.step).max(0.0);
        let transition = self.levels.evaluate(self.state.current_level, next);
        self.state.advance(next, transition.to);
        debug!("decay: {score:.1} -> {next:.1} after {idle_min:.1} idle min");
        self.levels.log_transition(&transition, next);

        let frame = transition.changed().then(|| FrameBody::AutoDecay {
            status: self.status(now),
            message: format!(
                "{:.1} min without detections; level {} -> {}",
                idle_min, transition.from, transition.to
            ),
        });
        DecayOutcome {
            applied: true,
            level_changed: transition.changed(),
            frame,
        }
    }

    // ── Reads ─────────────────────────────────────────────────

    pub fn blockage_analysis(&self, now: DateTime<Utc>) -> BlockageSnapshot {
        let view: Vec<&Detection> = self.window.iter().collect();
        blockage::estimate(&view, now, &self.config)
    }

    pub fn status(&self, now: DateTime<Utc>) -> StatusReport {
        self.status_with(self.blockage_analysis(now), now)
    }

    fn status_with(&self, blockage: BlockageSnapshot, now: DateTime<Utc>) -> StatusReport {
        let s = &self.state;
        StatusReport {
            score: s.current_score,
            level: s.current_level,
            previous_score: s.previous_score,
            previous_level: s.previous_level,
            pipe_status: self.levels.pipe_status(s.current_level),
            alerts_issued: s.alerts_issued,
            total_detections: self.window.len(),
            last_detection: s.last_detection.clone(),
            blockage,
            environment: EnvironmentFactors::at(now, self.config.utc_offset_minutes),
            patterns: self.last.as_ref().map(|l| l.patterns),
            assessment: self.last.as_ref().map(|l| l.assessment.clone()),
            breakdown: self.last.as_ref().map(|l| l.breakdown),
        }
    }

    /// Newest `limit` detections, oldest first.
    pub fn recent_detections(&self, limit: usize) -> RecentDetections {
        RecentDetections {
            detections: self.window.suffix(limit).cloned().collect(),
            total: self.window.len(),
        }
    }

    /// Newest `limit` alerts, newest first.
    pub fn recent_alerts(&self, limit: usize) -> RecentAlerts {
        RecentAlerts {
            alerts: self.alerts.newest(limit),
            total: self.alerts.len(),
        }
    }

    pub fn initial_frame(&self, now: DateTime<Utc>) -> FrameBody {
        FrameBody::Initial {
            status: self.status(now),
            recent_detections: self.recent_detections(self.config.initial_detections).detections,
            recent_alerts: self.recent_alerts(self.config.initial_alerts).alerts,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Back to baseline: empty window, no alerts, no pending confirmations.
    pub fn reset(&mut self, now: DateTime<Utc>) -> FrameBody {
        self.window.clear();
        self.alerts.clear();
        self.dwell.clear();
        self.state = RiskState::baseline(self.levels.lowest());
        self.last = None;
        info!("engine reset to baseline");
        FrameBody::Reset {
            status: self.status(now),
            message: "system reset".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 10, 12, 0, 0).unwrap()
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

    fn engine() -> RiskEngine {
        RiskEngine::new(EngineConfig::default()).unwrap()
    }

    #[test]
    fn invalid_config_is_refused() {
        let cfg = EngineConfig {
            window_capacity: 0,
            ..EngineConfig::default()
        };
        assert!(RiskEngine::new(cfg).is_err());
    }

    #[test]
    fn rejection_leaves_state_untouched() {
        let mut e = engine();
        let mut r = report(t0(), [0, 0, 50, 50]);
        r.confidence = 0.1;
        let out = e.submit(r, t0());
        assert_eq!(out.report.disposition, Disposition::Rejected);
        assert!(out.report.reason.is_some());
        assert!(out.frame.is_none());
        assert!(e.window().is_empty());
        assert_eq!(e.state(), &RiskState::baseline(RiskLevel::Safe));
    }

    #[test]
    fn accepted_event_raises_score_and_records_analysis() {
        let mut e = engine();
        let out = e.submit(report(t0(), [0, 0, 100, 50]), t0());
        assert!(out.report.accepted);
        assert!(out.report.score > 0.0);
        assert_eq!(out.report.level, RiskLevel::Safe);
        assert!(!out.report.significant_change);
        assert!(out.frame.is_none(), "small move below the broadcast gate");

        let s = e.status(t0());
        assert_eq!(s.total_detections, 1);
        assert!(s.blockage.coverage_pct > 0.0);
        assert!(s.assessment.is_some() && s.breakdown.is_some());
        assert_eq!(s.last_detection.as_deref(), Some(t0().to_rfc3339().as_str()));
    }

    #[test]
    fn duplicate_is_silent() {
        let mut e = engine();
        let first = e.submit(report(t0(), [0, 0, 100, 50]), t0());
        let later = t0() + Duration::seconds(1);
        let out = e.submit(report(later, [0, 0, 100, 50]), later);
        assert_eq!(out.report.disposition, Disposition::Duplicate);
        assert_eq!(out.report.score, first.report.score);
        assert_eq!(e.window().len(), 1);
    }

    /// Far apart from each other and from the box at the origin.
    fn spaced(i: i64) -> [i64; 4] {
        [100 * i, 300, 100 * i + 40, 340]
    }

    #[test]
    fn dedup_only_looks_at_recent_suffix() {
        let mut e = engine();
        e.submit(report(t0(), [0, 0, 40, 40]), t0());
        for i in 1..=5 {
            e.submit(report(t0(), spaced(i)), t0());
        }
        let later = t0() + Duration::seconds(1);
        let out = e.submit(report(later, [0, 0, 40, 40]), later);
        assert_eq!(out.report.disposition, Disposition::Accepted, "6th back has scrolled out");
        assert_eq!(e.window().len(), 7);

        let mut e = engine();
        e.submit(report(t0(), [0, 0, 40, 40]), t0());
        for i in 1..=3 {
            e.submit(report(t0(), spaced(i)), t0());
        }
        let out = e.submit(report(later, [0, 0, 40, 40]), later);
        assert_eq!(out.report.disposition, Disposition::Duplicate, "4th back is still in view");
        assert_eq!(e.window().len(), 4);
    }

    #[test]
    fn reset_discards_pending_confirmations() {
        let mut cfg = EngineConfig::default();
        cfg.dwell.enabled = true;
        let mut e = RiskEngine::new(cfg).unwrap();

        let out = e.submit(report(t0(), [0, 0, 40, 40]), t0());
        assert_eq!(out.report.disposition, Disposition::Pending);
        e.reset(t0());
        assert_eq!(e.pending_confirmations(), 0);

        let later = t0() + Duration::seconds(2);
        let out = e.submit(report(later, [0, 0, 40, 40]), later);
        assert_eq!(out.report.disposition, Disposition::Pending, "sighting starts over");
        assert!(e.window().is_empty());
    }

    #[test]
    fn dwell_holds_until_confirmed() {
        let mut cfg = EngineConfig::default();
        cfg.dwell.enabled = true;
        let mut e = RiskEngine::new(cfg).unwrap();

        let out = e.submit(report(t0(), [0, 0, 40, 40]), t0());
        assert_eq!(out.report.disposition, Disposition::Pending);
        assert_eq!(e.pending_confirmations(), 1);

        let later = t0() + Duration::seconds(2);
        let out = e.submit(report(later, [0, 0, 40, 40]), later);
        assert_eq!(out.report.disposition, Disposition::Accepted);
        assert_eq!(e.window().len(), 1);
        assert_eq!(e.pending_confirmations(), 0);
    }

    #[test]
    fn decay_tick_respects_floor_and_idle_time() {
        let mut cfg = EngineConfig::default();
        cfg.decay.floor = 0.0;
        let mut e = RiskEngine::new(cfg).unwrap();
        e.submit(report(t0(), [0, 0, 100, 50]), t0());
        let score = e.state().current_score;

        let soon = t0() + Duration::seconds(10);
        assert!(!e.decay_tick(soon).applied, "not idle long enough");

        let idle = t0() + Duration::minutes(2);
        let out = e.decay_tick(idle);
        assert!(out.applied);
        assert!(out.frame.is_none(), "level unchanged");
        assert!(e.state().current_score < score);
    }

    #[test]
    fn reset_returns_to_baseline() {
        let mut e = engine();
        e.submit(report(t0(), [0, 0, 100, 50]), t0());
        let frame = e.reset(t0());
        assert_eq!(frame.kind(), "reset");
        assert_eq!(frame.status().score, 0.0);
        assert!(e.window().is_empty());
        assert!(e.status(t0()).assessment.is_none());
    }

    #[test]
    fn recent_reads_are_ordered() {
        let mut e = engine();
        for i in 0..4 {
            let at = t0() + Duration::seconds(i * 20);
            e.submit(report(at, [i * 100, 0, i * 100 + 50, 50]), at);
        }
        let r = e.recent_detections(2);
        assert_eq!(r.total, 4);
        let xs: Vec<i64> = r.detections.iter().map(|d| d.bbox().x1).collect();
        assert_eq!(xs, [200, 300]);
        assert_eq!(e.recent_alerts(10).total, 0);
    }
}
