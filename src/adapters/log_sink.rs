//! Log-based subscriber adapter.
//!
//! Implements [`Subscriber`] by summarising every JSON frame through the
//! `log` facade. Useful as an audit trail next to the real transport.

use log::info;
use serde::Deserialize;
use serde::de::IgnoredAny;

use crate::app::ports::Subscriber;
use crate::error::DeliveryError;

/// Just the fields the summary line needs.
#[derive(Deserialize)]
struct Summary {
    seq: u64,
    body: SummaryBody,
}

#[derive(Deserialize)]
struct SummaryBody {
    #[serde(rename = "type")]
    kind: String,
    status: SummaryStatus,
    #[serde(default)]
    alert: Option<IgnoredAny>,
}

#[derive(Deserialize)]
struct SummaryStatus {
    score: f64,
    level: String,
    total_detections: usize,
}

/// Logs one line per frame. Expects JSON frames; others are logged by size.
#[derive(Debug, Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

impl Subscriber for LogSink {
    fn deliver(&mut self, frame: &[u8]) -> Result<(), DeliveryError> {
        match serde_json::from_slice::<Summary>(frame) {
            Ok(s) => info!(
                "FRAME | #{} {} | score={:.1} level={} | window={}{}",
                s.seq,
                s.body.kind,
                s.body.status.score,
                s.body.status.level,
                s.body.status.total_detections,
                if s.body.alert.is_some() { " | ALERT" } else { "" },
            ),
            Err(_) => info!("FRAME | {} bytes", frame.len()),
        }
        Ok(())
    }
}
