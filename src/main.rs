//! PipeGuard host runner.
//!
//! ```text
//!   stdin (JSON lines) ──▶ EngineHandle::submit ──▶ frames ──▶ stdout
//!                                  ▲
//!                   DecayScheduler ┘          logs ──▶ stderr
//! ```
//!
//! Usage: `pipeguard [config.json]`. The log level comes from the config
//! file, overridden by `PIPEGUARD_LOG`.

use std::sync::Arc;

use anyhow::{Context, Result};
use fern::Dispatch;
use log::{LevelFilter, debug, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use pipeguard::adapters::{Framing, JsonFileConfig, LogSink, SystemClock, WriterSink};
use pipeguard::app::ports::ConfigPort;
use pipeguard::config::WireFormat;
use pipeguard::detection::DetectionReport;
use pipeguard::scheduler::DecayScheduler;
use pipeguard::{EngineConfig, EngineHandle};

fn init_logging(config_level: &str) -> Result<()> {
    let raw = std::env::var("PIPEGUARD_LOG").unwrap_or_else(|_| config_level.to_owned());
    let level: LevelFilter = raw
        .parse()
        .with_context(|| format!("invalid log level {raw:?}"))?;

    Dispatch::new()
        .format(|out, msg, record| {
            out.finish(format_args!(
                "[{}][{:5}][{}] {}",
                chrono::Utc::now().to_rfc3339(),
                record.level(),
                record.target(),
                msg
            ));
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}

fn ingest(handle: &EngineHandle, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    match serde_json::from_str::<DetectionReport>(line) {
        Ok(report) => {
            let out = handle.submit(report);
            debug!(
                "submit: {:?} score={:.1} level={}{}",
                out.disposition,
                out.score,
                out.level,
                out.reason.map(|r| format!(" ({r})")).unwrap_or_default()
            );
        }
        Err(e) => warn!("skipping malformed report: {e}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args_os().nth(1) {
        Some(path) => JsonFileConfig::new(path)
            .load()
            .context("loading configuration")?,
        None => EngineConfig::default(),
    };
    init_logging(&config.log_level)?;

    let format = config.wire_format;
    let handle = EngineHandle::new(config, Arc::new(SystemClock)).context("building engine")?;

    let framing = match format {
        WireFormat::Json => Framing::Lines,
        WireFormat::Postcard => Framing::LengthPrefixed,
    };
    handle
        .subscribe(Box::new(WriterSink::new(std::io::stdout(), framing)))
        .context("attaching stdout subscriber")?;
    if format == WireFormat::Json && log::log_enabled!(log::Level::Info) {
        handle
            .subscribe(Box::new(LogSink::new()))
            .context("attaching log subscriber")?;
    }

    let decay = DecayScheduler::spawn(handle.clone());
    info!("pipeguard ready, reading detections from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => match line.context("reading stdin")? {
                Some(line) => ingest(&handle, &line),
                None => {
                    info!("input closed");
                    break;
                }
            },
            _ = &mut shutdown => {
                info!("interrupted");
                break;
            }
        }
    }

    decay.stop().await;
    let status = handle.status();
    info!(
        "final score {:.1} ({}), {} detections, {} alerts",
        status.score, status.level, status.total_detections, status.alerts_issued
    );
    Ok(())
}
