pub mod decode;
pub mod formats;
pub mod raw;

use anyhow::{anyhow, bail, Context, Result};
use indicatif::ProgressBar;
use std::future::Future;
use std::pin::Pin;
use std::sync::mpsc;
use tracing::info;

use crate::barcode::{BarcodeRecord, DecodeReport};
use crate::config::Config;
use crate::engine::Recognizer;
use crate::job::Job;
use crate::options::ReaderOptions;
use crate::scheduler::{EventLoop, Scheduler};

/// Build reader options from `NAME=VALUE` command-line arguments.
pub fn parse_option_args(args: &[String]) -> Result<ReaderOptions> {
    let mut options = ReaderOptions::default();
    for arg in args {
        let (name, value) = arg
            .split_once('=')
            .ok_or_else(|| anyhow!("Option without value: {:?} (expected NAME=VALUE)", arg))?;
        options
            .set(name.trim(), value.trim())
            .with_context(|| format!("Invalid option {:?}", arg))?;
    }
    Ok(options)
}

/// A running scheduler plus the event loop its completions are delivered on.
///
/// Jobs go through one at a time; each `decode` call waits for the
/// completion callback before returning its report.
pub(crate) struct Session {
    events: EventLoop,
    scheduler: Scheduler,
    reports_tx: mpsc::Sender<DecodeReport>,
    reports: mpsc::Receiver<DecodeReport>,
}

impl Session {
    pub fn start<R: Recognizer>(engine: R, config: &Config) -> Result<Self> {
        let events = EventLoop::new();
        let scheduler = Scheduler::with_config(engine, events.handle(), config);
        scheduler.start()?;
        let (reports_tx, reports) = mpsc::channel();

        Ok(Self {
            events,
            scheduler,
            reports_tx,
            reports,
        })
    }

    /// Decode one job. Returns `None` if `interrupt` resolves first, in which
    /// case the scheduler has been stopped.
    pub async fn decode<F: Future>(
        &mut self,
        job: Job,
        interrupt: Pin<&mut F>,
    ) -> Result<Option<DecodeReport>> {
        let source = job.display_name().to_string();
        let tx = self.reports_tx.clone();
        self.scheduler.submit(job, move |elapsed_ms, outcome| {
            tx.send(DecodeReport::new(elapsed_ms, &outcome).with_source(source))
                .map_err(|_| anyhow!("report channel closed"))
        })?;

        tokio::select! {
            dispatched = self.events.dispatch_next() => {
                if dispatched.is_none() {
                    bail!("completion queue closed");
                }
            }
            _ = interrupt => {
                info!("🛑 Interrupt received. Stopping decoder.");
                self.scheduler.stop();
                return Ok(None);
            }
        }

        self.reports
            .try_recv()
            .map(Some)
            .map_err(|_| anyhow!("decode completed without a report"))
    }

    pub fn finish(self) {
        self.scheduler.stop();
    }
}

/// Print a report as a JSON line or as human-readable lines.
pub(crate) fn emit(report: &DecodeReport, json: bool, progress: &ProgressBar) -> Result<()> {
    let lines = if json {
        vec![serde_json::to_string(report)?]
    } else {
        human_lines(report)
    };
    progress.suspend(|| {
        for line in &lines {
            println!("{}", line);
        }
    });
    Ok(())
}

fn human_lines(report: &DecodeReport) -> Vec<String> {
    let source = report.source.as_deref().unwrap_or("<image>");
    if let Some(error) = &report.error {
        return vec![format!("{}: error: {}", source, error)];
    }

    let records = report.barcodes.as_deref().unwrap_or_default();
    if records.is_empty() {
        return vec![format!("{}: no barcode found ({} ms)", source, report.elapsed_ms)];
    }
    records
        .iter()
        .map(|record| describe(source, record, report.elapsed_ms))
        .collect()
}

fn describe(source: &str, record: &BarcodeRecord, elapsed_ms: u64) -> String {
    match (&record.error_type, &record.error_msg) {
        (Some(kind), Some(message)) => format!(
            "{}: {} [{} error: {}] at {}",
            source, record.format, kind, message, record.position
        ),
        _ => format!(
            "{}: {} {:?} at {} ({} ms)",
            source, record.format, record.text, record.position, elapsed_ms
        ),
    }
}
