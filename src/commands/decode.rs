use anyhow::{anyhow, bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio::signal;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::{emit, parse_option_args, Session};
use crate::barcode::DecodeReport;
use crate::bitmap::ImageBuffer;
use crate::config::Config;
use crate::engine::{ExternalReader, Recognizer};
use crate::error::DecodeFailure;
use crate::job::Job;

/// Totals for one `decode` run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DecodeSummary {
    pub files: usize,
    pub barcodes: usize,
    pub failures: usize,
    pub interrupted: bool,
}

impl DecodeSummary {
    fn record(&mut self, report: &DecodeReport) {
        self.files += 1;
        if report.is_failure() {
            self.failures += 1;
        }
        self.barcodes += report.barcodes.as_ref().map_or(0, Vec::len);
    }
}

/// Command to decode barcodes from image files and directories
pub struct DecodeCommand {
    inputs: Vec<PathBuf>,
    options: Vec<String>,
    json: bool,
}

impl DecodeCommand {
    pub fn new(inputs: Vec<PathBuf>, options: Vec<String>, json: bool) -> Self {
        Self {
            inputs,
            options,
            json,
        }
    }

    pub async fn execute(&self) -> Result<()> {
        let config = Config::from_env();
        let engine = ExternalReader::from_config(&config);
        let summary = self.run(engine, &config).await?;

        if summary.failures > 0 {
            bail!(
                "{} of {} file(s) failed to decode",
                summary.failures,
                summary.files
            );
        }
        Ok(())
    }

    /// Decode every input with `engine`, printing one report per file.
    pub async fn run<R: Recognizer>(&self, engine: R, config: &Config) -> Result<DecodeSummary> {
        let options = parse_option_args(&self.options)?;
        let files = collect_images(&self.inputs, config)?;
        let mut summary = DecodeSummary::default();

        if files.is_empty() {
            warn!("⚠️ No image files found");
            return Ok(summary);
        }

        info!("🔎 Decoding {} image(s)", files.len());
        let progress = if self.json || files.len() < 2 {
            ProgressBar::hidden()
        } else {
            progress_bar(files.len())?
        };

        let mut session = Session::start(engine, config)?;
        let ctrl_c = signal::ctrl_c();
        tokio::pin!(ctrl_c);

        for path in &files {
            let source = path.display().to_string();
            progress.set_message(source.clone());

            let report = match load_image(path) {
                Ok(image) => {
                    let job = Job::new(image, options.clone()).with_label(&source);
                    match session.decode(job, ctrl_c.as_mut()).await? {
                        Some(report) => report,
                        None => {
                            summary.interrupted = true;
                            break;
                        }
                    }
                }
                Err(err) => {
                    warn!("⚠️ SKIPPING: {:#}", err);
                    DecodeReport::new(0, &Err(DecodeFailure::new(format!("{:#}", err))))
                        .with_source(&source)
                }
            };

            debug!("{} finished in {} ms", source, report.elapsed_ms);
            summary.record(&report);
            emit(&report, self.json, &progress)?;
            progress.inc(1);
        }

        progress.finish_and_clear();
        session.finish();

        info!(
            "✅ Decoded {} file(s): {} barcode(s), {} failure(s)",
            summary.files, summary.barcodes, summary.failures
        );
        Ok(summary)
    }
}

/// Expand inputs into image files. Directories are walked recursively and
/// filtered by extension; explicit files are taken as given.
pub fn collect_images(inputs: &[PathBuf], config: &Config) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if !input.exists() {
            return Err(anyhow!("Input does not exist: {:?}", input));
        }

        if input.is_file() {
            files.push(input.clone());
            continue;
        }

        for entry in WalkDir::new(input)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && config.is_image(path) {
                files.push(path.to_path_buf());
            }
        }
    }
    Ok(files)
}

fn load_image(path: &Path) -> Result<ImageBuffer> {
    let image = image::open(path).with_context(|| format!("Failed to load image {:?}", path))?;
    ImageBuffer::from_dynamic(image).with_context(|| format!("Unusable image {:?}", path))
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
    let style = ProgressStyle::with_template("{bar:40} {pos}/{len} {wide_msg}")?;
    Ok(ProgressBar::new(len as u64).with_style(style))
}
