use anyhow::{bail, Context, Result};
use indicatif::ProgressBar;
use std::path::PathBuf;
use tokio::fs;
use tokio::signal;
use tracing::info;

use super::{emit, parse_option_args, Session};
use crate::barcode::DecodeReport;
use crate::bitmap::ImageBuffer;
use crate::config::Config;
use crate::engine::{ExternalReader, Recognizer};
use crate::job::Job;

/// Command to decode a headerless pixel dump (`width height bpp bytes`)
pub struct RawCommand {
    width: i64,
    height: i64,
    bpp: i64,
    file: PathBuf,
    options: Vec<String>,
    json: bool,
}

impl RawCommand {
    pub fn new(
        width: i64,
        height: i64,
        bpp: i64,
        file: PathBuf,
        options: Vec<String>,
        json: bool,
    ) -> Self {
        Self {
            width,
            height,
            bpp,
            file,
            options,
            json,
        }
    }

    pub async fn execute(&self) -> Result<()> {
        let config = Config::from_env();
        let engine = ExternalReader::from_config(&config);
        if let Some(report) = self.run(engine, &config).await? {
            if let Some(error) = report.error {
                bail!("Decode failed: {}", error);
            }
        }
        Ok(())
    }

    /// Decode the pixel file. `None` means the run was interrupted.
    pub async fn run<R: Recognizer>(
        &self,
        engine: R,
        config: &Config,
    ) -> Result<Option<DecodeReport>> {
        let options = parse_option_args(&self.options)?;
        let data = fs::read(&self.file)
            .await
            .with_context(|| format!("Failed to read pixel data {:?}", self.file))?;
        let image = ImageBuffer::from_raw(self.width, self.height, self.bpp, data)?;

        info!(
            "🔎 Decoding {}x{} raw image ({} byte(s) per pixel)",
            self.width, self.height, self.bpp
        );

        let source = self.file.display().to_string();
        let job = Job::new(image, options).with_label(source);

        let mut session = Session::start(engine, config)?;
        let ctrl_c = signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let report = session.decode(job, ctrl_c.as_mut()).await?;
        session.finish();

        if let Some(report) = &report {
            emit(report, self.json, &ProgressBar::hidden())?;
        }
        Ok(report)
    }
}
