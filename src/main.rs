//! # barscan - Barcode Decoding CLI
//!
//! Decodes barcodes from image files on a background worker thread while the
//! command loop stays responsive. Recognition is delegated to a zxing-cpp
//! `ZXingReader` executable.
//!
//! ## Usage
//!
//! ```bash
//! # Decode every image under a directory
//! barscan decode /path/to/scans
//!
//! # Restrict formats and emit one JSON report per file
//! barscan decode label.png --option Formats=QRCode,EAN-13 --json
//!
//! # Decode a headerless 8-bit grey dump
//! barscan raw 640 480 1 frame.bin
//!
//! # List format names
//! barscan formats
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use barscan::commands::{decode::DecodeCommand, formats::FormatsCommand, raw::RawCommand};

/// barscan - Decode barcodes from images
#[derive(Parser)]
#[command(
    name = "barscan",
    about = "Decode barcodes from images on a background worker",
    long_about = "Decodes QR codes, DataMatrix, EAN/UPC and other symbologies using an external zxing-cpp reader, one image at a time on a dedicated worker thread.",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Decode image files, recursing into directories
    Decode {
        /// Image files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Reader option as NAME=VALUE, e.g. TryHarder=false or Formats=QRCode
        #[arg(long = "option", short = 'o', value_name = "NAME=VALUE")]
        options: Vec<String>,
        /// Print one JSON report per image
        #[arg(long)]
        json: bool,
    },
    /// List supported barcode format names
    Formats,
    /// Decode a headerless pixel file
    Raw {
        /// Image width in pixels
        width: i64,
        /// Image height in pixels
        height: i64,
        /// Bytes per pixel: 1 (grey) or 3 (RGB)
        bpp: i64,
        /// File holding width*height*bpp bytes
        file: PathBuf,
        /// Reader option as NAME=VALUE
        #[arg(long = "option", short = 'o', value_name = "NAME=VALUE")]
        options: Vec<String>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; stdout is reserved for reports
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "barscan=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Decode {
            paths,
            options,
            json,
        } => {
            info!("Starting decode command for {} path(s)", paths.len());
            DecodeCommand::new(paths, options, json).execute().await
        }
        Commands::Formats => FormatsCommand::new().execute().await,
        Commands::Raw {
            width,
            height,
            bpp,
            file,
            options,
            json,
        } => {
            info!(
                "Starting raw command for {:?} ({}x{}, bpp {})",
                file, width, height, bpp
            );
            RawCommand::new(width, height, bpp, file, options, json)
                .execute()
                .await
        }
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
