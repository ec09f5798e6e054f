use regex::Regex;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

use super::Recognizer;
use crate::barcode::{
    Barcode, BarcodeError, ContentType, DecodeOutcome, ErrorKind, Point, Position,
};
use crate::bitmap::ImageBuffer;
use crate::config::Config;
use crate::error::DecodeFailure;
use crate::options::{BarcodeFormat, Binarizer, EanAddOnSymbol, ReaderOptions, TextMode};

/// Recognizer backed by an external reader executable (ZXingReader compatible).
///
/// Each decode writes the image to a temporary PNG and runs the reader on it,
/// blocking the calling thread until the process exits.
#[derive(Debug, Clone)]
pub struct ExternalReader {
    program: String,
    add_on_warned: Arc<AtomicBool>,
}

impl ExternalReader {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            add_on_warned: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.reader_command.clone())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Command-line flags equivalent to `options`
    pub fn args(options: &ReaderOptions) -> Vec<String> {
        let mut args = Vec::new();

        if !options.try_harder {
            args.push("-fast".to_string());
        }
        if !options.try_rotate {
            args.push("-norotate".to_string());
        }
        if !options.try_invert {
            args.push("-noinvert".to_string());
        }
        if !options.try_downscale {
            args.push("-noscale".to_string());
        }
        if options.is_pure {
            args.push("-ispure".to_string());
        }
        if options.return_errors {
            args.push("-errors".to_string());
        }
        if !options.formats.is_empty() {
            let names: Vec<&str> = options.formats.iter().map(|f| f.name()).collect();
            args.push("-format".to_string());
            args.push(names.join(","));
        }
        if options.binarizer != Binarizer::LocalAverage {
            args.push("-binarizer".to_string());
            args.push(
                match options.binarizer {
                    Binarizer::LocalAverage => "local",
                    Binarizer::GlobalHistogram => "global",
                    Binarizer::FixedThreshold => "fixed",
                    Binarizer::BoolCast => "bool",
                }
                .to_string(),
            );
        }
        if options.text_mode != TextMode::Hri {
            args.push("-mode".to_string());
            args.push(
                match options.text_mode {
                    TextMode::Plain => "plain",
                    TextMode::Eci => "eci",
                    TextMode::Hri => "hri",
                    TextMode::Hex => "hex",
                    TextMode::Escaped => "escaped",
                }
                .to_string(),
            );
        }

        args
    }

    fn write_temp_png(&self, bitmap: &ImageBuffer) -> Result<tempfile::NamedTempFile, DecodeFailure> {
        let file = tempfile::Builder::new()
            .prefix("barscan-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| DecodeFailure::new(format!("Failed to create temporary image: {e}")))?;

        let (data, color) = bitmap.to_packed();
        image::save_buffer_with_format(
            file.path(),
            &data,
            bitmap.width(),
            bitmap.height(),
            color,
            image::ImageFormat::Png,
        )
        .map_err(|e| DecodeFailure::new(format!("Failed to encode temporary image: {e}")))?;

        Ok(file)
    }

    fn run(&self, path: &Path, options: &ReaderOptions) -> DecodeOutcome {
        let mut cmd = Command::new(&self.program);
        cmd.args(Self::args(options));
        cmd.arg(path);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        debug!("Executing reader command: {:?}", cmd);

        let output = cmd
            .output()
            .map_err(|e| DecodeFailure::new(format!("Failed to run {}: {e}", self.program)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let barcodes = parse_reader_output(&stdout);

        if barcodes.is_empty() && !output.status.success() {
            if stdout.contains("No barcode found") {
                return Ok(barcodes);
            }
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = if stderr.trim().is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                stderr.trim().to_string()
            };
            return Err(DecodeFailure::new(message));
        }

        self.warn_unforwarded(options);
        Ok(filter_results(barcodes, options))
    }

    /// The reader has no add-on switch; say so once instead of silently
    /// ignoring the setting.
    fn warn_unforwarded(&self, options: &ReaderOptions) {
        if options.ean_add_on_symbol != EanAddOnSymbol::Ignore
            && !self.add_on_warned.swap(true, Ordering::Relaxed)
        {
            warn!(
                "⚠️ {} does not read EAN/UPC add-ons; EanAddOnSymbol={:?} only filters its results",
                self.program, options.ean_add_on_symbol
            );
        }
    }
}

/// Apply the result-side options the reader executable does not enforce.
///
/// Invalid symbols are dropped before the symbol limit is applied so they
/// never crowd out valid ones.
fn filter_results(mut barcodes: Vec<Barcode>, options: &ReaderOptions) -> Vec<Barcode> {
    if !options.return_errors {
        barcodes.retain(Barcode::is_valid);
    }

    // A line count of 0 means the reader did not report one.
    barcodes.retain(|b| {
        !b.format.is_linear() || b.line_count == 0 || b.line_count >= options.min_line_count
    });

    if options.ean_add_on_symbol == EanAddOnSymbol::Require {
        barcodes.retain(|b| !b.format.is_ean_upc() || has_add_on(b));
    }

    if options.max_number_of_symbols > 0 {
        barcodes.truncate(options.max_number_of_symbols as usize);
    }
    barcodes
}

/// EAN/UPC symbols decoded together with an add-on report modifier 3.
fn has_add_on(barcode: &Barcode) -> bool {
    barcode.symbology_identifier == "]E3"
}

impl Recognizer for ExternalReader {
    fn decode(&self, image: &ImageBuffer, options: &ReaderOptions) -> DecodeOutcome {
        let file = self.write_temp_png(image)?;
        self.run(file.path(), options)
    }
}

fn field_regex() -> &'static Regex {
    static FIELD: OnceLock<Regex> = OnceLock::new();
    FIELD.get_or_init(|| Regex::new(r"^\s*([A-Za-z][A-Za-z ]*?)\s*:\s*(.*?)\s*$").expect("static pattern"))
}

fn point_regex() -> &'static Regex {
    static POINT: OnceLock<Regex> = OnceLock::new();
    POINT.get_or_init(|| Regex::new(r"(-?\d+)x(-?\d+)").expect("static pattern"))
}

/// Parse the `Key: value` report printed by a ZXingReader-style tool.
///
/// Each record starts with a `Text:` line. Records whose format cannot be
/// recognised are skipped.
pub fn parse_reader_output(output: &str) -> Vec<Barcode> {
    let mut records: Vec<Vec<(String, String)>> = Vec::new();

    for line in output.lines() {
        let Some(caps) = field_regex().captures(line) else {
            continue;
        };
        let key = caps[1].to_string();
        let value = caps[2].to_string();

        if key == "Text" || records.is_empty() {
            records.push(Vec::new());
        }
        if let Some(record) = records.last_mut() {
            record.push((key, value));
        }
    }

    records
        .into_iter()
        .filter_map(|fields| {
            let barcode = barcode_from_fields(&fields);
            if barcode.is_none() {
                warn!("Skipping reader record without a known format: {:?}", fields);
            }
            barcode
        })
        .collect()
}

fn barcode_from_fields(fields: &[(String, String)]) -> Option<Barcode> {
    let get = |name: &str| {
        fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    };

    let format: BarcodeFormat = get("Format")?.parse().ok()?;
    let text = get("Text").map(unquote).unwrap_or_default();
    let mut barcode = Barcode::new(format, text);

    if let Some(bytes) = get("Bytes").and_then(parse_hex) {
        barcode.bytes_eci = bytes.clone();
        barcode.bytes = bytes;
    }
    if let Some(content) = get("Content").and_then(ContentType::from_name) {
        barcode.content_type = content;
    }
    if let Some(identifier) = get("Identifier") {
        barcode.symbology_identifier = identifier.to_string();
    }
    barcode.has_eci = get("HasECI").map(|v| v == "true").unwrap_or(false);
    if let Some(level) = get("EC Level") {
        barcode.ec_level = level.to_string();
    }
    if let Some(position) = get("Position").and_then(parse_position) {
        barcode.position = position;
    }
    if let Some(rotation) = get("Rotation") {
        barcode.orientation = rotation
            .trim_end_matches("deg")
            .trim()
            .parse()
            .unwrap_or(0);
    }
    barcode.is_mirrored = get("IsMirrored").map(|v| v == "true").unwrap_or(false);
    barcode.is_inverted = get("IsInverted").map(|v| v == "true").unwrap_or(false);
    if let Some(lines) = get("Lines").and_then(|v| v.parse().ok()) {
        barcode.line_count = lines;
    }
    if let Some(message) = get("Error") {
        let kind = if message.contains("Checksum") {
            ErrorKind::Checksum
        } else if message.contains("Format") {
            ErrorKind::Format
        } else {
            ErrorKind::Unsupported
        };
        barcode.error = Some(BarcodeError {
            kind,
            message: message.to_string(),
        });
    }

    Some(barcode)
}

fn unquote(value: &str) -> String {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
        .to_string()
}

fn parse_hex(value: &str) -> Option<Vec<u8>> {
    value
        .split_whitespace()
        .map(|byte| u8::from_str_radix(byte, 16).ok())
        .collect()
}

fn parse_position(value: &str) -> Option<Position> {
    let points: Vec<Point> = point_regex()
        .captures_iter(value)
        .filter_map(|caps| {
            Some(Point {
                x: caps[1].parse().ok()?,
                y: caps[2].parse().ok()?,
            })
        })
        .collect();
    let corners: [Point; 4] = points.try_into().ok()?;
    Some(Position(corners))
}
