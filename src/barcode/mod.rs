//! Recognition results and their conversion into the payload handed to
//! completion callbacks.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DecodeFailure;
use crate::options::BarcodeFormat;

/// Kind of content carried by a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContentType {
    #[default]
    Text,
    Binary,
    Mixed,
    GS1,
    ISO15434,
    UnknownECI,
}

impl ContentType {
    pub fn name(self) -> &'static str {
        match self {
            ContentType::Text => "Text",
            ContentType::Binary => "Binary",
            ContentType::Mixed => "Mixed",
            ContentType::GS1 => "GS1",
            ContentType::ISO15434 => "ISO15434",
            ContentType::UnknownECI => "UnknownECI",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [
            ContentType::Text,
            ContentType::Binary,
            ContentType::Mixed,
            ContentType::GS1,
            ContentType::ISO15434,
            ContentType::UnknownECI,
        ]
        .into_iter()
        .find(|c| c.name().eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Corner points: top-left, top-right, bottom-right, bottom-left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position(pub [Point; 4]);

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, p) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}x{}", p.x, p.y)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Format,
    Checksum,
    Unsupported,
}

/// Why a located symbol could not be read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarcodeError {
    pub kind: ErrorKind,
    pub message: String,
}

/// A single symbol found by the recognizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Barcode {
    pub text: String,
    pub format: BarcodeFormat,
    pub bytes: Vec<u8>,
    pub bytes_eci: Vec<u8>,
    pub content_type: ContentType,
    pub symbology_identifier: String,
    pub has_eci: bool,
    pub ec_level: String,
    pub position: Position,
    pub orientation: i32,
    pub is_mirrored: bool,
    pub is_inverted: bool,
    pub line_count: i32,
    /// Present only for symbols that were located but failed to decode.
    pub error: Option<BarcodeError>,
}

impl Barcode {
    /// A valid text symbol with the remaining fields defaulted.
    pub fn new(format: BarcodeFormat, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            bytes: text.as_bytes().to_vec(),
            bytes_eci: text.as_bytes().to_vec(),
            text,
            format,
            content_type: ContentType::Text,
            symbology_identifier: String::new(),
            has_eci: false,
            ec_level: String::new(),
            position: Position::default(),
            orientation: 0,
            is_mirrored: false,
            is_inverted: false,
            line_count: 0,
            error: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

/// What the worker produced for one job
pub type DecodeOutcome = Result<Vec<Barcode>, DecodeFailure>;

/// Flat per-symbol record, keyed the way script bindings expose results
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarcodeRecord {
    pub text: String,
    pub format: String,
    pub bytes: Vec<u8>,
    #[serde(rename = "bytesECI")]
    pub bytes_eci: Vec<u8>,
    pub content: String,
    pub symbology_identifier: String,
    #[serde(rename = "hasECI")]
    pub has_eci: bool,
    pub ec_level: String,
    pub position: String,
    pub orientation: i32,
    pub is_mirrored: bool,
    pub is_inverted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
}

impl From<&Barcode> for BarcodeRecord {
    fn from(barcode: &Barcode) -> Self {
        let (error_type, error_msg) = match &barcode.error {
            Some(err) => (Some(format!("{:?}", err.kind)), Some(err.message.clone())),
            None => (None, None),
        };

        Self {
            text: barcode.text.clone(),
            format: barcode.format.name().to_string(),
            bytes: barcode.bytes.clone(),
            bytes_eci: barcode.bytes_eci.clone(),
            content: barcode.content_type.name().to_string(),
            symbology_identifier: barcode.symbology_identifier.clone(),
            has_eci: barcode.has_eci,
            ec_level: barcode.ec_level.clone(),
            position: barcode.position.to_string(),
            orientation: barcode.orientation,
            is_mirrored: barcode.is_mirrored,
            is_inverted: barcode.is_inverted,
            error_type,
            error_msg,
        }
    }
}

/// Structured payload for one completed decode
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodeReport {
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcodes: Option<Vec<BarcodeRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DecodeReport {
    pub fn new(elapsed_ms: u64, outcome: &DecodeOutcome) -> Self {
        match outcome {
            Ok(barcodes) => Self {
                elapsed_ms,
                source: None,
                barcodes: Some(barcodes.iter().map(BarcodeRecord::from).collect()),
                error: None,
            },
            Err(failure) => Self {
                elapsed_ms,
                source: None,
                barcodes: None,
                error: Some(failure.message.clone()),
            },
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_display() {
        let position = Position([
            Point { x: 1, y: 2 },
            Point { x: 30, y: 2 },
            Point { x: 30, y: 40 },
            Point { x: 1, y: 40 },
        ]);
        assert_eq!(position.to_string(), "1x2 30x2 30x40 1x40");
    }

    #[test]
    fn test_record_uses_binding_keys() {
        let barcode = Barcode::new(BarcodeFormat::QrCode, "hello");
        let report = DecodeReport::new(12, &Ok(vec![barcode]));
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["elapsed_ms"], 12);
        let record = &json["barcodes"][0];
        assert_eq!(record["text"], "hello");
        assert_eq!(record["format"], "QRCode");
        assert_eq!(record["content"], "Text");
        assert_eq!(record["hasECI"], false);
        assert!(record.get("bytesECI").is_some());
        assert!(record.get("symbologyIdentifier").is_some());
        assert!(record.get("errorType").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_invalid_symbol_carries_error_fields() {
        let mut barcode = Barcode::new(BarcodeFormat::Ean13, "");
        barcode.error = Some(BarcodeError {
            kind: ErrorKind::Checksum,
            message: "ChecksumError".to_string(),
        });
        assert!(!barcode.is_valid());

        let record = BarcodeRecord::from(&barcode);
        assert_eq!(record.error_type.as_deref(), Some("Checksum"));
        assert_eq!(record.error_msg.as_deref(), Some("ChecksumError"));
    }

    #[test]
    fn test_failure_report() {
        let report = DecodeReport::new(3, &Err(DecodeFailure::new("boom"))).with_source("a.png");
        assert!(report.is_failure());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["error"], "boom");
        assert_eq!(json["source"], "a.png");
        assert!(json.get("barcodes").is_none());
    }
}
