use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::OptionsError;

/// Barcode symbologies understood by the recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BarcodeFormat {
    Aztec,
    Codabar,
    Code39,
    Code93,
    Code128,
    DataBar,
    DataBarExpanded,
    DataBarLimited,
    DataMatrix,
    DXFilmEdge,
    Ean8,
    Ean13,
    Itf,
    MaxiCode,
    Pdf417,
    QrCode,
    MicroQrCode,
    RmqrCode,
    UpcA,
    UpcE,
}

impl BarcodeFormat {
    pub const ALL: [BarcodeFormat; 20] = [
        BarcodeFormat::Aztec,
        BarcodeFormat::Codabar,
        BarcodeFormat::Code39,
        BarcodeFormat::Code93,
        BarcodeFormat::Code128,
        BarcodeFormat::DataBar,
        BarcodeFormat::DataBarExpanded,
        BarcodeFormat::DataBarLimited,
        BarcodeFormat::DataMatrix,
        BarcodeFormat::DXFilmEdge,
        BarcodeFormat::Ean8,
        BarcodeFormat::Ean13,
        BarcodeFormat::Itf,
        BarcodeFormat::MaxiCode,
        BarcodeFormat::Pdf417,
        BarcodeFormat::QrCode,
        BarcodeFormat::MicroQrCode,
        BarcodeFormat::RmqrCode,
        BarcodeFormat::UpcA,
        BarcodeFormat::UpcE,
    ];

    /// Canonical display name
    pub fn name(self) -> &'static str {
        match self {
            BarcodeFormat::Aztec => "Aztec",
            BarcodeFormat::Codabar => "Codabar",
            BarcodeFormat::Code39 => "Code39",
            BarcodeFormat::Code93 => "Code93",
            BarcodeFormat::Code128 => "Code128",
            BarcodeFormat::DataBar => "DataBar",
            BarcodeFormat::DataBarExpanded => "DataBarExpanded",
            BarcodeFormat::DataBarLimited => "DataBarLimited",
            BarcodeFormat::DataMatrix => "DataMatrix",
            BarcodeFormat::DXFilmEdge => "DXFilmEdge",
            BarcodeFormat::Ean8 => "EAN-8",
            BarcodeFormat::Ean13 => "EAN-13",
            BarcodeFormat::Itf => "ITF",
            BarcodeFormat::MaxiCode => "MaxiCode",
            BarcodeFormat::Pdf417 => "PDF417",
            BarcodeFormat::QrCode => "QRCode",
            BarcodeFormat::MicroQrCode => "MicroQRCode",
            BarcodeFormat::RmqrCode => "rMQRCode",
            BarcodeFormat::UpcA => "UPC-A",
            BarcodeFormat::UpcE => "UPC-E",
        }
    }
}

impl BarcodeFormat {
    /// One-dimensional symbologies, read scan line by scan line
    pub fn is_linear(self) -> bool {
        matches!(
            self,
            BarcodeFormat::Codabar
                | BarcodeFormat::Code39
                | BarcodeFormat::Code93
                | BarcodeFormat::Code128
                | BarcodeFormat::DataBar
                | BarcodeFormat::DataBarExpanded
                | BarcodeFormat::DataBarLimited
                | BarcodeFormat::DXFilmEdge
                | BarcodeFormat::Itf
        ) || self.is_ean_upc()
    }

    /// Symbologies that may carry a 2- or 5-digit add-on
    pub fn is_ean_upc(self) -> bool {
        matches!(
            self,
            BarcodeFormat::Ean8 | BarcodeFormat::Ean13 | BarcodeFormat::UpcA | BarcodeFormat::UpcE
        )
    }
}

impl fmt::Display for BarcodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BarcodeFormat {
    type Err = OptionsError;

    /// Case-insensitive; `-`, `_` and spaces are ignored, so both
    /// `QR_CODE` and `QRCode` name the same symbology.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        let legacy = match normalized.as_str() {
            "rss14" => Some(BarcodeFormat::DataBar),
            "rssexpanded" => Some(BarcodeFormat::DataBarExpanded),
            "rsslimited" => Some(BarcodeFormat::DataBarLimited),
            _ => None,
        };

        legacy
            .or_else(|| {
                BarcodeFormat::ALL.into_iter().find(|format| {
                    format
                        .name()
                        .chars()
                        .filter(|c| *c != '-')
                        .flat_map(char::to_lowercase)
                        .eq(normalized.chars())
                })
            })
            .ok_or_else(|| OptionsError::UnknownFormat(s.to_string()))
    }
}

/// Binarization strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Binarizer {
    #[default]
    LocalAverage,
    GlobalHistogram,
    FixedThreshold,
    BoolCast,
}

/// Handling of EAN/UPC add-on symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EanAddOnSymbol {
    #[default]
    Ignore,
    Read,
    Require,
}

/// How decoded content is rendered into text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextMode {
    Plain,
    #[serde(rename = "ECI")]
    Eci,
    #[default]
    #[serde(rename = "HRI")]
    Hri,
    Hex,
    Escaped,
}

fn parse_enum<T: Copy>(option: &str, value: &str, table: &[(&str, T)]) -> Result<T, OptionsError> {
    table
        .iter()
        .find(|(name, _)| *name == value)
        .map(|(_, v)| *v)
        .ok_or_else(|| OptionsError::BadValue {
            option: option.to_string(),
            value: value.to_string(),
        })
}

impl FromStr for Binarizer {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_enum(
            "Binarizer",
            s,
            &[
                ("LocalAverage", Binarizer::LocalAverage),
                ("GlobalHistogram", Binarizer::GlobalHistogram),
                ("FixedThreshold", Binarizer::FixedThreshold),
                ("BoolCast", Binarizer::BoolCast),
            ],
        )
    }
}

impl FromStr for EanAddOnSymbol {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_enum(
            "EanAddOnSymbol",
            s,
            &[
                ("Ignore", EanAddOnSymbol::Ignore),
                ("Read", EanAddOnSymbol::Read),
                ("Require", EanAddOnSymbol::Require),
            ],
        )
    }
}

impl FromStr for TextMode {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_enum(
            "TextMode",
            s,
            &[
                ("Plain", TextMode::Plain),
                ("ECI", TextMode::Eci),
                ("HRI", TextMode::Hri),
                ("Hex", TextMode::Hex),
                ("Escaped", TextMode::Escaped),
            ],
        )
    }
}

/// Options controlling a single decode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderOptions {
    pub try_harder: bool,
    pub try_rotate: bool,
    pub try_invert: bool,
    pub try_downscale: bool,
    pub is_pure: bool,
    pub return_errors: bool,
    /// Empty means any format.
    pub formats: Vec<BarcodeFormat>,
    pub binarizer: Binarizer,
    pub ean_add_on_symbol: EanAddOnSymbol,
    pub text_mode: TextMode,
    pub min_line_count: i32,
    pub max_number_of_symbols: i32,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            try_harder: true,
            try_rotate: true,
            try_invert: true,
            try_downscale: true,
            is_pure: false,
            return_errors: false,
            formats: Vec::new(),
            binarizer: Binarizer::default(),
            ean_add_on_symbol: EanAddOnSymbol::default(),
            text_mode: TextMode::default(),
            min_line_count: 2,
            max_number_of_symbols: 255,
        }
    }
}

impl ReaderOptions {
    /// Parse alternating `Name value` pairs on top of the defaults.
    pub fn from_pairs<S: AsRef<str>>(args: &[S]) -> Result<Self, OptionsError> {
        let mut options = Self::default();
        if args.len() % 2 != 0 {
            return Err(OptionsError::MissingValue);
        }
        for pair in args.chunks(2) {
            options.set(pair[0].as_ref(), pair[1].as_ref())?;
        }
        Ok(options)
    }

    /// Set a single option by name.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), OptionsError> {
        match name {
            "TryHarder" => self.try_harder = parse_bool(name, value)?,
            "TryRotate" => self.try_rotate = parse_bool(name, value)?,
            "TryInvert" => self.try_invert = parse_bool(name, value)?,
            "TryDownscale" => self.try_downscale = parse_bool(name, value)?,
            "IsPure" => self.is_pure = parse_bool(name, value)?,
            "ReturnErrors" => self.return_errors = parse_bool(name, value)?,
            "Formats" => self.formats = parse_formats(value)?,
            "Binarizer" => self.binarizer = value.parse()?,
            "EanAddOnSymbol" => self.ean_add_on_symbol = value.parse()?,
            "TextMode" => self.text_mode = value.parse()?,
            "MinLineCount" => self.min_line_count = parse_int(name, value)?,
            "MaxNumberOfSymbols" => self.max_number_of_symbols = parse_int(name, value)?,
            _ => return Err(OptionsError::UnknownOption(name.to_string())),
        }
        Ok(())
    }
}

/// Parse a whitespace- or comma-separated list of format names.
pub fn parse_formats(value: &str) -> Result<Vec<BarcodeFormat>, OptionsError> {
    let mut formats = Vec::new();
    for name in value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
    {
        let format: BarcodeFormat = name.parse()?;
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    Ok(formats)
}

fn parse_bool(option: &str, value: &str) -> Result<bool, OptionsError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(OptionsError::BadValue {
            option: option.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_int(option: &str, value: &str) -> Result<i32, OptionsError> {
    value.trim().parse().map_err(|_| OptionsError::BadValue {
        option: option.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_families() {
        assert!(BarcodeFormat::Code128.is_linear());
        assert!(BarcodeFormat::UpcE.is_linear());
        assert!(BarcodeFormat::UpcE.is_ean_upc());
        assert!(!BarcodeFormat::Code128.is_ean_upc());
        assert!(!BarcodeFormat::QrCode.is_linear());
        assert!(!BarcodeFormat::Pdf417.is_linear());
    }

    #[test]
    fn test_defaults() {
        let options = ReaderOptions::default();
        assert!(options.try_harder);
        assert!(!options.is_pure);
        assert!(options.formats.is_empty());
        assert_eq!(options.text_mode, TextMode::Hri);
        assert_eq!(options.min_line_count, 2);
        assert_eq!(options.max_number_of_symbols, 255);
    }

    #[test]
    fn test_format_parsing_accepts_legacy_names() {
        assert_eq!("QR_CODE".parse::<BarcodeFormat>().unwrap(), BarcodeFormat::QrCode);
        assert_eq!("qrcode".parse::<BarcodeFormat>().unwrap(), BarcodeFormat::QrCode);
        assert_eq!("EAN-13".parse::<BarcodeFormat>().unwrap(), BarcodeFormat::Ean13);
        assert_eq!("CODE_128".parse::<BarcodeFormat>().unwrap(), BarcodeFormat::Code128);
        assert_eq!("PDF_417".parse::<BarcodeFormat>().unwrap(), BarcodeFormat::Pdf417);
        assert_eq!("RSS_14".parse::<BarcodeFormat>().unwrap(), BarcodeFormat::DataBar);
        assert_eq!("rMQRCode".parse::<BarcodeFormat>().unwrap(), BarcodeFormat::RmqrCode);
        assert_eq!(
            "UPC_EAN_EXTENSION".parse::<BarcodeFormat>(),
            Err(OptionsError::UnknownFormat("UPC_EAN_EXTENSION".to_string()))
        );
    }

    #[test]
    fn test_every_format_name_round_trips() {
        for format in BarcodeFormat::ALL {
            assert_eq!(format.name().parse::<BarcodeFormat>().unwrap(), format);
        }
    }

    #[test]
    fn test_from_pairs() {
        let options = ReaderOptions::from_pairs(&[
            "TryHarder",
            "0",
            "Formats",
            "QRCode, EAN-13 QRCode",
            "Binarizer",
            "GlobalHistogram",
            "TextMode",
            "Escaped",
            "MaxNumberOfSymbols",
            "3",
        ])
        .unwrap();

        assert!(!options.try_harder);
        assert_eq!(options.formats, vec![BarcodeFormat::QrCode, BarcodeFormat::Ean13]);
        assert_eq!(options.binarizer, Binarizer::GlobalHistogram);
        assert_eq!(options.text_mode, TextMode::Escaped);
        assert_eq!(options.max_number_of_symbols, 3);
    }

    #[test]
    fn test_from_pairs_errors() {
        assert_eq!(
            ReaderOptions::from_pairs(&["TryHarder"]),
            Err(OptionsError::MissingValue)
        );
        assert_eq!(
            ReaderOptions::from_pairs(&["Sharpen", "1"]),
            Err(OptionsError::UnknownOption("Sharpen".to_string()))
        );
        assert!(matches!(
            ReaderOptions::from_pairs(&["IsPure", "maybe"]),
            Err(OptionsError::BadValue { .. })
        ));
        assert!(matches!(
            ReaderOptions::from_pairs(&["EanAddOnSymbol", "read"]),
            Err(OptionsError::BadValue { .. })
        ));
    }
}
