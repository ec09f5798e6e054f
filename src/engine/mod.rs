//! The recognition engine seam.
//!
//! The scheduler treats decoding as an opaque, synchronous call of unknown
//! duration. Anything implementing [`Recognizer`] can be plugged in; the
//! CLI uses [`ExternalReader`], which runs a reader executable per image.

mod external;

pub use external::{parse_reader_output, ExternalReader};

use crate::barcode::DecodeOutcome;
use crate::bitmap::ImageBuffer;
use crate::options::ReaderOptions;

/// A synchronous barcode recognizer.
///
/// Called only from the scheduler's worker thread. Must not keep state
/// across calls that affects later results.
pub trait Recognizer: Send + Sync + 'static {
    fn decode(&self, image: &ImageBuffer, options: &ReaderOptions) -> DecodeOutcome;
}

impl<F> Recognizer for F
where
    F: Fn(&ImageBuffer, &ReaderOptions) -> DecodeOutcome + Send + Sync + 'static,
{
    fn decode(&self, image: &ImageBuffer, options: &ReaderOptions) -> DecodeOutcome {
        self(image, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barcode::Barcode;
    use crate::error::DecodeFailure;
    use crate::options::BarcodeFormat;

    #[test]
    fn test_closures_are_recognizers() {
        fn run(engine: &dyn Recognizer) -> DecodeOutcome {
            let image = ImageBuffer::from_raw(1, 1, 1, vec![0]).unwrap();
            engine.decode(&image, &ReaderOptions::default())
        }

        let found = run(&|_: &ImageBuffer, _: &ReaderOptions| -> DecodeOutcome {
            Ok(vec![Barcode::new(BarcodeFormat::QrCode, "x")])
        });
        assert_eq!(found.unwrap().len(), 1);

        let failed = run(&|_: &ImageBuffer, _: &ReaderOptions| -> DecodeOutcome {
            Err(DecodeFailure::new("boom"))
        });
        assert_eq!(failed, Err(DecodeFailure::new("boom")));
    }
}
