pub mod barcode;
pub mod bitmap;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod job;
pub mod options;
pub mod scheduler;

pub use barcode::{Barcode, DecodeOutcome, DecodeReport};
pub use bitmap::{ImageBuffer, ImageFormat};
pub use error::{DecodeFailure, ImageError, OptionsError, SchedulerError};
pub use job::Job;
pub use options::{BarcodeFormat, ReaderOptions};
pub use scheduler::{EventLoop, Scheduler, SchedulerStatus};
