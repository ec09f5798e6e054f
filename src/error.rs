use std::io;
use thiserror::Error;

/// Synchronous failures of the scheduler API.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The worker thread could not be spawned.
    #[error("failed to start decode worker: {0}")]
    StartFailed(#[source] io::Error),

    /// A job or an undelivered outcome is already outstanding.
    #[error("decoder busy")]
    Busy,

    /// `submit` was called before `start` (or after `stop`).
    #[error("decoder not started")]
    NotStarted,
}

/// Failure reported by the recognition engine for a single decode.
///
/// Delivered through the completion callback, never returned from `submit`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DecodeFailure {
    pub message: String,
}

impl DecodeFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Image marshaling errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("unsupported image depth")]
    UnsupportedDepth,

    #[error("invalid image size")]
    InvalidSize,

    #[error("malformed image")]
    Malformed,

    #[error("Unsupported pixel layout: R:{0},G:{1},B:{2},A:{3}")]
    UnsupportedLayout(i32, i32, i32, i32),
}

/// Decode option parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    #[error("Option without value")]
    MissingValue,

    #[error("bad option \"{0}\"")]
    UnknownOption(String),

    #[error("format \"{0}\" not found")]
    UnknownFormat(String),

    #[error("bad value \"{value}\" for option {option}")]
    BadValue { option: String, value: String },
}
