use std::fmt;
use uuid::Uuid;

use crate::barcode::DecodeOutcome;
use crate::bitmap::ImageBuffer;
use crate::options::ReaderOptions;

/// Invoked on the owning thread with `(elapsed_ms, outcome)` once a job completes.
///
/// Errors returned here go to the event loop's background error handler.
pub type DecodeCallback = Box<dyn FnOnce(u64, DecodeOutcome) -> anyhow::Result<()> + Send>;

/// One decode request: an image and the options to decode it with.
///
/// Both are owned by the job and move with it into the worker.
pub struct Job {
    pub id: String,
    pub image: ImageBuffer,
    pub options: ReaderOptions,
    pub label: Option<String>,
}

impl Job {
    pub fn new(image: ImageBuffer, options: ReaderOptions) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            image,
            options,
            label: None,
        }
    }

    /// Attach a human-readable name (usually the source path) for logging.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .field("format", &self.image.format())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_creation() {
        let image = ImageBuffer::from_raw(2, 2, 1, vec![0; 4]).unwrap();
        let job = Job::new(image, ReaderOptions::default());
        assert_eq!(job.id.len(), 36);
        assert_eq!(job.display_name(), job.id);

        let other = Job::new(job.image.clone(), ReaderOptions::default()).with_label("a.png");
        assert_ne!(job.id, other.id);
        assert_eq!(other.display_name(), "a.png");
    }
}
