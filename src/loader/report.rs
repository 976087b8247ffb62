//! Results of a batch load.

use crate::cbf::ImageName;
use crate::core::{FrameShape, FrameStack, FrameStats};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// A frame that could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameFailure {
    /// Position of the frame in the input list.
    pub index: usize,
    /// Frame path.
    pub path: PathBuf,
    /// Error message.
    pub error: String,
}

/// Outcome of [`BatchLoader::load`](crate::loader::BatchLoader::load).
#[derive(Debug)]
pub struct LoadReport {
    /// Loaded frames, in list order.
    pub stack: FrameStack,
    /// Frames skipped under [`ErrorPolicy::Skip`](crate::loader::ErrorPolicy::Skip).
    pub failures: Vec<FrameFailure>,
    /// Wall time spent loading.
    pub elapsed: Duration,
    /// Decoder backend name.
    pub decoder: &'static str,
}

/// Serializable overview of a [`LoadReport`].
#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    /// Decoder backend name.
    pub decoder: &'static str,
    /// Frames loaded.
    pub frames: usize,
    /// Frame shape.
    pub shape: FrameShape,
    /// File name template of the first frame, e.g. `ref_1_####.cbf`.
    pub template: Option<String>,
    /// Frame number of the first loaded frame.
    pub first_number: Option<u64>,
    /// Frame number of the last loaded frame.
    pub last_number: Option<u64>,
    /// Pixel statistics over the whole stack.
    pub stats: Option<FrameStats>,
    /// Frames that failed.
    pub failures: Vec<FrameFailure>,
    /// Wall time in milliseconds.
    pub elapsed_ms: u128,
}

impl LoadReport {
    /// Summarises the report.
    #[must_use]
    pub fn summary(&self) -> LoadSummary {
        let sources = self.stack.sources();
        let first = sources.first().and_then(ImageName::parse);
        let last = sources.last().and_then(ImageName::parse);

        LoadSummary {
            decoder: self.decoder,
            frames: self.stack.len(),
            shape: self.stack.shape(),
            template: first.as_ref().map(|n| n.template('#')),
            first_number: first.as_ref().and_then(ImageName::number),
            last_number: last.as_ref().and_then(ImageName::number),
            stats: self.stack.stats(),
            failures: self.failures.clone(),
            elapsed_ms: self.elapsed.as_millis(),
        }
    }
}
