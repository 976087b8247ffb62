//! Batch loading of CBF frame lists into a single stack.

pub mod batch;
pub mod config;
pub mod report;

pub use batch::BatchLoader;
pub use config::{ErrorPolicy, LoaderConfig};
pub use report::{FrameFailure, LoadReport, LoadSummary};
