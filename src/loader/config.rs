//! Batch loader configuration.

use crate::core::FrameShape;
use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// What to do when a frame can't be loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop at the first failing frame.
    #[default]
    Abort,
    /// Record the failure and continue with the next frame.
    Skip,
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Abort => "abort",
            Self::Skip => "skip",
        })
    }
}

impl FromStr for ErrorPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "skip" => Ok(Self::Skip),
            _ => Err(Error::Config {
                message: format!("unknown error policy: {s}"),
            }),
        }
    }
}

/// Configuration for [`BatchLoader`](crate::loader::BatchLoader).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoaderConfig {
    /// Expected frame shape; `None` adopts the first decoded frame's shape.
    pub shape: Option<FrameShape>,
    /// Failure handling.
    pub policy: ErrorPolicy,
    /// Decoder threads; 1 decodes on the calling thread.
    pub jobs: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            shape: None,
            policy: ErrorPolicy::Abort,
            jobs: 1,
        }
    }
}

impl LoaderConfig {
    /// Sets the expected frame shape.
    #[must_use]
    pub const fn with_shape(mut self, shape: FrameShape) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Sets the failure policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the number of decoder threads.
    #[must_use]
    pub const fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Checks the configuration before loading.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `jobs` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.jobs == 0 {
            return Err(Error::Config {
                message: "jobs must be > 0".to_string(),
            });
        }
        Ok(())
    }
}
