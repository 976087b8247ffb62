//! Contiguous multi-frame pixel buffer.
//!
//! A [`FrameStack`] holds every loaded frame back to back in one `Vec<i32>`,
//! so frame `i` occupies `pixels[i * n..(i + 1) * n]` where `n` is the
//! frame's pixel count.

use crate::core::FrameShape;
use crate::error::{FrameError, Result};
use ndarray::{ArrayView2, ShapeError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Stack of equally shaped integer frames.
///
/// # Examples
///
/// ```
/// use cbf_stack::core::{FrameShape, FrameStack};
///
/// let shape = FrameShape::new(2, 2).unwrap();
/// let mut stack = FrameStack::with_capacity(shape, 1);
/// stack.push_frame("a.cbf", &[1, 2, 3, 4]).unwrap();
/// assert_eq!(stack.frame(0), Some(&[1, 2, 3, 4][..]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameStack {
    shape: FrameShape,
    pixels: Vec<i32>,
    sources: Vec<PathBuf>,
}

/// Summary statistics of one frame or of a whole stack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameStats {
    /// Smallest pixel value.
    pub min: i32,
    /// Largest pixel value.
    pub max: i32,
    /// Sum of all pixel values.
    pub sum: i64,
    /// Mean pixel value.
    pub mean: f64,
}

impl FrameStats {
    #[allow(clippy::cast_precision_loss)]
    fn from_pixels(pixels: &[i32]) -> Option<Self> {
        let first = *pixels.first()?;
        let (min, max, sum) = pixels
            .iter()
            .fold((first, first, 0_i64), |(min, max, sum), &p| {
                (min.min(p), max.max(p), sum + i64::from(p))
            });
        Some(Self {
            min,
            max,
            sum,
            mean: sum as f64 / pixels.len() as f64,
        })
    }
}

impl FrameStack {
    /// Creates an empty stack with room for `frames` frames.
    ///
    /// If that much memory can't be reserved up front the buffer starts
    /// empty and grows as frames are pushed.
    #[must_use]
    pub fn with_capacity(shape: FrameShape, frames: usize) -> Self {
        let mut pixels = Vec::new();
        let mut sources = Vec::new();
        let reserved = shape
            .pixel_count()
            .checked_mul(frames)
            .is_some_and(|total| pixels.try_reserve_exact(total).is_ok())
            && sources.try_reserve_exact(frames).is_ok();
        if !reserved {
            debug!(frames, shape = %shape, "stack preallocation failed, growing on demand");
        }
        Self {
            shape,
            pixels,
            sources,
        }
    }

    /// Appends one decoded frame.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::LengthMismatch`] if `pixels` does not hold
    /// exactly one frame of the stack's shape.
    pub fn push_frame<P: AsRef<Path>>(&mut self, source: P, pixels: &[i32]) -> Result<usize> {
        let expected = self.shape.pixel_count();
        if pixels.len() != expected {
            return Err(FrameError::LengthMismatch {
                expected,
                actual: pixels.len(),
            }
            .into());
        }
        self.pixels.extend_from_slice(pixels);
        self.sources.push(source.as_ref().to_path_buf());
        Ok(self.sources.len() - 1)
    }

    /// Shape shared by every frame.
    #[must_use]
    pub const fn shape(&self) -> FrameShape {
        self.shape
    }

    /// Number of frames stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Returns true if no frame has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Source path of each frame, in frame order.
    #[must_use]
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// All pixels, frame-major.
    #[must_use]
    pub fn pixels(&self) -> &[i32] {
        &self.pixels
    }

    /// Flattened pixels of frame `index`.
    #[must_use]
    pub fn frame(&self, index: usize) -> Option<&[i32]> {
        let n = self.shape.pixel_count();
        let start = index.checked_mul(n)?;
        self.pixels.get(start..start.checked_add(n)?)
    }

    /// Views the stack as a `frames x pixels` array.
    ///
    /// # Errors
    ///
    /// Returns an error only if the buffer and shape disagree, which
    /// `push_frame` prevents.
    pub fn as_array(&self) -> std::result::Result<ArrayView2<'_, i32>, ShapeError> {
        ArrayView2::from_shape((self.len(), self.shape.pixel_count()), &self.pixels)
    }

    /// Views frame `index` as a `height x width` array.
    #[must_use]
    pub fn frame_view(&self, index: usize) -> Option<ArrayView2<'_, i32>> {
        let frame = self.frame(index)?;
        ArrayView2::from_shape((self.shape.height, self.shape.width), frame).ok()
    }

    /// Statistics of frame `index`.
    #[must_use]
    pub fn frame_stats(&self, index: usize) -> Option<FrameStats> {
        self.frame(index).and_then(FrameStats::from_pixels)
    }

    /// Statistics over every pixel of every frame.
    #[must_use]
    pub fn stats(&self) -> Option<FrameStats> {
        FrameStats::from_pixels(&self.pixels)
    }

    /// Consumes the stack and returns the raw pixel buffer.
    #[must_use]
    pub fn into_pixels(self) -> Vec<i32> {
        self.pixels
    }
}
