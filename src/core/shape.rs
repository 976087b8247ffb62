//! Frame geometry.

use crate::error::{FrameError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Width and height of a detector frame in pixels.
///
/// The width is the fastest-varying dimension of the decoded array.
///
/// # Examples
///
/// ```
/// use cbf_stack::core::FrameShape;
///
/// let shape: FrameShape = "1475x1679".parse().unwrap();
/// assert_eq!(shape.pixel_count(), 1475 * 1679);
/// assert_eq!(shape.to_string(), "1475x1679");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameShape {
    /// Pixels along the fast axis.
    pub width: usize,
    /// Pixels along the slow axis.
    pub height: usize,
}

impl FrameShape {
    /// Creates a shape, rejecting zero dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::InvalidShape`] if either dimension is zero and
    /// [`FrameError::TooLarge`] if the pixel count overflows `usize`.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(FrameError::InvalidShape { width, height }.into());
        }
        if width.checked_mul(height).is_none() {
            return Err(FrameError::TooLarge { width, height }.into());
        }
        Ok(Self { width, height })
    }

    /// Total pixels in one frame.
    ///
    /// Saturates for shapes built field by field that bypass [`Self::new`].
    #[must_use]
    pub const fn pixel_count(&self) -> usize {
        self.width.saturating_mul(self.height)
    }
}

impl fmt::Display for FrameShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for FrameShape {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        let syntax = || FrameError::ShapeSyntax {
            input: s.to_string(),
        };
        let (w, h) = s
            .trim()
            .split_once(['x', 'X', ','])
            .ok_or_else(syntax)?;
        let width = w.trim().parse::<usize>().map_err(|_| syntax())?;
        let height = h.trim().parse::<usize>().map_err(|_| syntax())?;
        Self::new(width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("1475x1679", 1475, 1679 ; "lowercase separator")]
    #[test_case("2463X2527", 2463, 2527 ; "uppercase separator")]
    #[test_case(" 2070 , 2167 ", 2070, 2167 ; "comma with spaces")]
    fn test_parse_shape(input: &str, width: usize, height: usize) {
        let shape: FrameShape = input.parse().unwrap();
        assert_eq!(shape, FrameShape { width, height });
    }

    #[test_case("1475" ; "single number")]
    #[test_case("axb" ; "not numeric")]
    #[test_case("0x10" ; "zero width")]
    #[test_case("10x0" ; "zero height")]
    #[test_case("-1x10" ; "negative")]
    fn test_parse_shape_rejects(input: &str) {
        assert!(input.parse::<FrameShape>().is_err());
    }

    #[test]
    fn test_overflowing_shape_rejected() {
        let err = FrameShape::new(usize::MAX, 2).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Frame(FrameError::TooLarge { height: 2, .. })
        ));
        assert!(format!("{}x{}", usize::MAX / 2, 3).parse::<FrameShape>().is_err());
        assert!(FrameShape::new(usize::MAX, 1).is_ok());
    }

    #[test]
    fn test_pixel_count_saturates_for_unchecked_shapes() {
        let shape = FrameShape {
            width: usize::MAX,
            height: 4,
        };
        assert_eq!(shape.pixel_count(), usize::MAX);
    }

    #[test]
    fn test_pixel_count_and_display() {
        let shape = FrameShape::new(3, 2).unwrap();
        assert_eq!(shape.pixel_count(), 6);
        assert_eq!(shape.to_string(), "3x2");
    }
}
