//! Known detector models and their frame geometry.

use crate::core::FrameShape;
use serde::Serialize;

/// Area detectors whose frame geometry is known in advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DetectorModel {
    /// PILATUS 2M / 3M family.
    Pilatus2M,
    /// PILATUS 6M family.
    Pilatus6M,
    /// EIGER 4M.
    Eiger4M,
}

impl DetectorModel {
    /// Recognises a model from a header `Detector:` description.
    ///
    /// # Examples
    ///
    /// ```
    /// use cbf_stack::cbf::DetectorModel;
    ///
    /// let model = DetectorModel::from_description("PILATUS3 6M, S/N 60-0128").unwrap();
    /// assert_eq!(model.shape().width, 2463);
    /// assert!(DetectorModel::from_description("ADSC Q315").is_none());
    /// ```
    #[must_use]
    pub fn from_description(description: &str) -> Option<Self> {
        let d = description.to_ascii_uppercase();
        if ["PILATUS 3M", "PILATUS3 2M", "PILATUS 2M", "PILATUS2 3M"]
            .iter()
            .any(|m| d.contains(m))
        {
            Some(Self::Pilatus2M)
        } else if d.contains("PILATUS 6M") || d.contains("PILATUS3 6M") {
            Some(Self::Pilatus6M)
        } else if d.contains("EIGER 4M") {
            Some(Self::Eiger4M)
        } else {
            None
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pilatus2M => "PILATUS2 3M",
            Self::Pilatus6M => "PILATUS2 6M",
            Self::Eiger4M => "EIGER 4M",
        }
    }

    /// Short type tag.
    #[must_use]
    pub const fn kind(self) -> &'static str {
        match self {
            Self::Pilatus2M => "pilatus2m",
            Self::Pilatus6M => "pilatus6m",
            Self::Eiger4M => "eiger4m",
        }
    }

    /// Frame geometry.
    #[must_use]
    pub const fn shape(self) -> FrameShape {
        let (width, height) = match self {
            Self::Pilatus2M => (1475, 1679),
            Self::Pilatus6M => (2463, 2527),
            Self::Eiger4M => (2070, 2167),
        };
        FrameShape { width, height }
    }
}
