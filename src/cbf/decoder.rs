//! Frame decoder trait definition.
//!
//! A decoder turns one CBF file into its integer pixel array. The batch
//! loader only talks to this trait, so the CBFlib binding can be swapped
//! for another backend or a test double.

use crate::core::FrameShape;
use crate::error::Result;
use serde::Serialize;
use std::path::Path;

/// CBFlib compression identifiers (`CBF_*` in `cbf.h`).
const COMPRESSIONS: &[(u32, &str)] = &[
    (0x0010, "x-CBF_INTEGER"),
    (0x0020, "x-CBF_FLOAT"),
    (0x0040, "none"),
    (0x0050, "x-CBF_CANONICAL"),
    (0x0060, "x-CBF_PACKED"),
    (0x0070, "x-CBF_BYTE_OFFSET"),
    (0x0080, "x-CBF_PREDICTOR"),
    (0x0090, "x-CBF_PACKED_V2"),
    (0x00A0, "x-CBF_NIBBLE_OFFSET"),
];

/// Where the image lives inside the CBF data block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataLocation {
    /// Category holding the binary array.
    pub category: String,
    /// Column holding the binary array.
    pub column: String,
    /// Row to select.
    pub row: u32,
}

impl Default for DataLocation {
    fn default() -> Self {
        Self {
            category: "array_data".to_string(),
            column: "data".to_string(),
            row: 0,
        }
    }
}

/// Integer array parameters reported by CBFlib for a binary section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArrayParameters {
    /// Compression identifier.
    pub compression: u32,
    /// Binary section id.
    pub binary_id: i32,
    /// Stored element size in bytes.
    pub element_size: usize,
    /// Elements are signed.
    pub signed: bool,
    /// Elements are unsigned.
    pub unsigned: bool,
    /// Number of elements.
    pub elements: usize,
    /// Smallest element.
    pub min_element: i32,
    /// Largest element.
    pub max_element: i32,
    /// Byte order, e.g. `little_endian`.
    pub byte_order: String,
    /// Fastest-varying dimension.
    pub dim_fast: usize,
    /// Middle dimension.
    pub dim_mid: usize,
    /// Slowest dimension (1 or 0 for 2D images).
    pub dim_slow: usize,
    /// Padding after the binary data.
    pub padding: usize,
}

impl ArrayParameters {
    /// Frame shape described by the fast and middle dimensions.
    #[must_use]
    pub fn shape(&self) -> Option<FrameShape> {
        FrameShape::new(self.dim_fast, self.dim_mid).ok()
    }

    /// Name of the compression scheme.
    #[must_use]
    pub fn compression_name(&self) -> &'static str {
        // Flag bits above the low byte (e.g. CBF_UNCORRELATED_SECTIONS)
        // don't change the scheme.
        let scheme = self.compression & 0x00FF;
        COMPRESSIONS
            .iter()
            .find(|(id, _)| *id == scheme)
            .map_or("unknown", |&(_, name)| name)
    }
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Pixels, fastest dimension first.
    pub pixels: Vec<i32>,
    /// Array parameters of the binary section.
    pub params: ArrayParameters,
}

/// Trait for decoding CBF files into pixel arrays.
///
/// Implementations must be `Send + Sync` so frames can be decoded on a
/// worker pool.
pub trait FrameDecoder: Send + Sync {
    /// Decodes the frame stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be opened or decoded.
    fn decode(&self, path: &Path) -> Result<DecodedFrame>;

    /// Returns the name of the decoder backend.
    fn name(&self) -> &'static str;
}
