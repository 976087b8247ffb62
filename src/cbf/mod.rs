//! CBF image access.
//!
//! The text header is parsed natively; binary image decoding goes through
//! the [`FrameDecoder`] seam, implemented by the CBFlib binding in [`ffi`].

pub mod decoder;
pub mod detector;
pub mod ffi;
pub mod header;
pub mod naming;

pub use decoder::{ArrayParameters, DataLocation, DecodedFrame, FrameDecoder};
pub use detector::DetectorModel;
pub use ffi::{CbfLibDecoder, CbfLibrary, DEFAULT_LIBRARY_NAMES};
pub use header::{BINARY_MARKER, CbfHeader, read_header};
pub use naming::{ImageName, number_gaps};
