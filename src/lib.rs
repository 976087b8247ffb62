//! # cbf-stack
//!
//! Batch loader for CBF (Crystallographic Binary File) diffraction images.
//!
//! cbf-stack reads a text list of CBF image paths, decodes each frame through
//! CBFlib and copies the pixels into one contiguous `i32` stack, one frame
//! after another in list order.
//!
//! ## Features
//!
//! - **Runtime CBFlib binding**: `libcbf` is opened with `libloading`, so the
//!   crate builds without it
//! - **Header parsing**: detector, geometry and binary layout read natively
//! - **Memory Mapping**: large lists and headers are read through `memmap2`
//! - **Parallel decoding**: optional rayon pool with list order preserved
//!
//! ## Example
//!
//! ```no_run
//! use cbf_stack::{BatchLoader, CbfLibDecoder, LoaderConfig, read_file_list};
//!
//! let paths = read_file_list("frames.lst", false)?;
//! let loader = BatchLoader::new(CbfLibDecoder::load(None)?, LoaderConfig::default());
//! let report = loader.load(&paths)?;
//! let cube = report.stack.as_array().expect("contiguous stack");
//! assert_eq!(cube.nrows(), report.stack.len());
//! # Ok::<(), cbf_stack::Error>(())
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
// Note: unsafe is needed for memory-mapped I/O (memmap2) and the CBFlib binding
#![warn(unsafe_code)]

pub mod cbf;
pub mod cli;
pub mod core;
pub mod error;
pub mod io;
pub mod loader;

// Re-export commonly used types at crate root
pub use error::{Error, Result};

// Re-export core domain types
pub use core::{FrameShape, FrameStack, FrameStats};

// Re-export CBF types
pub use cbf::{
    ArrayParameters, CbfHeader, CbfLibDecoder, CbfLibrary, DataLocation, DecodedFrame,
    DetectorModel, FrameDecoder, ImageName, read_header,
};

// Re-export I/O helpers
pub use io::{read_file_list, write_stack_raw};

// Re-export loader types
pub use loader::{BatchLoader, ErrorPolicy, LoadReport, LoaderConfig};

// Re-export CLI types
pub use cli::{Cli, Commands, OutputFormat};
