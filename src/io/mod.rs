//! I/O utilities for cbf-stack.
//!
//! File access with memory mapping, frame list parsing, and raw stack
//! export.

pub mod list;
pub mod reader;
pub mod writer;

pub use list::{parse_file_list, read_file_list};
pub use reader::{FileBytes, FileReader};
pub use writer::{StackLayout, sidecar_path, write_stack_raw};
