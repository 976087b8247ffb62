//! Raw stack export.
//!
//! Writes the stacked pixels as little-endian `i32`, frame-major, next to a
//! JSON sidecar describing the layout.

use crate::core::{FrameShape, FrameStack};
use crate::error::{IoError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Layout description written next to a raw stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackLayout {
    /// Number of frames in the file.
    pub frames: usize,
    /// Frame shape.
    pub shape: FrameShape,
    /// Element type of the raw data.
    pub dtype: String,
    /// Byte order of the raw data.
    pub byte_order: String,
    /// Source file of each frame.
    pub sources: Vec<PathBuf>,
}

impl StackLayout {
    /// Describes `stack`.
    #[must_use]
    pub fn of(stack: &FrameStack) -> Self {
        Self {
            frames: stack.len(),
            shape: stack.shape(),
            dtype: "int32".to_string(),
            byte_order: "little".to_string(),
            sources: stack.sources().to_vec(),
        }
    }
}

/// Path of the sidecar for a raw stack file.
#[must_use]
pub fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".json");
    PathBuf::from(name)
}

/// Writes `stack` to `path` and its layout to [`sidecar_path`].
///
/// Parent directories are created as needed. Returns the sidecar path.
///
/// # Errors
///
/// Returns an error if directory creation or writing fails.
pub fn write_stack_raw<P: AsRef<Path>>(stack: &FrameStack, path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    let path_str = path.to_string_lossy().to_string();
    let write_err = |e: std::io::Error| IoError::WriteFailed {
        path: path_str.clone(),
        reason: e.to_string(),
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|e| IoError::DirectoryFailed {
            path: parent.to_string_lossy().to_string(),
            reason: e.to_string(),
        })?;
    }

    let mut out = BufWriter::new(File::create(path).map_err(write_err)?);
    for value in stack.pixels() {
        out.write_all(&value.to_le_bytes()).map_err(write_err)?;
    }
    out.flush().map_err(write_err)?;

    let sidecar = sidecar_path(path);
    let layout = serde_json::to_string_pretty(&StackLayout::of(stack))?;
    std::fs::write(&sidecar, layout).map_err(|e| IoError::WriteFailed {
        path: sidecar.to_string_lossy().to_string(),
        reason: e.to_string(),
    })?;

    info!(
        path = %path_str,
        frames = stack.len(),
        shape = %stack.shape(),
        "wrote raw stack"
    );
    Ok(sidecar)
}
