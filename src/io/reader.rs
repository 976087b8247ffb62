//! File reading utilities with memory mapping support.
//!
//! Frame files are typically several megabytes; only their text header is
//! inspected here, so large files are mapped instead of copied.

// Memory mapping requires unsafe but is well-documented and safe for read-only access
#![allow(unsafe_code)]

use crate::error::{IoError, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io::Read;
use std::ops::Deref;
use std::path::Path;

/// Threshold for using memory mapping (1MB). Also keeps empty files, which
/// can't be mapped on every platform, on the read path.
const MMAP_THRESHOLD: u64 = 1024 * 1024;

/// Maximum file size to open (4GB).
const MAX_FILE_SIZE: u64 = 4 * 1024 * 1024 * 1024;

/// File reader with support for memory mapping.
///
/// Automatically chooses the reading strategy based on file size:
/// - Small files (< 1MB): Read directly into memory
/// - Large files (>= 1MB): Use memory mapping
///
/// # Examples
///
/// ```no_run
/// use cbf_stack::io::FileReader;
///
/// let reader = FileReader::open("frame_0001.cbf").unwrap();
/// let bytes = reader.bytes().unwrap();
/// assert!(bytes.starts_with(b"###CBF"));
/// ```
pub struct FileReader {
    /// File handle.
    file: File,
    /// File size in bytes.
    size: u64,
    /// File path for error messages.
    path: String,
}

/// Bytes of a file, either mapped or read into memory.
pub enum FileBytes {
    /// Memory-mapped contents.
    Mapped(Mmap),
    /// Contents read into a buffer.
    Owned(Vec<u8>),
}

impl Deref for FileBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Self::Mapped(mmap) => &mmap[..],
            Self::Owned(bytes) => bytes.as_slice(),
        }
    }
}

impl FileReader {
    /// Opens a file for reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the file doesn't exist or can't be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_string_lossy().to_string();

        if !path_ref.exists() {
            return Err(IoError::FileNotFound { path: path_str }.into());
        }

        let file = File::open(path_ref).map_err(|e| IoError::ReadFailed {
            path: path_str.clone(),
            reason: e.to_string(),
        })?;

        let metadata = file.metadata().map_err(|e| IoError::ReadFailed {
            path: path_str.clone(),
            reason: e.to_string(),
        })?;

        let size = metadata.len();

        if size > MAX_FILE_SIZE {
            return Err(IoError::ReadFailed {
                path: path_str,
                reason: format!("file too large: {size} bytes (max: {MAX_FILE_SIZE} bytes)"),
            }
            .into());
        }

        Ok(Self {
            file,
            size,
            path: path_str,
        })
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the file contents, mapped for large files.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or mapping fails.
    pub fn bytes(&self) -> Result<FileBytes> {
        if self.size >= MMAP_THRESHOLD {
            self.mmap().map(FileBytes::Mapped)
        } else {
            self.read_direct_bytes().map(FileBytes::Owned)
        }
    }

    /// Reads bytes directly into memory.
    #[allow(clippy::cast_possible_truncation)]
    fn read_direct_bytes(&self) -> Result<Vec<u8>> {
        let mut file = &self.file;
        let mut buffer = Vec::with_capacity(self.size as usize);
        file.read_to_end(&mut buffer)
            .map_err(|e| IoError::ReadFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        Ok(buffer)
    }

    /// Creates a memory-mapped view of the file.
    ///
    /// # Errors
    ///
    /// Returns an error if memory mapping fails.
    pub fn mmap(&self) -> Result<Mmap> {
        // Safety: We're only reading from the file
        unsafe {
            Mmap::map(&self.file).map_err(|e| {
                IoError::MmapFailed {
                    path: self.path.clone(),
                    reason: e.to_string(),
                }
                .into()
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_small_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("small.txt");
        std::fs::write(&file_path, "frame_0001.cbf\n").unwrap();

        let reader = FileReader::open(&file_path).unwrap();
        assert_eq!(reader.size(), 15);
        assert!(reader.path().contains("small.txt"));
        let bytes = reader.bytes().unwrap();
        assert!(matches!(bytes, FileBytes::Owned(_)));
        assert_eq!(&*bytes, b"frame_0001.cbf\n");
    }

    #[test]
    fn test_open_nonexistent_file() {
        let result = FileReader::open("/nonexistent/path/frame.cbf");
        assert!(matches!(
            result,
            Err(crate::Error::Io(IoError::FileNotFound { .. }))
        ));
    }

    #[test]
    fn test_large_file_is_mapped() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("large.bin");
        let content: Vec<u8> = (0..255u8).cycle().take(1024 * 1024 + 100).collect();
        std::fs::write(&file_path, &content).unwrap();

        let reader = FileReader::open(&file_path).unwrap();
        assert!(reader.size() >= MMAP_THRESHOLD);
        let bytes = reader.bytes().unwrap();
        assert!(matches!(bytes, FileBytes::Mapped(_)));
        assert_eq!(bytes.len(), content.len());
        assert_eq!(&bytes[..4], &[0, 1, 2, 3]);
    }

    #[test]
    fn test_binary_bytes_preserved() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("bytes.bin");
        std::fs::write(&file_path, b"\x0c\x1a\x04\xd5payload").unwrap();

        let reader = FileReader::open(&file_path).unwrap();
        assert_eq!(&*reader.bytes().unwrap(), b"\x0c\x1a\x04\xd5payload");
    }

    #[test]
    fn test_read_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("empty.lst");
        std::fs::write(&file_path, "").unwrap();

        let reader = FileReader::open(&file_path).unwrap();
        assert!(reader.bytes().unwrap().is_empty());
    }
}
