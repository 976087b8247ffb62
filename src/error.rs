//! Error types for cbf-stack operations.
//!
//! This module provides the error hierarchy using `thiserror` for list
//! parsing, file access, CBFlib calls, frame assembly and CLI commands.

use thiserror::Error;

/// Result type alias for cbf-stack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors (file operations).
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Frame list errors.
    #[error("frame list error: {0}")]
    List(#[from] ListError),

    /// CBF parsing or CBFlib errors.
    #[error("CBF error: {0}")]
    Cbf(#[from] CbfError),

    /// Frame buffer errors.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Batch loading errors.
    #[error("loader error: {0}")]
    Loader(#[from] LoaderError),

    /// CLI command errors.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// Configuration errors.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

/// I/O-specific errors for file operations.
#[derive(Error, Debug)]
pub enum IoError {
    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path to the file that was not found.
        path: String,
    },

    /// Failed to read file.
    #[error("failed to read file: {path}: {reason}")]
    ReadFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Failed to write file.
    #[error("failed to write file: {path}: {reason}")]
    WriteFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Memory mapping error.
    #[error("memory mapping failed: {path}: {reason}")]
    MmapFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Directory creation error.
    #[error("failed to create directory: {path}: {reason}")]
    DirectoryFailed {
        /// Path to the directory.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Generic I/O error wrapper.
    #[error("I/O error: {0}")]
    Generic(String),
}

/// Errors raised while reading the frame list.
#[derive(Error, Debug)]
pub enum ListError {
    /// The list contains no paths.
    #[error("frame list is empty: {path}")]
    Empty {
        /// Path to the list file.
        path: String,
    },

    /// A line is not valid UTF-8.
    #[error("invalid UTF-8 on line {line} of {path}")]
    InvalidUtf8 {
        /// Path to the list file.
        path: String,
        /// One-based line number.
        line: usize,
    },
}

/// CBF header and CBFlib errors.
#[derive(Error, Debug)]
pub enum CbfError {
    /// The shared library could not be opened.
    #[error("CBFlib unavailable (tried {tried}): {reason}")]
    LibraryUnavailable {
        /// Library names that were tried.
        tried: String,
        /// Loader error for the last candidate.
        reason: String,
    },

    /// A required symbol is missing from the library.
    #[error("CBFlib symbol missing: {symbol}: {reason}")]
    MissingSymbol {
        /// Symbol name.
        symbol: &'static str,
        /// Loader error.
        reason: String,
    },

    /// A CBFlib call returned a non-zero status.
    #[error("{function} failed for {path} (code {code:#x})")]
    Call {
        /// CBFlib function name.
        function: &'static str,
        /// Frame path.
        path: String,
        /// Status code returned by CBFlib.
        code: i32,
    },

    /// `fopen` on the frame failed.
    #[error("couldn't open {path}: {reason}")]
    Open {
        /// Frame path.
        path: String,
        /// OS error.
        reason: String,
    },

    /// The selected value is not a binary section.
    #[error("unable to find binary image in {path} (value type {found:?})")]
    NotBinary {
        /// Frame path.
        path: String,
        /// Value type reported by CBFlib.
        found: String,
    },

    /// Fewer elements were decoded than announced.
    #[error("short read in {path}: {read} of {expected} elements")]
    ShortRead {
        /// Frame path.
        path: String,
        /// Elements decoded.
        read: usize,
        /// Elements announced by the array parameters.
        expected: usize,
    },

    /// The file does not look like a CBF image.
    #[error("not a CBF image: {path}")]
    NotCbf {
        /// File path.
        path: String,
    },

    /// Path contains an interior NUL byte.
    #[error("path cannot be passed to CBFlib: {path}")]
    InvalidPath {
        /// Offending path.
        path: String,
    },
}

/// Frame buffer errors.
#[derive(Error, Debug)]
pub enum FrameError {
    /// Shape has a zero dimension.
    #[error("raw image must be 2D in pixels, got {width}x{height}")]
    InvalidShape {
        /// Width in pixels.
        width: usize,
        /// Height in pixels.
        height: usize,
    },

    /// Pixel count of the shape does not fit in memory addressing.
    #[error("frame {width}x{height} has too many pixels")]
    TooLarge {
        /// Width in pixels.
        width: usize,
        /// Height in pixels.
        height: usize,
    },

    /// Shape string could not be parsed.
    #[error("invalid frame shape {input:?}, expected WIDTHxHEIGHT")]
    ShapeSyntax {
        /// Input string.
        input: String,
    },

    /// Pixel array length differs from the stack shape.
    #[error("frame has {actual} pixels, stack expects {expected}")]
    LengthMismatch {
        /// Expected pixel count.
        expected: usize,
        /// Actual pixel count.
        actual: usize,
    },

    /// Decoded dimensions differ from the stack shape.
    #[error("frame is {actual}, stack expects {expected}")]
    ShapeMismatch {
        /// Expected shape.
        expected: String,
        /// Decoded shape.
        actual: String,
    },
}

/// Batch loading errors.
#[derive(Error, Debug)]
pub enum LoaderError {
    /// Every frame failed under the skip policy.
    #[error("no frames could be loaded ({failed} failed)")]
    NoFrames {
        /// Number of failed frames.
        failed: usize,
    },

    /// Worker pool could not be built.
    #[error("worker pool failed: {reason}")]
    Pool {
        /// Reason for failure.
        reason: String,
    },

    /// Aborted at a frame.
    #[error("frame {index} ({path}) failed: {source}")]
    FrameFailed {
        /// Frame index in the list.
        index: usize,
        /// Frame path.
        path: String,
        /// Underlying error.
        source: Box<Error>,
    },
}

/// CLI command-specific errors.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Invalid argument provided.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Output format error.
    #[error("output format error: {0}")]
    OutputFormat(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(IoError::Generic(err.to_string()))
    }
}

impl From<serde_json::Error> for CommandError {
    fn from(err: serde_json::Error) -> Self {
        Self::OutputFormat(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Command(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_config() {
        let err = Error::Config {
            message: "bad config".to_string(),
        };
        assert_eq!(err.to_string(), "configuration error: bad config");
    }

    #[test]
    fn test_io_error_display() {
        let err = IoError::FileNotFound {
            path: "/tmp/frames.lst".to_string(),
        };
        assert_eq!(err.to_string(), "file not found: /tmp/frames.lst");
    }

    #[test]
    fn test_list_error_display() {
        let err = ListError::Empty {
            path: "frames.lst".to_string(),
        };
        assert_eq!(err.to_string(), "frame list is empty: frames.lst");

        let err = ListError::InvalidUtf8 {
            path: "frames.lst".to_string(),
            line: 3,
        };
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_cbf_call_error_display() {
        let err = CbfError::Call {
            function: "cbf_find_category",
            path: "img_0001.cbf".to_string(),
            code: 0x40,
        };
        assert_eq!(
            err.to_string(),
            "cbf_find_category failed for img_0001.cbf (code 0x40)"
        );
    }

    #[test]
    fn test_cbf_error_variants() {
        let err = CbfError::NotBinary {
            path: "a.cbf".to_string(),
            found: "word".to_string(),
        };
        assert!(err.to_string().contains("unable to find binary image"));

        let err = CbfError::ShortRead {
            path: "a.cbf".to_string(),
            read: 10,
            expected: 20,
        };
        assert!(err.to_string().contains("10 of 20"));

        let err = CbfError::LibraryUnavailable {
            tried: "libcbf.so".to_string(),
            reason: "not found".to_string(),
        };
        assert!(err.to_string().contains("libcbf.so"));
    }

    #[test]
    fn test_frame_error_display() {
        let err = FrameError::InvalidShape {
            width: 0,
            height: 1679,
        };
        assert_eq!(
            err.to_string(),
            "raw image must be 2D in pixels, got 0x1679"
        );

        let err = FrameError::LengthMismatch {
            expected: 4,
            actual: 3,
        };
        assert!(err.to_string().contains("3 pixels"));
    }

    #[test]
    fn test_loader_frame_failed_display() {
        let err = LoaderError::FrameFailed {
            index: 2,
            path: "c.cbf".to_string(),
            source: Box::new(
                CbfError::NotCbf {
                    path: "c.cbf".to_string(),
                }
                .into(),
            ),
        };
        let msg = err.to_string();
        assert!(msg.contains("frame 2"));
        assert!(msg.contains("not a CBF image"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_from_sub_enums() {
        let err: Error = FrameError::ShapeSyntax {
            input: "abc".to_string(),
        }
        .into();
        assert!(matches!(err, Error::Frame(_)));

        let err: Error = LoaderError::NoFrames { failed: 3 }.into();
        assert!(matches!(err, Error::Loader(_)));

        let err: Error = CommandError::InvalidArgument("--jobs".to_string()).into();
        assert!(matches!(err, Error::Command(_)));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err: serde_json::Error = serde_json::from_str::<i32>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Command(CommandError::OutputFormat(_))));
    }
}
