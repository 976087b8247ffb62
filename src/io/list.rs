//! Frame list parsing.
//!
//! A frame list is a plain text file with one CBF path per line. Only the
//! first whitespace-separated token of a line is used, so trailing
//! comments or columns written by other tools are ignored.

use crate::error::{ListError, Result};
use crate::io::FileReader;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Parses frame paths out of list text.
///
/// Blank lines are skipped. `\r\n` line endings are accepted.
///
/// # Examples
///
/// ```
/// use cbf_stack::io::parse_file_list;
/// use std::path::PathBuf;
///
/// let paths = parse_file_list("a_0001.cbf\n\n  b_0002.cbf  extra\n");
/// assert_eq!(paths, vec![PathBuf::from("a_0001.cbf"), PathBuf::from("b_0002.cbf")]);
/// ```
#[must_use]
pub fn parse_file_list(text: &str) -> Vec<PathBuf> {
    text.lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(PathBuf::from)
        .collect()
}

/// Reads a frame list file.
///
/// When `relative_to_list` is true, relative entries are resolved against
/// the directory containing the list instead of the working directory.
///
/// # Errors
///
/// Returns an error if the list can't be read, a line is not UTF-8, or the
/// list holds no paths.
pub fn read_file_list<P: AsRef<Path>>(path: P, relative_to_list: bool) -> Result<Vec<PathBuf>> {
    let path = path.as_ref();
    let path_str = path.to_string_lossy().to_string();
    let bytes = FileReader::open(path)?.bytes()?;

    let mut text = String::with_capacity(bytes.len());
    for (index, line) in bytes.split(|&b| b == b'\n').enumerate() {
        let line = std::str::from_utf8(line).map_err(|_| ListError::InvalidUtf8 {
            path: path_str.clone(),
            line: index + 1,
        })?;
        text.push_str(line);
        text.push('\n');
    }

    let mut paths = parse_file_list(&text);
    if paths.is_empty() {
        return Err(ListError::Empty { path: path_str }.into());
    }

    if relative_to_list && let Some(base) = path.parent() {
        for entry in &mut paths {
            if entry.is_relative() {
                *entry = base.join(&*entry);
            }
        }
    }

    debug!(list = %path_str, frames = paths.len(), "read frame list");
    Ok(paths)
}
