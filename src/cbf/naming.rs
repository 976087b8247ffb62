//! Image file naming conventions.
//!
//! Frame files are named `<prefix><separator><number>.<suffix>`, e.g.
//! `ref-lyso_1_0042.cbf` has prefix `ref-lyso_1`, separator `_`, number 42.

use regex::Regex;
use serde::Serialize;
use std::path::Path;
use std::sync::OnceLock;

/// Components of a frame file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageName {
    /// Everything before the separator.
    pub prefix: String,
    /// Non-digit character preceding the frame number.
    pub separator: String,
    /// Frame number digits, as written.
    pub digits: String,
    /// Extension without the dot.
    pub suffix: String,
}

impl ImageName {
    /// Splits the file name of `path`.
    ///
    /// # Examples
    ///
    /// ```
    /// use cbf_stack::cbf::ImageName;
    ///
    /// let name = ImageName::parse("/data/ref-lyso_1_0042.cbf").unwrap();
    /// assert_eq!(name.number(), Some(42));
    /// assert_eq!(name.template('#'), "ref-lyso_1_####.cbf");
    /// ```
    #[must_use]
    pub fn parse<P: AsRef<Path>>(path: P) -> Option<Self> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let re = PATTERN
            .get_or_init(|| Regex::new(r"^(.*)([^0-9])([0-9]*)\.(.*)$").expect("valid regex"));

        let file_name = path.as_ref().file_name()?.to_str()?;
        let caps = re.captures(file_name)?;
        Some(Self {
            prefix: caps[1].to_string(),
            separator: caps[2].to_string(),
            digits: caps[3].to_string(),
            suffix: caps[4].to_string(),
        })
    }

    /// Frame number, if the name carries one.
    #[must_use]
    pub fn number(&self) -> Option<u64> {
        self.digits.parse().ok()
    }

    /// Name with the frame number replaced by `symbol` repeated.
    #[must_use]
    pub fn template(&self, symbol: char) -> String {
        let hashes: String = std::iter::repeat_n(symbol, self.digits.len()).collect();
        format!(
            "{}{}{}.{}",
            self.prefix, self.separator, hashes, self.suffix
        )
    }
}

/// Finds frame numbers missing between consecutive entries.
///
/// Returns `(previous, next)` pairs where `next` doesn't follow `previous`. Paths
/// without a frame number are ignored.
#[must_use]
pub fn number_gaps<P: AsRef<Path>>(paths: &[P]) -> Vec<(u64, u64)> {
    let numbers: Vec<u64> = paths
        .iter()
        .filter_map(|p| ImageName::parse(p).and_then(|n| n.number()))
        .collect();
    numbers
        .windows(2)
        .filter(|w| w[0].checked_add(1) != Some(w[1]))
        .map(|w| (w[0], w[1]))
        .collect()
}
