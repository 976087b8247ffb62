//! Mini-CBF text header reader.
//!
//! Area detectors write acquisition metadata as `# Key value` lines inside
//! the `_array_data.header_contents` text field, followed by a MIME block
//! that announces the binary section. Both are plain text and are read
//! here; the binary section itself is left to CBFlib.

use crate::cbf::DetectorModel;
use crate::core::FrameShape;
use crate::error::{CbfError, Result};
use crate::io::FileReader;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{trace, warn};

/// Byte sequence that starts the binary section.
pub const BINARY_MARKER: [u8; 4] = [0x0c, 0x1a, 0x04, 0xd5];

/// Bytes scanned when no binary marker is present.
const HEADER_SCAN_LIMIT: usize = 64 * 1024;

/// Photon energy (eV) times wavelength (Å).
const ENERGY_WAVELENGTH_PRODUCT: f64 = 12398.0;

/// Parsed CBF header.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CbfHeader {
    /// File the header was read from.
    pub path: Option<PathBuf>,
    /// Detector description, e.g. `PILATUS 6M, S/N 60-0100`.
    pub detector: Option<String>,
    /// Acquisition timestamp as written by the detector.
    pub date: Option<String>,
    /// Pixel size along x and y in metres.
    pub pixel_size: Option<(f64, f64)>,
    /// Exposure time in seconds.
    pub exposure_time: Option<f64>,
    /// Wavelength in Ångström.
    pub wavelength: Option<f64>,
    /// Sample-to-detector distance in metres.
    pub detector_distance: Option<f64>,
    /// Beam centre in pixels.
    pub beam_xy: Option<(f64, f64)>,
    /// Rotation start in degrees.
    pub start_angle: Option<f64>,
    /// Rotation width per frame in degrees.
    pub angle_increment: Option<f64>,
    /// Binary compression scheme, e.g. `x-CBF_BYTE_OFFSET`.
    pub conversions: Option<String>,
    /// Element type of the binary section.
    pub element_type: Option<String>,
    /// Number of elements in the binary section.
    pub elements: Option<usize>,
    /// Fastest-varying binary dimension.
    pub fast_dimension: Option<usize>,
    /// Second binary dimension.
    pub second_dimension: Option<usize>,
    /// Binary padding in bytes.
    pub padding: Option<usize>,
    /// Every `# Key value` line, key without trailing colon.
    pub fields: BTreeMap<String, String>,
}

impl CbfHeader {
    /// Parses a header from the start of a CBF file.
    ///
    /// # Errors
    ///
    /// Returns [`CbfError::NotCbf`] if the bytes carry neither a CBF
    /// signature nor an `_array_data` block.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let marker = find_marker(bytes);
        let end = marker.unwrap_or_else(|| bytes.len().min(HEADER_SCAN_LIMIT));
        let text = String::from_utf8_lossy(&bytes[..end]);

        if marker.is_none() && !text.starts_with("###CBF") && !text.contains("_array_data") {
            return Err(CbfError::NotCbf {
                path: String::new(),
            }
            .into());
        }

        let mut header = Self::default();
        for line in text.lines() {
            let line = line.trim_end_matches('\r');
            if let Some(body) = line.strip_prefix('#') {
                // `###CBF: VERSION` banner
                if body.starts_with('#') {
                    continue;
                }
                header.apply_comment(body.trim());
            } else if let Some((key, value)) = line.split_once(':') {
                if header.apply_mime(key.trim(), value.trim()) {
                    break;
                }
            } else if let Some(conversions) = conversions_of(line) {
                header.conversions = Some(conversions);
            }
        }
        Ok(header)
    }

    /// Handles one `# ...` header line.
    fn apply_comment(&mut self, body: &str) {
        if body.is_empty() {
            return;
        }
        if is_timestamp(body) {
            self.date = Some(body.to_string());
            return;
        }

        let (key, value) = body.split_once(char::is_whitespace).unwrap_or((body, ""));
        let key = key.trim_end_matches(':');
        let value = value.trim();
        self.fields.insert(key.to_string(), value.to_string());

        match key {
            "Detector" => self.detector = Some(value.to_string()),
            "Pixel_size" => {
                // "172e-6 m x 172e-6 m"
                let tokens: Vec<&str> = value.split_whitespace().collect();
                let x = tokens.first().and_then(|t| number(key, t));
                let y = tokens.get(3).and_then(|t| number(key, t));
                self.pixel_size = x.map(|x| (x, y.unwrap_or(x)));
            }
            "Exposure_time" => self.exposure_time = first_number(key, value),
            "Wavelength" => self.wavelength = first_number(key, value),
            "Detector_distance" => self.detector_distance = first_number(key, value),
            "Beam_xy" => self.beam_xy = beam_xy_of(value),
            "Start_angle" => self.start_angle = first_number(key, value),
            "Angle_increment" => self.angle_increment = first_number(key, value),
            _ => trace!(key, "unhandled header field"),
        }
    }

    /// Handles one MIME `Key: value` line. Returns true at the end of the
    /// MIME block.
    fn apply_mime(&mut self, key: &str, value: &str) -> bool {
        let value = value.trim_matches('"');
        match key {
            "Content-Type" => {
                if let Some(conversions) = conversions_of(value) {
                    self.conversions = Some(conversions);
                }
            }
            "X-Binary-Element-Type" => self.element_type = Some(value.to_string()),
            "X-Binary-Number-of-Elements" => self.elements = integer(key, value),
            "X-Binary-Size-Fastest-Dimension" => self.fast_dimension = integer(key, value),
            "X-Binary-Size-Second-Dimension" => self.second_dimension = integer(key, value),
            "X-Binary-Size-Padding" => {
                self.padding = integer(key, value);
                return true;
            }
            _ => {}
        }
        false
    }

    /// Frame shape announced by the binary dimensions.
    #[must_use]
    pub fn shape(&self) -> Option<FrameShape> {
        FrameShape::new(self.fast_dimension?, self.second_dimension?).ok()
    }

    /// Photon energy in eV derived from the wavelength.
    #[must_use]
    pub fn photon_energy(&self) -> Option<f64> {
        self.wavelength
            .filter(|w| *w > 0.0)
            .map(|w| ENERGY_WAVELENGTH_PRODUCT / w)
    }

    /// Detector model recognised from the description.
    #[must_use]
    pub fn detector_model(&self) -> Option<DetectorModel> {
        self.detector.as_deref().and_then(DetectorModel::from_description)
    }

    /// Rotation end in degrees.
    #[must_use]
    pub fn end_angle(&self) -> Option<f64> {
        Some(self.start_angle? + self.angle_increment?)
    }
}

/// Reads the header of the CBF file at `path`.
///
/// # Errors
///
/// Returns an error if the file can't be read or is not a CBF image.
pub fn read_header<P: AsRef<Path>>(path: P) -> Result<CbfHeader> {
    let path = path.as_ref();
    let bytes = FileReader::open(path)?.bytes()?;
    let mut header = CbfHeader::parse(&bytes).map_err(|e| match e {
        crate::Error::Cbf(CbfError::NotCbf { .. }) => CbfError::NotCbf {
            path: path.to_string_lossy().to_string(),
        }
        .into(),
        other => other,
    })?;
    header.path = Some(path.to_path_buf());
    Ok(header)
}

fn find_marker(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(BINARY_MARKER.len())
        .position(|w| w == BINARY_MARKER)
}

/// Detectors write either `2018/12/10 12:00:00.000` or
/// `2018-12-10T12:00:00.000`.
fn is_timestamp(body: &str) -> bool {
    let b = body.as_bytes();
    b.len() >= 10
        && b[..4].iter().all(u8::is_ascii_digit)
        && ((b[4] == b'/' && b[7] == b'/') || (b[4] == b'-' && b[7] == b'-' && b.get(10) == Some(&b'T')))
}

fn number(key: &str, token: &str) -> Option<f64> {
    match token.parse::<f64>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, token, "unparseable header value");
            None
        }
    }
}

fn first_number(key: &str, value: &str) -> Option<f64> {
    value.split_whitespace().next().and_then(|t| number(key, t))
}

fn integer(key: &str, value: &str) -> Option<usize> {
    match value.trim().parse::<usize>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value, "unparseable header value");
            None
        }
    }
}

fn beam_xy_of(value: &str) -> Option<(f64, f64)> {
    static BEAM_XY: OnceLock<Regex> = OnceLock::new();
    let re = BEAM_XY.get_or_init(|| {
        Regex::new(r"\(\s*([-+0-9.eE]+)\s*,\s*([-+0-9.eE]+)\s*\)").expect("valid regex")
    });
    let caps = re.captures(value)?;
    Some((
        number("Beam_xy", &caps[1])?,
        number("Beam_xy", &caps[2])?,
    ))
}

fn conversions_of(text: &str) -> Option<String> {
    static CONVERSIONS: OnceLock<Regex> = OnceLock::new();
    let re = CONVERSIONS
        .get_or_init(|| Regex::new(r#"conversions\s*=\s*"([^"]+)""#).expect("valid regex"));
    re.captures(text).map(|caps| caps[1].to_string())
}
