//! Output formatting for CLI commands.
//!
//! Supports text and JSON output formats.

use crate::cbf::CbfHeader;
use crate::error::Error;
use crate::io::StackLayout;
use crate::loader::LoadSummary;
use serde::Serialize;
use std::fmt::Write;
use std::path::Path;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
}

impl OutputFormat {
    /// Parses format from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Formats the summary of a loaded stack.
#[must_use]
pub fn format_summary(summary: &LoadSummary, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_summary_text(summary),
        OutputFormat::Json => format_json(summary),
    }
}

fn format_summary_text(summary: &LoadSummary) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "Loaded {} frames of {} ({} decoder, {} ms)",
        summary.frames, summary.shape, summary.decoder, summary.elapsed_ms
    );
    if let Some(template) = &summary.template {
        let _ = writeln!(output, "  Template:  {template}");
    }
    if let (Some(first), Some(last)) = (summary.first_number, summary.last_number) {
        let _ = writeln!(output, "  Images:    {first}..{last}");
    }
    if let Some(stats) = &summary.stats {
        let _ = writeln!(
            output,
            "  Pixels:    min {} / max {} / mean {:.3}",
            stats.min, stats.max, stats.mean
        );
    }
    if !summary.failures.is_empty() {
        let _ = writeln!(output, "  Skipped:   {}", summary.failures.len());
        for failure in &summary.failures {
            let _ = writeln!(
                output,
                "    [{}] {}: {}",
                failure.index,
                failure.path.display(),
                failure.error
            );
        }
    }
    output
}

/// Formats the result of an export.
#[must_use]
pub fn format_export(
    summary: &LoadSummary,
    layout: &StackLayout,
    output_path: &Path,
    sidecar: &Path,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = format_summary_text(summary);
            let _ = writeln!(
                output,
                "Wrote {} x {} {} ({}) to {}",
                layout.frames,
                layout.shape,
                layout.dtype,
                layout.byte_order,
                output_path.display()
            );
            let _ = writeln!(output, "Layout: {}", sidecar.display());
            output
        }
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct Export<'a> {
                summary: &'a LoadSummary,
                output: &'a Path,
                sidecar: &'a Path,
            }
            format_json(&Export {
                summary,
                output: output_path,
                sidecar,
            })
        }
    }
}

/// Formats a parsed CBF header.
#[must_use]
pub fn format_header(header: &CbfHeader, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_header_text(header),
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct HeaderWithModel<'a> {
                #[serde(flatten)]
                header: &'a CbfHeader,
                detector_model: Option<&'static str>,
                detector_kind: Option<&'static str>,
                photon_energy: Option<f64>,
                end_angle: Option<f64>,
            }
            let model = header.detector_model();
            format_json(&HeaderWithModel {
                header,
                detector_model: model.map(|m| m.name()),
                detector_kind: model.map(|m| m.kind()),
                photon_energy: header.photon_energy(),
                end_angle: header.end_angle(),
            })
        }
    }
}

fn format_header_text(header: &CbfHeader) -> String {
    let mut output = String::new();
    if let Some(path) = &header.path {
        let _ = writeln!(output, "Header: {}", path.display());
    }

    let mut line = |label: &str, value: Option<String>| {
        if let Some(value) = value {
            let _ = writeln!(output, "  {label:<18} {value}");
        }
    };

    line("Detector:", header.detector.clone());
    line(
        "Model:",
        header
            .detector_model()
            .map(|m| format!("{} ({})", m.name(), m.kind())),
    );
    line("Date:", header.date.clone());
    line(
        "Pixel size:",
        header
            .pixel_size
            .map(|(x, y)| format!("{x} m x {y} m")),
    );
    line("Exposure time:", header.exposure_time.map(|t| format!("{t} s")));
    line("Wavelength:", header.wavelength.map(|w| format!("{w} A")));
    line(
        "Photon energy:",
        header.photon_energy().map(|e| format!("{e:.1} eV")),
    );
    line(
        "Distance:",
        header.detector_distance.map(|d| format!("{d} m")),
    );
    line(
        "Beam centre:",
        header.beam_xy.map(|(x, y)| format!("({x}, {y}) pixels")),
    );
    line(
        "Oscillation:",
        header
            .start_angle
            .zip(header.end_angle())
            .map(|(start, end)| format!("{start} -> {end} deg")),
    );
    line("Compression:", header.conversions.clone());
    line("Element type:", header.element_type.clone());
    line("Dimensions:", header.shape().map(|s| s.to_string()));
    output
}

/// Formats an error for output.
#[must_use]
pub fn format_error(error: &Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => error.to_string(),
        OutputFormat::Json => {
            let json = serde_json::json!({
                "error": error.to_string(),
            });
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| "{}".to_string())
        }
    }
}

fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}
