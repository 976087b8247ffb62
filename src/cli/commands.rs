//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

use crate::cbf::{CbfLibDecoder, FrameDecoder, read_header};
use crate::cli::output::{OutputFormat, format_export, format_header, format_summary};
use crate::cli::parser::{Cli, Commands, LoadArgs};
use crate::error::{CommandError, Result};
use crate::io::{StackLayout, read_file_list, write_stack_raw};
use crate::loader::{BatchLoader, ErrorPolicy, LoadReport, LoaderConfig};
use std::path::Path;

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let library = cli.cbf_library.as_deref();

    match &cli.command {
        Commands::Load { args } => cmd_load(args, || CbfLibDecoder::load(library), format),
        Commands::Export { args, output } => {
            cmd_export(args, output, || CbfLibDecoder::load(library), format)
        }
        Commands::Header { file } => cmd_header(file, format),
    }
}

impl LoadArgs {
    /// Loader configuration selected by these options.
    #[must_use]
    pub fn loader_config(&self) -> LoaderConfig {
        let policy = if self.skip_errors {
            ErrorPolicy::Skip
        } else {
            ErrorPolicy::Abort
        };
        let config = LoaderConfig::default()
            .with_policy(policy)
            .with_jobs(self.jobs);
        match self.shape {
            Some(shape) => config.with_shape(shape),
            None => config,
        }
    }
}

/// Reads the list, then opens the decoder and loads every frame.
///
/// The list is read first so a bad list is reported without touching the
/// decoder backend.
fn load_stack<D, F>(args: &LoadArgs, decoder: F) -> Result<LoadReport>
where
    D: FrameDecoder,
    F: FnOnce() -> Result<D>,
{
    let paths = read_file_list(&args.list, args.relative_to_list)?;
    let loader = BatchLoader::new(decoder()?, args.loader_config());
    loader.load(&paths)
}

fn cmd_load<D, F>(args: &LoadArgs, decoder: F, format: OutputFormat) -> Result<String>
where
    D: FrameDecoder,
    F: FnOnce() -> Result<D>,
{
    let report = load_stack(args, decoder)?;
    Ok(format_summary(&report.summary(), format))
}

fn cmd_export<D, F>(args: &LoadArgs, output: &Path, decoder: F, format: OutputFormat) -> Result<String>
where
    D: FrameDecoder,
    F: FnOnce() -> Result<D>,
{
    if output.is_dir() {
        return Err(CommandError::InvalidArgument(format!(
            "output is a directory: {}",
            output.display()
        ))
        .into());
    }

    let report = load_stack(args, decoder)?;
    let sidecar = write_stack_raw(&report.stack, output)?;
    let layout = StackLayout::of(&report.stack);
    Ok(format_export(
        &report.summary(),
        &layout,
        output,
        &sidecar,
        format,
    ))
}

fn cmd_header(file: &Path, format: OutputFormat) -> Result<String> {
    let header = read_header(file)?;
    Ok(format_header(&header, format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cbf::header::tests::pilatus_bytes;
    use crate::cbf::{ArrayParameters, DecodedFrame};
    use crate::error::{CbfError, Error, ListError};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Decoder returning a 2x2 frame filled with the file's byte length.
    struct LengthDecoder;

    impl FrameDecoder for LengthDecoder {
        fn decode(&self, path: &Path) -> Result<DecodedFrame> {
            let len = fs::read(path)
                .map_err(|e| CbfError::Open {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?
                .len();
            let value = i32::try_from(len).unwrap();
            Ok(DecodedFrame {
                pixels: vec![value; 4],
                params: ArrayParameters {
                    elements: 4,
                    dim_fast: 2,
                    dim_mid: 2,
                    dim_slow: 1,
                    ..Default::default()
                },
            })
        }

        fn name(&self) -> &'static str {
            "length"
        }
    }

    fn setup(frames: &[&str]) -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let mut list = String::new();
        for (i, name) in frames.iter().enumerate() {
            fs::write(temp_dir.path().join(name), vec![0_u8; i + 1]).unwrap();
            list.push_str(name);
            list.push('\n');
        }
        let list_path = temp_dir.path().join("frames.lst");
        fs::write(&list_path, list).unwrap();
        (temp_dir, list_path)
    }

    fn args(list: PathBuf) -> LoadArgs {
        LoadArgs {
            list,
            shape: None,
            skip_errors: false,
            jobs: 1,
            relative_to_list: true,
        }
    }

    #[test]
    fn test_cmd_load() {
        let (_temp_dir, list) = setup(&["ref_1_0001.cbf", "ref_1_0002.cbf"]);
        let output = cmd_load(&args(list), || Ok(LengthDecoder), OutputFormat::Text).unwrap();
        assert!(output.contains("Loaded 2 frames of 2x2 (length decoder"));
        assert!(output.contains("ref_1_####.cbf"));
        assert!(output.contains("max 2"));
    }

    #[test]
    fn test_cmd_load_missing_list_skips_decoder() {
        let temp_dir = TempDir::new().unwrap();
        let list = temp_dir.path().join("missing.lst");
        let result = cmd_load(
            &args(list),
            || -> Result<LengthDecoder> { panic!("decoder must not be opened") },
            OutputFormat::Text,
        );
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_cmd_load_empty_list() {
        let (_temp_dir, list) = setup(&[]);
        let result = cmd_load(&args(list), || Ok(LengthDecoder), OutputFormat::Text);
        assert!(matches!(result, Err(Error::List(ListError::Empty { .. }))));
    }

    #[test]
    fn test_cmd_load_skip_errors() {
        let (temp_dir, list) = setup(&["a_0001.cbf", "a_0002.cbf"]);
        fs::remove_file(temp_dir.path().join("a_0001.cbf")).unwrap();

        let mut load_args = args(list);
        assert!(cmd_load(&load_args, || Ok(LengthDecoder), OutputFormat::Text).is_err());

        load_args.skip_errors = true;
        let output = cmd_load(&load_args, || Ok(LengthDecoder), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["frames"], 1);
        assert_eq!(value["failures"][0]["index"], 0);
    }

    #[test]
    fn test_cmd_export() {
        let (temp_dir, list) = setup(&["b_0001.cbf", "b_0002.cbf", "b_0003.cbf"]);
        let output = temp_dir.path().join("out/stack.raw");

        let text = cmd_export(&args(list), &output, || Ok(LengthDecoder), OutputFormat::Text)
            .unwrap();
        assert!(text.contains("Wrote 3 x 2x2 int32"));

        let raw = fs::read(&output).unwrap();
        assert_eq!(raw.len(), 3 * 4 * 4);
        assert_eq!(&raw[..4], &1_i32.to_le_bytes());
        assert_eq!(&raw[raw.len() - 4..], &3_i32.to_le_bytes());
        assert!(temp_dir.path().join("out/stack.raw.json").exists());
    }

    #[test]
    fn test_cmd_export_to_directory() {
        let (temp_dir, list) = setup(&["c_0001.cbf"]);
        let result = cmd_export(
            &args(list),
            temp_dir.path(),
            || Ok(LengthDecoder),
            OutputFormat::Text,
        );
        assert!(matches!(
            result,
            Err(Error::Command(CommandError::InvalidArgument(_)))
        ));
    }

    #[test]
    fn test_cmd_header() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ref_1_0001.cbf");
        fs::write(&path, pilatus_bytes()).unwrap();

        let output = cmd_header(&path, OutputFormat::Text).unwrap();
        assert!(output.contains("PILATUS 6M"));
        assert!(output.contains("x-CBF_BYTE_OFFSET"));
    }

    #[test]
    fn test_cmd_header_not_cbf() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.txt");
        fs::write(&path, "just text\n").unwrap();
        assert!(matches!(
            cmd_header(&path, OutputFormat::Text),
            Err(Error::Cbf(CbfError::NotCbf { .. }))
        ));
    }

    #[test]
    fn test_loader_config_from_args() {
        let mut load_args = args(PathBuf::from("f.lst"));
        load_args.skip_errors = true;
        load_args.jobs = 3;
        load_args.shape = Some("4x2".parse().unwrap());

        let config = load_args.loader_config();
        assert_eq!(config.policy, ErrorPolicy::Skip);
        assert_eq!(config.jobs, 3);
        assert_eq!(config.shape.unwrap().to_string(), "4x2");
    }
}
