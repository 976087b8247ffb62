//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use crate::core::FrameShape;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// cbf-stack: load lists of CBF diffraction images into one pixel stack.
///
/// Frames are decoded with CBFlib, opened at runtime.
#[derive(Parser, Debug)]
#[command(name = "cbf-stack")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the CBFlib shared library.
    ///
    /// Defaults to searching the system library path for `libcbf`.
    #[arg(long, env = "CBF_LIBRARY", global = true)]
    pub cbf_library: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by the commands that load a frame list.
#[derive(Args, Debug, Clone)]
pub struct LoadArgs {
    /// Text file listing one CBF image path per line.
    pub list: PathBuf,

    /// Expected frame shape as WIDTHxHEIGHT (default: first frame's shape).
    #[arg(long, env = "CBF_STACK_SHAPE")]
    pub shape: Option<FrameShape>,

    /// Skip frames that fail to load instead of aborting.
    #[arg(long)]
    pub skip_errors: bool,

    /// Number of decoder threads.
    #[arg(short, long, env = "CBF_STACK_JOBS", default_value = "1")]
    pub jobs: usize,

    /// Resolve relative image paths against the list file's directory.
    #[arg(long)]
    pub relative_to_list: bool,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load every frame of a list and print a summary of the stack.
    Load {
        /// Load options.
        #[command(flatten)]
        args: LoadArgs,
    },

    /// Load a list and write the stack as raw little-endian int32.
    ///
    /// A JSON sidecar (`<output>.json`) describes the layout.
    Export {
        /// Load options.
        #[command(flatten)]
        args: LoadArgs,

        /// Output file for the raw stack.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the text header of a CBF image.
    Header {
        /// Path to the CBF image.
        file: PathBuf,
    },
}

impl Cli {
    /// Log level selected by the `-v` count.
    #[must_use]
    pub const fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
