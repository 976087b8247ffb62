//! CLI layer for cbf-stack.
//!
//! Provides the command-line interface using clap, with commands for
//! loading and exporting frame stacks and inspecting CBF headers.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands, LoadArgs};
