//! CLI module for the resource-sync tool.
//!
//! This module provides the command-line interface for resolving and
//! registering an application's registry resources.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
