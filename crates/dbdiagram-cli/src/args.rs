//! Command-line argument definitions for the dbdiagram CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments control input/output paths, configuration file
//! selection, the sample texts to measure, and logging verbosity.

use clap::Parser;

/// Command-line arguments for the dbdiagram measurement tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the host document (SVG or XHTML)
    #[arg(help = "Path to the host document")]
    pub input: String,

    /// Path to the output TOML report
    #[arg(short, long, default_value = "measurements.toml")]
    pub output: String,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Table name to measure a header for (repeatable)
    #[arg(long = "table-name", value_name = "NAME")]
    pub table_names: Vec<String>,

    /// Engine label to measure a footer for (repeatable)
    #[arg(long = "engine", value_name = "LABEL")]
    pub engines: Vec<String>,
}
