//! CLI logic for the dbdiagram measurement tool.
//!
//! This module reads a host document, measures the shared diagram geometry
//! it declares and writes the result as a TOML report.

pub mod error_adapter;

mod args;
mod config;

pub use args::Args;

use std::fs;

use log::info;

use dbdiagram::{DbDiagramError, DiagramMeasurer};

/// Run the dbdiagram CLI application
///
/// This function measures the input host document and writes the resulting
/// report to the output file.
///
/// # Errors
///
/// Returns `DbDiagramError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Malformed host markup
/// - Headers or footers that cannot be measured
pub fn run(args: &Args) -> Result<(), DbDiagramError> {
    info!(
        input_path = args.input,
        output_path = args.output;
        "Measuring host document"
    );

    let app_config = config::load_config(args.config.as_ref())?;

    let markup = fs::read_to_string(&args.input)?;

    let report = DiagramMeasurer::new(app_config)
        .with_table_names(args.table_names.iter().cloned())
        .with_engines(args.engines.iter().cloned())
        .measure(&markup)?;

    let output = toml::to_string_pretty(&report)
        .map_err(|err| DbDiagramError::Config(format!("failed to serialize report: {err}")))?;
    fs::write(&args.output, output)?;

    info!(output_file = args.output; "Report written successfully");

    Ok(())
}
