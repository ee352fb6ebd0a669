//! Error types for dbdiagram operations.
//!
//! This module provides the main error type [`DbDiagramError`] which wraps
//! the error conditions that can occur while loading a host document and
//! measuring against it.

use std::io;

use thiserror::Error;

use crate::{document::DocumentError, visualization};

/// The main error type for dbdiagram operations.
///
/// # Diagnostic Variants
///
/// The `Document` variant keeps the markup it failed on, so the offset inside
/// [`DocumentError`] can be rendered as a labeled source span.
#[derive(Debug, Error)]
pub enum DbDiagramError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{err}")]
    Document { err: DocumentError, src: String },

    #[error("Measurement error: {0}")]
    Visualization(#[from] visualization::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbDiagramError {
    /// Create a new `Document` error with the associated markup.
    pub fn new_document_error(err: DocumentError, src: impl Into<String>) -> Self {
        Self::Document {
            err,
            src: src.into(),
        }
    }
}
