//! Error adapter for converting DbDiagramError to miette diagnostics.
//!
//! This module provides the bridge between the library's standard error types
//! and miette's rich diagnostic formatting used in the CLI. Malformed host
//! markup is rendered with a labeled snippet of the offending input.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan, SourceSpan};

use dbdiagram::{DbDiagramError, document::DocumentError, visualization};

/// Adapter for a host document error with its source markup.
pub struct DocumentAdapter<'a> {
    err: &'a DocumentError,
    src: &'a str,
}

impl<'a> DocumentAdapter<'a> {
    pub fn new(err: &'a DocumentError, src: &'a str) -> Self {
        Self { err, src }
    }
}

impl fmt::Debug for DocumentAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentAdapter")
            .field("err", &self.err)
            .finish()
    }
}

impl fmt::Display for DocumentAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.err {
            DocumentError::Parse { message, .. } => write!(f, "invalid host markup: {message}"),
            DocumentError::NoRoot => fmt::Display::fmt(self.err, f),
        }
    }
}

impl std::error::Error for DocumentAdapter<'_> {}

impl MietteDiagnostic for DocumentAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new("dbdiagram::document"))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new("the host must be a well-formed SVG or XHTML document"))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.src as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let offset = self.err.offset()?.min(self.src.len());
        let span = SourceSpan::new(offset.into(), 0);
        Some(Box::new(std::iter::once(LabeledSpan::new_primary_with_span(
            Some("here".to_string()),
            span,
        ))))
    }
}

/// Adapter for [`DbDiagramError`] variants without source information.
pub struct ErrorAdapter<'a>(pub &'a DbDiagramError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            DbDiagramError::Io(_) => "dbdiagram::io",
            DbDiagramError::Document { .. } => "dbdiagram::document",
            DbDiagramError::Visualization(_) => "dbdiagram::measure",
            DbDiagramError::Config(_) => "dbdiagram::config",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match &self.0 {
            DbDiagramError::Visualization(visualization::Error::IconNotFound { .. }) => Some(
                Box::new("define the icon in the host or point [icons] at an existing id"),
            ),
            _ => None,
        }
    }
}

/// A reportable error that can be rendered by miette.
#[derive(Debug)]
pub enum Reportable<'a> {
    /// Malformed markup with a source location.
    Document(DocumentAdapter<'a>),
    /// A simple error without source location.
    Error(ErrorAdapter<'a>),
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reportable::Document(d) => fmt::Display::fmt(d, f),
            Reportable::Error(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reportable::Document(_) => None,
            Reportable::Error(e) => e.source(),
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Document(d) => d.code(),
            Reportable::Error(e) => e.code(),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Document(d) => d.help(),
            Reportable::Error(e) => e.help(),
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self {
            Reportable::Document(d) => d.source_code(),
            Reportable::Error(e) => e.source_code(),
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        match self {
            Reportable::Document(d) => d.labels(),
            Reportable::Error(e) => e.labels(),
        }
    }
}

/// Convert a [`DbDiagramError`] into a list of reportable errors.
pub fn to_reportables(err: &DbDiagramError) -> Vec<Reportable<'_>> {
    match err {
        DbDiagramError::Document { err: doc_err, src } => {
            vec![Reportable::Document(DocumentAdapter::new(doc_err, src))]
        }
        _ => vec![Reportable::Error(ErrorAdapter(err))],
    }
}
