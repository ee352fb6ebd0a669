//! dbdiagram - Shared geometry for database entity-relationship diagrams.
//!
//! Tables and fields of a diagram are rendered as SVG into a host document.
//! They all need the same numbers: how large the icons are, how tall a table
//! header, footer or field row is. This crate measures those once per host,
//! against the fonts and icon definitions the host actually declares, and
//! shares them with every element of the diagram.
//!
//! The entry point for embedders is [`visualization::Visualization`]. For a
//! one-shot summary of a host document, use [`DiagramMeasurer`].

pub mod config;
pub mod document;
pub mod elements;
pub mod measure;
pub mod surface;
pub mod visualization;

mod error;

pub use dbdiagram_core::{assets, attributes, css, dom, field, geometry};

pub use error::DbDiagramError;

use log::{debug, info, trace};
use serde::Serialize;

use config::AppConfig;
use document::{Document, ReadyState};
use geometry::{BBox, Padding};
use visualization::{
    DEFAULT_ENGINE_LABEL, DEFAULT_TABLE_NAME, Visualization, VisualizationRegistry,
};

/// Measures `markup` with the default samples.
///
/// Shorthand for [`DiagramMeasurer::measure`].
pub fn measure_document(
    markup: &str,
    config: &AppConfig,
) -> Result<MeasurementReport, DbDiagramError> {
    DiagramMeasurer::new(config.clone()).measure(markup)
}

/// Measures a host document and summarizes the shared geometry.
///
/// # Examples
///
/// ```rust,no_run
/// use dbdiagram::{DiagramMeasurer, config::AppConfig};
///
/// let markup = std::fs::read_to_string("host.svg").expect("Failed to read");
/// let report = DiagramMeasurer::new(AppConfig::default())
///     .with_table_names(["users", "orders"])
///     .measure(&markup)
///     .expect("Failed to measure");
///
/// println!("field rows are {:?}px tall", report.constants().field_height);
/// ```
#[derive(Debug, Default)]
pub struct DiagramMeasurer {
    config: AppConfig,
    table_names: Vec<String>,
    engines: Vec<String>,
}

impl DiagramMeasurer {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            table_names: Vec::new(),
            engines: Vec::new(),
        }
    }

    /// Table names to measure headers for, in addition to the defaults.
    pub fn with_table_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.table_names.extend(names.into_iter().map(Into::into));
        self
    }

    /// Engine labels to measure footers for, in addition to the defaults.
    pub fn with_engines<I, S>(mut self, engines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.engines.extend(engines.into_iter().map(Into::into));
        self
    }

    /// Parses `markup` as a loaded host document and measures it.
    ///
    /// Icons and derived constants that cannot be measured are reported as
    /// such rather than failing the whole run.
    ///
    /// # Errors
    ///
    /// Returns [`DbDiagramError::Document`] when `markup` is not well-formed
    /// and [`DbDiagramError::Visualization`] when a requested header or
    /// footer cannot be measured.
    pub fn measure(&self, markup: &str) -> Result<MeasurementReport, DbDiagramError> {
        info!("Parsing host document");
        let host = Document::parse(markup)
            .map_err(|err| DbDiagramError::new_document_error(err, markup))?;
        trace!(host:?; "Parsed host document");

        let registry = VisualizationRegistry::from_config(&self.config);
        let visualization = registry.get_instance(&host);
        host.set_ready_state(ReadyState::Complete);
        debug!(lifecycle:? = visualization.lifecycle(); "Host loaded");

        let report = self.report(&host, &visualization)?;
        info!(icons = report.icons.len(), headers = report.headers.len(); "Measurement complete");
        Ok(report)
    }

    fn report(
        &self,
        host: &Document,
        visualization: &Visualization,
    ) -> Result<MeasurementReport, DbDiagramError> {
        let icons = visualization
            .icons()
            .iter()
            .map(|(name, id)| {
                let (bbox, error) = match visualization.icon_element_size(id, false) {
                    Ok(bbox) => (Some(bbox), None),
                    Err(err) => (None, Some(err.to_string())),
                };
                IconReport {
                    name: name.to_string(),
                    id: id.to_string(),
                    error,
                    bbox,
                }
            })
            .collect();

        let constants = LayoutConstants {
            header_height: visualization.table_header_height().ok(),
            footer_height: visualization.table_footer_height().ok(),
            field_height: visualization.table_field_height().ok(),
            field_icon_width: visualization.table_field_icon_width().ok(),
        };

        let mut headers = Vec::new();
        let names = std::iter::once(DEFAULT_TABLE_NAME)
            .chain(self.table_names.iter().map(String::as_str));
        for name in names {
            headers.push(TextSample {
                text: name.to_string(),
                bbox: visualization.table_header_size(name)?,
            });
        }

        let mut footers = Vec::new();
        let engines =
            std::iter::once(DEFAULT_ENGINE_LABEL).chain(self.engines.iter().map(String::as_str));
        for engine in engines {
            footers.push(TextSample {
                text: engine.to_string(),
                bbox: visualization.table_footer_size(engine)?,
            });
        }

        Ok(MeasurementReport {
            root: host.root_name(),
            field_name_type_spacing: Visualization::FIELD_NAME_TYPE_SPACING,
            table_text_padding: Visualization::TABLE_TEXT_PADDING,
            table_field_padding: Visualization::TABLE_FIELD_PADDING,
            constants,
            icons,
            headers,
            footers,
        })
    }
}

/// Summary of the shared geometry of one host document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementReport {
    root: String,
    field_name_type_spacing: f32,
    table_text_padding: Padding,
    table_field_padding: Padding,
    constants: LayoutConstants,
    icons: Vec<IconReport>,
    headers: Vec<TextSample>,
    footers: Vec<TextSample>,
}

impl MeasurementReport {
    /// Tag name of the host root element.
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn constants(&self) -> &LayoutConstants {
        &self.constants
    }

    pub fn icons(&self) -> &[IconReport] {
        &self.icons
    }

    pub fn headers(&self) -> &[TextSample] {
        &self.headers
    }

    pub fn footers(&self) -> &[TextSample] {
        &self.footers
    }
}

/// The derived constants; `None` where they could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayoutConstants {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_height: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer_height: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_height: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_icon_width: Option<f32>,
}

/// One registered icon and either its box or why it has none.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IconReport {
    pub name: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BBox>,
}

/// A measured header or footer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextSample {
    pub text: String,
    pub bbox: BBox,
}
