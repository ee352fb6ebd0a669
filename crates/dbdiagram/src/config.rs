//! Configuration types for the measurement service.
//!
//! All types implement [`serde::Deserialize`] with every field defaulted, so
//! a configuration file only needs to name what it changes.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining the sections below.
//! - [`IconSet`] - Element ids of the icon definitions in the host.
//! - [`StyleNames`] - CSS class and custom property names read from the host.
//! - [`MeasurementConfig`] - Which text measurer to use and its fallbacks.
//!
//! # Example
//!
//! ```
//! # use dbdiagram::config::{AppConfig, MeasurerKind};
//! let config = AppConfig::default();
//! assert_eq!(config.measurement().measurer(), MeasurerKind::Font);
//! assert_eq!(config.icons().table(), "dbdg-table-icon");
//! ```

use std::rc::Rc;

use serde::Deserialize;

pub use dbdiagram_core::assets::{IconSet, StyleNames};

use crate::measure::{ApproximateMeasurer, FontMeasurer, FontSpec, TextMeasurer};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Icon registry section.
    #[serde(default)]
    icons: IconSet,

    /// Style registry section.
    #[serde(default)]
    styles: StyleNames,

    /// Text measurement section.
    #[serde(default)]
    measurement: MeasurementConfig,
}

impl AppConfig {
    pub fn new(icons: IconSet, styles: StyleNames, measurement: MeasurementConfig) -> Self {
        Self {
            icons,
            styles,
            measurement,
        }
    }

    pub fn icons(&self) -> &IconSet {
        &self.icons
    }

    pub fn styles(&self) -> &StyleNames {
        &self.styles
    }

    pub fn measurement(&self) -> &MeasurementConfig {
        &self.measurement
    }
}

/// Which [`TextMeasurer`] backs text measurement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurerKind {
    /// Shape text with the system fonts.
    #[default]
    Font,
    /// Estimate from character counts; identical on every machine.
    Approximate,
}

/// Text measurement settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MeasurementConfig {
    measurer: MeasurerKind,
    width_factor: f32,
    line_height_factor: f32,
    /// Family used when the host declares none.
    fallback_font_family: String,
    /// Size in pixels used when the host declares none.
    fallback_font_size: f32,
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            measurer: MeasurerKind::default(),
            width_factor: 0.55,
            line_height_factor: 1.15,
            fallback_font_family: "sans-serif".to_string(),
            fallback_font_size: 16.0,
        }
    }
}

impl MeasurementConfig {
    pub fn with_measurer(mut self, measurer: MeasurerKind) -> Self {
        self.measurer = measurer;
        self
    }

    pub fn measurer(&self) -> MeasurerKind {
        self.measurer
    }

    pub fn width_factor(&self) -> f32 {
        self.width_factor
    }

    pub fn line_height_factor(&self) -> f32 {
        self.line_height_factor
    }

    /// The font assumed for attributes the host leaves unset.
    pub fn fallback_font(&self) -> FontSpec {
        FontSpec::new(&self.fallback_font_family, self.fallback_font_size)
    }

    /// Builds the configured measurer.
    pub fn build_measurer(&self) -> Rc<dyn TextMeasurer> {
        match self.measurer {
            MeasurerKind::Font => Rc::new(FontMeasurer::new()),
            MeasurerKind::Approximate => Rc::new(ApproximateMeasurer::new(
                self.width_factor,
                self.line_height_factor,
            )),
        }
    }
}
