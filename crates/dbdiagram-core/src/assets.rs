//! Icon and style registries.
//!
//! The measurement service never hard-codes DOM ids or CSS property names.
//! It resolves them through two registries that the host configures:
//!
//! - [`IconSet`] maps symbolic icon names to the element ids of their
//!   definitions in the host document.
//! - [`StyleNames`] maps the fonts the service reads to CSS custom property
//!   names on the host root element.
//!
//! Both deserialize from configuration with every field defaulted, so an
//! empty section yields the stock `dbdg` names.
//!
//! # Example
//!
//! ```
//! # use dbdiagram_core::assets::{FontAttribute, IconSet, StyleNames};
//! # use dbdiagram_core::field::FieldKind;
//! let icons = IconSet::default();
//! assert_eq!(icons.table(), "dbdg-table-icon");
//!
//! let styles = StyleNames::default();
//! assert_eq!(
//!     styles.field_text_property(FieldKind::Primary, FontAttribute::Weight),
//!     "--dbdg-field-text-primary-font-weight",
//! );
//! ```

use std::fmt;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::field::FieldKind;

/// One of the four font properties read for every text measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontAttribute {
    Family,
    Size,
    Style,
    Weight,
}

impl FontAttribute {
    pub const ALL: [FontAttribute; 4] = [Self::Family, Self::Size, Self::Style, Self::Weight];

    pub fn name(self) -> &'static str {
        match self {
            Self::Family => "family",
            Self::Size => "size",
            Self::Style => "style",
            Self::Weight => "weight",
        }
    }
}

impl fmt::Display for FontAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Icons
// =============================================================================

/// Symbolic icon name to element id registry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IconSet {
    table: String,
    primary_key: String,
    foreign_key: String,
    unique_key: String,
    /// Additional icons measured during the warm-up pass.
    extra: IndexMap<String, String>,
}

impl Default for IconSet {
    fn default() -> Self {
        Self {
            table: "dbdg-table-icon".to_string(),
            primary_key: "dbdg-primary-key-icon".to_string(),
            foreign_key: "dbdg-foreign-key-icon".to_string(),
            unique_key: "dbdg-unique-key-icon".to_string(),
            extra: IndexMap::new(),
        }
    }
}

impl IconSet {
    pub fn new(
        table: impl Into<String>,
        primary_key: impl Into<String>,
        foreign_key: impl Into<String>,
        unique_key: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            primary_key: primary_key.into(),
            foreign_key: foreign_key.into(),
            unique_key: unique_key.into(),
            extra: IndexMap::new(),
        }
    }

    /// Registers an additional named icon.
    pub fn with_extra(mut self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.extra.insert(name.into(), id.into());
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    pub fn unique_key(&self) -> &str {
        &self.unique_key
    }

    /// The key icon id shown for a field kind, `None` for normal fields.
    pub fn key_icon(&self, kind: FieldKind) -> Option<&str> {
        match kind {
            FieldKind::Normal => None,
            FieldKind::Primary => Some(&self.primary_key),
            FieldKind::Foreign => Some(&self.foreign_key),
            FieldKind::Unique => Some(&self.unique_key),
        }
    }

    /// Every `(name, id)` pair in warm-up order: the built-in icons first,
    /// then the extras in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        [
            ("table", self.table.as_str()),
            ("primary_key", self.primary_key.as_str()),
            ("foreign_key", self.foreign_key.as_str()),
            ("unique_key", self.unique_key.as_str()),
        ]
        .into_iter()
        .chain(
            self.extra
                .iter()
                .map(|(name, id)| (name.as_str(), id.as_str())),
        )
    }
}

// =============================================================================
// Styles
// =============================================================================

/// The custom property names of one font (`<prefix>-font-family`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FontProperties {
    family: String,
    size: String,
    style: String,
    weight: String,
}

impl FontProperties {
    /// Builds the four names from a shared prefix such as `--dbdg-table-title`.
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            family: format!("{prefix}-font-family"),
            size: format!("{prefix}-font-size"),
            style: format!("{prefix}-font-style"),
            weight: format!("{prefix}-font-weight"),
        }
    }

    pub fn property(&self, attribute: FontAttribute) -> &str {
        match attribute {
            FontAttribute::Family => &self.family,
            FontAttribute::Size => &self.size,
            FontAttribute::Style => &self.style,
            FontAttribute::Weight => &self.weight,
        }
    }
}

/// CSS class and custom property names read from the host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StyleNames {
    root_class: String,
    table_title_font: FontProperties,
    table_footer_font: FontProperties,
    field_type_font: FontProperties,
    /// Prefix of the per-kind field name font properties.
    field_text_prefix: String,
}

impl Default for StyleNames {
    fn default() -> Self {
        Self {
            root_class: "dbdg".to_string(),
            table_title_font: FontProperties::with_prefix("--dbdg-table-title"),
            table_footer_font: FontProperties::with_prefix("--dbdg-table-footer-text"),
            field_type_font: FontProperties::with_prefix("--dbdg-field-text-type"),
            field_text_prefix: "--dbdg-field-text".to_string(),
        }
    }
}

impl StyleNames {
    /// The class applied to every diagram root `<svg>`.
    pub fn root_class(&self) -> &str {
        &self.root_class
    }

    pub fn table_title_font(&self) -> &FontProperties {
        &self.table_title_font
    }

    pub fn table_footer_font(&self) -> &FontProperties {
        &self.table_footer_font
    }

    pub fn field_type_font(&self) -> &FontProperties {
        &self.field_type_font
    }

    /// The property holding `attribute` of the name font for `kind`,
    /// e.g. `--dbdg-field-text-foreign-font-size`.
    pub fn field_text_property(&self, kind: FieldKind, attribute: FontAttribute) -> String {
        format!(
            "{}-{}-font-{}",
            self.field_text_prefix,
            kind.selector(),
            attribute.name()
        )
    }
}
