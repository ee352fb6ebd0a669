//! Table field model.
//!
//! The measurement service only needs to know three things about a field:
//! its name, its declared data type (rendered as an upper-case label) and
//! its key kind, which selects both the key icon and the font used for the
//! name.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification of a table column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    Normal,
    Primary,
    Foreign,
    Unique,
}

impl FieldKind {
    /// Key kinds, i.e. every kind that shows an icon.
    pub const KEYS: [FieldKind; 3] = [FieldKind::Primary, FieldKind::Foreign, FieldKind::Unique];

    /// The segment used in per-kind CSS property names.
    ///
    /// Normal fields use `name`; key fields use their lower-case kind.
    pub fn selector(self) -> &'static str {
        match self {
            Self::Normal => "name",
            Self::Primary => "primary",
            Self::Foreign => "foreign",
            Self::Unique => "unique",
        }
    }
}

/// Declared data type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Bool,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    Decimal,
    Char,
    Varchar,
    Text,
    Blob,
    Date,
    Time,
    DateTime,
    Timestamp,
    Json,
    Uuid,
}

impl DataType {
    /// The label shown next to the field name.
    pub fn label(self) -> &'static str {
        match self {
            Self::Bool => "BOOL",
            Self::TinyInt => "TINYINT",
            Self::SmallInt => "SMALLINT",
            Self::Int => "INT",
            Self::BigInt => "BIGINT",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::Decimal => "DECIMAL",
            Self::Char => "CHAR",
            Self::Varchar => "VARCHAR",
            Self::Text => "TEXT",
            Self::Blob => "BLOB",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::DateTime => "DATETIME",
            Self::Timestamp => "TIMESTAMP",
            Self::Json => "JSON",
            Self::Uuid => "UUID",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A table field as seen by the measurement service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    name: String,
    data_type: DataType,
    #[serde(default)]
    kind: Option<FieldKind>,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: FieldKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// The declared kind, if any.
    pub fn kind(&self) -> Option<FieldKind> {
        self.kind
    }

    /// The kind used for font selection; an undeclared kind is [`FieldKind::Normal`].
    pub fn effective_kind(&self) -> FieldKind {
        self.kind.unwrap_or_default()
    }
}
