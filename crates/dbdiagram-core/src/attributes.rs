//! Typed attribute bags for graphic elements.
//!
//! Diagram elements are configured by applying an attribute bag to them in
//! one call. Bags are plain structs implementing [`Attributes`]; unset fields
//! are simply not emitted.
//!
//! The `style` key is special: it is merged into the element's existing
//! inline style declaration by declaration instead of replacing the whole
//! attribute, so custom properties set earlier survive later applications.
//!
//! # Example
//!
//! ```
//! # use dbdiagram_core::attributes::{apply_attributes, attribute_number, TextAttributes};
//! # use dbdiagram_core::dom::Element;
//! let mut text = Element::new("text");
//! let attrs = TextAttributes::new()
//!     .with_font_family("Arial")
//!     .with_font_size("14px");
//!
//! apply_attributes(&mut text, &attrs).set_attribute("x", "2.5");
//!
//! assert_eq!(text.attribute("font-family"), Some("Arial"));
//! assert_eq!(attribute_number(&text, "font-size"), 14.0);
//! assert_eq!(attribute_number(&text, "x"), 2.5);
//! assert_eq!(attribute_number(&text, "y"), 0.0);
//! ```

use indexmap::IndexMap;
use log::debug;
use winnow::{
    Parser as _,
    ascii::{digit0, digit1},
    combinator::{alt, opt},
    error::{ContextError, ErrMode},
    token::one_of,
};

use crate::{
    css::{self, StyleDeclaration},
    dom::Element,
};

/// Attribute name that is merged rather than overwritten.
pub const STYLE_ATTRIBUTE: &str = "style";

/// A bag of attribute name/value pairs that can be applied to an element.
pub trait Attributes {
    /// Returns the attributes to set, in application order.
    fn entries(&self) -> Vec<(String, String)>;
}

impl Attributes for IndexMap<String, String> {
    fn entries(&self) -> Vec<(String, String)> {
        self.iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

impl<K: AsRef<str>, V: AsRef<str>> Attributes for [(K, V)] {
    fn entries(&self) -> Vec<(String, String)> {
        self.iter()
            .map(|(name, value)| (name.as_ref().to_string(), value.as_ref().to_string()))
            .collect()
    }
}

/// Font attributes for `<text>` elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextAttributes {
    font_family: Option<String>,
    font_size: Option<String>,
    font_style: Option<String>,
    font_weight: Option<String>,
}

impl TextAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = non_empty(family.into());
        self
    }

    pub fn with_font_size(mut self, size: impl Into<String>) -> Self {
        self.font_size = non_empty(size.into());
        self
    }

    pub fn with_font_style(mut self, style: impl Into<String>) -> Self {
        self.font_style = non_empty(style.into());
        self
    }

    pub fn with_font_weight(mut self, weight: impl Into<String>) -> Self {
        self.font_weight = non_empty(weight.into());
        self
    }

    pub fn font_family(&self) -> Option<&str> {
        self.font_family.as_deref()
    }

    pub fn font_size(&self) -> Option<&str> {
        self.font_size.as_deref()
    }

    pub fn font_style(&self) -> Option<&str> {
        self.font_style.as_deref()
    }

    pub fn font_weight(&self) -> Option<&str> {
        self.font_weight.as_deref()
    }
}

/// Values read from an unset CSS property arrive as empty strings.
fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl Attributes for TextAttributes {
    fn entries(&self) -> Vec<(String, String)> {
        [
            ("font-family", &self.font_family),
            ("font-size", &self.font_size),
            ("font-style", &self.font_style),
            ("font-weight", &self.font_weight),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_ref().map(|v| (name.to_string(), v.clone())))
        .collect()
    }
}

/// Attributes for a `<use>` element referencing an icon definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UseAttributes {
    pub href: Option<String>,
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub class: Option<String>,
    pub style: Option<String>,
}

impl Attributes for UseAttributes {
    fn entries(&self) -> Vec<(String, String)> {
        let mut entries = Vec::new();
        if let Some(href) = &self.href {
            entries.push(("href".to_string(), href.clone()));
        }
        for (name, value) in [
            ("x", self.x),
            ("y", self.y),
            ("width", self.width),
            ("height", self.height),
        ] {
            if let Some(value) = value {
                entries.push((name.to_string(), value.to_string()));
            }
        }
        if let Some(class) = &self.class {
            entries.push(("class".to_string(), class.clone()));
        }
        if let Some(style) = &self.style {
            entries.push((STYLE_ATTRIBUTE.to_string(), style.clone()));
        }
        entries
    }
}

/// Attributes for a root `<svg>` element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SvgRootAttributes {
    pub class: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub style: Option<String>,
}

impl Attributes for SvgRootAttributes {
    fn entries(&self) -> Vec<(String, String)> {
        [
            ("class", &self.class),
            ("width", &self.width),
            ("height", &self.height),
            (STYLE_ATTRIBUTE, &self.style),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_ref().map(|v| (name.to_string(), v.clone())))
        .collect()
    }
}

/// Applies every attribute of `attributes` to `element`, returning the element for chaining.
pub fn apply_attributes<'e, A>(element: &'e mut Element, attributes: &A) -> &'e mut Element
where
    A: Attributes + ?Sized,
{
    for (name, value) in attributes.entries() {
        if name == STYLE_ATTRIBUTE {
            merge_style(element, &value);
        } else {
            element.set_attribute(name, value);
        }
    }
    element
}

fn merge_style(element: &mut Element, style: &str) {
    let incoming = match css::parse_declarations(style) {
        Ok(incoming) => incoming,
        Err(err) => {
            debug!(style, err:% = err; "Applying unparsable style verbatim");
            element.set_attribute(STYLE_ATTRIBUTE, style);
            return;
        }
    };

    let mut current = element
        .attribute(STYLE_ATTRIBUTE)
        .and_then(|existing| css::parse_declarations(existing).ok())
        .unwrap_or_else(StyleDeclaration::new);
    current.merge(&incoming);
    element.set_attribute(STYLE_ATTRIBUTE, current.to_string());
}

/// Reads a numeric attribute.
///
/// The leading number of the value is used, so `"24px"` reads as `24`.
/// Missing or unparsable attributes read as `0`.
pub fn attribute_number(element: &Element, name: &str) -> f32 {
    element
        .attribute(name)
        .and_then(leading_number)
        .map(|(number, _)| number)
        .unwrap_or(0.0)
}

/// Splits a value such as `"1.5em"` into its leading number and the rest.
///
/// Returns `None` when the value does not start with a finite number.
///
/// ```
/// # use dbdiagram_core::attributes::leading_number;
/// assert_eq!(leading_number(" 12pt"), Some((12.0, "pt")));
/// assert_eq!(leading_number("1.5em"), Some((1.5, "em")));
/// assert_eq!(leading_number("-2e1"), Some((-20.0, "")));
/// assert_eq!(leading_number("auto"), None);
/// ```
pub fn leading_number(value: &str) -> Option<(f32, &str)> {
    let mut input = value.trim();
    let number: IResult<&str> = (
        opt(one_of(['+', '-'])),
        alt(((digit1, opt(('.', digit0))).void(), ('.', digit1).void())),
        opt((one_of(['e', 'E']), opt(one_of(['+', '-'])), digit1)),
    )
        .take()
        .parse_next(&mut input);
    let number = number.ok()?.parse::<f32>().ok()?;
    number.is_finite().then_some((number, input.trim()))
}

type IResult<O> = Result<O, ErrMode<ContextError>>;
