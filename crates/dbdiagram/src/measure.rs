//! Text measurement.
//!
//! The hidden text element on the measurement surface carries a text and a
//! set of `font-*` attributes. A [`TextMeasurer`] turns that into a rendered
//! size. Two measurers are provided:
//!
//! - [`FontMeasurer`] shapes the text with cosmic-text against the fonts
//!   installed on the system.
//! - [`ApproximateMeasurer`] estimates the size from the character count.
//!   It is deterministic across machines.

use std::sync::{Mutex, OnceLock, PoisonError};

use cosmic_text::{Attrs, Buffer, Family, FontSystem, Metrics, Shaping, Style, Weight};
use log::info;

use dbdiagram_core::{
    attributes::leading_number, css::strip_quotes, dom::Element, geometry::Size,
};

/// Line height relative to the font size.
const LINE_HEIGHT_FACTOR: f32 = 1.15;

/// Average glyph advance relative to the font size.
const WIDTH_FACTOR: f32 = 0.55;

/// Slant of a font.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
    Oblique,
}

impl FontStyle {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "normal" => Some(Self::Normal),
            "italic" => Some(Self::Italic),
            value if value.starts_with("oblique") => Some(Self::Oblique),
            _ => None,
        }
    }
}

/// A resolved font: what the text element's `font-*` attributes select.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    family: String,
    size_px: f32,
    style: FontStyle,
    weight: u16,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self::new("sans-serif", 16.0)
    }
}

impl FontSpec {
    pub fn new(family: impl Into<String>, size_px: f32) -> Self {
        Self {
            family: family.into(),
            size_px,
            style: FontStyle::Normal,
            weight: 400,
        }
    }

    pub fn with_style(mut self, style: FontStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_weight(mut self, weight: u16) -> Self {
        self.weight = weight;
        self
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn size_px(&self) -> f32 {
        self.size_px
    }

    pub fn style(&self) -> FontStyle {
        self.style
    }

    pub fn weight(&self) -> u16 {
        self.weight
    }

    /// Resolves the font of a text element.
    ///
    /// Missing or unparsable attributes keep the value from `fallback`. Only
    /// the first family of a family list is used.
    pub fn from_element(element: &Element, fallback: &FontSpec) -> Self {
        let family = element
            .attribute("font-family")
            .and_then(|list| list.split(',').next())
            .map(|first| strip_quotes(first).to_string())
            .filter(|family| !family.is_empty())
            .unwrap_or_else(|| fallback.family.clone());

        let size_px = element
            .attribute("font-size")
            .and_then(|size| parse_font_size(size, fallback.size_px))
            .unwrap_or(fallback.size_px);

        let style = element
            .attribute("font-style")
            .and_then(FontStyle::parse)
            .unwrap_or(fallback.style);

        let weight = element
            .attribute("font-weight")
            .and_then(|weight| parse_font_weight(weight, fallback.weight))
            .unwrap_or(fallback.weight);

        Self {
            family,
            size_px,
            style,
            weight,
        }
    }
}

/// Parses a CSS font size into pixels.
///
/// Accepts `px`, `pt`, `em`, `rem` and `%` units as well as bare numbers.
/// Relative units resolve against `base_px`. Non-positive sizes are
/// rejected.
pub fn parse_font_size(value: &str, base_px: f32) -> Option<f32> {
    let (number, unit) = leading_number(value)?;
    let px = match unit.to_ascii_lowercase().as_str() {
        "" | "px" => number,
        "pt" => number * 4.0 / 3.0,
        "em" | "rem" => number * base_px,
        "%" => number * base_px / 100.0,
        _ => return None,
    };
    (px > 0.0).then_some(px)
}

fn parse_font_weight(value: &str, current: u16) -> Option<u16> {
    match value.trim().to_ascii_lowercase().as_str() {
        "normal" => Some(400),
        "bold" => Some(700),
        "bolder" => Some(current.saturating_add(300).min(900)),
        "lighter" => Some(current.saturating_sub(300).max(100)),
        other => other
            .parse::<u16>()
            .ok()
            .filter(|weight| (1..=1000).contains(weight)),
    }
}

/// Measures the rendered size of a text in a given font.
pub trait TextMeasurer {
    fn measure(&self, text: &str, font: &FontSpec) -> Size;
}

/// Deterministic size estimate from character counts.
///
/// Each line is `chars × size × width_factor` wide and
/// `size × line_height_factor` tall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApproximateMeasurer {
    width_factor: f32,
    line_height_factor: f32,
}

impl Default for ApproximateMeasurer {
    fn default() -> Self {
        Self::new(WIDTH_FACTOR, LINE_HEIGHT_FACTOR)
    }
}

impl ApproximateMeasurer {
    pub fn new(width_factor: f32, line_height_factor: f32) -> Self {
        Self {
            width_factor,
            line_height_factor,
        }
    }
}

impl TextMeasurer for ApproximateMeasurer {
    fn measure(&self, text: &str, font: &FontSpec) -> Size {
        if text.is_empty() {
            return Size::default();
        }
        let widest = text.lines().map(|line| line.chars().count()).max().unwrap_or(0);
        let lines = text.lines().count().max(1);
        Size::new(
            widest as f32 * font.size_px * self.width_factor,
            lines as f32 * font.size_px * self.line_height_factor,
        )
    }
}

/// Text measurement by shaping with cosmic-text.
///
/// All instances share one lazily created [`FontSystem`], since loading the
/// system font database is expensive.
#[derive(Debug, Clone, Copy, Default)]
pub struct FontMeasurer;

static FONT_SYSTEM: OnceLock<Mutex<FontSystem>> = OnceLock::new();

fn font_system() -> &'static Mutex<FontSystem> {
    FONT_SYSTEM.get_or_init(|| {
        info!("Initializing FontSystem");
        Mutex::new(FontSystem::new())
    })
}

impl FontMeasurer {
    pub fn new() -> Self {
        Self
    }
}

impl TextMeasurer for FontMeasurer {
    fn measure(&self, text: &str, font: &FontSpec) -> Size {
        if text.is_empty() {
            return Size::default();
        }

        let mut font_system = font_system()
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let line_height = font.size_px * LINE_HEIGHT_FACTOR;
        let metrics = Metrics::new(font.size_px, line_height);

        let mut buffer = Buffer::new(&mut font_system, metrics);
        let mut buffer = buffer.borrow_with(&mut font_system);

        let style = match font.style {
            FontStyle::Normal => Style::Normal,
            FontStyle::Italic => Style::Italic,
            FontStyle::Oblique => Style::Oblique,
        };
        let attrs = Attrs::new()
            .family(font_family(&font.family))
            .style(style)
            .weight(Weight(font.weight));

        buffer.set_size(None, None);
        buffer.set_text(text, &attrs, Shaping::Advanced, None);
        buffer.shape_until_scroll(true);

        let mut max_width: f32 = 0.0;
        let mut total_height: f32 = 0.0;
        let layout_runs: Vec<_> = buffer.layout_runs().collect();
        if layout_runs.is_empty() {
            max_width = text.chars().count() as f32 * (font.size_px * WIDTH_FACTOR);
            total_height = line_height;
        } else {
            for run in &layout_runs {
                if let Some(last) = run.glyphs.last() {
                    max_width = max_width.max(last.x + last.w);
                }
                total_height += line_height;
            }
        }

        Size::new(max_width, total_height)
    }
}

fn font_family(name: &str) -> Family<'_> {
    match name.to_ascii_lowercase().as_str() {
        "serif" => Family::Serif,
        "sans-serif" => Family::SansSerif,
        "monospace" => Family::Monospace,
        "cursive" => Family::Cursive,
        "fantasy" => Family::Fantasy,
        _ => Family::Name(name),
    }
}
