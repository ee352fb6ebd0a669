//! The hidden measurement surface.
//!
//! Every text measurement goes through one shared `<text>` element that
//! lives inside an invisible 1×1 `<svg>` container. The element is reused
//! for every call, so it is only reachable through a [`TextScratch`] guard
//! which restores it to its pristine state when dropped, whatever path the
//! measurement took.

use std::cell::{RefCell, RefMut};

use dbdiagram_core::{
    attributes::{Attributes, apply_attributes},
    dom::Element,
};

use crate::visualization::Error;

/// The one attribute the shared text element keeps between measurements.
pub const VISIBILITY_ATTRIBUTE: &str = "visibility";

const SURFACE_STYLE: &str =
    "position: absolute; z-index: -1; top: 0; left: 0; width: 1px; height: 1px";

/// An invisible container holding the shared text element.
#[derive(Debug)]
pub struct MeasureSurface {
    container: Element,
    text: RefCell<Element>,
}

impl Default for MeasureSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl MeasureSurface {
    pub fn new() -> Self {
        let mut container = Element::new("svg");
        apply_attributes(
            &mut container,
            &[
                ("style", SURFACE_STYLE),
                (VISIBILITY_ATTRIBUTE, "hidden"),
            ][..],
        );

        let mut text = Element::new("text");
        text.set_attribute(VISIBILITY_ATTRIBUTE, "hidden");

        Self {
            container,
            text: RefCell::new(text),
        }
    }

    /// Acquires the shared text element for one measurement.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SurfaceBusy`] while another guard is alive.
    pub fn acquire(&self) -> Result<TextScratch<'_>, Error> {
        let text = self.text.try_borrow_mut().map_err(|_| Error::SurfaceBusy)?;
        Ok(TextScratch { text })
    }

    /// A copy of the shared text element, `None` while it is acquired.
    pub fn text_snapshot(&self) -> Option<Element> {
        self.text.try_borrow().ok().map(|text| text.clone())
    }

    /// The full surface subtree, as attached to the host document.
    pub fn to_element(&self) -> Element {
        let mut container = self.container.clone();
        if let Some(text) = self.text_snapshot() {
            container.append_child(text);
        }
        container
    }
}

/// Exclusive access to the shared text element.
///
/// Dropping the guard removes every attribute except `visibility` and clears
/// the text content.
pub struct TextScratch<'a> {
    text: RefMut<'a, Element>,
}

impl TextScratch<'_> {
    pub fn set_text(&mut self, text: &str) {
        self.text.set_text_content(text);
    }

    pub fn apply<A>(&mut self, attributes: &A) -> &mut Self
    where
        A: Attributes + ?Sized,
    {
        apply_attributes(&mut self.text, attributes);
        self
    }

    pub fn element(&self) -> &Element {
        &self.text
    }
}

impl Drop for TextScratch<'_> {
    fn drop(&mut self) {
        let stale: Vec<String> = self
            .text
            .attribute_names()
            .filter(|name| *name != VISIBILITY_ATTRIBUTE)
            .map(str::to_string)
            .collect();
        for name in stale {
            self.text.remove_attribute(&name);
        }
        self.text.set_text_content("");
    }
}

#[cfg(test)]
mod tests {
    use dbdiagram_core::attributes::TextAttributes;

    use super::*;

    #[test]
    fn test_new_surface_is_hidden() {
        let surface = MeasureSurface::new();
        let element = surface.to_element();
        assert_eq!(element.name(), "svg");
        assert_eq!(element.attribute("visibility"), Some("hidden"));
        assert!(element.attribute("style").unwrap().contains("width: 1px;"));

        let text = element.child_elements().next().unwrap();
        assert_eq!(text.name(), "text");
        assert_eq!(text.attribute_names().collect::<Vec<_>>(), ["visibility"]);
    }

    #[test]
    fn test_scratch_resets_on_drop() {
        let surface = MeasureSurface::new();
        {
            let mut scratch = surface.acquire().unwrap();
            scratch.set_text("DUMP");
            scratch.apply(
                &TextAttributes::new()
                    .with_font_family("Arial")
                    .with_font_size("14px"),
            );
            assert_eq!(scratch.element().text_content(), "DUMP");
            assert_eq!(scratch.element().attribute("font-size"), Some("14px"));
        }

        let text = surface.text_snapshot().unwrap();
        assert_eq!(text.attribute_names().collect::<Vec<_>>(), ["visibility"]);
        assert_eq!(text.text_content(), "");
    }

    #[test]
    fn test_second_acquire_is_busy() {
        let surface = MeasureSurface::new();
        let _scratch = surface.acquire().unwrap();
        assert!(matches!(surface.acquire(), Err(Error::SurfaceBusy)));
        assert!(surface.text_snapshot().is_none());
    }

    #[test]
    fn test_visibility_survives_override() {
        let surface = MeasureSurface::new();
        {
            let mut scratch = surface.acquire().unwrap();
            scratch.apply(&[("visibility", "visible"), ("x", "3")][..]);
        }
        let text = surface.text_snapshot().unwrap();
        assert_eq!(text.attribute("visibility"), Some("visible"));
        assert!(!text.has_attribute("x"));
    }
}
