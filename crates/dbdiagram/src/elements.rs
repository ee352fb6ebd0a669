//! Factories for the SVG elements every diagram shares.

use std::rc::Rc;

use svg::node::element::{SVG, Use};

use dbdiagram_core::{
    assets::StyleNames,
    attributes::{Attributes, SvgRootAttributes, UseAttributes},
};

use crate::document::Document;

/// A `<use>` element referencing the icon `id`.
///
/// `id` always wins over an `href` in `attributes`.
pub fn reference_icon(id: &str, attributes: &UseAttributes) -> Use {
    let mut element = Use::new();
    for (name, value) in attributes.entries() {
        if name != "href" {
            element = element.set(name, value);
        }
    }
    element.set("href", format!("#{id}"))
}

/// The root `<svg>` of a diagram: the root class and full size.
///
/// Entries in `attributes` are applied afterwards and override the
/// defaults.
pub fn svg_root(styles: &StyleNames, attributes: &SvgRootAttributes) -> SVG {
    let mut element = SVG::new()
        .set("class", styles.root_class())
        .set("width", "100%")
        .set("height", "100%");
    for (name, value) in attributes.entries() {
        element = element.set(name, value);
    }
    element
}

/// Runs `callback` once `host` has finished loading, immediately when it
/// already has.
pub fn on_dom_ready(host: &Rc<Document>, callback: impl FnOnce() + 'static) {
    host.on_ready(callback);
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use crate::document::ReadyState;

    use super::*;

    #[test]
    fn test_reference_icon_href() {
        let attributes = UseAttributes {
            href: Some("#elsewhere".to_string()),
            width: Some(16.0),
            class: Some("key".to_string()),
            ..Default::default()
        };
        let markup = reference_icon("dbdg-primary-key-icon", &attributes).to_string();
        assert!(markup.contains(r##"href="#dbdg-primary-key-icon""##));
        assert!(!markup.contains("#elsewhere"));
        assert!(markup.contains(r#"width="16""#));
        assert!(markup.contains(r#"class="key""#));
    }

    #[test]
    fn test_svg_root_defaults() {
        let markup = svg_root(&StyleNames::default(), &SvgRootAttributes::default()).to_string();
        assert!(markup.contains(r#"class="dbdg""#));
        assert!(markup.contains(r#"width="100%""#));
        assert!(markup.contains(r#"height="100%""#));
    }

    #[test]
    fn test_svg_root_overrides() {
        let attributes = SvgRootAttributes {
            class: Some("dbdg dark".to_string()),
            height: Some("480".to_string()),
            ..Default::default()
        };
        let markup = svg_root(&StyleNames::default(), &attributes).to_string();
        assert!(markup.contains(r#"class="dbdg dark""#));
        assert!(markup.contains(r#"height="480""#));
        assert!(!markup.contains(r#"height="100%""#));
    }

    #[test]
    fn test_on_dom_ready_waits_for_host() {
        let host = Document::parse("<svg/>").unwrap();
        let fired = Rc::new(Cell::new(false));

        let flag = Rc::clone(&fired);
        on_dom_ready(&host, move || flag.set(true));
        assert!(!fired.get());

        host.set_ready_state(ReadyState::Complete);
        assert!(fired.get());
    }
}
