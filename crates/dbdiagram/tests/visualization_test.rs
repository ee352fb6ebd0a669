//! Integration tests for the shared measurement service.
//!
//! These drive a [`Visualization`] through its public API against an
//! in-memory host, with measurers whose output and call count are known.

use std::{cell::Cell, rc::Rc};

use float_cmp::assert_approx_eq;

use dbdiagram::{
    assets::{IconSet, StyleNames},
    attributes::TextAttributes,
    document::{Document, ReadyState},
    geometry::{BBox, Size},
    measure::{FontSpec, TextMeasurer},
    visualization::{Error, Lifecycle, Memo, Visualization, VisualizationRegistry},
};

const HOST: &str = r#"<svg xmlns="http://www.w3.org/2000/svg">
  <defs>
    <symbol id="dbdg-table-icon" width="24" height="24"/>
    <symbol id="dbdg-primary-key-icon" width="16" height="16"/>
    <symbol id="dbdg-foreign-key-icon" width="16" height="16"/>
    <symbol id="dbdg-unique-key-icon" width="16" height="16"/>
    <rect id="dbdg-link-icon" width="10" height="6"/>
  </defs>
</svg>"#;

/// Reports the same size for every text and counts its calls.
struct FixedMeasurer {
    size: Size,
    calls: Cell<usize>,
}

impl FixedMeasurer {
    fn new(width: f32, height: f32) -> Rc<Self> {
        Rc::new(Self {
            size: Size::new(width, height),
            calls: Cell::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl TextMeasurer for FixedMeasurer {
    fn measure(&self, text: &str, _font: &FontSpec) -> Size {
        self.calls.set(self.calls.get() + 1);
        if text.is_empty() {
            Size::default()
        } else {
            self.size
        }
    }
}

fn setup(icons: IconSet) -> (Rc<Document>, Rc<Visualization>, Rc<FixedMeasurer>) {
    let measurer = FixedMeasurer::new(40.0, 14.0);
    let registry = VisualizationRegistry::new(icons, StyleNames::default(), measurer.clone());
    let host = Document::parse(HOST).expect("Failed to parse host");
    let visualization = registry.get_instance(&host);
    host.set_ready_state(ReadyState::Complete);
    (host, visualization, measurer)
}

#[test]
fn test_header_scenario() {
    let (_host, visualization, _measurer) = setup(IconSet::default());

    let header = visualization.table_header_size("DUMP").unwrap();
    assert_eq!(header, BBox::new(-6.0, -8.0, 76.0, 40.0));
    assert!(header.width() >= 40.0 + 12.0);
    assert!(header.height() >= 24.0 + 16.0);

    // Deterministic across calls.
    assert_eq!(visualization.table_header_size("DUMP").unwrap(), header);
}

#[test]
fn test_memoized_getters_measure_once() {
    let (_host, visualization, measurer) = setup(IconSet::default());
    let after_warm_up = measurer.calls();

    let header = visualization.table_header_height().unwrap();
    let footer = visualization.table_footer_height().unwrap();
    let field = visualization.table_field_height().unwrap();
    assert_eq!(measurer.calls(), after_warm_up);

    assert_eq!(visualization.table_header_height().unwrap(), header);
    assert_eq!(visualization.table_footer_height().unwrap(), footer);
    assert_eq!(visualization.table_field_height().unwrap(), field);
    assert_eq!(measurer.calls(), after_warm_up);

    assert_approx_eq!(f32, header, 40.0);
    assert_approx_eq!(f32, footer, 14.0 + 16.0);
    assert_approx_eq!(f32, field, 16.0 + 8.0);
}

#[test]
fn test_memos_are_explicit_tri_state() {
    let host = Document::parse(HOST).unwrap();
    let registry = VisualizationRegistry::new(
        IconSet::default(),
        StyleNames::default(),
        FixedMeasurer::new(40.0, 14.0),
    );
    let visualization = registry.get_instance(&host);
    assert_eq!(visualization.layout_memos().header_height, Memo::Uncomputed);

    host.set_ready_state(ReadyState::Interactive);
    let memos = visualization.layout_memos();
    assert_eq!(memos.header_height, Memo::Computed(40.0));
    assert_eq!(memos.field_icon_width, Memo::Computed(28.0));
}

#[test]
fn test_force_recompute_replaces_cache() {
    let (host, visualization, _measurer) = setup(IconSet::default());
    let id = "dbdg-primary-key-icon";
    assert_eq!(
        visualization.icon_element_size(id, false).unwrap().width(),
        16.0
    );

    assert!(host.update_element(id, |element| element.set_attribute("width", "30")));

    // The cache still answers until forced.
    assert_eq!(
        visualization.icon_element_size(id, false).unwrap().width(),
        16.0
    );

    let remeasured = Cell::new(false);
    let forced = visualization
        .icon_element_size_with(id, true, |_| remeasured.set(true))
        .unwrap();
    assert!(remeasured.get());
    assert_eq!(forced.width(), 30.0);
    assert_eq!(visualization.cached_icon_size(id), Some(forced));
    assert_eq!(
        visualization.icon_element_size(id, false).unwrap().width(),
        30.0
    );

    // Derived constants were invalidated and pick up the new icon.
    assert_eq!(visualization.layout_memos().field_icon_width, Memo::Stale);
    assert_approx_eq!(f32, visualization.table_field_icon_width().unwrap(), 42.0);
    assert_eq!(
        visualization.layout_memos().field_icon_width,
        Memo::Computed(42.0)
    );
}

#[test]
fn test_forced_remeasure_of_unchanged_icon_keeps_memos() {
    let (_host, visualization, _measurer) = setup(IconSet::default());
    let before = visualization.layout_memos();
    visualization
        .icon_element_size("dbdg-table-icon", true)
        .unwrap();
    assert_eq!(visualization.layout_memos(), before);
}

#[test]
fn test_missing_icon_leaves_no_cache_entry() {
    let (_host, visualization, _measurer) = setup(IconSet::default());
    let err = visualization
        .icon_element_size("does-not-exist", false)
        .unwrap_err();
    assert_eq!(
        err,
        Error::IconNotFound {
            id: "does-not-exist".to_string()
        }
    );
    assert_eq!(err.to_string(), "Element id: does-not-exist not found");
    assert!(visualization.cached_icon_size("does-not-exist").is_none());

    // The instance is still usable.
    assert!(visualization.table_header_height().is_ok());
}

#[test]
fn test_warm_up_skips_failing_icons() {
    let icons = IconSet::default()
        .with_extra("note", "dbdg-note-icon")
        .with_extra("link", "dbdg-link-icon");
    let (_host, visualization, _measurer) = setup(icons);

    assert!(visualization.update_properties_value().is_ok());
    for id in [
        "dbdg-table-icon",
        "dbdg-primary-key-icon",
        "dbdg-foreign-key-icon",
        "dbdg-unique-key-icon",
    ] {
        assert!(visualization.cached_icon_size(id).is_some(), "{id} cached");
    }
    assert!(visualization.cached_icon_size("dbdg-note-icon").is_none());
    assert_eq!(
        visualization.cached_icon_size("dbdg-link-icon"),
        Some(BBox::new(0.0, 0.0, 10.0, 6.0))
    );
}

#[test]
fn test_text_element_hygiene() {
    let (_host, visualization, _measurer) = setup(IconSet::default());
    let attribute_sets = [
        TextAttributes::new().with_font_family("Arial"),
        TextAttributes::new()
            .with_font_size("12px")
            .with_font_weight("bold"),
        TextAttributes::new()
            .with_font_style("italic")
            .with_font_family("'Fira Code'"),
    ];
    for attributes in &attribute_sets {
        visualization.measure_text("orders", attributes).unwrap();
        let text = visualization.surface().text_snapshot().unwrap();
        assert_eq!(text.attribute_names().collect::<Vec<_>>(), ["visibility"]);
        assert_eq!(text.text_content(), "");
    }
}

#[test]
fn test_measurement_before_ready() {
    let host = Document::parse(HOST).unwrap();
    let registry = VisualizationRegistry::new(
        IconSet::default(),
        StyleNames::default(),
        FixedMeasurer::new(1.0, 1.0),
    );
    let visualization = registry.get_instance(&host);

    assert_eq!(visualization.lifecycle(), Lifecycle::Pending);
    assert_eq!(visualization.table_header_height(), Err(Error::NotReady));
    assert_eq!(visualization.update_properties_value(), Err(Error::NotReady));
}

#[test]
fn test_instance_for_already_loaded_host_is_ready() {
    let host = Document::parse(HOST).unwrap();
    host.set_ready_state(ReadyState::Complete);
    let registry = VisualizationRegistry::new(
        IconSet::default(),
        StyleNames::default(),
        FixedMeasurer::new(1.0, 1.0),
    );
    let visualization = registry.get_instance(&host);
    assert_eq!(visualization.lifecycle(), Lifecycle::Ready);
    assert!(registry.contains(host.id()));
}

#[test]
fn test_fragments_get_their_own_instance() {
    let owner = Document::parse(HOST).unwrap();
    let fragment = Document::parse_fragment(
        &owner,
        r#"<svg><symbol id="dbdg-table-icon" width="48" height="48"/></svg>"#,
    )
    .unwrap();

    let registry = VisualizationRegistry::new(
        IconSet::default(),
        StyleNames::default(),
        FixedMeasurer::new(40.0, 14.0),
    );
    let page = registry.get_instance(&owner);
    let island = registry.get_instance(&fragment);
    assert!(!Rc::ptr_eq(&page, &island));
    assert_eq!(registry.len(), 2);

    // Readiness comes from the owner.
    assert_eq!(island.lifecycle(), Lifecycle::Pending);
    owner.set_ready_state(ReadyState::Complete);
    assert_eq!(island.lifecycle(), Lifecycle::Ready);

    // Icons resolve in the fragment's own id space.
    assert_eq!(
        island.icon_element_size("dbdg-table-icon", false).unwrap().width(),
        48.0
    );
    assert_eq!(
        page.icon_element_size("dbdg-table-icon", false).unwrap().width(),
        24.0
    );
    assert!(matches!(
        island.icon_element_size("dbdg-primary-key-icon", false),
        Err(Error::IconNotFound { .. })
    ));
}

#[test]
fn test_default_registry_shares_instances() {
    let host = Document::parse(HOST).unwrap();
    let first = Visualization::get_instance(&host);
    let second = Visualization::get_instance(&host);
    assert!(Rc::ptr_eq(&first, &second));
}
