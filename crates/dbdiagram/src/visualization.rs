//! The shared measurement service.
//!
//! A [`Visualization`] pre-computes and memoizes the pixel geometry of the
//! reusable pieces of a table: icons, the header and footer bands and a field
//! row. Every table and field element of one host document asks the same
//! instance, so they all lay out with identical numbers.
//!
//! # Overview
//!
//! - [`VisualizationRegistry`] - Maps each host document to its instance.
//!   [`Visualization::get_instance`] uses a per-thread default registry.
//! - [`Visualization`] - Measures text and icons against a hidden
//!   [`MeasureSurface`] and caches the results.
//! - [`Lifecycle`] - `Pending` until the host signals readiness, then
//!   `Ready` for good.
//! - [`Memo`] / [`LayoutMemos`] - The derived constants and whether they are
//!   currently valid.
//!
//! # Lifecycle
//!
//! An instance is created `Pending` on the first lookup for a host. Once the
//! host leaves [`ReadyState::Loading`](crate::document::ReadyState::Loading)
//! the surface is attached to the host, the instance becomes `Ready` and
//! [`Visualization::update_properties_value`] runs a full measurement pass.
//! If the host is already loaded, all of this happens during the lookup.
//! Measurements requested while `Pending` fail with [`Error::NotReady`].
//!
//! # Row geometry
//!
//! Segments of a row are laid out side by side with
//! [`ExtendMode::Stack`]: widths add up and the row is as tall as its
//! tallest segment. Alternatives for the same slot (the three key icons, the
//! name fonts of the four field kinds) are combined with
//! [`ExtendMode::Overlay`].
//!
//! # Example
//!
//! ```
//! # use std::rc::Rc;
//! # use dbdiagram::{
//! #     config::{AppConfig, MeasurementConfig, MeasurerKind},
//! #     document::{Document, ReadyState},
//! #     visualization::VisualizationRegistry,
//! # };
//! let host = Document::parse(
//!     r#"<svg xmlns="http://www.w3.org/2000/svg">
//!          <symbol id="dbdg-table-icon" width="24" height="24"/>
//!        </svg>"#,
//! )
//! .unwrap();
//! let measurement = MeasurementConfig::default().with_measurer(MeasurerKind::Approximate);
//! let config = AppConfig::new(Default::default(), Default::default(), measurement);
//! let registry = VisualizationRegistry::from_config(&config);
//!
//! let visualization = registry.get_instance(&host);
//! assert!(visualization.table_header_height().is_err());
//!
//! host.set_ready_state(ReadyState::Complete);
//! let icon = visualization.icon_element_size("dbdg-table-icon", false).unwrap();
//! assert_eq!(icon.width(), 24.0);
//! ```

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    fmt,
    rc::{Rc, Weak},
};

use indexmap::IndexMap;
use log::{debug, info, warn};
use thiserror::Error;

use dbdiagram_core::{
    assets::{FontAttribute, FontProperties, IconSet, StyleNames},
    attributes::{TextAttributes, attribute_number},
    css::{StyleDeclaration, strip_quotes},
    dom::Element,
    field::{DataType, Field, FieldKind},
    geometry::{BBox, ExtendMode, Padding},
};

use crate::{
    config::AppConfig,
    document::{Document, HostId, InlineStyle},
    measure::{FontSpec, TextMeasurer},
    surface::MeasureSurface,
};

/// Table name measured when none is given.
pub const DEFAULT_TABLE_NAME: &str = "DUMP";

/// Engine label measured for the footer when none is given.
pub const DEFAULT_ENGINE_LABEL: &str = "Unknown";

/// Footer text measured when none is given.
pub const DEFAULT_FOOTER_TEXT: &str = "Footer";

/// Field measured for the canonical field row.
const SAMPLE_FIELD_NAME: &str = "Field";

/// Errors raised by measurement operations.
///
/// None of them affects the instance itself: the failed call leaves every
/// cache as it was and may be retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Element id: {id} not found")]
    IconNotFound { id: String },

    #[error("Element id: {id} is not a graphical element (<{tag}>)")]
    NotGraphical { id: String, tag: String },

    #[error("host document has not finished loading")]
    NotReady,

    #[error("measurement surface is already in use")]
    SurfaceBusy,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Where an instance is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Created; waiting for the host to finish loading.
    Pending,
    /// Surface attached; measurements are valid.
    Ready,
}

/// A memoized derived value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Memo {
    /// Never computed.
    #[default]
    Uncomputed,
    Computed(f32),
    /// Invalidated by a forced recomputation; recomputed on next read.
    Stale,
}

impl Memo {
    pub fn value(self) -> Option<f32> {
        match self {
            Self::Computed(value) => Some(value),
            Self::Uncomputed | Self::Stale => None,
        }
    }

    fn invalidate(self) -> Self {
        match self {
            Self::Uncomputed => Self::Uncomputed,
            Self::Computed(_) | Self::Stale => Self::Stale,
        }
    }
}

/// The four derived layout constants.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayoutMemos {
    pub header_height: Memo,
    pub footer_height: Memo,
    pub field_height: Memo,
    pub field_icon_width: Memo,
}

impl LayoutMemos {
    fn invalidate(self) -> Self {
        Self {
            header_height: self.header_height.invalidate(),
            footer_height: self.footer_height.invalidate(),
            field_height: self.field_height.invalidate(),
            field_icon_width: self.field_icon_width.invalidate(),
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Maps host documents to their [`Visualization`].
///
/// The registry only keeps weak handles: an instance, and the host it
/// measures, live as long as some caller holds the returned `Rc`. Lookups
/// after the last holder is gone create a fresh instance.
pub struct VisualizationRegistry {
    icons: IconSet,
    styles: StyleNames,
    fallback_font: FontSpec,
    measurer: Rc<dyn TextMeasurer>,
    instances: RefCell<HashMap<HostId, Weak<Visualization>>>,
}

impl fmt::Debug for VisualizationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisualizationRegistry")
            .field("instances", &self.len())
            .finish_non_exhaustive()
    }
}

thread_local! {
    static DEFAULT_REGISTRY: VisualizationRegistry =
        VisualizationRegistry::from_config(&AppConfig::default());
}

impl VisualizationRegistry {
    /// Creates an empty registry whose instances share `measurer`.
    pub fn new(icons: IconSet, styles: StyleNames, measurer: Rc<dyn TextMeasurer>) -> Self {
        Self {
            icons,
            styles,
            fallback_font: FontSpec::default(),
            measurer,
            instances: RefCell::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.icons().clone(),
            config.styles().clone(),
            config.measurement().build_measurer(),
        )
        .with_fallback_font(config.measurement().fallback_font())
    }

    /// Sets the font assumed for attributes the host leaves unset.
    pub fn with_fallback_font(mut self, font: FontSpec) -> Self {
        self.fallback_font = font;
        self
    }

    /// Resolves the instance bound to `host`, creating it on first request.
    ///
    /// A new instance is `Pending`; it becomes `Ready` when `host` finishes
    /// loading, which may already be the case when this returns.
    pub fn get_instance(&self, host: &Rc<Document>) -> Rc<Visualization> {
        let existing = self.instances.borrow().get(&host.id()).and_then(Weak::upgrade);
        if let Some(existing) = existing {
            return existing;
        }
        self.prune();

        let visualization = Rc::new(Visualization::new(
            Rc::clone(host),
            self.icons.clone(),
            self.styles.clone(),
            self.fallback_font.clone(),
            Rc::clone(&self.measurer),
        ));
        self.instances
            .borrow_mut()
            .insert(host.id(), Rc::downgrade(&visualization));
        info!(host:% = host.id(), fragment = host.is_fragment(); "Created visualization");

        Visualization::schedule_ready(&visualization);
        visualization
    }

    /// Whether a live instance exists for `host`.
    pub fn contains(&self, host: HostId) -> bool {
        self.instances
            .borrow()
            .get(&host)
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.instances
            .borrow()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets instances nobody holds anymore.
    fn prune(&self) {
        let mut instances = self.instances.borrow_mut();
        let before = instances.len();
        instances.retain(|_, weak| weak.strong_count() > 0);
        if instances.len() < before {
            debug!(dropped = before - instances.len(); "Pruned visualization registry");
        }
    }
}

// =============================================================================
// Visualization
// =============================================================================

/// Shared geometry of one host document.
pub struct Visualization {
    host: Rc<Document>,
    icons: IconSet,
    styles: StyleNames,
    fallback_font: FontSpec,
    measurer: Rc<dyn TextMeasurer>,
    surface: MeasureSurface,
    lifecycle: Cell<Lifecycle>,
    icon_sizes: RefCell<IndexMap<String, BBox>>,
    memos: Cell<LayoutMemos>,
}

impl fmt::Debug for Visualization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Visualization")
            .field("host", &self.host.id())
            .field("lifecycle", &self.lifecycle.get())
            .field("icon_sizes", &self.icon_sizes.borrow())
            .field("memos", &self.memos.get())
            .finish_non_exhaustive()
    }
}

impl Visualization {
    /// Padding around every text inside a table.
    pub const TABLE_TEXT_PADDING: Padding = Padding::new(6.0, 6.0, 8.0, 8.0);

    /// Padding around a field row.
    pub const TABLE_FIELD_PADDING: Padding = Padding::new(6.0, 6.0, 4.0, 4.0);

    /// Minimum gap between a field name and its type.
    pub const FIELD_NAME_TYPE_SPACING: f32 = 20.0;

    /// Resolves the instance bound to `host` in this thread's default
    /// registry, which uses [`AppConfig::default`].
    pub fn get_instance(host: &Rc<Document>) -> Rc<Visualization> {
        DEFAULT_REGISTRY.with(|registry| registry.get_instance(host))
    }

    fn new(
        host: Rc<Document>,
        icons: IconSet,
        styles: StyleNames,
        fallback_font: FontSpec,
        measurer: Rc<dyn TextMeasurer>,
    ) -> Self {
        Self {
            host,
            icons,
            styles,
            fallback_font,
            measurer,
            surface: MeasureSurface::new(),
            lifecycle: Cell::new(Lifecycle::Pending),
            icon_sizes: RefCell::new(IndexMap::new()),
            memos: Cell::new(LayoutMemos::default()),
        }
    }

    /// Arranges for the instance to become ready with its host.
    ///
    /// The host only keeps a weak handle, so a dropped instance is never
    /// revived by a late readiness signal.
    fn schedule_ready(this: &Rc<Self>) {
        let weak: Weak<Self> = Rc::downgrade(this);
        this.host.on_ready(move || {
            if let Some(visualization) = weak.upgrade() {
                visualization.activate();
            }
        });
    }

    fn activate(&self) {
        if self.lifecycle.get() == Lifecycle::Ready {
            return;
        }
        self.host.append_surface(self.surface.to_element());
        self.lifecycle.set(Lifecycle::Ready);
        info!(host:% = self.host.id(); "Visualization ready");

        if let Err(err) = self.update_properties_value() {
            warn!(host:% = self.host.id(), err:% = err; "Initial measurement pass failed");
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn host(&self) -> &Rc<Document> {
        &self.host
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle.get()
    }

    /// The icon registry this instance measures.
    pub fn icons(&self) -> &IconSet {
        &self.icons
    }

    /// The style registry this instance reads fonts through.
    pub fn styles(&self) -> &StyleNames {
        &self.styles
    }

    /// Current state of the derived constants.
    pub fn layout_memos(&self) -> LayoutMemos {
        self.memos.get()
    }

    /// The cached box of an icon, without measuring.
    pub fn cached_icon_size(&self, id: &str) -> Option<BBox> {
        self.icon_sizes.borrow().get(id).copied()
    }

    pub fn surface(&self) -> &MeasureSurface {
        &self.surface
    }

    /// The computed style of the host root element.
    pub fn read_only_element_style(&self) -> StyleDeclaration {
        self.host.computed_style()
    }

    /// The inline style of the host root element.
    pub fn writable_element_style(&self) -> InlineStyle<'_> {
        self.host.inline_style()
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.lifecycle.get() {
            Lifecycle::Ready => Ok(()),
            Lifecycle::Pending => Err(Error::NotReady),
        }
    }

    // =========================================================================
    // Icons
    // =========================================================================

    /// Returns the box of icon `id`, measuring it when not cached or when
    /// `force` is set.
    ///
    /// # Errors
    ///
    /// - [`Error::IconNotFound`] when the host has no element `id`.
    /// - [`Error::NotGraphical`] when the element is neither a `<symbol>`
    ///   nor a graphics element.
    /// - [`Error::NotReady`] before the host has finished loading.
    pub fn icon_element_size(&self, id: &str, force: bool) -> Result<BBox> {
        self.icon_element_size_with(id, force, |_| {})
    }

    /// Like [`Visualization::icon_element_size`], calling `on_measure` with
    /// the icon definition when, and only when, it is (re)measured.
    pub fn icon_element_size_with(
        &self,
        id: &str,
        force: bool,
        on_measure: impl FnOnce(&Element),
    ) -> Result<BBox> {
        self.ensure_ready()?;
        if !force {
            if let Some(cached) = self.cached_icon_size(id) {
                return Ok(cached);
            }
        }

        let element = self
            .host
            .element_by_id(id)
            .ok_or_else(|| Error::IconNotFound { id: id.to_string() })?;

        let bbox = if element.name() == "symbol" {
            // Symbols are never rendered; their geometry is declared.
            BBox::new(
                attribute_number(&element, "x"),
                attribute_number(&element, "y"),
                attribute_number(&element, "width"),
                attribute_number(&element, "height"),
            )
        } else {
            self.host
                .bbox(&element)
                .ok_or_else(|| Error::NotGraphical {
                    id: id.to_string(),
                    tag: element.name().to_string(),
                })?
        };

        let previous = self.icon_sizes.borrow_mut().insert(id.to_string(), bbox);
        if previous.is_some_and(|previous| previous != bbox) {
            self.memos.set(self.memos.get().invalidate());
        }
        debug!(id, force, bbox:?; "Measured icon");

        on_measure(&element);
        Ok(bbox)
    }

    // =========================================================================
    // Text
    // =========================================================================

    /// Measures `text` rendered with `attributes` on the shared text element.
    ///
    /// The element is reset afterwards to carry nothing but its visibility.
    ///
    /// # Errors
    ///
    /// [`Error::NotReady`] before the host has finished loading and
    /// [`Error::SurfaceBusy`] when called while another measurement holds
    /// the surface.
    pub fn measure_text(&self, text: &str, attributes: &TextAttributes) -> Result<BBox> {
        self.ensure_ready()?;
        let mut scratch = self.surface.acquire()?;
        scratch.set_text(text);
        scratch.apply(attributes);

        let element = scratch.element();
        let font = FontSpec::from_element(element, &self.fallback_font);
        let size = self.measurer.measure(&element.text_content(), &font);
        Ok(BBox::from_size(size))
    }

    /// Text attributes read from a font's custom properties.
    fn font_attributes(&self, font: &FontProperties) -> TextAttributes {
        self.font_attributes_with(|attribute| font.property(attribute).to_string())
    }

    fn font_attributes_with(&self, property: impl Fn(FontAttribute) -> String) -> TextAttributes {
        let style = self.read_only_element_style();
        let value = |attribute| strip_quotes(style.property_value(&property(attribute))).to_string();
        TextAttributes::new()
            .with_font_family(value(FontAttribute::Family))
            .with_font_size(value(FontAttribute::Size))
            .with_font_style(value(FontAttribute::Style))
            .with_font_weight(value(FontAttribute::Weight))
    }

    // =========================================================================
    // Table geometry
    // =========================================================================

    /// The size of a table header: the table icon followed by the name,
    /// inside [`Self::TABLE_TEXT_PADDING`].
    pub fn table_header_size(&self, name: &str) -> Result<BBox> {
        let text = self.table_header_text_size(name)?;
        let icon = self.icon_element_size(self.icons.table(), false)?;
        Ok(icon
            .editable()
            .extend(text, ExtendMode::Stack)
            .padding(Self::TABLE_TEXT_PADDING)
            .finish())
    }

    /// The size of a table name in the title font.
    pub fn table_header_text_size(&self, name: &str) -> Result<BBox> {
        let attributes = self.font_attributes(self.styles.table_title_font());
        self.measure_text(name, &attributes)
    }

    /// The size of a table footer showing `engine`, padding included.
    pub fn table_footer_size(&self, engine: &str) -> Result<BBox> {
        Ok(self
            .table_footer_text_size(engine)?
            .editable()
            .padding(Self::TABLE_TEXT_PADDING)
            .finish())
    }

    /// The size of `text` in the footer font.
    pub fn table_footer_text_size(&self, text: &str) -> Result<BBox> {
        let attributes = self.font_attributes(self.styles.table_footer_font());
        self.measure_text(text, &attributes)
    }

    /// The canonical field row.
    ///
    /// The row holds a key icon slot wide and tall enough for any key icon,
    /// the name in whichever field kind font is largest, the name/type gap
    /// and the type label, inside [`Self::TABLE_FIELD_PADDING`].
    pub fn table_field_size(&self) -> Result<BBox> {
        let icon_slot = self.key_icon_slot()?;

        let mut field = Field::new(SAMPLE_FIELD_NAME, DataType::Int);
        let mut name = self.table_text_field_variable_size(&field)?;
        for kind in FieldKind::KEYS {
            field = field.with_kind(kind);
            let kind_name = self.table_text_field_variable_size(&field)?;
            name = name.editable().extend(kind_name, ExtendMode::Overlay).finish();
        }
        let data_type = self.table_text_field_type_size(&field)?;

        Ok(icon_slot
            .editable()
            .extend(name, ExtendMode::Stack)
            .extend(
                BBox::new(0.0, 0.0, Self::FIELD_NAME_TYPE_SPACING, 0.0),
                ExtendMode::Stack,
            )
            .extend(data_type, ExtendMode::Stack)
            .padding(Self::TABLE_FIELD_PADDING)
            .finish())
    }

    /// The size of a field name in the font of its kind.
    pub fn table_text_field_variable_size(&self, field: &Field) -> Result<BBox> {
        let kind = field.effective_kind();
        let attributes =
            self.font_attributes_with(|attribute| self.styles.field_text_property(kind, attribute));
        self.measure_text(field.name(), &attributes)
    }

    /// The size of a field's upper-case type label in the type font.
    pub fn table_text_field_type_size(&self, field: &Field) -> Result<BBox> {
        let attributes = self.font_attributes(self.styles.field_type_font());
        self.measure_text(field.data_type().label(), &attributes)
    }

    /// The three key icons drawn over each other.
    fn key_icon_slot(&self) -> Result<BBox> {
        let primary = self.icon_element_size(self.icons.primary_key(), false)?;
        let foreign = self.icon_element_size(self.icons.foreign_key(), false)?;
        let unique = self.icon_element_size(self.icons.unique_key(), false)?;
        Ok(primary
            .editable()
            .extend(foreign, ExtendMode::Overlay)
            .extend(unique, ExtendMode::Overlay)
            .finish())
    }

    // =========================================================================
    // Derived constants
    // =========================================================================

    /// Height of a table header for [`DEFAULT_TABLE_NAME`].
    pub fn table_header_height(&self) -> Result<f32> {
        self.memoized(
            |memos| &mut memos.header_height,
            || Ok(self.table_header_size(DEFAULT_TABLE_NAME)?.height()),
        )
    }

    /// Height of a table footer for [`DEFAULT_ENGINE_LABEL`].
    pub fn table_footer_height(&self) -> Result<f32> {
        self.memoized(
            |memos| &mut memos.footer_height,
            || Ok(self.table_footer_size(DEFAULT_ENGINE_LABEL)?.height()),
        )
    }

    /// Height of the canonical field row.
    pub fn table_field_height(&self) -> Result<f32> {
        self.memoized(
            |memos| &mut memos.field_height,
            || Ok(self.table_field_size()?.height()),
        )
    }

    /// Width of the key icon slot, text padding included.
    pub fn table_field_icon_width(&self) -> Result<f32> {
        self.memoized(
            |memos| &mut memos.field_icon_width,
            || {
                Ok(self
                    .key_icon_slot()?
                    .editable()
                    .padding(Self::TABLE_TEXT_PADDING)
                    .width())
            },
        )
    }

    fn memoized(
        &self,
        slot: fn(&mut LayoutMemos) -> &mut Memo,
        compute: impl FnOnce() -> Result<f32>,
    ) -> Result<f32> {
        let mut memos = self.memos.get();
        if let Memo::Computed(value) = *slot(&mut memos) {
            return Ok(value);
        }

        let value = compute()?;
        // Computing may have touched other memos.
        let mut memos = self.memos.get();
        *slot(&mut memos) = Memo::Computed(value);
        self.memos.set(memos);
        debug!(value; "Computed layout constant");
        Ok(value)
    }

    /// Re-measures every icon and recomputes the derived constants.
    ///
    /// Icons are measured best-effort: an icon that fails is skipped so an
    /// optional or missing icon never aborts the pass.
    ///
    /// # Errors
    ///
    /// Fails when the host is not ready or when one of the derived constants
    /// cannot be computed.
    pub fn update_properties_value(&self) -> Result<()> {
        self.ensure_ready()?;
        self.memos.set(self.memos.get().invalidate());

        for (name, id) in self.icons.iter() {
            if let Err(err) = self.icon_element_size(id, true) {
                debug!(name, id, err:% = err; "Skipping icon during warm-up");
            }
        }

        self.table_header_height()?;
        self.table_footer_height()?;
        self.table_field_height()?;
        self.table_field_icon_width()?;
        debug!(host:% = self.host.id(), memos:? = self.memos.get(); "Layout constants updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use crate::{
        config::{MeasurementConfig, MeasurerKind},
        document::ReadyState,
    };

    use super::*;

    const HOST: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" style="--dbdg-table-title-font-size: 10px">
  <defs>
    <symbol id="dbdg-table-icon" x="1" y="2" width="24" height="24"/>
    <symbol id="dbdg-primary-key-icon" width="16" height="12"/>
    <symbol id="dbdg-foreign-key-icon" width="14" height="14"/>
    <rect id="dbdg-unique-key-icon" x="0" y="0" width="12" height="10"/>
    <linearGradient id="gradient"/>
    <text id="caption" x="2" y="12">DUMP</text>
  </defs>
</svg>"#;

    fn registry() -> VisualizationRegistry {
        let measurement = MeasurementConfig::default().with_measurer(MeasurerKind::Approximate);
        VisualizationRegistry::from_config(&AppConfig::new(
            IconSet::default(),
            StyleNames::default(),
            measurement,
        ))
    }

    fn ready_instance() -> Rc<Visualization> {
        let host = Document::parse(HOST).unwrap();
        host.set_ready_state(ReadyState::Complete);
        registry().get_instance(&host)
    }

    #[test]
    fn test_memo_invalidate() {
        assert_eq!(Memo::Uncomputed.invalidate(), Memo::Uncomputed);
        assert_eq!(Memo::Computed(3.0).invalidate(), Memo::Stale);
        assert_eq!(Memo::Stale.invalidate(), Memo::Stale);
        assert_eq!(Memo::Computed(3.0).value(), Some(3.0));
        assert_eq!(Memo::Stale.value(), None);
    }

    #[test]
    fn test_pending_until_host_ready() {
        let host = Document::parse(HOST).unwrap();
        let registry = registry();
        let visualization = registry.get_instance(&host);

        assert_eq!(visualization.lifecycle(), Lifecycle::Pending);
        assert_eq!(
            visualization.icon_element_size("dbdg-table-icon", false),
            Err(Error::NotReady)
        );
        assert_eq!(
            visualization.measure_text("x", &TextAttributes::new()),
            Err(Error::NotReady)
        );

        host.set_ready_state(ReadyState::Interactive);
        assert_eq!(visualization.lifecycle(), Lifecycle::Ready);
        assert!(visualization.layout_memos().header_height.value().is_some());
    }

    #[test]
    fn test_same_host_same_instance() {
        let host = Document::parse(HOST).unwrap();
        let registry = registry();
        let first = registry.get_instance(&host);
        let second = registry.get_instance(&host);
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);

        host.set_ready_state(ReadyState::Complete);
        let surfaces = host
            .snapshot()
            .child_elements()
            .filter(|element| element.name() == "svg")
            .count();
        assert_eq!(surfaces, 1);
    }

    #[test]
    fn test_default_registry_releases_dropped_hosts() {
        let hosts: Vec<Weak<Document>> = (0..100)
            .map(|_| {
                let host = Document::parse(HOST).unwrap();
                let visualization = Visualization::get_instance(&host);
                assert_eq!(visualization.lifecycle(), Lifecycle::Pending);
                Rc::downgrade(&host)
            })
            .collect();

        assert!(hosts.iter().all(|host| host.upgrade().is_none()));
    }

    #[test]
    fn test_registry_prunes_released_instances() {
        let registry = registry();
        let host = Document::parse(HOST).unwrap();
        let id = host.id();
        let visualization = registry.get_instance(&host);
        assert!(registry.contains(id));

        drop(visualization);
        drop(host);
        assert!(!registry.contains(id));
        assert!(registry.is_empty());

        // The next lookup forgets the released entry.
        let other = Document::parse(HOST).unwrap();
        let _kept = registry.get_instance(&other);
        assert_eq!(registry.instances.borrow().len(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_held_instance_survives_ready_signal() {
        let registry = registry();
        let host = Document::parse(HOST).unwrap();
        let visualization = registry.get_instance(&host);
        host.set_ready_state(ReadyState::Complete);

        assert_eq!(visualization.lifecycle(), Lifecycle::Ready);
        assert!(Rc::ptr_eq(&visualization, &registry.get_instance(&host)));
    }

    #[test]
    fn test_symbol_reads_declared_geometry() {
        let visualization = ready_instance();
        let icon = visualization
            .icon_element_size("dbdg-table-icon", false)
            .unwrap();
        assert_eq!(icon, BBox::new(1.0, 2.0, 24.0, 24.0));
    }

    #[test]
    fn test_graphics_element_uses_bbox() {
        let visualization = ready_instance();
        let icon = visualization
            .icon_element_size("dbdg-unique-key-icon", false)
            .unwrap();
        assert_eq!(icon, BBox::new(0.0, 0.0, 12.0, 10.0));
    }

    #[test]
    fn test_non_graphical_icon() {
        let visualization = ready_instance();
        let err = visualization
            .icon_element_size("gradient", false)
            .unwrap_err();
        assert_eq!(
            err,
            Error::NotGraphical {
                id: "gradient".to_string(),
                tag: "linearGradient".to_string(),
            }
        );
        assert!(visualization.cached_icon_size("gradient").is_none());
    }

    #[test]
    fn test_text_icon_is_not_graphical() {
        let visualization = ready_instance();
        assert!(matches!(
            visualization.icon_element_size("caption", false),
            Err(Error::NotGraphical { tag, .. }) if tag == "text"
        ));
        assert!(visualization.cached_icon_size("caption").is_none());
    }

    #[test]
    fn test_on_measure_only_on_recomputation() {
        let visualization = ready_instance();
        let calls = Cell::new(0);
        let count = |_: &Element| calls.set(calls.get() + 1);

        // Warm-up already cached the icon.
        visualization
            .icon_element_size_with("dbdg-table-icon", false, count)
            .unwrap();
        assert_eq!(calls.get(), 0);

        visualization
            .icon_element_size_with("dbdg-table-icon", true, |element| {
                assert_eq!(element.name(), "symbol");
                calls.set(calls.get() + 1);
            })
            .unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_header_stacks_icon_and_text() {
        let visualization = ready_instance();
        let text = visualization.table_header_text_size("DUMP").unwrap();
        // 4 chars * 10px * 0.55, one line of 10px * 1.15.
        assert_approx_eq!(f32, text.width(), 22.0);
        assert_approx_eq!(f32, text.height(), 11.5);

        let header = visualization.table_header_size("DUMP").unwrap();
        assert_approx_eq!(f32, header.width(), 24.0 + 22.0 + 12.0);
        assert_approx_eq!(f32, header.height(), 24.0 + 16.0);
        assert_approx_eq!(f32, visualization.table_header_height().unwrap(), 40.0);
    }

    #[test]
    fn test_footer_adds_text_padding() {
        let visualization = ready_instance();
        let text = visualization.table_footer_text_size("Unknown").unwrap();
        let footer = visualization.table_footer_size("Unknown").unwrap();
        assert_approx_eq!(f32, footer.width(), text.width() + 12.0);
        assert_approx_eq!(f32, footer.height(), text.height() + 16.0);
    }

    #[test]
    fn test_field_icon_width() {
        let visualization = ready_instance();
        // Widest key icon is 16, plus 6 + 6 text padding.
        assert_approx_eq!(f32, visualization.table_field_icon_width().unwrap(), 28.0);
    }

    #[test]
    fn test_field_row_is_tall_enough_for_any_key_icon() {
        let visualization = ready_instance();
        let row = visualization.table_field_size().unwrap();
        assert!(row.height() >= 14.0 + 8.0);
        assert_approx_eq!(f32, visualization.table_field_height().unwrap(), row.height());
    }

    #[test]
    fn test_styles_are_read_from_host() {
        let visualization = ready_instance();
        assert_eq!(
            visualization
                .read_only_element_style()
                .property_value("--dbdg-table-title-font-size"),
            "10px"
        );

        visualization
            .writable_element_style()
            .set_property("--dbdg-table-title-font-size", "20px");
        let text = visualization.table_header_text_size("DUMP").unwrap();
        assert_approx_eq!(f32, text.width(), 44.0);
    }

    #[test]
    fn test_reentrant_measurement_is_busy() {
        let visualization = ready_instance();
        let _held = visualization.surface().acquire().unwrap();
        assert_eq!(
            visualization.measure_text("x", &TextAttributes::new()),
            Err(Error::SurfaceBusy)
        );
    }
}
