//! In-memory host documents.
//!
//! A [`Document`] is the tree a diagram is rendered into: either a top-level
//! document parsed from SVG or XHTML markup, or a fragment owned by such a
//! document (an isolated content island with its own id space).
//!
//! # Overview
//!
//! The measurement service needs four things from its host:
//!
//! - A readiness flag and a one-shot readiness notification
//!   ([`Document::ready_state`], [`Document::on_ready`]).
//! - Lookup by id ([`Document::element_by_id`]).
//! - The computed and inline style of the root element
//!   ([`Document::computed_style`], [`Document::inline_style`]).
//! - A place to attach its hidden surface and a way to read bounding boxes
//!   ([`Document::append_surface`], [`Document::bbox`]).
//!
//! Fragments take their readiness and their styles from the owner document;
//! lookups and surface attachment stay inside the fragment.

use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering},
};

use log::{debug, trace, warn};
use svgtypes::{PathParser, PathSegment};
use thiserror::Error;

use dbdiagram_core::{
    attributes::{STYLE_ATTRIBUTE, attribute_number},
    css::{self, StyleDeclaration},
    dom::Element,
    geometry::{BBox, ExtendMode},
};

/// Tag of the synthetic element holding the top-level nodes of a fragment.
const FRAGMENT_TAG: &str = "#fragment";

/// Guards against `<use>` elements referencing each other in a cycle.
const MAX_USE_DEPTH: usize = 16;

static NEXT_HOST_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostId(u64);

impl HostId {
    fn next() -> Self {
        Self(NEXT_HOST_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "host#{}", self.0)
    }
}

/// Loading state of a host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

/// Errors raised while building a host document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("invalid markup at byte {offset}: {message}")]
    Parse { message: String, offset: usize },

    #[error("markup contains no element")]
    NoRoot,
}

impl DocumentError {
    /// Byte offset of a parse failure in the source markup.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::Parse { offset, .. } => Some(*offset),
            Self::NoRoot => None,
        }
    }
}

/// A host document or document fragment.
pub struct Document {
    id: HostId,
    owner: Option<Rc<Document>>,
    tree: RefCell<Element>,
    ready_state: Cell<ReadyState>,
    ready_callbacks: RefCell<Vec<Box<dyn FnOnce()>>>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("fragment", &self.is_fragment())
            .field("ready_state", &self.ready_state())
            .finish_non_exhaustive()
    }
}

impl Document {
    /// Parses a top-level document from SVG or XHTML markup.
    ///
    /// The document starts in [`ReadyState::Loading`].
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Parse`] when the markup is not well-formed.
    pub fn parse(markup: &str) -> Result<Rc<Self>, DocumentError> {
        let parsed = roxmltree::Document::parse(markup).map_err(|err| parse_error(markup, &err, 0))?;
        let root = convert(parsed.root_element());
        let document = Self::with_tree(root, None);
        debug!(host:% = document.id, root = document.tree.borrow().name(); "Parsed host document");
        Ok(Rc::new(document))
    }

    /// Parses a fragment owned by `owner`.
    ///
    /// The markup may hold several top-level elements.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Parse`] for malformed markup and
    /// [`DocumentError::NoRoot`] when it holds no element at all.
    pub fn parse_fragment(owner: &Rc<Document>, markup: &str) -> Result<Rc<Self>, DocumentError> {
        let open = format!("<{FRAGMENT_WRAPPER}>");
        let wrapped = format!("{open}{markup}</{FRAGMENT_WRAPPER}>");
        let parsed = roxmltree::Document::parse(&wrapped)
            .map_err(|err| parse_error(&wrapped, &err, open.len()))?;

        let mut container = Element::new(FRAGMENT_TAG);
        for child in parsed.root_element().children().filter(|n| n.is_element()) {
            container.append_child(convert(child));
        }
        if container.child_elements().next().is_none() {
            return Err(DocumentError::NoRoot);
        }

        // Fragments always hang off the top-level document.
        let owner = Rc::clone(owner.owner().unwrap_or(owner));
        let document = Self::with_tree(container, Some(owner));
        debug!(host:% = document.id, owner:% = document.top().id; "Parsed host fragment");
        Ok(Rc::new(document))
    }

    fn with_tree(tree: Element, owner: Option<Rc<Document>>) -> Self {
        Self {
            id: HostId::next(),
            owner,
            tree: RefCell::new(tree),
            ready_state: Cell::new(ReadyState::Loading),
            ready_callbacks: RefCell::new(Vec::new()),
        }
    }

    pub fn id(&self) -> HostId {
        self.id
    }

    pub fn is_fragment(&self) -> bool {
        self.owner.is_some()
    }

    /// The document owning this fragment, `None` for a top-level document.
    pub fn owner(&self) -> Option<&Rc<Document>> {
        self.owner.as_ref()
    }

    /// The top-level document: `self`, or the owner of a fragment.
    fn top(&self) -> &Document {
        self.owner.as_deref().unwrap_or(self)
    }

    /// Returns a copy of the whole tree.
    ///
    /// For fragments the returned element is a synthetic container whose
    /// children are the fragment's top-level nodes.
    pub fn snapshot(&self) -> Element {
        self.tree.borrow().clone()
    }

    // =========================================================================
    // Readiness
    // =========================================================================

    pub fn ready_state(&self) -> ReadyState {
        self.top().ready_state.get()
    }

    /// Advances the loading state.
    ///
    /// The first transition away from [`ReadyState::Loading`] runs every
    /// queued readiness callback exactly once. Backward transitions are
    /// ignored.
    pub fn set_ready_state(&self, state: ReadyState) {
        let top = self.top();
        let previous = top.ready_state.get();
        if state <= previous {
            trace!(host:% = top.id, state:?, previous:?; "Ignoring ready state transition");
            return;
        }
        top.ready_state.set(state);
        debug!(host:% = top.id, state:?; "Host ready state changed");

        if previous == ReadyState::Loading {
            let callbacks = std::mem::take(&mut *top.ready_callbacks.borrow_mut());
            for callback in callbacks {
                callback();
            }
        }
    }

    /// Runs `callback` once the host has finished loading.
    ///
    /// When the host is already past loading the callback runs immediately.
    pub fn on_ready(&self, callback: impl FnOnce() + 'static) {
        let top = self.top();
        if top.ready_state.get() == ReadyState::Loading {
            top.ready_callbacks.borrow_mut().push(Box::new(callback));
        } else {
            callback();
        }
    }

    // =========================================================================
    // Lookup and styles
    // =========================================================================

    /// Returns a copy of the element with the given id.
    pub fn element_by_id(&self, id: &str) -> Option<Element> {
        self.tree.borrow().find_by_id(id).cloned()
    }

    /// Edits the element with the given id in place.
    ///
    /// Returns `false` when no such element exists.
    pub fn update_element(&self, id: &str, edit: impl FnOnce(&mut Element)) -> bool {
        match self.tree.borrow_mut().find_by_id_mut(id) {
            Some(element) => {
                edit(element);
                true
            }
            None => false,
        }
    }

    /// Tag name of the root element (of the owner, for fragments).
    pub fn root_name(&self) -> String {
        self.top().tree.borrow().name().to_string()
    }

    /// The computed declarations of the root element.
    ///
    /// Rules for `:root`, `html` and `svg` from every `<style>` element apply
    /// first, then the root element's inline style. Malformed stylesheets are
    /// skipped.
    pub fn computed_style(&self) -> StyleDeclaration {
        let top = self.top();
        let tree = top.tree.borrow();

        let mut computed = StyleDeclaration::new();
        for style in tree.descendants_named("style") {
            match css::parse_root_declarations(&style.text_content()) {
                Ok(declarations) => computed.merge(&declarations),
                Err(err) => warn!(host:% = top.id, err:% = err; "Skipping malformed stylesheet"),
            }
        }
        if let Some(inline) = tree.attribute(STYLE_ATTRIBUTE) {
            match css::parse_declarations(inline) {
                Ok(declarations) => computed.merge(&declarations),
                Err(err) => warn!(host:% = top.id, err:% = err; "Skipping malformed inline style"),
            }
        }
        computed
    }

    /// A writable handle over the root element's inline style.
    pub fn inline_style(&self) -> InlineStyle<'_> {
        InlineStyle {
            document: self.top(),
        }
    }

    // =========================================================================
    // Surface attachment
    // =========================================================================

    /// Attaches `element` to the live tree.
    ///
    /// Documents attach under `<body>` when there is one and under the root
    /// element otherwise. Fragments attach at their top level.
    pub fn append_surface(&self, element: Element) {
        let mut tree = self.tree.borrow_mut();
        if self.is_fragment() {
            tree.append_child(element);
            return;
        }
        match tree.first_named_mut("body") {
            Some(body) => body.append_child(element),
            None => tree.append_child(element),
        }
    }

    // =========================================================================
    // Bounding boxes
    // =========================================================================

    /// Whether `tag` names an element that can report a bounding box.
    pub fn is_graphical(tag: &str) -> bool {
        matches!(
            tag,
            "rect"
                | "circle"
                | "ellipse"
                | "line"
                | "polyline"
                | "polygon"
                | "path"
                | "image"
                | "use"
                | "g"
                | "svg"
                | "a"
                | "switch"
        )
    }

    /// The untransformed bounding box of a graphics element.
    ///
    /// Returns `None` when `element` is not graphical. `<use>` references
    /// resolve against this document's id space.
    pub fn bbox(&self, element: &Element) -> Option<BBox> {
        let tree = self.tree.borrow();
        graphics_bbox(&tree, element, 0)
    }
}

/// Name of the element wrapping fragment markup while it is parsed.
const FRAGMENT_WRAPPER: &str = "dbdg-fragment";

fn parse_error(source: &str, err: &roxmltree::Error, shift: usize) -> DocumentError {
    let pos = err.pos();
    DocumentError::Parse {
        message: err.to_string(),
        offset: text_pos_to_offset(source, pos.row, pos.col).saturating_sub(shift),
    }
}

/// Converts a 1-based row/column (in characters) to a byte offset.
fn text_pos_to_offset(source: &str, row: u32, col: u32) -> usize {
    let mut offset = 0;
    for (index, line) in source.split_inclusive('\n').enumerate() {
        if index + 1 == row as usize {
            let col_bytes: usize = line
                .chars()
                .take(col.saturating_sub(1) as usize)
                .map(char::len_utf8)
                .sum();
            return offset + col_bytes;
        }
        offset += line.len();
    }
    source.len()
}

fn convert(node: roxmltree::Node<'_, '_>) -> Element {
    let mut element = Element::new(node.tag_name().name());
    for attribute in node.attributes() {
        element.set_attribute(attribute.name(), attribute.value());
    }
    for child in node.children() {
        if child.is_element() {
            element.append_child(convert(child));
        } else if child.is_text() {
            if let Some(text) = child.text() {
                element.append_text(text);
            }
        }
    }
    element
}

/// A writable view of the root element's inline style.
pub struct InlineStyle<'a> {
    document: &'a Document,
}

impl InlineStyle<'_> {
    fn declarations(&self) -> StyleDeclaration {
        self.document
            .tree
            .borrow()
            .attribute(STYLE_ATTRIBUTE)
            .and_then(|style| css::parse_declarations(style).ok())
            .unwrap_or_default()
    }

    fn store(&self, declarations: &StyleDeclaration) {
        let mut tree = self.document.tree.borrow_mut();
        if declarations.is_empty() {
            tree.remove_attribute(STYLE_ATTRIBUTE);
        } else {
            tree.set_attribute(STYLE_ATTRIBUTE, declarations.to_string());
        }
    }

    /// The inline value of `name`, or `""`.
    pub fn property_value(&self, name: &str) -> String {
        self.declarations().property_value(name).to_string()
    }

    pub fn set_property(&self, name: &str, value: &str) {
        let mut declarations = self.declarations();
        declarations.set_property(name, value);
        self.store(&declarations);
    }

    pub fn remove_property(&self, name: &str) -> Option<String> {
        let mut declarations = self.declarations();
        let removed = declarations.remove_property(name);
        self.store(&declarations);
        removed
    }

    /// Every inline declaration.
    pub fn snapshot(&self) -> StyleDeclaration {
        self.declarations()
    }
}

// =============================================================================
// Geometry of graphics elements
// =============================================================================

fn graphics_bbox(tree: &Element, element: &Element, depth: usize) -> Option<BBox> {
    let num = |name: &str| attribute_number(element, name);
    match element.name() {
        "rect" | "image" => Some(BBox::new(num("x"), num("y"), num("width"), num("height"))),
        "circle" => {
            let r = num("r");
            Some(BBox::new(num("cx") - r, num("cy") - r, 2.0 * r, 2.0 * r))
        }
        "ellipse" => {
            let (rx, ry) = (num("rx"), num("ry"));
            Some(BBox::new(num("cx") - rx, num("cy") - ry, 2.0 * rx, 2.0 * ry))
        }
        "line" => Some(hull([(num("x1"), num("y1")), (num("x2"), num("y2"))]).unwrap_or_default()),
        "polyline" | "polygon" => {
            let points = element.attribute("points").map(parse_points).unwrap_or_default();
            Some(hull(points).unwrap_or_default())
        }
        "path" => {
            let points = element.attribute("d").map(path_points).unwrap_or_default();
            Some(hull(points).unwrap_or_default())
        }
        "use" => {
            if depth >= MAX_USE_DEPTH {
                warn!(depth = depth; "Nested <use> references too deep");
                return Some(BBox::default());
            }
            let target = element
                .attribute("href")
                .and_then(|href| href.trim().strip_prefix('#'))
                .and_then(|id| tree.find_by_id(id));
            let inner = match target {
                Some(target) if target.name() == "symbol" => children_bbox(tree, target, depth + 1),
                Some(target) => graphics_bbox(tree, target, depth + 1),
                None => None,
            };
            Some(inner.unwrap_or_default().translate(num("x"), num("y")))
        }
        "g" | "svg" | "a" | "switch" => {
            Some(children_bbox(tree, element, depth).unwrap_or_default())
        }
        _ => None,
    }
}

fn children_bbox(tree: &Element, element: &Element, depth: usize) -> Option<BBox> {
    element
        .child_elements()
        .filter_map(|child| graphics_bbox(tree, child, depth))
        .reduce(|acc, next| acc.editable().extend(next, ExtendMode::Overlay).finish())
}

fn hull(points: impl IntoIterator<Item = (f32, f32)>) -> Option<BBox> {
    let mut points = points.into_iter();
    let (x, y) = points.next()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (x, y, x, y);
    for (x, y) in points {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    Some(BBox::new(min_x, min_y, max_x - min_x, max_y - min_y))
}

fn parse_points(input: &str) -> Vec<(f32, f32)> {
    let numbers: Vec<f32> = input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<f32>().ok())
        .collect();
    numbers
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .collect()
}

/// End and control points of a path, in absolute coordinates.
fn path_points(d: &str) -> Vec<(f32, f32)> {
    let mut points = Vec::new();
    let (mut cx, mut cy) = (0.0_f64, 0.0_f64);
    let (mut start_x, mut start_y) = (0.0_f64, 0.0_f64);

    for segment in PathParser::from(d).flatten() {
        let base = move |abs: bool| if abs { (0.0, 0.0) } else { (cx, cy) };
        match segment {
            PathSegment::MoveTo { abs, x, y } => {
                let (bx, by) = base(abs);
                (cx, cy) = (bx + x, by + y);
                (start_x, start_y) = (cx, cy);
            }
            PathSegment::LineTo { abs, x, y }
            | PathSegment::SmoothQuadratic { abs, x, y }
            | PathSegment::EllipticalArc { abs, x, y, .. } => {
                let (bx, by) = base(abs);
                (cx, cy) = (bx + x, by + y);
            }
            PathSegment::HorizontalLineTo { abs, x } => {
                cx = if abs { x } else { cx + x };
            }
            PathSegment::VerticalLineTo { abs, y } => {
                cy = if abs { y } else { cy + y };
            }
            PathSegment::CurveTo {
                abs,
                x1,
                y1,
                x2,
                y2,
                x,
                y,
            } => {
                let (bx, by) = base(abs);
                points.push(((bx + x1) as f32, (by + y1) as f32));
                points.push(((bx + x2) as f32, (by + y2) as f32));
                (cx, cy) = (bx + x, by + y);
            }
            PathSegment::SmoothCurveTo { abs, x2, y2, x, y } => {
                let (bx, by) = base(abs);
                points.push(((bx + x2) as f32, (by + y2) as f32));
                (cx, cy) = (bx + x, by + y);
            }
            PathSegment::Quadratic { abs, x1, y1, x, y } => {
                let (bx, by) = base(abs);
                points.push(((bx + x1) as f32, (by + y1) as f32));
                (cx, cy) = (bx + x, by + y);
            }
            PathSegment::ClosePath { .. } => {
                (cx, cy) = (start_x, start_y);
            }
        }
        points.push((cx as f32, cy as f32));
    }
    points
}
