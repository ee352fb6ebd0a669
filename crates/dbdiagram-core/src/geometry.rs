//! Geometric primitives for diagram measurement.
//!
//! This module provides the value types used to describe the measured
//! geometry of reusable diagram primitives (icons, header and footer bands,
//! field rows).
//!
//! # Overview
//!
//! - [`Size`] - Width and height dimensions, as produced by text measurement
//! - [`Padding`] - Immutable offsets for the four sides of a box
//! - [`BBox`] - A read-only, axis-aligned bounding box
//! - [`EditableBox`] - A box opened for composition via [`BBox::editable`]
//! - [`ExtendMode`] - How [`EditableBox::extend`] combines two boxes
//!
//! # Coordinate System
//!
//! Boxes use the SVG coordinate system: origin at the top-left, X increasing
//! rightward and Y increasing downward.
//!
//! # Read-only and editable boxes
//!
//! [`BBox`] is `Copy`, so every box handed out of a cache is an independent
//! value and mutating it can never reach back into the cache. Composition
//! happens on an [`EditableBox`], which is only obtainable through
//! [`BBox::editable`] and is consumed by each step of the pipeline:
//!
//! ```
//! # use dbdiagram_core::geometry::{BBox, ExtendMode, Padding};
//! let icon = BBox::new(0.0, 0.0, 24.0, 24.0);
//! let text = BBox::new(0.0, 0.0, 40.0, 14.0);
//!
//! let header = icon
//!     .editable()
//!     .extend(text, ExtendMode::Stack)
//!     .padding(Padding::new(6.0, 6.0, 8.0, 8.0))
//!     .finish();
//!
//! assert_eq!(header.width(), 24.0 + 40.0 + 12.0);
//! assert_eq!(header.height(), 24.0 + 16.0);
//! // The cached icon box is untouched.
//! assert_eq!(icon.width(), 24.0);
//! ```

use serde::{Deserialize, Serialize};

/// Represents the dimensions of an element with width and height
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    width: f32,
    height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Returns the width dimension of this size
    pub fn width(self) -> f32 {
        self.width
    }

    /// Returns the height dimension of this size
    pub fn height(self) -> f32 {
        self.height
    }

    /// Returns a new Size with the maximum width and height between this size and another
    pub fn max(self, other: Size) -> Self {
        Self {
            width: self.width.max(other.width),
            height: self.height.max(other.height),
        }
    }

    /// Returns a new Size with padding added to both width and height
    pub fn add_padding(self, padding: Padding) -> Self {
        Self {
            width: self.width + padding.horizontal_sum(),
            height: self.height + padding.vertical_sum(),
        }
    }

    /// Returns true if both width and height are zero
    pub fn is_zero(self) -> bool {
        self.width == 0.0 && self.height == 0.0
    }
}

/// Spacing around an element, with potentially different values for each side.
///
/// Offsets are never negative: [`Padding::new`] clamps negative inputs to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "PaddingDef")]
pub struct Padding {
    left: f32,
    right: f32,
    top: f32,
    bottom: f32,
}

/// Wire form of [`Padding`]; deserialized values go through [`Padding::new`].
#[derive(Deserialize)]
struct PaddingDef {
    #[serde(default)]
    left: f32,
    #[serde(default)]
    right: f32,
    #[serde(default)]
    top: f32,
    #[serde(default)]
    bottom: f32,
}

impl From<PaddingDef> for Padding {
    fn from(def: PaddingDef) -> Self {
        Self::new(def.left, def.right, def.top, def.bottom)
    }
}

const fn non_negative(value: f32) -> f32 {
    if value < 0.0 { 0.0 } else { value }
}

impl Padding {
    /// Creates padding with the given left, right, top and bottom offsets.
    ///
    /// Note the argument order: horizontal sides first, then vertical sides.
    pub const fn new(left: f32, right: f32, top: f32, bottom: f32) -> Self {
        Self {
            left: non_negative(left),
            right: non_negative(right),
            top: non_negative(top),
            bottom: non_negative(bottom),
        }
    }

    /// Creates uniform padding with the same value for all sides
    pub const fn uniform(value: f32) -> Self {
        Self::new(value, value, value, value)
    }

    /// Returns the left offset
    pub fn left(self) -> f32 {
        self.left
    }

    /// Returns the right offset
    pub fn right(self) -> f32 {
        self.right
    }

    /// Returns the top offset
    pub fn top(self) -> f32 {
        self.top
    }

    /// Returns the bottom offset
    pub fn bottom(self) -> f32 {
        self.bottom
    }

    /// Returns the sum of left and right offsets
    pub fn horizontal_sum(self) -> f32 {
        self.left + self.right
    }

    /// Returns the sum of top and bottom offsets
    pub fn vertical_sum(self) -> f32 {
        self.top + self.bottom
    }
}

/// A read-only axis-aligned bounding box.
///
/// This is the value returned by every measurement. It is `Copy`: holding one
/// never aliases the measurement cache it came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BBox {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

impl BBox {
    /// Creates a new box from its origin and dimensions.
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a box at the origin with the given size.
    pub fn from_size(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width(), size.height())
    }

    pub fn x(self) -> f32 {
        self.x
    }

    pub fn y(self) -> f32 {
        self.y
    }

    pub fn width(self) -> f32 {
        self.width
    }

    pub fn height(self) -> f32 {
        self.height
    }

    /// Returns the x-coordinate of the right edge
    pub fn right(self) -> f32 {
        self.x + self.width
    }

    /// Returns the y-coordinate of the bottom edge
    pub fn bottom(self) -> f32 {
        self.y + self.height
    }

    /// Returns the dimensions of the box
    pub fn size(self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Returns the box moved by the given offsets.
    pub fn translate(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Opens a copy of this box for composition.
    ///
    /// The returned [`EditableBox`] owns its own rectangle; nothing done to it
    /// is visible through `self` or any other copy of `self`.
    pub fn editable(self) -> EditableBox {
        EditableBox { rect: self }
    }
}

impl From<Size> for BBox {
    fn from(size: Size) -> Self {
        Self::from_size(size)
    }
}

/// How [`EditableBox::extend`] combines a box with another one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendMode {
    /// The rectangle union of both boxes: the result covers both, as if they
    /// were drawn on top of each other.
    Overlay,
    /// The boxes are laid out side by side: widths add up and the height is
    /// the taller of the two. The origin stays with the box being extended.
    Stack,
}

/// A box opened for composition.
///
/// Each operation consumes the box and returns it, so pipelines read as a
/// single chain ending in [`EditableBox::finish`].
#[derive(Debug, Clone, PartialEq)]
pub struct EditableBox {
    rect: BBox,
}

impl EditableBox {
    /// Grows this box to accommodate `other`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use dbdiagram_core::geometry::{BBox, ExtendMode};
    /// let a = BBox::new(0.0, 0.0, 10.0, 20.0);
    /// let b = BBox::new(0.0, 0.0, 30.0, 5.0);
    ///
    /// let overlay = a.editable().extend(b, ExtendMode::Overlay).finish();
    /// assert_eq!((overlay.width(), overlay.height()), (30.0, 20.0));
    ///
    /// let stack = a.editable().extend(b, ExtendMode::Stack).finish();
    /// assert_eq!((stack.width(), stack.height()), (40.0, 20.0));
    /// ```
    pub fn extend(mut self, other: impl Into<BBox>, mode: ExtendMode) -> Self {
        let other = other.into();
        let rect = self.rect;
        self.rect = match mode {
            ExtendMode::Overlay => {
                let x = rect.x.min(other.x);
                let y = rect.y.min(other.y);
                BBox::new(
                    x,
                    y,
                    rect.right().max(other.right()) - x,
                    rect.bottom().max(other.bottom()) - y,
                )
            }
            ExtendMode::Stack => BBox::new(
                rect.x,
                rect.y,
                rect.width + other.width,
                rect.height.max(other.height),
            ),
        };
        self
    }

    /// Inflates the box by `padding`.
    ///
    /// The origin moves up and left by the top and left offsets, and the
    /// dimensions grow by the horizontal and vertical sums.
    pub fn padding(mut self, padding: Padding) -> Self {
        self.rect = BBox::new(
            self.rect.x - padding.left(),
            self.rect.y - padding.top(),
            self.rect.width + padding.horizontal_sum(),
            self.rect.height + padding.vertical_sum(),
        );
        self
    }

    pub fn width(&self) -> f32 {
        self.rect.width
    }

    pub fn height(&self) -> f32 {
        self.rect.height
    }

    /// Closes the pipeline, returning the read-only result.
    pub fn finish(self) -> BBox {
        self.rect
    }
}

impl From<EditableBox> for BBox {
    fn from(editable: EditableBox) -> Self {
        editable.finish()
    }
}
