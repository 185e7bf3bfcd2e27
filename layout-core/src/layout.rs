//! Layouts: named canvases holding an ordered sequence of elements.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::element::{Element, ElementId, ElementPatch, Size};
use crate::{LayoutError, LayoutResult};

/// Unique identifier for a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayoutId(Uuid);

impl LayoutId {
    /// Create a new unique layout ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a layout ID from its string form.
    ///
    /// # Errors
    ///
    /// Returns an error if `s` is not a valid UUID.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for LayoutId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LayoutId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named canvas of fixed size containing elements in render order.
///
/// The last element renders on top. Every mutation refreshes `updated_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    id: LayoutId,
    /// Display name; not unique.
    pub name: String,
    #[serde(flatten)]
    canvas_size: Size,
    #[serde(default)]
    elements: Vec<Element>,
    #[serde(default = "Utc::now")]
    created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    updated_at: DateTime<Utc>,
}

impl Layout {
    /// Create an empty layout.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LayoutError::InvalidDimension`] if either dimension is zero.
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> LayoutResult<Self> {
        let canvas_size = Size::new(width, height).validated()?;
        let now = Utc::now();
        Ok(Self {
            id: LayoutId::new(),
            name: name.into(),
            canvas_size,
            elements: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Unique identifier.
    #[must_use]
    pub const fn id(&self) -> LayoutId {
        self.id
    }

    /// Logical page dimensions.
    #[must_use]
    pub const fn canvas_size(&self) -> Size {
        self.canvas_size
    }

    /// Elements in render order.
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Mutable access to elements, for resolution on a copied layout.
    ///
    /// Does not refresh `updated_at`.
    pub fn elements_mut(&mut self) -> &mut [Element] {
        &mut self.elements
    }

    /// Creation time.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last modification time.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Get an element by ID.
    #[must_use]
    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id() == id)
    }

    /// Append an element so it renders on top.
    pub fn add_element(&mut self, element: Element) -> ElementId {
        let id = element.id();
        self.elements.push(element);
        self.touch();
        id
    }

    /// Apply a partial update to an element.
    ///
    /// Returns `Ok(false)` without touching the layout if `id` is absent.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LayoutError::InvalidDimension`] if the patch sets a
    /// zero width or height.
    pub fn update_element(&mut self, id: ElementId, patch: &ElementPatch) -> LayoutResult<bool> {
        let Some(element) = self.elements.iter_mut().find(|e| e.id() == id) else {
            return Ok(false);
        };
        element.apply_patch(patch)?;
        self.touch();
        Ok(true)
    }

    /// Move an element by a delta. Returns `false` if absent.
    pub fn move_element(&mut self, id: ElementId, dx: i32, dy: i32) -> bool {
        self.modify_element(id, |element| element.move_by(dx, dy))
    }

    /// Resize an element, clamping to the minimum size. Returns `false` if absent.
    pub fn resize_element(&mut self, id: ElementId, width: i64, height: i64) -> bool {
        self.modify_element(id, |element| element.resize(width, height))
    }

    /// Remove an element, returning it if it existed.
    pub fn remove_element(&mut self, id: ElementId) -> Option<Element> {
        let index = self.elements.iter().position(|e| e.id() == id)?;
        let removed = self.elements.remove(index);
        self.touch();
        Some(removed)
    }

    /// Replace the canvas size. Elements are neither moved nor rescaled.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LayoutError::InvalidDimension`] if either dimension is zero.
    pub fn resize(&mut self, width: u32, height: u32) -> LayoutResult<()> {
        self.canvas_size = Size::new(width, height).validated()?;
        self.touch();
        Ok(())
    }

    /// Merge a partial update.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::InvalidDimension`] if the patch sets a zero
    /// canvas dimension or carries a zero-sized element, and
    /// [`LayoutError::DuplicateElement`] if its elements repeat an id.
    /// Nothing changes in either case.
    pub fn apply_patch(&mut self, patch: LayoutPatch) -> LayoutResult<()> {
        let canvas_size = Size::new(
            patch.width.unwrap_or(self.canvas_size.width),
            patch.height.unwrap_or(self.canvas_size.height),
        )
        .validated()?;
        if let Some(elements) = &patch.elements {
            check_elements(elements)?;
        }
        self.canvas_size = canvas_size;
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(mut elements) = patch.elements {
            elements.iter_mut().for_each(Element::normalize);
            self.elements = elements;
        }
        self.touch();
        Ok(())
    }

    /// Stamp `updated_at` with the current time.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Restore the element invariants after loading untrusted data.
    ///
    /// Static elements lose stale binding fields. Zero-sized elements and
    /// repeated ids are dropped (the first occurrence wins). Returns the
    /// number of elements dropped.
    pub fn normalize(&mut self) -> usize {
        let before = self.elements.len();
        let mut seen = HashSet::with_capacity(before);
        self.elements
            .retain(|e| e.size().validated().is_ok() && seen.insert(e.id()));
        self.elements.iter_mut().for_each(Element::normalize);
        before - self.elements.len()
    }

    fn modify_element<F>(&mut self, id: ElementId, f: F) -> bool
    where
        F: FnOnce(&mut Element),
    {
        let Some(element) = self.elements.iter_mut().find(|e| e.id() == id) else {
            return false;
        };
        f(element);
        self.touch();
        true
    }

    #[cfg(test)]
    pub(crate) fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

/// Every element must have a non-zero size and a distinct id.
fn check_elements(elements: &[Element]) -> LayoutResult<()> {
    let mut seen = HashSet::with_capacity(elements.len());
    for element in elements {
        element.size().validated()?;
        if !seen.insert(element.id()) {
            return Err(LayoutError::DuplicateElement(element.id().to_string()));
        }
    }
    Ok(())
}

/// Partial layout update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutPatch {
    /// New display name.
    pub name: Option<String>,
    /// New canvas width.
    pub width: Option<u32>,
    /// New canvas height.
    pub height: Option<u32>,
    /// Replacement element sequence.
    pub elements: Option<Vec<Element>>,
}
