//! Layout storage with active-layout and selected-element focus.
//!
//! [`LayoutStore`] is an explicit state container: callers construct one and
//! pass it by reference. It has a single logical writer (`&mut self`);
//! servers that share it wrap it in a lock themselves.
//!
//! The active layout and selected element are held as plain ids and looked up
//! on use, so deleting a layout or element elsewhere can only turn them into
//! a lookup miss.

use std::collections::HashSet;
use std::sync::Arc;

use crate::blob::{self, BlobStore, MemoryBlobStore};
use crate::element::{Element, ElementId, ElementKind, ElementPatch, Position};
use crate::layout::{Layout, LayoutId, LayoutPatch};
use crate::{LayoutError, LayoutResult};

/// In-memory registry of layouts bridged to a blob store.
///
/// # Example
///
/// ```
/// use layout_core::store::LayoutStore;
/// use layout_core::{Element, Position};
///
/// let mut store = LayoutStore::in_memory();
/// store.create_layout("Window sticker", 800, 600).unwrap();
///
/// let id = store.add_element(Element::text(Position::new(50, 50)));
/// assert!(id.is_some());
/// assert_eq!(store.selected_element().map(Element::id), id);
/// ```
#[derive(Debug)]
pub struct LayoutStore {
    layouts: Vec<Layout>,
    active_layout_id: Option<LayoutId>,
    selected_element_id: Option<ElementId>,
    blob: Arc<dyn BlobStore>,
}

impl LayoutStore {
    /// Create an empty store persisting to `blob`.
    ///
    /// Nothing is read until [`LayoutStore::load_from_blob`] is called.
    #[must_use]
    pub fn new(blob: Arc<dyn BlobStore>) -> Self {
        Self {
            layouts: Vec::new(),
            active_layout_id: None,
            selected_element_id: None,
            blob,
        }
    }

    /// Create an empty store backed by a [`MemoryBlobStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBlobStore::new()))
    }

    /// Replace the current set with whatever the blob store holds.
    ///
    /// Missing or corrupt data loads as an empty set. Returns the number of
    /// layouts loaded.
    pub fn load_from_blob(&mut self) -> usize {
        let layouts = blob::load_layouts(self.blob.as_ref());
        let count = layouts.len();
        self.replace_all(layouts);
        tracing::debug!("Loaded {count} persisted layouts");
        count
    }

    // -----------------------------------------------------------------------
    // Layout lifecycle
    // -----------------------------------------------------------------------

    /// Create a layout, make it active and clear the selection.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LayoutError::InvalidDimension`] if either dimension is zero.
    pub fn create_layout(
        &mut self,
        name: impl Into<String>,
        width: u32,
        height: u32,
    ) -> LayoutResult<LayoutId> {
        let layout = Layout::new(name, width, height)?;
        let id = layout.id();
        self.layouts.push(layout);
        self.active_layout_id = Some(id);
        self.selected_element_id = None;
        tracing::debug!("Created layout {id}");
        Ok(id)
    }

    /// Point the active layout at `id` and clear the selection.
    ///
    /// The id is not checked; a dangling id reads as "no active layout".
    pub fn load_layout(&mut self, id: LayoutId) {
        self.active_layout_id = Some(id);
        self.selected_element_id = None;
    }

    /// Point the active layout at `id`, keeping the current selection.
    pub fn select_layout(&mut self, id: LayoutId) {
        self.active_layout_id = Some(id);
    }

    /// Rename a layout. Returns `false` if absent.
    pub fn rename_layout(&mut self, id: LayoutId, name: impl Into<String>) -> bool {
        let Some(layout) = self.layout_mut(id) else {
            return false;
        };
        layout.name = name.into();
        layout.touch();
        true
    }

    /// Merge a partial update into a layout.
    ///
    /// Returns `Ok(false)` if the layout is absent.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LayoutError::InvalidDimension`] if the patch sets a
    /// zero canvas dimension.
    pub fn update_layout(&mut self, id: LayoutId, patch: LayoutPatch) -> LayoutResult<bool> {
        let Some(layout) = self.layout_mut(id) else {
            return Ok(false);
        };
        layout.apply_patch(patch)?;
        Ok(true)
    }

    /// Delete a layout and persist the remaining set.
    ///
    /// If the deleted layout was active, the first remaining layout becomes
    /// active (or none). The selection is always cleared. The in-memory
    /// change stands even when persisting fails.
    ///
    /// Returns `Ok(false)` if nothing was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the remaining set cannot be persisted.
    pub fn delete_layout(&mut self, id: LayoutId) -> LayoutResult<bool> {
        let before = self.layouts.len();
        self.layouts.retain(|layout| layout.id() != id);
        let removed = self.layouts.len() != before;

        if self.active_layout_id == Some(id) {
            self.active_layout_id = self.layouts.first().map(Layout::id);
        }
        self.selected_element_id = None;

        blob::save_layouts(self.blob.as_ref(), &self.layouts)?;
        if removed {
            tracing::debug!("Deleted layout {id}");
        }
        Ok(removed)
    }

    /// Stamp every layout and persist the entire set.
    ///
    /// Every layout's `updated_at` is refreshed, changed or not.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the blob write fails.
    pub fn save_all(&mut self) -> LayoutResult<()> {
        for layout in &mut self.layouts {
            layout.touch();
        }
        blob::save_layouts(self.blob.as_ref(), &self.layouts)?;
        tracing::debug!("Saved {} layouts", self.layouts.len());
        Ok(())
    }

    /// Replace the whole set, activating the first layout (or none).
    ///
    /// Layouts repeating an earlier id are discarded.
    pub fn replace_all(&mut self, mut layouts: Vec<Layout>) {
        let mut seen = HashSet::with_capacity(layouts.len());
        layouts.retain(|layout| seen.insert(layout.id()));
        self.active_layout_id = layouts.first().map(Layout::id);
        self.selected_element_id = None;
        self.layouts = layouts;
    }

    // -----------------------------------------------------------------------
    // Element passthroughs (active layout only)
    // -----------------------------------------------------------------------

    /// Append an element to the active layout and select it.
    ///
    /// Returns `None` without side effects when there is no active layout.
    pub fn add_element(&mut self, element: Element) -> Option<ElementId> {
        let layout = self.active_layout_mut()?;
        let id = layout.add_element(element);
        self.selected_element_id = Some(id);
        Some(id)
    }

    /// Append a palette element of `kind` at `position` and select it.
    pub fn add_element_of_kind(&mut self, kind: ElementKind, position: Position) -> Option<ElementId> {
        self.add_element(Element::of_kind(kind, position))
    }

    /// Apply a partial update to an element of the active layout.
    ///
    /// Returns `Ok(false)` when there is no active layout or no such element.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LayoutError::InvalidDimension`] if the patch sets a
    /// zero width or height.
    pub fn update_element(&mut self, id: ElementId, patch: &ElementPatch) -> LayoutResult<bool> {
        match self.active_layout_mut() {
            Some(layout) => layout.update_element(id, patch),
            None => Ok(false),
        }
    }

    /// Move an element of the active layout by a delta.
    pub fn move_element(&mut self, id: ElementId, dx: i32, dy: i32) -> bool {
        self.active_layout_mut()
            .is_some_and(|layout| layout.move_element(id, dx, dy))
    }

    /// Resize an element of the active layout, clamping to the minimum size.
    pub fn resize_element(&mut self, id: ElementId, width: i64, height: i64) -> bool {
        self.active_layout_mut()
            .is_some_and(|layout| layout.resize_element(id, width, height))
    }

    /// Remove an element from the active layout.
    ///
    /// Clears the selection if it pointed at the removed element.
    pub fn delete_element(&mut self, id: ElementId) -> bool {
        let removed = self
            .active_layout_mut()
            .and_then(|layout| layout.remove_element(id))
            .is_some();
        if self.selected_element_id == Some(id) {
            self.selected_element_id = None;
        }
        removed
    }

    /// Set (or clear) the selected element of the active layout.
    pub fn select_element(&mut self, id: Option<ElementId>) {
        if self.active_layout().is_none() {
            return;
        }
        self.selected_element_id = id;
    }

    // -----------------------------------------------------------------------
    // Getters
    // -----------------------------------------------------------------------

    /// All layouts in insertion order.
    #[must_use]
    pub fn layouts(&self) -> &[Layout] {
        &self.layouts
    }

    /// Get a layout by ID.
    #[must_use]
    pub fn layout(&self, id: LayoutId) -> Option<&Layout> {
        self.layouts.iter().find(|layout| layout.id() == id)
    }

    /// Deep copy of a layout, detached from the store.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::LayoutNotFound`] if no layout has this id.
    pub fn snapshot(&self, id: LayoutId) -> LayoutResult<Layout> {
        self.layout(id)
            .cloned()
            .ok_or_else(|| LayoutError::LayoutNotFound(id.to_string()))
    }

    /// The active layout id, which may be stale.
    #[must_use]
    pub const fn active_layout_id(&self) -> Option<LayoutId> {
        self.active_layout_id
    }

    /// The selected element id, which may be stale.
    #[must_use]
    pub const fn selected_element_id(&self) -> Option<ElementId> {
        self.selected_element_id
    }

    /// The active layout, or `None` if unset or stale.
    #[must_use]
    pub fn active_layout(&self) -> Option<&Layout> {
        self.active_layout_id.and_then(|id| self.layout(id))
    }

    /// The selected element within the active layout, or `None`.
    #[must_use]
    pub fn selected_element(&self) -> Option<&Element> {
        let id = self.selected_element_id?;
        self.active_layout()?.element(id)
    }

    /// Number of layouts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    /// Check if the store holds no layouts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    fn layout_mut(&mut self, id: LayoutId) -> Option<&mut Layout> {
        self.layouts.iter_mut().find(|layout| layout.id() == id)
    }

    fn active_layout_mut(&mut self) -> Option<&mut Layout> {
        let id = self.active_layout_id?;
        self.layout_mut(id)
    }
}

impl Default for LayoutStore {
    fn default() -> Self {
        Self::in_memory()
    }
}
