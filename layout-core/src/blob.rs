//! Key-value blob persistence for the layout collection.
//!
//! The store persists the whole layout set under [`LAYOUTS_KEY`] as one JSON
//! array and overwrites it on every save. There is no concurrency check:
//! the last writer wins.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::{Layout, LayoutResult};

/// Key under which the layout array is stored.
pub const LAYOUTS_KEY: &str = "layouts";

/// A string-valued key-value store.
pub trait BlobStore: Send + Sync + std::fmt::Debug {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be read.
    fn get(&self, key: &str) -> LayoutResult<Option<String>>;

    /// Overwrite the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be written.
    fn put(&self, key: &str, value: &str) -> LayoutResult<()>;
}

/// Volatile blob store, mainly for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBlobStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> LayoutResult<Option<String>> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> LayoutResult<()> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Blob store keeping one `<key>.json` file per key in a directory.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    data_dir: PathBuf,
}

impl FileBlobStore {
    /// Create a store rooted at `data_dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created.
    pub fn new(data_dir: impl Into<PathBuf>) -> LayoutResult<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    /// Directory holding the blob files.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}.json", sanitize_filename(key)))
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> LayoutResult<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, value: &str) -> LayoutResult<()> {
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

/// Load the layout collection.
///
/// A missing key, an unreadable medium or corrupt JSON all yield an empty
/// collection; the latter two are logged.
#[must_use]
pub fn load_layouts(blob: &dyn BlobStore) -> Vec<Layout> {
    let raw = match blob.get(LAYOUTS_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!("Failed to read persisted layouts: {e}");
            return Vec::new();
        }
    };
    match serde_json::from_str::<Vec<Layout>>(&raw) {
        Ok(layouts) => sanitize_layouts(layouts),
        Err(e) => {
            tracing::warn!("Ignoring corrupt persisted layouts: {e}");
            Vec::new()
        }
    }
}

/// Drop persisted entries that break the model invariants.
///
/// Layouts with a zero canvas dimension or an id already seen are dropped;
/// each kept layout is normalized.
fn sanitize_layouts(layouts: Vec<Layout>) -> Vec<Layout> {
    let mut seen = HashSet::with_capacity(layouts.len());
    layouts
        .into_iter()
        .filter_map(|mut layout| {
            let id = layout.id();
            if layout.canvas_size().validated().is_err() {
                tracing::warn!("Dropping persisted layout {id} with an empty canvas");
                return None;
            }
            if !seen.insert(id) {
                tracing::warn!("Dropping persisted layout with duplicate id {id}");
                return None;
            }
            let dropped = layout.normalize();
            if dropped > 0 {
                tracing::warn!("Dropped {dropped} invalid elements from layout {id}");
            }
            Some(layout)
        })
        .collect()
}

/// Persist the entire layout collection, overwriting any previous value.
///
/// # Errors
///
/// Returns an error if serialization or the blob write fails.
pub fn save_layouts(blob: &dyn BlobStore, layouts: &[Layout]) -> LayoutResult<()> {
    let json = serde_json::to_string(layouts)?;
    blob.put(LAYOUTS_KEY, &json)
}

/// Sanitize a key for use as a filename.
///
/// Replaces any character that is not alphanumeric, `-`, or `_` with `_`.
fn sanitize_filename(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
