//! # Layout Forge Core
//!
//! Printable layouts with variable binding points.
//!
//! A [`Layout`] is a fixed-size canvas of absolutely positioned text and
//! image elements. Any element can be made dynamic and bound to a named
//! variable; at processing time the [`Resolver`] substitutes supplied values
//! (plain text, image references, or text rendered as a QR code) into a deep
//! copy of the layout and produces an [`ExportDocument`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 layout-core                 │
//! ├─────────────────────────────────────────────┤
//! │  LayoutStore     │  Resolver                │
//! │  - Layouts       │  - Variable extraction   │
//! │  - Active/select │  - QR encoding (async)   │
//! │  - Blob persist  │  - Export / HTML         │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod blob;
pub mod element;
pub mod error;
pub mod export;
pub mod layout;
pub mod qr;
pub mod resolve;
pub mod store;
pub mod variables;

pub use blob::{load_layouts, save_layouts, BlobStore, FileBlobStore, MemoryBlobStore, LAYOUTS_KEY};
pub use element::{
    DynamicType, Element, ElementId, ElementKind, ElementPatch, ElementStyle, Position, Size,
    MIN_ELEMENT_SIZE,
};
pub use error::{LayoutError, LayoutResult};
pub use export::{ExportDocument, ExportLayout, ExportVariable};
pub use layout::{Layout, LayoutId, LayoutPatch};
pub use qr::{qrcode_filename, LocalQrEncoder, QrEncoder, FALLBACK_QR_IMAGE};
pub use resolve::{ResolvedLayout, Resolver};
pub use store::LayoutStore;
pub use variables::{
    declarations_by_name, extract_variables, VariableDeclaration, VariableValue, VariableValues,
};

/// Layout core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
