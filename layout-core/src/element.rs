//! Layout elements - the placeable units of a canvas.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LayoutError, LayoutResult};

/// Smallest width/height an interactive resize can produce.
pub const MIN_ELEMENT_SIZE: u32 = 20;

/// Default content of a freshly placed text element.
pub const DEFAULT_TEXT_CONTENT: &str = "Sample text";

/// Default content of a freshly placed image element.
pub const DEFAULT_IMAGE_CONTENT: &str = "https://via.placeholder.com/150";

/// Unique identifier for an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(Uuid);

impl ElementId {
    /// Create a new unique element ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse an element ID from its string form.
    ///
    /// # Errors
    ///
    /// Returns an error if `s` is not a valid UUID.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The type of content an element holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// Literal text.
    Text,
    /// An image reference (URL or data URI).
    Image,
}

/// How the resolver treats the value bound to a dynamic element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DynamicType {
    /// Value is substituted as text.
    #[default]
    Text,
    /// Value is substituted as an image reference.
    Image,
    /// Value is encoded into a QR code image.
    #[serde(rename = "qrcode")]
    QrCode,
}

impl DynamicType {
    /// Dynamic type implied by an element kind when none is set explicitly.
    #[must_use]
    pub const fn from_kind(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Image => Self::Image,
            ElementKind::Text => Self::Text,
        }
    }

    /// Lowercase name as used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::QrCode => "qrcode",
        }
    }
}

impl std::fmt::Display for DynamicType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canvas-relative position in logical units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Distance from the left edge.
    pub x: i32,
    /// Distance from the top edge.
    pub y: i32,
}

impl Position {
    /// Create a position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Width and height in logical units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

impl Size {
    /// Create a size without validation.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Check that both dimensions are at least 1.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::InvalidDimension`] if either dimension is zero.
    pub fn validated(self) -> LayoutResult<Self> {
        if self.width == 0 || self.height == 0 {
            return Err(LayoutError::InvalidDimension {
                width: self.width,
                height: self.height,
            });
        }
        Ok(self)
    }

    /// Build a size from drag input, clamping each side to [`MIN_ELEMENT_SIZE`].
    #[must_use]
    pub fn clamped(width: i64, height: i64) -> Self {
        Self {
            width: clamp_dimension(width),
            height: clamp_dimension(height),
        }
    }
}

fn clamp_dimension(value: i64) -> u32 {
    u32::try_from(value.max(i64::from(MIN_ELEMENT_SIZE))).unwrap_or(u32::MAX)
}

/// Presentation attributes passed through to renderers untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementStyle {
    /// Foreground color, e.g. `#333333`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Background color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    /// CSS font size, e.g. `16px`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<String>,
    /// CSS font weight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    /// CSS text alignment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<String>,
}

impl ElementStyle {
    /// Style given to elements placed from the tool palette.
    #[must_use]
    pub fn editor_default() -> Self {
        Self {
            color: Some("#333333".to_string()),
            background_color: Some("#ffffff".to_string()),
            font_size: Some("16px".to_string()),
            font_weight: None,
            text_align: Some("left".to_string()),
        }
    }
}

/// A positioned, sized text or image unit, optionally bound to a variable.
///
/// Identity is the [`ElementId`]: two elements compare equal when their ids
/// match, whatever their content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    id: ElementId,
    #[serde(rename = "type")]
    kind: ElementKind,
    /// Literal text or image reference. A placeholder when dynamic.
    #[serde(default)]
    pub content: String,
    /// Canvas-relative position.
    #[serde(flatten)]
    pub position: Position,
    #[serde(flatten)]
    size: Size,
    #[serde(default)]
    is_dynamic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    variable_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dynamic_type: Option<DynamicType>,
    /// Optional presentation attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<ElementStyle>,
}

impl Element {
    /// Create a new static element.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::InvalidDimension`] if `size` has a zero side.
    pub fn new(
        kind: ElementKind,
        position: Position,
        size: Size,
        content: impl Into<String>,
    ) -> LayoutResult<Self> {
        Ok(Self {
            id: ElementId::new(),
            kind,
            content: content.into(),
            position,
            size: size.validated()?,
            is_dynamic: false,
            variable_name: None,
            dynamic_type: None,
            style: None,
        })
    }

    /// A text element with the palette defaults (200x50, sample text).
    #[must_use]
    pub fn text(position: Position) -> Self {
        Self::palette(ElementKind::Text, position, Size::new(200, 50), DEFAULT_TEXT_CONTENT)
    }

    /// An image element with the palette defaults (150x150, placeholder image).
    #[must_use]
    pub fn image(position: Position) -> Self {
        Self::palette(ElementKind::Image, position, Size::new(150, 150), DEFAULT_IMAGE_CONTENT)
    }

    /// A palette element of the given kind.
    #[must_use]
    pub fn of_kind(kind: ElementKind, position: Position) -> Self {
        match kind {
            ElementKind::Text => Self::text(position),
            ElementKind::Image => Self::image(position),
        }
    }

    fn palette(kind: ElementKind, position: Position, size: Size, content: &str) -> Self {
        Self {
            id: ElementId::new(),
            kind,
            content: content.to_string(),
            position,
            size,
            is_dynamic: false,
            variable_name: None,
            dynamic_type: None,
            style: Some(ElementStyle::editor_default()),
        }
    }

    /// Set the style.
    #[must_use]
    pub fn with_style(mut self, style: ElementStyle) -> Self {
        self.style = Some(style);
        self
    }

    /// Mark the element dynamic and bind it to `variable_name`.
    #[must_use]
    pub fn with_variable(
        mut self,
        variable_name: impl Into<String>,
        dynamic_type: Option<DynamicType>,
    ) -> Self {
        self.set_dynamic(true, Some(variable_name.into()), dynamic_type);
        self
    }

    /// Unique identifier.
    #[must_use]
    pub const fn id(&self) -> ElementId {
        self.id
    }

    /// Content kind.
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Current size.
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// Whether the content comes from variable resolution.
    #[must_use]
    pub const fn is_dynamic(&self) -> bool {
        self.is_dynamic
    }

    /// Bound variable name, if dynamic.
    #[must_use]
    pub fn variable_name(&self) -> Option<&str> {
        self.variable_name.as_deref()
    }

    /// Explicit dynamic type, if set.
    #[must_use]
    pub const fn dynamic_type(&self) -> Option<DynamicType> {
        self.dynamic_type
    }

    /// Explicit dynamic type, falling back to the one implied by the kind.
    #[must_use]
    pub fn effective_dynamic_type(&self) -> DynamicType {
        self.dynamic_type
            .unwrap_or_else(|| DynamicType::from_kind(self.kind))
    }

    /// Variable name and type when this element is a usable binding point.
    ///
    /// Dynamic elements without a (non-empty) variable name are not bindings.
    #[must_use]
    pub fn binding(&self) -> Option<(&str, DynamicType)> {
        if !self.is_dynamic {
            return None;
        }
        self.variable_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .map(|name| (name, self.effective_dynamic_type()))
    }

    /// Toggle dynamic binding.
    ///
    /// Turning dynamic off always clears the variable name and type, even if
    /// new ones are passed. Turning it on without a type picks `Image` for
    /// image elements and `Text` otherwise; an element that was already
    /// dynamic keeps its type.
    pub fn set_dynamic(
        &mut self,
        is_dynamic: bool,
        variable_name: Option<String>,
        dynamic_type: Option<DynamicType>,
    ) {
        if !is_dynamic {
            self.is_dynamic = false;
            self.variable_name = None;
            self.dynamic_type = None;
            return;
        }

        let was_dynamic = self.is_dynamic;
        self.is_dynamic = true;
        if let Some(name) = variable_name {
            self.variable_name = Some(name);
        }
        self.dynamic_type = match (dynamic_type, was_dynamic) {
            (Some(explicit), _) => Some(explicit),
            (None, true) => Some(self.effective_dynamic_type()),
            (None, false) => Some(DynamicType::from_kind(self.kind)),
        };
    }

    /// Resize with each side clamped to [`MIN_ELEMENT_SIZE`]. Never fails.
    pub fn resize(&mut self, width: i64, height: i64) {
        self.size = Size::clamped(width, height);
    }

    /// Move by a delta. Elements may end up off-canvas.
    pub fn move_by(&mut self, dx: i32, dy: i32) {
        self.position.x = self.position.x.saturating_add(dx);
        self.position.y = self.position.y.saturating_add(dy);
    }

    /// Apply a partial update.
    ///
    /// The patch is validated before anything changes, so a rejected patch
    /// leaves the element untouched.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::InvalidDimension`] if the patch sets a zero
    /// width or height.
    pub fn apply_patch(&mut self, patch: &ElementPatch) -> LayoutResult<()> {
        let size = Size::new(
            patch.width.unwrap_or(self.size.width),
            patch.height.unwrap_or(self.size.height),
        )
        .validated()?;
        self.size = size;

        if let Some(content) = &patch.content {
            self.content.clone_from(content);
        }
        if let Some(x) = patch.x {
            self.position.x = x;
        }
        if let Some(y) = patch.y {
            self.position.y = y;
        }
        if let Some(style) = &patch.style {
            self.style = Some(style.clone());
        }

        match patch.is_dynamic {
            Some(is_dynamic) => {
                self.set_dynamic(is_dynamic, patch.variable_name.clone(), patch.dynamic_type);
            }
            None if self.is_dynamic => {
                if let Some(name) = &patch.variable_name {
                    self.variable_name = Some(name.clone());
                }
                if let Some(dynamic_type) = patch.dynamic_type {
                    self.dynamic_type = Some(dynamic_type);
                }
            }
            None => {}
        }
        Ok(())
    }

    /// Drop binding fields left behind on a static element.
    ///
    /// Older editors stored a default `dynamicType` on every element; loading
    /// such data goes through here so the static/dynamic invariant holds.
    pub fn normalize(&mut self) {
        if !self.is_dynamic {
            self.variable_name = None;
            self.dynamic_type = None;
        }
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Element {}

/// Partial element update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ElementPatch {
    /// New content.
    pub content: Option<String>,
    /// New x position.
    pub x: Option<i32>,
    /// New y position.
    pub y: Option<i32>,
    /// New width (must be at least 1).
    pub width: Option<u32>,
    /// New height (must be at least 1).
    pub height: Option<u32>,
    /// Toggle dynamic binding.
    pub is_dynamic: Option<bool>,
    /// New variable name (ignored on static elements).
    pub variable_name: Option<String>,
    /// New dynamic type (ignored on static elements).
    pub dynamic_type: Option<DynamicType>,
    /// Replacement style.
    pub style: Option<ElementStyle>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_element() -> Element {
        Element::new(
            ElementKind::Text,
            Position::new(10, 10),
            Size::new(100, 40),
            "Hello",
        )
        .expect("valid element")
    }

    #[test]
    fn test_new_element_is_static() {
        let element = text_element();
        assert!(!element.is_dynamic());
        assert!(element.variable_name().is_none());
        assert!(element.dynamic_type().is_none());
        assert_eq!(element.content, "Hello");
    }

    #[test]
    fn test_new_rejects_zero_dimension() {
        let result = Element::new(ElementKind::Image, Position::default(), Size::new(0, 10), "");
        assert!(matches!(
            result,
            Err(LayoutError::InvalidDimension { width: 0, height: 10 })
        ));
    }

    #[test]
    fn test_palette_defaults() {
        let text = Element::text(Position::new(50, 50));
        assert_eq!(text.size(), Size::new(200, 50));
        assert_eq!(text.content, DEFAULT_TEXT_CONTENT);

        let image = Element::image(Position::new(50, 50));
        assert_eq!(image.size(), Size::new(150, 150));
        assert_eq!(image.kind(), ElementKind::Image);
        assert!(image.style.is_some());
    }

    #[test]
    fn test_set_dynamic_defaults_type_from_kind() {
        let mut text = text_element();
        text.set_dynamic(true, Some("title".into()), None);
        assert_eq!(text.dynamic_type(), Some(DynamicType::Text));

        let mut image = Element::image(Position::default());
        image.set_dynamic(true, Some("photo".into()), None);
        assert_eq!(image.dynamic_type(), Some(DynamicType::Image));
    }

    #[test]
    fn test_set_dynamic_keeps_type_when_already_dynamic() {
        let mut element = text_element().with_variable("vin", Some(DynamicType::QrCode));
        element.set_dynamic(true, Some("chassis".into()), None);
        assert_eq!(element.dynamic_type(), Some(DynamicType::QrCode));
        assert_eq!(element.variable_name(), Some("chassis"));
    }

    #[test]
    fn test_set_dynamic_off_clears_even_with_new_values() {
        let mut element = text_element().with_variable("title", Some(DynamicType::Text));
        element.set_dynamic(false, Some("other".into()), Some(DynamicType::QrCode));
        assert!(!element.is_dynamic());
        assert!(element.variable_name().is_none());
        assert!(element.dynamic_type().is_none());
    }

    #[test]
    fn test_binding_requires_non_empty_name() {
        let element = text_element().with_variable("", None);
        assert!(element.binding().is_none());

        let element = text_element().with_variable("model", None);
        assert_eq!(element.binding(), Some(("model", DynamicType::Text)));
    }

    #[test]
    fn test_resize_clamps_to_floor() {
        let mut element = text_element();
        element.resize(5, -300);
        assert_eq!(element.size(), Size::new(MIN_ELEMENT_SIZE, MIN_ELEMENT_SIZE));

        element.resize(640, 25);
        assert_eq!(element.size(), Size::new(640, 25));

        element.resize(i64::MAX, 30);
        assert_eq!(element.size().width, u32::MAX);
    }

    #[test]
    fn test_move_allows_off_canvas() {
        let mut element = text_element();
        element.move_by(-50, -5);
        assert_eq!(element.position, Position::new(-40, 5));
    }

    #[test]
    fn test_equality_is_by_id() {
        let a = text_element();
        let mut b = a.clone();
        b.content = "Different".into();
        assert_eq!(a, b);
        assert_ne!(a, text_element());
    }

    #[test]
    fn test_apply_patch_rejects_zero_size_without_changes() {
        let mut element = text_element();
        let patch = ElementPatch {
            content: Some("changed".into()),
            width: Some(0),
            ..ElementPatch::default()
        };
        assert!(element.apply_patch(&patch).is_err());
        assert_eq!(element.content, "Hello");
    }

    #[test]
    fn test_apply_patch_toggles_dynamic() {
        let mut element = text_element();
        let patch = ElementPatch {
            is_dynamic: Some(true),
            variable_name: Some("titulo".into()),
            ..ElementPatch::default()
        };
        element.apply_patch(&patch).expect("patch");
        assert_eq!(element.binding(), Some(("titulo", DynamicType::Text)));

        let patch = ElementPatch {
            dynamic_type: Some(DynamicType::QrCode),
            ..ElementPatch::default()
        };
        element.apply_patch(&patch).expect("patch");
        assert_eq!(element.dynamic_type(), Some(DynamicType::QrCode));
    }

    #[test]
    fn test_apply_patch_ignores_binding_on_static_element() {
        let mut element = text_element();
        let patch = ElementPatch {
            variable_name: Some("ghost".into()),
            dynamic_type: Some(DynamicType::Image),
            ..ElementPatch::default()
        };
        element.apply_patch(&patch).expect("patch");
        assert!(element.variable_name().is_none());
        assert!(element.dynamic_type().is_none());
    }

    #[test]
    fn test_serialized_field_names() {
        let element = text_element().with_variable("vin", Some(DynamicType::QrCode));
        let json = serde_json::to_value(&element).expect("serialize");
        assert_eq!(json["type"], "text");
        assert_eq!(json["x"], 10);
        assert_eq!(json["width"], 100);
        assert_eq!(json["isDynamic"], true);
        assert_eq!(json["variableName"], "vin");
        assert_eq!(json["dynamicType"], "qrcode");
    }

    #[test]
    fn test_normalize_drops_stale_binding() {
        let json = serde_json::json!({
            "id": ElementId::new(),
            "type": "image",
            "content": "https://example.com/a.png",
            "x": 0, "y": 0, "width": 150, "height": 150,
            "isDynamic": false,
            "dynamicType": "image",
            "style": { "color": "#333333", "textAlign": "left" }
        });
        let mut element: Element = serde_json::from_value(json).expect("deserialize");
        assert_eq!(element.dynamic_type(), Some(DynamicType::Image));
        element.normalize();
        assert!(element.dynamic_type().is_none());
        assert_eq!(
            element.style.as_ref().and_then(|s| s.text_align.as_deref()),
            Some("left")
        );
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_resize_never_below_floor(width in any::<i64>(), height in any::<i64>()) {
                let mut element = Element::text(Position::default());
                element.resize(width, height);
                prop_assert!(element.size().width >= MIN_ELEMENT_SIZE);
                prop_assert!(element.size().height >= MIN_ELEMENT_SIZE);
            }

            #[test]
            fn prop_dynamic_off_always_clears(
                name in "[a-z]{0,12}",
                start_dynamic in any::<bool>(),
                pass_type in any::<bool>(),
            ) {
                let mut element = Element::image(Position::default());
                if start_dynamic {
                    element.set_dynamic(true, Some(name.clone()), None);
                }
                let dynamic_type = pass_type.then_some(DynamicType::QrCode);
                element.set_dynamic(false, Some(name), dynamic_type);
                prop_assert!(!element.is_dynamic());
                prop_assert!(element.variable_name().is_none());
                prop_assert!(element.dynamic_type().is_none());
            }
        }
    }
}
