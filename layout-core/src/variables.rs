//! Variable declarations derived from a layout's dynamic elements.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::element::DynamicType;
use crate::Layout;

/// One binding point of a layout: `{name, type, defaultValue}`.
///
/// Derived at extraction time and never stored on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDeclaration {
    /// Variable name (the element's `variableName`).
    pub name: String,
    /// How the value is treated on resolution.
    #[serde(rename = "type")]
    pub variable_type: DynamicType,
    /// The element's design-time content.
    pub default_value: String,
}

/// A user-supplied value for one variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableValue {
    /// Raw value: text, image reference, or text to encode as a QR code.
    pub value: String,
    /// How the value should be treated.
    #[serde(rename = "type", default)]
    pub variable_type: DynamicType,
}

impl VariableValue {
    /// A value substituted as text.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::new(value, DynamicType::Text)
    }

    /// A value substituted as an image reference.
    #[must_use]
    pub fn image(value: impl Into<String>) -> Self {
        Self::new(value, DynamicType::Image)
    }

    /// A value encoded into a QR code.
    #[must_use]
    pub fn qrcode(value: impl Into<String>) -> Self {
        Self::new(value, DynamicType::QrCode)
    }

    /// A value of the given type.
    #[must_use]
    pub fn new(value: impl Into<String>, variable_type: DynamicType) -> Self {
        Self {
            value: value.into(),
            variable_type,
        }
    }
}

/// Values keyed by variable name.
pub type VariableValues = HashMap<String, VariableValue>;

/// Scan a layout for dynamic elements with a non-empty variable name.
///
/// Declarations come out in element order. Names are not deduplicated: two
/// elements bound to the same variable yield two declarations.
#[must_use]
pub fn extract_variables(layout: &Layout) -> Vec<VariableDeclaration> {
    layout
        .elements()
        .iter()
        .filter_map(|element| {
            element
                .binding()
                .map(|(name, variable_type)| VariableDeclaration {
                    name: name.to_string(),
                    variable_type,
                    default_value: element.content.clone(),
                })
        })
        .collect()
}

/// Index declarations by name.
///
/// On duplicate names the later declaration silently shadows the earlier one.
#[must_use]
pub fn declarations_by_name(
    declarations: &[VariableDeclaration],
) -> HashMap<&str, &VariableDeclaration> {
    declarations
        .iter()
        .map(|declaration| (declaration.name.as_str(), declaration))
        .collect()
}
