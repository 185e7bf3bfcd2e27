//! Variable resolution: substitute supplied values into a copy of a layout.
//!
//! Resolution never mutates its input and never fails as a whole. A missing
//! or empty value leaves the element's content as it is; a QR code that
//! cannot be encoded becomes [`FALLBACK_QR_IMAGE`]. The only hard failure is
//! a missing layout in [`Resolver::resolve_stored`].
//!
//! QR encodings for one batch are started together and joined before the
//! result is assembled. Each distinct value is encoded once.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;

use crate::element::DynamicType;
use crate::export::{ExportDocument, ExportLayout, ExportVariable};
use crate::qr::{QrEncoder, FALLBACK_QR_IMAGE};
use crate::variables::{extract_variables, VariableValues};
use crate::{Layout, LayoutId, LayoutResult, LayoutStore};

/// A fully resolved copy of a layout plus its variable list.
#[derive(Debug, Clone)]
pub struct ResolvedLayout {
    /// Deep copy of the input with dynamic content substituted.
    pub layout: Layout,
    /// One entry per extracted declaration, with the value used.
    pub variables: Vec<ExportVariable>,
    /// QR codes encoded successfully.
    pub qr_generated: usize,
    /// QR codes replaced by the fallback image.
    pub qr_fallbacks: usize,
}

impl ResolvedLayout {
    /// Assemble the export document `{layout, variables}`.
    #[must_use]
    pub fn to_export_document(&self) -> ExportDocument {
        let size = self.layout.canvas_size();
        ExportDocument {
            layout: ExportLayout {
                name: self.layout.name.clone(),
                width: size.width,
                height: size.height,
                elements: self.layout.elements().to_vec(),
            },
            variables: self.variables.clone(),
        }
    }
}

/// Resolves layouts against user-supplied variable values.
#[derive(Clone)]
pub struct Resolver {
    encoder: Arc<dyn QrEncoder>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver").finish_non_exhaustive()
    }
}

impl Resolver {
    /// Create a resolver using `encoder` for QR-typed values.
    #[must_use]
    pub fn new(encoder: Arc<dyn QrEncoder>) -> Self {
        Self { encoder }
    }

    /// Resolve `layout` against `values`.
    pub async fn resolve(&self, layout: &Layout, values: &VariableValues) -> ResolvedLayout {
        let qr_inputs = qr_inputs(layout, values);
        let encoded = join_all(qr_inputs.iter().map(|text| self.encoder.encode(text))).await;

        let mut qr_generated = 0;
        let mut qr_fallbacks = 0;
        let qr_images: HashMap<&str, String> = qr_inputs
            .into_iter()
            .zip(encoded)
            .map(|(text, result)| {
                let image = match result {
                    Ok(image) => {
                        qr_generated += 1;
                        image
                    }
                    Err(e) => {
                        qr_fallbacks += 1;
                        tracing::warn!("QR encoding failed for {text:?}, using fallback image: {e}");
                        FALLBACK_QR_IMAGE.to_string()
                    }
                };
                (text, image)
            })
            .collect();

        let mut resolved = layout.clone();
        for element in resolved.elements_mut() {
            let Some((name, _)) = element.binding() else {
                continue;
            };
            let Some(supplied) = values.get(name).filter(|v| !v.value.is_empty()) else {
                continue;
            };
            element.content = match supplied.variable_type {
                DynamicType::QrCode => qr_images
                    .get(supplied.value.as_str())
                    .cloned()
                    .unwrap_or_else(|| FALLBACK_QR_IMAGE.to_string()),
                DynamicType::Text | DynamicType::Image => supplied.value.clone(),
            };
        }

        let variables = extract_variables(layout)
            .into_iter()
            .map(|declaration| {
                let value = values
                    .get(&declaration.name)
                    .map(|v| v.value.as_str())
                    .filter(|v| !v.is_empty())
                    .unwrap_or(&declaration.default_value)
                    .to_string();
                ExportVariable {
                    name: declaration.name,
                    variable_type: declaration.variable_type,
                    default_value: declaration.default_value,
                    value,
                }
            })
            .collect();

        tracing::debug!(
            layout = %layout.id(),
            qr_generated,
            qr_fallbacks,
            "Resolved layout"
        );

        ResolvedLayout {
            layout: resolved,
            variables,
            qr_generated,
            qr_fallbacks,
        }
    }

    /// Resolve a stored layout.
    ///
    /// Shared stores should take [`LayoutStore::snapshot`] under their lock
    /// and call [`Resolver::resolve`] after releasing it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LayoutError::LayoutNotFound`] if `id` is not stored.
    pub async fn resolve_stored(
        &self,
        store: &LayoutStore,
        id: LayoutId,
        values: &VariableValues,
    ) -> LayoutResult<ResolvedLayout> {
        let layout = store.snapshot(id)?;
        Ok(self.resolve(&layout, values).await)
    }
}

/// Distinct non-empty QR values referenced by the layout's bindings.
fn qr_inputs<'a>(layout: &Layout, values: &'a VariableValues) -> Vec<&'a str> {
    let mut inputs: Vec<&str> = Vec::new();
    for (name, _) in layout.elements().iter().filter_map(|e| e.binding()) {
        let Some(supplied) = values.get(name) else {
            continue;
        };
        if supplied.variable_type == DynamicType::QrCode
            && !supplied.value.is_empty()
            && !inputs.contains(&supplied.value.as_str())
        {
            inputs.push(&supplied.value);
        }
    }
    inputs
}
