//! Processing Integration Tests
//!
//! Tests the complete layout flow including:
//! - Designing a layout through the store
//! - Persisting and reloading it
//! - Extracting variables and resolving a batch
//! - Exporting the result as JSON and HTML

use std::sync::Arc;

use layout_core::{
    extract_variables, DynamicType, Element, ElementKind, ElementPatch, FileBlobStore,
    LayoutStore, LocalQrEncoder, Position, Resolver, VariableValue, VariableValues,
    FALLBACK_QR_IMAGE,
};

/// Build a window-sticker layout with a title, a photo and a VIN QR code.
fn design_sticker(store: &mut LayoutStore) -> layout_core::LayoutId {
    let layout_id = store
        .create_layout("Window sticker", 800, 600)
        .expect("create layout");

    let title = store
        .add_element(Element::text(Position::new(40, 40)))
        .expect("title");
    store
        .update_element(
            title,
            &ElementPatch {
                content: Some("Model".to_string()),
                is_dynamic: Some(true),
                variable_name: Some("titulo".to_string()),
                ..ElementPatch::default()
            },
        )
        .expect("bind title");

    store
        .add_element(Element::image(Position::new(40, 120)))
        .expect("photo");

    let qr = store
        .add_element_of_kind(ElementKind::Image, Position::new(600, 400))
        .expect("qr");
    store
        .update_element(
            qr,
            &ElementPatch {
                is_dynamic: Some(true),
                variable_name: Some("vin".to_string()),
                dynamic_type: Some(DynamicType::QrCode),
                ..ElementPatch::default()
            },
        )
        .expect("bind qr");

    layout_id
}

fn values(entries: &[(&str, VariableValue)]) -> VariableValues {
    entries
        .iter()
        .map(|(name, value)| ((*name).to_string(), value.clone()))
        .collect()
}

#[tokio::test]
async fn test_design_persist_and_process() {
    let dir = tempfile::tempdir().expect("tempdir");
    let blob = Arc::new(FileBlobStore::new(dir.path()).expect("blob"));

    let layout_id = {
        let mut store = LayoutStore::new(blob.clone());
        let id = design_sticker(&mut store);
        store.save_all().expect("save");
        id
    };

    let mut store = LayoutStore::new(blob);
    assert_eq!(store.load_from_blob(), 1);

    let layout = store.snapshot(layout_id).expect("snapshot");
    let declarations = extract_variables(&layout);
    let names: Vec<_> = declarations.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["titulo", "vin"]);

    let resolver = Resolver::new(Arc::new(LocalQrEncoder::new()));
    let resolved = resolver
        .resolve(
            &layout,
            &values(&[
                ("titulo", VariableValue::text("Golf GTI")),
                ("vin", VariableValue::qrcode("9BWZZZ377VT004251")),
            ]),
        )
        .await;

    let contents: Vec<_> = resolved
        .layout
        .elements()
        .iter()
        .map(|e| e.content.as_str())
        .collect();
    assert_eq!(contents[0], "Golf GTI");
    assert_eq!(contents[1], layout.elements()[1].content);
    assert!(contents[2].starts_with("data:image/png;base64,"));
    assert_ne!(contents[2], FALLBACK_QR_IMAGE);
    assert_eq!(resolved.qr_generated, 1);

    // The stored layout is untouched.
    assert_eq!(store.layout(layout_id).expect("layout").elements()[0].content, "Model");

    let document = resolved.to_export_document();
    let json: serde_json::Value =
        serde_json::from_str(&document.to_json_pretty().expect("json")).expect("parse");
    assert_eq!(json["layout"]["name"], "Window sticker");
    assert_eq!(json["variables"][1]["type"], "qrcode");
    assert_eq!(json["variables"][1]["value"], "9BWZZZ377VT004251");

    let html = document.render_html();
    assert!(html.contains(">Golf GTI</div>"));
    assert!(html.contains("alt=\"QR Code\""));
}

#[tokio::test]
async fn test_empty_values_leave_layout_unchanged() {
    let mut store = LayoutStore::in_memory();
    let layout_id = design_sticker(&mut store);
    let layout = store.snapshot(layout_id).expect("snapshot");

    let resolver = Resolver::new(Arc::new(LocalQrEncoder::new()));
    let resolved = resolver.resolve(&layout, &VariableValues::new()).await;

    assert_eq!(
        serde_json::to_value(&resolved.layout).expect("serialize"),
        serde_json::to_value(&layout).expect("serialize")
    );
    assert_eq!(resolved.qr_generated + resolved.qr_fallbacks, 0);
}
