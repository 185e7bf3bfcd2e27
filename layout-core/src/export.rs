//! Export document and print-ready HTML rendering.
//!
//! The export document is the JSON handed to downstream consumers:
//!
//! ```json
//! {
//!   "layout": { "name": "...", "width": 800, "height": 600, "elements": [] },
//!   "variables": [{ "name": "...", "type": "text", "default_value": "...", "value": "..." }]
//! }
//! ```

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::element::{DynamicType, Element, ElementKind};
use crate::LayoutResult;

/// Resolved layout plus the variable values used to produce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    /// The resolved layout.
    pub layout: ExportLayout,
    /// One entry per extracted declaration.
    pub variables: Vec<ExportVariable>,
}

/// Layout part of an export document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportLayout {
    /// Layout name.
    pub name: String,
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Elements with dynamic content substituted.
    pub elements: Vec<Element>,
}

/// A variable and the value substituted for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportVariable {
    /// Variable name.
    pub name: String,
    /// Declared treatment.
    #[serde(rename = "type")]
    pub variable_type: DynamicType,
    /// Design-time content of the bound element.
    pub default_value: String,
    /// Supplied value, or the default when none was given.
    pub value: String,
}

impl ExportDocument {
    /// Serialize as indented JSON.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LayoutError::Serialization`] if serialization fails.
    pub fn to_json_pretty(&self) -> LayoutResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render a standalone HTML page sized to the canvas.
    ///
    /// Text elements become absolutely positioned `div`s carrying their
    /// style; image elements and embedded image content become `img` tags.
    #[must_use]
    pub fn render_html(&self) -> String {
        let ExportLayout {
            name,
            width,
            height,
            elements,
        } = &self.layout;

        let mut html = String::with_capacity(1024 + elements.len() * 256);
        let _ = write!(
            html,
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n",
            escape_html(name)
        );
        let _ = write!(
            html,
            "<style>\n\
             @page {{ size: {width}px {height}px; margin: 0; }}\n\
             body {{ margin: 0; padding: 0; width: {width}px; height: {height}px; }}\n\
             .layout-canvas {{ position: relative; width: {width}px; height: {height}px; overflow: hidden; background: #ffffff; }}\n\
             .element {{ position: absolute; box-sizing: border-box; }}\n\
             .element-text {{ overflow: hidden; word-wrap: break-word; }}\n\
             .element-image {{ object-fit: contain; }}\n\
             @media print {{ body {{ -webkit-print-color-adjust: exact; print-color-adjust: exact; }} }}\n\
             </style>\n</head>\n<body>\n<div class=\"layout-canvas\">\n"
        );

        for element in elements {
            render_element(&mut html, element);
        }

        html.push_str("</div>\n</body>\n</html>\n");
        html
    }
}

fn render_element(html: &mut String, element: &Element) {
    let size = element.size();
    let geometry = format!(
        "left: {}px; top: {}px; width: {}px; height: {}px;",
        element.position.x, element.position.y, size.width, size.height
    );

    if renders_as_image(element) {
        let alt = if element.binding().map(|(_, t)| t) == Some(DynamicType::QrCode) {
            "QR Code"
        } else {
            "Image"
        };
        let _ = writeln!(
            html,
            "<img class=\"element element-image\" style=\"{geometry}\" src=\"{}\" alt=\"{alt}\">",
            escape_html(&element.content)
        );
        return;
    }

    let mut style = geometry;
    if let Some(s) = &element.style {
        for (property, value) in [
            ("color", &s.color),
            ("background-color", &s.background_color),
            ("font-size", &s.font_size),
            ("font-weight", &s.font_weight),
            ("text-align", &s.text_align),
        ] {
            if let Some(value) = value {
                let _ = write!(style, " {property}: {value};");
            }
        }
    }
    let _ = writeln!(
        html,
        "<div class=\"element element-text\" style=\"{}\">{}</div>",
        escape_html(&style),
        escape_html(&element.content)
    );
}

/// Image elements, and text elements whose content was replaced by an
/// embedded image (a QR value bound to a text element).
fn renders_as_image(element: &Element) -> bool {
    element.kind() == ElementKind::Image || element.content.starts_with("data:image/")
}

/// Escape special HTML characters.
fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementStyle, Position, Size};

    fn document(elements: Vec<Element>) -> ExportDocument {
        ExportDocument {
            layout: ExportLayout {
                name: "Sticker <A4>".to_string(),
                width: 800,
                height: 600,
                elements,
            },
            variables: vec![ExportVariable {
                name: "titulo".to_string(),
                variable_type: DynamicType::Text,
                default_value: "placeholder".to_string(),
                value: "Golf GTI".to_string(),
            }],
        }
    }

    fn element(kind: ElementKind, content: &str) -> Element {
        Element::new(kind, Position::new(10, 20), Size::new(200, 50), content).expect("element")
    }

    #[test]
    fn test_json_uses_export_field_names() {
        let json = document(vec![]).to_json_pretty().expect("json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");

        assert_eq!(value["layout"]["width"], 800);
        assert_eq!(value["variables"][0]["type"], "text");
        assert_eq!(value["variables"][0]["default_value"], "placeholder");
        assert!(value["variables"][0].get("defaultValue").is_none());
        assert!(json.contains('\n'));
    }

    #[test]
    fn test_html_sizes_page_to_canvas() {
        let html = document(vec![]).render_html();
        assert!(html.contains("@page { size: 800px 600px; margin: 0; }"));
        assert!(html.contains("<title>Sticker &lt;A4&gt;</title>"));
    }

    #[test]
    fn test_html_renders_text_with_style() {
        let text = element(ElementKind::Text, "Fish & <Chips>").with_style(ElementStyle {
            color: Some("#333333".to_string()),
            font_size: Some("16px".to_string()),
            ..ElementStyle::default()
        });
        let html = document(vec![text]).render_html();

        assert!(html.contains("left: 10px; top: 20px; width: 200px; height: 50px;"));
        assert!(html.contains("color: #333333; font-size: 16px;"));
        assert!(html.contains(">Fish &amp; &lt;Chips&gt;</div>"));
    }

    #[test]
    fn test_html_renders_images_and_embedded_qr() {
        let image = element(ElementKind::Image, "https://example.com/car.png");
        let qr_text = element(ElementKind::Text, "data:image/png;base64,AAAA")
            .with_variable("vin", Some(DynamicType::QrCode));
        let html = document(vec![image, qr_text]).render_html();

        assert!(html.contains("src=\"https://example.com/car.png\" alt=\"Image\""));
        assert!(html.contains("src=\"data:image/png;base64,AAAA\" alt=\"QR Code\""));
        assert!(!html.contains("class=\"element element-text\""));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b>&\"'"), "a&lt;b&gt;&amp;&quot;&#39;");
    }
}
