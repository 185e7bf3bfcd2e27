//! QR code encoding capability.
//!
//! The resolver only depends on [`QrEncoder`]: `text -> image reference`.
//! [`LocalQrEncoder`] renders PNG data URIs in-process; other
//! implementations (remote services, encoders that save to the QR folder)
//! live in the server.

use std::io::Cursor;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{GrayImage, ImageFormat, Luma};
use qrcode::{Color, EcLevel, QrCode};

use crate::{LayoutError, LayoutResult};

/// Prefix of an embedded PNG reference.
pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Placeholder image substituted when a QR code cannot be produced.
pub const FALLBACK_QR_IMAGE: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAQAAAAEAAQMAAABmvDolAAAABlBMVEX///8AAABVwtN+AAABA0lEQVR42uyYMQ7DIAxFDWLIEXKUHi1H69F6BJQhQwdEm1b90eoWqf8bHX4sy5a/DQBe4CMHgDUHQMwB0J/XagZwzmtVA6j/MG4A5x/mJoBORmQEUOFG6s8QbmcIwDIMAMoQBYgCDAAzRAHaAcCdYQAYKlUqVaoClCEKEAWQ0pQqValKVapSlapUpSr1/wAeJPEqYBuA+LcjvgXY3AsSuCPiAebcnOHu6BGA5tLsXrvbS4VhAHPtbk8ZNg8QMHnKsMnggWGTwQPDRoAzw9aBAMOWgfh3Z9gGEGfYMHDOsGEgzrBRIM2wTcDNsE0gzbBNwM2wTSDNsE0AMGwSABg2CeQZthNEvV/cQfI9cQAAAABJRU5ErkJggg==";

/// Encodes text into an embeddable image reference.
#[async_trait]
pub trait QrEncoder: Send + Sync {
    /// Encode `text`, returning an image reference (usually a data URI).
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::QrEncode`] if the code cannot be produced.
    async fn encode(&self, text: &str) -> LayoutResult<String>;
}

/// In-process QR encoder producing PNG data URIs.
#[derive(Debug, Clone, Copy)]
pub struct LocalQrEncoder {
    /// Approximate output side in pixels.
    target_size: u32,
    /// Blank border in modules.
    quiet_zone: u32,
    ec_level: EcLevel,
}

impl Default for LocalQrEncoder {
    fn default() -> Self {
        Self {
            target_size: 300,
            quiet_zone: 2,
            ec_level: EcLevel::H,
        }
    }
}

impl LocalQrEncoder {
    /// Encoder with a 300px target, 2-module quiet zone and high error correction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the approximate output side in pixels.
    #[must_use]
    pub fn with_target_size(mut self, target_size: u32) -> Self {
        self.target_size = target_size.max(1);
        self
    }

    /// Render `text` as PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::QrEncode`] if `text` is empty, too long for a
    /// QR code, or the PNG cannot be written.
    pub fn render_png(&self, text: &str) -> LayoutResult<Vec<u8>> {
        if text.is_empty() {
            return Err(LayoutError::QrEncode("nothing to encode".to_string()));
        }
        let code = QrCode::with_error_correction_level(text.as_bytes(), self.ec_level)
            .map_err(|e| LayoutError::QrEncode(e.to_string()))?;

        let modules = u32::try_from(code.width())
            .map_err(|_| LayoutError::QrEncode("QR code too large".to_string()))?;
        let colors = code.to_colors();
        let quiet = self.quiet_zone;
        let total = modules + 2 * quiet;
        let scale = (self.target_size / total).max(1);
        let side = total * scale;

        let image = GrayImage::from_fn(side, side, |px, py| {
            let (mx, my) = (px / scale, py / scale);
            let inside = (quiet..quiet + modules).contains(&mx) && (quiet..quiet + modules).contains(&my);
            if !inside {
                return Luma([255]);
            }
            let index = ((my - quiet) * modules + (mx - quiet)) as usize;
            match colors.get(index) {
                Some(Color::Dark) => Luma([0]),
                _ => Luma([255]),
            }
        });

        let mut buf = Cursor::new(Vec::new());
        image
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(|e| LayoutError::QrEncode(format!("PNG encoding failed: {e}")))?;
        Ok(buf.into_inner())
    }
}

/// Rendering runs on the blocking pool so a batch of codes can proceed in
/// parallel without stalling the async workers. Requires a Tokio runtime.
#[async_trait]
impl QrEncoder for LocalQrEncoder {
    async fn encode(&self, text: &str) -> LayoutResult<String> {
        let encoder = *self;
        let text = text.to_owned();
        let png = tokio::task::spawn_blocking(move || encoder.render_png(&text))
            .await
            .map_err(|e| LayoutError::QrEncode(format!("QR rendering task failed: {e}")))??;
        Ok(png_data_uri(&png))
    }
}

/// Wrap PNG bytes in a `data:image/png;base64,` URI.
#[must_use]
pub fn png_data_uri(png: &[u8]) -> String {
    format!("{PNG_DATA_URI_PREFIX}{}", STANDARD.encode(png))
}

/// Decode a PNG data URI (or bare base64) back into bytes.
///
/// # Errors
///
/// Returns [`LayoutError::QrEncode`] if the payload is not valid base64.
pub fn decode_png_data_uri(data: &str) -> LayoutResult<Vec<u8>> {
    let payload = data.strip_prefix(PNG_DATA_URI_PREFIX).unwrap_or(data);
    STANDARD
        .decode(payload.trim())
        .map_err(|e| LayoutError::QrEncode(format!("invalid base64 payload: {e}")))
}

/// File name for a saved QR image: `qrcode_<text>_<millis>_<suffix>.png`.
///
/// The text part keeps the first 20 characters after replacing anything
/// outside `[a-z0-9]` (case-insensitive) with `_` and lowercasing.
#[must_use]
pub fn qrcode_filename(text: &str, timestamp_ms: i64, suffix: &str) -> String {
    let sanitized: String = text
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .take(20)
        .collect();
    format!("qrcode_{sanitized}_{timestamp_ms}_{suffix}.png")
}
