//! QR encoder that stores each generated code in the QR code folder.
//!
//! Resolved elements then reference `/qrcodes/<filename>` instead of carrying
//! the image inline, which keeps exported documents small.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use layout_core::qr::QrEncoder;
use layout_core::{qrcode_filename, LayoutError, LayoutResult};
use uuid::Uuid;

use crate::metrics;
use crate::qrcodes::QrCodeFolder;

/// Wraps another [`QrEncoder`] and saves its output as a PNG file.
///
/// File names follow [`qrcode_filename`] with a random 7-character suffix.
/// A failed save is returned as an encoding error, so the resolver falls
/// back to its placeholder image.
#[derive(Clone)]
pub struct SavingQrEncoder {
    inner: Arc<dyn QrEncoder>,
    folder: Arc<QrCodeFolder>,
}

impl std::fmt::Debug for SavingQrEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SavingQrEncoder")
            .field("folder", &self.folder.dir())
            .finish_non_exhaustive()
    }
}

impl SavingQrEncoder {
    /// Save codes produced by `inner` into `folder`.
    #[must_use]
    pub fn new(inner: Arc<dyn QrEncoder>, folder: Arc<QrCodeFolder>) -> Self {
        Self { inner, folder }
    }
}

fn random_suffix() -> String {
    Uuid::new_v4().simple().to_string().chars().take(7).collect()
}

#[async_trait]
impl QrEncoder for SavingQrEncoder {
    async fn encode(&self, text: &str) -> LayoutResult<String> {
        let data_uri = self.inner.encode(text).await?;
        let filename = qrcode_filename(text, Utc::now().timestamp_millis(), &random_suffix());

        let folder = Arc::clone(&self.folder);
        let public_path = tokio::task::spawn_blocking(move || folder.save(&filename, &data_uri))
            .await
            .map_err(|e| LayoutError::QrEncode(format!("QR save task failed: {e}")))?
            .map_err(|e| LayoutError::QrEncode(format!("Failed to save QR code: {e}")))?;

        metrics::record_qr_file_saved();
        Ok(public_path)
    }
}
