//! Server configuration from command-line flags and environment variables.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Default port for the layout server.
pub const DEFAULT_PORT: u16 = 9474;

/// Default age after which saved QR code images are cleaned up.
pub const DEFAULT_QRCODE_MAX_AGE_HOURS: u64 = 24;

/// Command-line arguments for layout-forge.
#[derive(Debug, Clone, Parser)]
#[command(name = "layout-forge")]
#[command(about = "Layout Forge server: layout storage, variable processing and QR code files")]
#[command(version)]
pub struct ServerConfig {
    /// Port to listen on (localhost only)
    #[arg(long, env = "LAYOUT_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Directory holding the persisted layout collection
    #[arg(long, env = "LAYOUT_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Directory for saved QR code images, served under /qrcodes
    #[arg(long, env = "LAYOUT_QRCODE_DIR", default_value = "public/qrcodes")]
    pub qrcode_dir: PathBuf,

    /// Saved QR code images older than this are removed by cleanup
    #[arg(long, env = "LAYOUT_QRCODE_MAX_AGE_HOURS", default_value_t = DEFAULT_QRCODE_MAX_AGE_HOURS)]
    pub qrcode_max_age_hours: u64,

    /// Remote QR code service (e.g., <https://api.qrserver.com/v1/create-qr-code/>).
    /// QR codes are rendered locally when unset.
    #[arg(long, env = "LAYOUT_QR_SERVICE_URL")]
    pub qr_service_url: Option<String>,

    /// Save each generated QR code under the QR code folder and reference it
    /// by its /qrcodes path instead of embedding the image
    #[arg(long, env = "LAYOUT_SAVE_QRCODES")]
    pub save_qrcodes: bool,
}

impl ServerConfig {
    /// Maximum age of saved QR code images.
    #[must_use]
    pub fn qrcode_max_age(&self) -> Duration {
        Duration::from_secs(self.qrcode_max_age_hours.saturating_mul(3600))
    }
}
