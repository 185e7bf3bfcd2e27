//! QR code image folder: save, inspect, and clean up PNG files.
//!
//! Saved files are served back under [`PUBLIC_PREFIX`].

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use layout_core::qr::decode_png_data_uri;
use serde::Serialize;
use thiserror::Error;

use crate::validation::{self, ValidationError};

/// URL prefix under which saved files are served.
pub const PUBLIC_PREFIX: &str = "/qrcodes";

/// Errors from QR code folder operations.
#[derive(Debug, Error)]
pub enum QrFileError {
    /// The file name or payload failed validation.
    #[error("invalid request: {0}")]
    InvalidInput(#[from] ValidationError),
    /// The uploaded payload is not base64 PNG data.
    #[error("invalid QR code data: {0}")]
    InvalidData(String),
    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl QrFileError {
    /// Whether the error was caused by the request rather than the server.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

/// Summary returned by [`QrCodeFolder::check`].
#[derive(Debug, Clone, Serialize)]
pub struct FolderStatus {
    /// Absolute or configured path of the folder.
    pub path: PathBuf,
    /// Number of entries in the folder.
    pub files_count: usize,
}

/// Folder holding saved QR code images.
#[derive(Debug, Clone)]
pub struct QrCodeFolder {
    dir: PathBuf,
    max_age: Duration,
}

impl QrCodeFolder {
    /// Create a handle for `dir`. Nothing is touched on disk.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, max_age: Duration) -> Self {
        Self {
            dir: dir.into(),
            max_age,
        }
    }

    /// The folder path.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Age after which [`QrCodeFolder::cleanup`] removes a file.
    #[must_use]
    pub const fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Decode a PNG data URI (or bare base64) and write it as `filename`.
    ///
    /// Returns the public path of the saved file.
    ///
    /// # Errors
    ///
    /// Returns [`QrFileError::InvalidInput`] for unsafe names or oversized data,
    /// [`QrFileError::InvalidData`] if the payload does not decode, and
    /// [`QrFileError::Io`] if the file cannot be written.
    pub fn save(&self, filename: &str, qr_data: &str) -> Result<String, QrFileError> {
        validation::validate_filename(filename)?;
        validation::validate_qr_data(qr_data)?;
        let png =
            decode_png_data_uri(qr_data).map_err(|e| QrFileError::InvalidData(e.to_string()))?;

        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(filename);
        std::fs::write(&path, png)?;
        tracing::info!("QR code saved to {}", path.display());

        Ok(format!("{PUBLIC_PREFIX}/{filename}"))
    }

    /// Create the folder if needed and count its entries.
    ///
    /// # Errors
    ///
    /// Returns [`QrFileError::Io`] if the folder cannot be created or read.
    pub fn check(&self) -> Result<FolderStatus, QrFileError> {
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir)?;
            tracing::info!("Created QR code folder {}", self.dir.display());
        }
        let files_count = std::fs::read_dir(&self.dir)?.count();
        Ok(FolderStatus {
            path: self.dir.clone(),
            files_count,
        })
    }

    /// Remove files older than the configured maximum age.
    ///
    /// A missing folder counts as nothing to remove.
    ///
    /// # Errors
    ///
    /// Returns [`QrFileError::Io`] if the folder or a file cannot be read or
    /// removed.
    pub fn cleanup(&self) -> Result<usize, QrFileError> {
        self.cleanup_at(SystemTime::now())
    }

    /// Like [`QrCodeFolder::cleanup`], measuring ages against `now`.
    ///
    /// # Errors
    ///
    /// See [`QrCodeFolder::cleanup`].
    pub fn cleanup_at(&self, now: SystemTime) -> Result<usize, QrFileError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            // Files with a modification time in the future have age zero.
            let age = now
                .duration_since(metadata.modified()?)
                .unwrap_or(Duration::ZERO);
            if age > self.max_age {
                std::fs::remove_file(entry.path())?;
                removed += 1;
            }
        }

        tracing::info!("Removed {removed} old QR codes from {}", self.dir.display());
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layout_core::qr::png_data_uri;
    use layout_core::LocalQrEncoder;

    const DAY: Duration = Duration::from_secs(24 * 3600);

    fn folder(dir: &Path) -> QrCodeFolder {
        QrCodeFolder::new(dir.join("qrcodes"), DAY)
    }

    #[test]
    fn test_save_writes_decoded_png() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let folder = folder(tmp.path());
        let png = LocalQrEncoder::new().render_png("VW123").expect("render");

        let public = folder
            .save("qrcode_vw123_1_abc.png", &png_data_uri(&png))
            .expect("save");

        assert_eq!(public, "/qrcodes/qrcode_vw123_1_abc.png");
        let written = std::fs::read(folder.dir().join("qrcode_vw123_1_abc.png")).expect("read");
        assert_eq!(written, png);
    }

    #[test]
    fn test_save_rejects_traversal_and_garbage() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let folder = folder(tmp.path());

        let err = folder
            .save("../escape.png", "data:image/png;base64,AAAA")
            .expect_err("traversal");
        assert!(matches!(err, QrFileError::InvalidInput(_)));
        assert!(err.is_client_error());

        let err = folder.save("ok.png", "not base64 !!").expect_err("garbage");
        assert!(matches!(err, QrFileError::InvalidData(_)));
        assert!(!folder.dir().join("ok.png").exists());
    }

    #[test]
    fn test_check_creates_folder_and_counts() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let folder = folder(tmp.path());
        assert!(!folder.dir().exists());

        let status = folder.check().expect("check");
        assert!(folder.dir().exists());
        assert_eq!(status.files_count, 0);

        std::fs::write(folder.dir().join("a.png"), b"x").expect("write");
        assert_eq!(folder.check().expect("check").files_count, 1);
    }

    #[test]
    fn test_cleanup_missing_folder_is_zero() {
        let tmp = tempfile::tempdir().expect("tempdir");
        assert_eq!(folder(tmp.path()).cleanup().expect("cleanup"), 0);
    }

    #[test]
    fn test_cleanup_removes_only_old_files() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let folder = folder(tmp.path());
        folder.check().expect("check");
        std::fs::write(folder.dir().join("a.png"), b"x").expect("write");
        std::fs::write(folder.dir().join("b.png"), b"y").expect("write");

        // Fresh files survive a cleanup now.
        assert_eq!(folder.cleanup().expect("cleanup"), 0);

        // Two days later both are stale.
        let later = SystemTime::now() + 2 * DAY;
        assert_eq!(folder.cleanup_at(later).expect("cleanup"), 2);
        assert_eq!(folder.check().expect("check").files_count, 0);
    }

    #[test]
    fn test_cleanup_skips_directories() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let folder = folder(tmp.path());
        std::fs::create_dir_all(folder.dir().join("nested")).expect("mkdir");

        let later = SystemTime::now() + 2 * DAY;
        assert_eq!(folder.cleanup_at(later).expect("cleanup"), 0);
        assert!(folder.dir().join("nested").exists());
    }
}
