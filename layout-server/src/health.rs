//! Health checks.
//!
//! `/health/live` answers as long as the process runs. `/health/ready` (and
//! its alias `/health`) reports whether layouts can be read and QR code files
//! can be served, returning 503 when either fails.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

/// Readiness report.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// "healthy" or "unhealthy"
    pub status: &'static str,
    /// Server version
    pub version: &'static str,
    /// Layouts held in memory
    pub layouts: usize,
    /// Per-component results
    pub checks: HealthChecks,
}

/// Component results behind a [`HealthStatus`].
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    /// The store lock has not been poisoned by a panicking writer.
    pub layout_store: bool,
    /// The QR code folder exists on disk.
    pub qrcode_folder: bool,
}

impl HealthChecks {
    /// Whether every component is usable.
    #[must_use]
    pub const fn all_ok(&self) -> bool {
        self.layout_store && self.qrcode_folder
    }
}

/// Inspect `state` without side effects.
#[must_use]
pub fn inspect(state: &AppState) -> HealthStatus {
    let checks = HealthChecks {
        layout_store: !state.store.is_poisoned(),
        qrcode_folder: state.qrcodes.dir().is_dir(),
    };

    HealthStatus {
        status: if checks.all_ok() { "healthy" } else { "unhealthy" },
        version: env!("CARGO_PKG_VERSION"),
        layouts: state.read_store().len(),
        checks,
    }
}

/// Liveness check.
#[tracing::instrument(name = "liveness_check")]
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Readiness check: 200 when [`inspect`] is healthy, 503 otherwise.
#[tracing::instrument(name = "readiness_check", skip(state))]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let status = inspect(&state);
    let code = if status.checks.all_ok() {
        StatusCode::OK
    } else {
        tracing::warn!(checks = ?status.checks, "Readiness check failed");
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use layout_core::{LayoutStore, LocalQrEncoder, Resolver};

    use super::*;
    use crate::QrCodeFolder;

    fn state_in(dir: &std::path::Path) -> AppState {
        let mut store = LayoutStore::in_memory();
        store.create_layout("Sticker", 800, 600).expect("layout");
        AppState::new(
            store,
            Resolver::new(Arc::new(LocalQrEncoder::new())),
            QrCodeFolder::new(dir.join("qrcodes"), Duration::from_secs(60)),
        )
    }

    #[test]
    fn test_readiness_needs_qrcode_folder() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = state_in(dir.path());

        let status = inspect(&state);
        assert_eq!(status.status, "unhealthy");
        assert!(status.checks.layout_store);
        assert!(!status.checks.qrcode_folder);
        assert_eq!(status.layouts, 1);

        state.qrcodes.check().expect("check");
        let status = inspect(&state);
        assert_eq!(status.status, "healthy");
        assert!(status.checks.all_ok());
    }

    #[test]
    fn test_health_status_serialization() {
        let status = HealthStatus {
            status: "unhealthy",
            version: "0.1.0",
            layouts: 0,
            checks: HealthChecks {
                layout_store: true,
                qrcode_folder: false,
            },
        };

        let json = serde_json::to_value(&status).expect("should serialize");
        assert_eq!(json["status"], "unhealthy");
        assert_eq!(json["checks"]["layout_store"], true);
        assert_eq!(json["checks"]["qrcode_folder"], false);
    }
}
