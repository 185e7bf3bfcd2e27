//! # Layout Forge Server Library
//!
//! Shared types and functionality for the layout server.
//! This library is used by both the binary and integration tests.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use layout_core::{LayoutStore, Resolver};
use tower_http::services::ServeDir;

pub mod config;
pub mod health;
pub mod metrics;
pub mod qrcodes;
pub mod remote_qr;
pub mod routes;
pub mod saved_qr;
pub mod validation;

pub use config::ServerConfig;
pub use qrcodes::{QrCodeFolder, QrFileError};
pub use remote_qr::HttpQrEncoder;
pub use routes::ApiError;
pub use saved_qr::SavingQrEncoder;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The single layout store. Guards must not be held across `.await`.
    pub store: Arc<RwLock<LayoutStore>>,
    /// Variable resolver with the configured QR encoder.
    pub resolver: Arc<Resolver>,
    /// Folder for saved QR code images.
    pub qrcodes: Arc<QrCodeFolder>,
}

impl AppState {
    /// Bundle the server's collaborators.
    #[must_use]
    pub fn new(store: LayoutStore, resolver: Resolver, qrcodes: QrCodeFolder) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            resolver: Arc::new(resolver),
            qrcodes: Arc::new(qrcodes),
        }
    }

    /// Read access to the store, recovering from poisoning.
    pub fn read_store(&self) -> RwLockReadGuard<'_, LayoutStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write access to the store, recovering from poisoning.
    pub fn write_store(&self) -> RwLockWriteGuard<'_, LayoutStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Build the application router: health checks, QR code file endpoints,
/// the layout API, and the saved QR code files under `/qrcodes`.
///
/// Metrics, CORS and tracing layers are added by the binary.
pub fn router(state: AppState) -> Router {
    let qrcode_files = ServeDir::new(state.qrcodes.dir());

    Router::new()
        // Health check endpoints (liveness and readiness)
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/health", get(health::readiness))
        // QR code files
        .route(
            "/api/save-qrcode",
            post(routes::save_qrcode)
                .layer(DefaultBodyLimit::max(validation::MAX_QR_UPLOAD_BODY_LEN)),
        )
        .route("/api/check-qrcodes-folder", post(routes::check_qrcodes_folder))
        .route("/api/cleanup-qrcodes", post(routes::cleanup_qrcodes))
        // Layouts
        .route(
            "/api/layouts",
            get(routes::list_layouts).post(routes::create_layout),
        )
        .route("/api/layouts/save", post(routes::save_layouts))
        .route(
            "/api/layouts/{id}",
            get(routes::get_layout)
                .patch(routes::update_layout)
                .delete(routes::delete_layout),
        )
        .route("/api/layouts/{id}/variables", get(routes::layout_variables))
        .route("/api/layouts/{id}/process", post(routes::process_layout))
        .route(
            "/api/layouts/{id}/process/html",
            post(routes::process_layout_html),
        )
        .nest_service(qrcodes::PUBLIC_PREFIX, qrcode_files)
        .with_state(state)
}
