//! Test server harness for integration tests.
//!
//! Provides a way to spin up a real Axum server on a random port
//! for integration testing with HTTP clients.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use layout_core::{FileBlobStore, LayoutStore, LocalQrEncoder, QrEncoder, Resolver};
use layout_server::{AppState, QrCodeFolder, SavingQrEncoder};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A test server instance with control handles.
pub struct TestServer {
    addr: SocketAddr,
    state: AppState,
    dir: TempDir,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server with the local QR encoder.
    #[allow(dead_code)]
    pub async fn start() -> Self {
        Self::start_with_encoder(Arc::new(LocalQrEncoder::new())).await
    }

    /// Start a new test server with the given QR encoder.
    #[allow(dead_code)]
    pub async fn start_with_encoder(encoder: Arc<dyn QrEncoder>) -> Self {
        Self::start_with(|_| encoder).await
    }

    /// Start a new test server whose local QR codes are saved to its folder.
    #[allow(dead_code)]
    pub async fn start_saving_qrcodes() -> Self {
        Self::start_with(|folder| {
            Arc::new(SavingQrEncoder::new(
                Arc::new(LocalQrEncoder::new()),
                Arc::new(folder.clone()),
            ))
        })
        .await
    }

    /// Start a new test server on a random available port.
    ///
    /// Layouts and QR code files live in a temporary directory removed on drop.
    ///
    /// # Panics
    ///
    /// Panics if no port is available or server fails to bind.
    async fn start_with<F>(make_encoder: F) -> Self
    where
        F: FnOnce(&QrCodeFolder) -> Arc<dyn QrEncoder>,
    {
        let dir = tempfile::tempdir().expect("tempdir");
        let blob = FileBlobStore::new(dir.path().join("data")).expect("blob store");
        let mut store = LayoutStore::new(Arc::new(blob));
        store.load_from_blob();
        let qrcodes = QrCodeFolder::new(dir.path().join("qrcodes"), Duration::from_secs(24 * 3600));
        let encoder = make_encoder(&qrcodes);

        let state = AppState::new(store, Resolver::new(encoder), qrcodes);
        let app = layout_server::router(state.clone());

        let port = portpicker::pick_unused_port().expect("no available port");
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let listener = TcpListener::bind(addr).await.expect("failed to bind");
        let actual_addr = listener.local_addr().expect("failed to get local addr");

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        // Spawn the server
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("server error");
        });

        // Give the server a moment to start
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

        Self {
            addr: actual_addr,
            state,
            dir,
            shutdown_tx: Some(shutdown_tx),
            handle,
        }
    }

    /// Absolute URL for `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Shared state (for test assertions).
    #[allow(dead_code)]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Directory holding saved QR code files.
    #[allow(dead_code)]
    pub fn qrcode_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("qrcodes")
    }

    /// Directory holding the persisted layout blob.
    #[allow(dead_code)]
    pub fn data_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("data")
    }

    /// Gracefully shut down the server.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = tokio::time::timeout(tokio::time::Duration::from_secs(5), self.handle).await;
    }
}
