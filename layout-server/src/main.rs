//! # Layout Forge Server
//!
//! Local embedded server for Layout Forge.
//! Binds to localhost only for security.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    response::IntoResponse,
    routing::get,
    Router,
};
use clap::Parser;
use layout_core::{FileBlobStore, LayoutStore, LocalQrEncoder, QrEncoder, Resolver};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use layout_server::metrics;
use layout_server::{AppState, HttpQrEncoder, QrCodeFolder, SavingQrEncoder, ServerConfig};

/// Build a CORS layer that only allows localhost origins.
fn build_cors_layer(port: u16) -> CorsLayer {
    let localhost_origins = [
        format!("http://localhost:{port}"),
        format!("http://127.0.0.1:{port}"),
        // Editor dev servers
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(), // Vite
        "http://127.0.0.1:3000".to_string(),
        "http://127.0.0.1:5173".to_string(),
    ];

    let origins: Vec<HeaderValue> = localhost_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

/// Initialize structured tracing with optional JSON format.
///
/// Set `RUST_LOG` to control log levels (default: info,layout_server=debug,tower_http=debug).
/// Set `RUST_LOG_FORMAT=json` for JSON output (recommended for production).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,layout_server=debug,layout_core=debug,tower_http=debug")
    });

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

/// Pick the QR encoder: the remote service when configured, local otherwise,
/// optionally saving every code into the QR code folder.
fn build_qr_encoder(
    config: &ServerConfig,
    qrcodes: &QrCodeFolder,
) -> anyhow::Result<Arc<dyn QrEncoder>> {
    let encoder: Arc<dyn QrEncoder> = match &config.qr_service_url {
        Some(url) => {
            tracing::info!("Using remote QR service at {url}");
            Arc::new(HttpQrEncoder::new(url)?)
        }
        None => {
            tracing::info!("Rendering QR codes locally");
            Arc::new(LocalQrEncoder::new())
        }
    };

    if config.save_qrcodes {
        tracing::info!("Saving generated QR codes to {:?}", qrcodes.dir());
        return Ok(Arc::new(SavingQrEncoder::new(
            encoder,
            Arc::new(qrcodes.clone()),
        )));
    }
    Ok(encoder)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = ServerConfig::parse();

    let metrics_handle = metrics::init_metrics()
        .map_err(|e| anyhow::anyhow!("Failed to initialize Prometheus metrics: {}", e))?;
    tracing::info!("Prometheus metrics initialized");

    // Load persisted layouts
    let blob = FileBlobStore::new(&config.data_dir)?;
    tracing::info!("Persisting layouts in {:?}", blob.data_dir());
    let mut store = LayoutStore::new(Arc::new(blob));
    let loaded = store.load_from_blob();
    metrics::set_layouts_stored(loaded);
    tracing::info!("Loaded {loaded} layouts");

    // QR code folder is created up front so it can be served immediately
    let qrcodes = QrCodeFolder::new(&config.qrcode_dir, config.qrcode_max_age());
    let status = qrcodes.check()?;
    tracing::info!(
        "Serving {} QR code files from {:?}",
        status.files_count,
        status.path
    );

    let resolver = Resolver::new(build_qr_encoder(&config, &qrcodes)?);
    let state = AppState::new(store, resolver, qrcodes);

    // Build metrics router with PrometheusHandle
    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics_handle);

    let app = layout_server::router(state)
        .merge(metrics_router)
        // Request ID for distributed tracing correlation
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        // CORS configuration - restricted to localhost only for security
        .layer(build_cors_layer(config.port))
        // Structured request tracing with timing
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    // Bind to localhost ONLY (security requirement)
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Layout Forge server starting on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Prometheus metrics endpoint.
#[tracing::instrument(name = "metrics", skip(handle))]
async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
