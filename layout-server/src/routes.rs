//! API route handlers.
//!
//! Every handler takes the store lock in a short synchronous section and
//! drops it before any `.await`.

use std::fmt::Display;
use std::path::PathBuf;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use layout_core::{
    extract_variables, ExportDocument, Layout, LayoutError, LayoutId, LayoutPatch, ResolvedLayout,
    VariableDeclaration, VariableValues,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics;
use crate::qrcodes::QrFileError;
use crate::validation::{self, ValidationError};
use crate::AppState;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by API handlers, rendered as `{success: false, message}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A client-facing failure with an explicit status.
    #[error("{status}: {message}")]
    Http {
        /// Response status.
        status: StatusCode,
        /// Human readable message.
        message: String,
    },
    /// A server-side failure; the cause is reported in the `error` field.
    #[error("{message}: {error}")]
    Internal {
        /// Human readable message.
        message: String,
        /// Underlying cause.
        error: String,
    },
    /// Untrusted input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A layout operation failed.
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, error) = match self {
            Self::Http { status, message } => (status, message, None),
            Self::Internal { message, error } => {
                tracing::error!("{message}: {error}");
                (StatusCode::INTERNAL_SERVER_ERROR, message, Some(error))
            }
            Self::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string(), None),
            Self::Layout(LayoutError::LayoutNotFound(id)) => {
                (StatusCode::NOT_FOUND, format!("Layout not found: {id}"), None)
            }
            Self::Layout(
                e @ (LayoutError::InvalidDimension { .. } | LayoutError::DuplicateElement(_)),
            ) => {
                (StatusCode::BAD_REQUEST, e.to_string(), None)
            }
            Self::Layout(e) => {
                tracing::error!("Layout operation failed: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Layout operation failed".to_string(),
                    Some(e.to_string()),
                )
            }
        };
        let body = Json(ErrorBody {
            success: false,
            message,
            error,
        });
        (status, body).into_response()
    }
}

impl ApiError {
    /// 400 with `message`.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Http {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// 404 with `message`.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::Http {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    /// 500 with `message` and the underlying cause.
    pub fn internal(message: impl Into<String>, error: impl Display) -> Self {
        Self::Internal {
            message: message.into(),
            error: error.to_string(),
        }
    }

    /// Map a QR folder failure: request problems are 400, I/O is 500.
    fn qr_file(message: &str, error: QrFileError) -> Self {
        if error.is_client_error() {
            metrics::record_validation_failure("qrcode");
            Self::bad_request(error.to_string())
        } else {
            Self::internal(message, error)
        }
    }
}

fn validated(result: Result<(), ValidationError>, kind: &'static str) -> Result<(), ApiError> {
    result.map_err(|e| {
        metrics::record_validation_failure(kind);
        ApiError::from(e)
    })
}

fn parse_layout_id(raw: &str) -> Result<LayoutId, ApiError> {
    LayoutId::parse(raw).map_err(|_| {
        metrics::record_validation_failure("layout_id");
        ApiError::bad_request(format!("Invalid layout id: {raw}"))
    })
}

/// Run a QR folder operation on the blocking pool.
async fn run_blocking<T, F>(message: &'static str, op: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, QrFileError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| ApiError::internal(message, e))?
        .map_err(|e| ApiError::qr_file(message, e))
}

// ---------------------------------------------------------------------------
// QR code files
// ---------------------------------------------------------------------------

/// Response for a saved QR code.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveQrCodeResponse {
    /// Always `true`.
    pub success: bool,
    /// Human readable message.
    pub message: String,
    /// Public path of the saved file.
    pub file_path: String,
}

/// Response for a folder check.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckFolderResponse {
    /// Always `true`.
    pub success: bool,
    /// Human readable message.
    pub message: String,
    /// Folder path.
    pub path: PathBuf,
    /// Number of entries in the folder.
    pub files_count: usize,
}

/// Response for a cleanup run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResponse {
    /// Always `true`.
    pub success: bool,
    /// Human readable message.
    pub message: String,
    /// Number of files removed.
    pub removed_count: usize,
}

/// Save an uploaded QR code image.
///
/// Multipart fields: `qrData` (PNG data URI or base64) and `filename`.
#[tracing::instrument(name = "save_qrcode", skip(state, multipart))]
pub async fn save_qrcode(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SaveQrCodeResponse>, ApiError> {
    let mut qr_data = None;
    let mut filename = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Multipart error: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "qrData" | "filename" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read {name}: {e}")))?;
                if name == "qrData" {
                    qr_data = Some(text);
                } else {
                    filename = Some(text);
                }
            }
            _ => {}
        }
    }

    let (Some(qr_data), Some(filename)) = (
        qr_data.filter(|s| !s.is_empty()),
        filename.filter(|s| !s.is_empty()),
    ) else {
        return Err(ApiError::bad_request("QR code data or filename missing"));
    };

    let folder = state.qrcodes.clone();
    let file_path = run_blocking("Failed to save QR code", move || {
        folder.save(&filename, &qr_data)
    })
    .await?;
    metrics::record_qr_file_saved();

    Ok(Json(SaveQrCodeResponse {
        success: true,
        message: "QR code saved".to_string(),
        file_path,
    }))
}

/// Create the QR code folder if needed and report its contents.
#[tracing::instrument(name = "check_qrcodes_folder", skip(state))]
pub async fn check_qrcodes_folder(
    State(state): State<AppState>,
) -> Result<Json<CheckFolderResponse>, ApiError> {
    let folder = state.qrcodes.clone();
    let status = run_blocking("Failed to check QR code folder", move || folder.check()).await?;

    Ok(Json(CheckFolderResponse {
        success: true,
        message: "QR code folder checked".to_string(),
        path: status.path,
        files_count: status.files_count,
    }))
}

/// Remove saved QR code images older than the configured age.
#[tracing::instrument(name = "cleanup_qrcodes", skip(state))]
pub async fn cleanup_qrcodes(
    State(state): State<AppState>,
) -> Result<Json<CleanupResponse>, ApiError> {
    let folder = state.qrcodes.clone();
    let removed_count =
        run_blocking("Failed to clean up old QR codes", move || folder.cleanup()).await?;
    metrics::record_qr_files_removed(removed_count);

    Ok(Json(CleanupResponse {
        success: true,
        message: format!("{removed_count} old QR codes removed"),
        removed_count,
    }))
}

// ---------------------------------------------------------------------------
// Layouts
// ---------------------------------------------------------------------------

/// Summary of a stored layout.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSummary {
    /// Layout id.
    pub id: LayoutId,
    /// Layout name.
    pub name: String,
    /// Canvas width.
    pub width: u32,
    /// Canvas height.
    pub height: u32,
    /// Number of elements.
    pub element_count: usize,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl From<&Layout> for LayoutSummary {
    fn from(layout: &Layout) -> Self {
        let size = layout.canvas_size();
        Self {
            id: layout.id(),
            name: layout.name.clone(),
            width: size.width,
            height: size.height,
            element_count: layout.elements().len(),
            created_at: layout.created_at(),
            updated_at: layout.updated_at(),
        }
    }
}

/// Response for `GET /api/layouts`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutListResponse {
    /// Layouts in insertion order.
    pub layouts: Vec<LayoutSummary>,
    /// The active layout, if any.
    pub active_layout_id: Option<LayoutId>,
}

/// Request body for `POST /api/layouts`.
#[derive(Debug, Deserialize)]
pub struct CreateLayoutRequest {
    /// Layout name.
    pub name: String,
    /// Canvas width.
    pub width: u32,
    /// Canvas height.
    pub height: u32,
}

/// Response for `POST /api/layouts/save`.
#[derive(Debug, Serialize)]
pub struct SaveLayoutsResponse {
    /// Always `true`.
    pub success: bool,
    /// Human readable message.
    pub message: String,
    /// Number of layouts persisted.
    pub count: usize,
}

/// List all layouts.
#[tracing::instrument(name = "list_layouts", skip(state))]
pub async fn list_layouts(State(state): State<AppState>) -> Json<LayoutListResponse> {
    let store = state.read_store();
    Json(LayoutListResponse {
        layouts: store.layouts().iter().map(LayoutSummary::from).collect(),
        active_layout_id: store.active_layout_id(),
    })
}

/// Create a layout and make it active. Not persisted until saved.
#[tracing::instrument(name = "create_layout", skip(state, request), fields(name = %request.name))]
pub async fn create_layout(
    State(state): State<AppState>,
    Json(request): Json<CreateLayoutRequest>,
) -> Result<(StatusCode, Json<Layout>), ApiError> {
    validated(validation::validate_layout_name(&request.name), "layout_name")?;

    let mut store = state.write_store();
    let id = store.create_layout(request.name, request.width, request.height)?;
    metrics::set_layouts_stored(store.len());
    let layout = store.snapshot(id)?;
    tracing::info!("Created layout {id}");

    Ok((StatusCode::CREATED, Json(layout)))
}

/// Get a layout by id.
#[tracing::instrument(name = "get_layout", skip(state))]
pub async fn get_layout(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Layout>, ApiError> {
    let id = parse_layout_id(&id)?;
    let layout = state.read_store().snapshot(id)?;
    Ok(Json(layout))
}

/// Merge a partial update into a layout.
#[tracing::instrument(name = "update_layout", skip(state, patch))]
pub async fn update_layout(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<LayoutPatch>,
) -> Result<Json<Layout>, ApiError> {
    let id = parse_layout_id(&id)?;
    if let Some(name) = &patch.name {
        validated(validation::validate_layout_name(name), "layout_name")?;
    }

    let mut store = state.write_store();
    if !store.update_layout(id, patch)? {
        return Err(ApiError::not_found(format!("Layout not found: {id}")));
    }
    Ok(Json(store.snapshot(id)?))
}

/// Delete a layout and persist the remaining set.
#[tracing::instrument(name = "delete_layout", skip(state))]
pub async fn delete_layout(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_layout_id(&id)?;

    let mut store = state.write_store();
    let deleted = store
        .delete_layout(id)
        .map_err(|e| ApiError::internal("Layout deleted but could not be persisted", e))?;
    metrics::set_layouts_stored(store.len());

    if deleted {
        tracing::info!("Deleted layout {id}");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("Layout not found: {id}")))
    }
}

/// Persist every layout, stamping each as updated.
#[tracing::instrument(name = "save_layouts", skip(state))]
pub async fn save_layouts(
    State(state): State<AppState>,
) -> Result<Json<SaveLayoutsResponse>, ApiError> {
    let mut store = state.write_store();
    store
        .save_all()
        .map_err(|e| ApiError::internal("Failed to save layouts", e))?;
    let count = store.len();

    Ok(Json(SaveLayoutsResponse {
        success: true,
        message: format!("{count} layouts saved"),
        count,
    }))
}

/// List the variables a layout declares.
#[tracing::instrument(name = "layout_variables", skip(state))]
pub async fn layout_variables(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<VariableDeclaration>>, ApiError> {
    let id = parse_layout_id(&id)?;
    let store = state.read_store();
    let layout = store
        .layout(id)
        .ok_or_else(|| ApiError::not_found(format!("Layout not found: {id}")))?;
    Ok(Json(extract_variables(layout)))
}

// ---------------------------------------------------------------------------
// Processing
// ---------------------------------------------------------------------------

async fn resolve_batch(
    state: &AppState,
    raw_id: &str,
    values: &VariableValues,
    format: &'static str,
) -> Result<ResolvedLayout, ApiError> {
    let id = parse_layout_id(raw_id)?;
    validated(validation::validate_variable_values(values), "variables")?;

    let layout = {
        let store = state.read_store();
        store.snapshot(id)?
    };
    let resolved = state.resolver.resolve(&layout, values).await;
    metrics::record_batch_processed(format, resolved.qr_generated, resolved.qr_fallbacks);

    Ok(resolved)
}

/// Resolve a layout against a values map and return the export document.
#[tracing::instrument(name = "process_layout", skip(state, values))]
pub async fn process_layout(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(values): Json<VariableValues>,
) -> Result<Json<ExportDocument>, ApiError> {
    let resolved = resolve_batch(&state, &id, &values, "json").await?;
    Ok(Json(resolved.to_export_document()))
}

/// Resolve a layout against a values map and render it as HTML.
#[tracing::instrument(name = "process_layout_html", skip(state, values))]
pub async fn process_layout_html(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(values): Json<VariableValues>,
) -> Result<Html<String>, ApiError> {
    let resolved = resolve_batch(&state, &id, &values, "html").await?;
    Ok(Html(resolved.to_export_document().render_html()))
}
