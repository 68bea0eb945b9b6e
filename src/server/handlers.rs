//! HTTP request handlers for the slide browser and tile API.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check endpoint
//! - `GET /api/slides` - Every slide below the root
//! - `GET /api/slides/browse?path=` - One directory level
//! - `GET /api/slides/{slide_id}/info` - Slide metadata
//! - `GET /api/slides/{slide_id}/overview` - Whole-slide JPEG overview
//! - `GET /api/slides/{slide_id}/dzi` - Tile pyramid description
//! - `GET /api/slides/{slide_id}/tiles/{level}/{col}/{row}.jpg` - Serve a tile
//!
//! Slide operations block on file I/O and decoding, so every handler moves its
//! work onto the blocking thread pool.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::task::JoinError;
use tracing::{debug, error, warn};

use crate::browse::{BrowseListing, CatalogEntry, DirectoryBrowser};
use crate::error::{BrowseError, EngineError, TileError};
use crate::slide::DecodeEngine;
use crate::tile::{
    PyramidMetadata, SlideMetadata, TileAddress, TileService, DEFAULT_JPEG_QUALITY,
    DEFAULT_OVERVIEW_MAX_SIZE,
};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<E: DecodeEngine> {
    /// Pixel and metadata requests
    pub tile_service: Arc<TileService<E>>,

    /// Directory listings
    pub browser: Arc<DirectoryBrowser<E>>,

    /// Cache-Control max-age for images, in seconds
    pub cache_max_age: u32,

    /// Quality used when a request does not specify one
    pub jpeg_quality: u8,

    /// Overview size used when a request does not specify one
    pub overview_max_size: u32,
}

impl<E: DecodeEngine> AppState<E> {
    /// Create a new application state with default response settings.
    pub fn new(tile_service: Arc<TileService<E>>, browser: Arc<DirectoryBrowser<E>>) -> Self {
        Self {
            tile_service,
            browser,
            cache_max_age: 3600,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            overview_max_size: DEFAULT_OVERVIEW_MAX_SIZE,
        }
    }

    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn with_overview_max_size(mut self, max_size: u32) -> Self {
        self.overview_max_size = max_size;
        self
    }

    fn jpeg_response(&self, data: Bytes) -> Response {
        (
            [
                (header::CONTENT_TYPE, "image/jpeg".to_string()),
                (
                    header::CACHE_CONTROL,
                    format!("public, max-age={}", self.cache_max_age),
                ),
            ],
            data,
        )
            .into_response()
    }
}

impl<E: DecodeEngine> Clone for AppState<E> {
    fn clone(&self) -> Self {
        Self {
            tile_service: Arc::clone(&self.tile_service),
            browser: Arc::clone(&self.browser),
            cache_max_age: self.cache_max_age,
            jpeg_quality: self.jpeg_quality,
            overview_max_size: self.overview_max_size,
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Path parameters for tile requests.
///
/// Extracted from: `/api/slides/{slide_id}/tiles/{level}/{col}/{filename}`
/// where filename is `{row}` or `{row}.jpg`
#[derive(Debug, Deserialize)]
pub struct TilePathParams {
    pub slide_id: String,

    /// Pyramid level (0 = highest resolution)
    pub level: usize,

    /// Tile column (0-indexed from left)
    pub col: u32,

    /// Tile row with optional .jpg extension (e.g., "0" or "0.jpg")
    pub filename: String,
}

impl TilePathParams {
    /// Parse the row from the filename, stripping any .jpg/.jpeg extension.
    pub fn row(&self) -> Result<u32, std::num::ParseIntError> {
        let row = self
            .filename
            .strip_suffix(".jpg")
            .or_else(|| self.filename.strip_suffix(".jpeg"))
            .unwrap_or(&self.filename);
        row.parse()
    }
}

/// Query parameters for tile requests.
#[derive(Debug, Default, Deserialize)]
pub struct TileQueryParams {
    /// JPEG quality (1-100, defaults to the configured quality)
    #[serde(default)]
    pub quality: Option<u8>,
}

/// Query parameters for overview requests.
#[derive(Debug, Default, Deserialize)]
pub struct OverviewQueryParams {
    /// Longest side in pixels (defaults to the configured size)
    #[serde(default)]
    pub max_size: Option<u32>,

    /// JPEG quality (1-100, defaults to the configured quality)
    #[serde(default)]
    pub quality: Option<u8>,
}

/// Query parameters for directory listings.
#[derive(Debug, Default, Deserialize)]
pub struct BrowseQueryParams {
    /// Virtual path, `/` being the slides root
    #[serde(default)]
    pub path: Option<String>,
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "invalid_level")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

/// Response from the slide catalog endpoint.
#[derive(Debug, Serialize)]
pub struct SlidesResponse {
    pub count: usize,
    pub slides: Vec<CatalogEntry>,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Log by severity and build the JSON error body.
///
/// - 5xx errors are logged at ERROR level (server errors)
/// - 404 errors are logged at DEBUG level (common and expected)
/// - other 4xx errors are logged at WARN level (client errors)
fn error_response(status: StatusCode, error_type: &str, message: String) -> Response {
    if status.is_server_error() {
        error!(
            error_type = error_type,
            status = status.as_u16(),
            "Server error: {}",
            message
        );
    } else if status == StatusCode::NOT_FOUND {
        debug!(
            error_type = error_type,
            status = status.as_u16(),
            "Resource not found: {}",
            message
        );
    } else if status.is_client_error() {
        warn!(
            error_type = error_type,
            status = status.as_u16(),
            "Client error: {}",
            message
        );
    }

    let body = ErrorResponse::with_status(error_type, message, status);
    (status, Json(body)).into_response()
}

impl IntoResponse for TileError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            TileError::SlideNotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            TileError::InvalidLevel { .. } => (StatusCode::BAD_REQUEST, "invalid_level"),
            TileError::InvalidQuality { .. } => (StatusCode::BAD_REQUEST, "invalid_quality"),
            TileError::InvalidRequest { .. } => (StatusCode::BAD_REQUEST, "invalid_request"),
            TileError::Decode(EngineError::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
            TileError::Decode(_) => (StatusCode::INTERNAL_SERVER_ERROR, "decode_error"),
            TileError::Encode { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "encode_error"),
            TileError::Worker { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "worker_error"),
        };

        // Engine messages carry filesystem paths
        let message = match &self {
            TileError::Decode(EngineError::NotFound(_)) => "Slide file not found".to_string(),
            TileError::Decode(_) => "Failed to decode slide".to_string(),
            other => other.to_string(),
        };
        if let TileError::Decode(engine) = &self {
            error!("Decode engine error: {}", engine);
        }

        error_response(status, error_type, message)
    }
}

impl IntoResponse for BrowseError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            BrowseError::AccessDenied { .. } => (StatusCode::FORBIDDEN, "access_denied"),
            BrowseError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            BrowseError::NotADirectory { .. } => (StatusCode::BAD_REQUEST, "not_a_directory"),
            BrowseError::Io { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
        };
        error_response(status, error_type, self.to_string())
    }
}

impl From<JoinError> for TileError {
    fn from(err: JoinError) -> Self {
        TileError::Worker {
            message: err.to_string(),
        }
    }
}

impl From<JoinError> for BrowseError {
    fn from(err: JoinError) -> Self {
        BrowseError::Io {
            path: "/".to_string(),
            message: err.to_string(),
        }
    }
}

/// Run a blocking slide operation on the blocking thread pool.
async fn blocking<T, Err, F>(work: F) -> Result<T, Err>
where
    F: FnOnce() -> Result<T, Err> + Send + 'static,
    T: Send + 'static,
    Err: From<JoinError> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle health check requests.
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// List every slide below the root, running a full recursive scan.
pub async fn slides_handler<E: DecodeEngine>(
    State(state): State<AppState<E>>,
) -> Result<Json<SlidesResponse>, BrowseError> {
    let browser = Arc::clone(&state.browser);
    let slides = blocking(move || browser.catalog()).await?;

    Ok(Json(SlidesResponse {
        count: slides.len(),
        slides,
    }))
}

/// List one directory level.
///
/// # Errors
///
/// - `403 Forbidden`: The path escapes the slides root
/// - `404 Not Found`: The directory does not exist
/// - `400 Bad Request`: The path is not a directory
pub async fn browse_handler<E: DecodeEngine>(
    State(state): State<AppState<E>>,
    Query(query): Query<BrowseQueryParams>,
) -> Result<Json<BrowseListing>, BrowseError> {
    let path = query.path.unwrap_or_else(|| "/".to_string());
    let browser = Arc::clone(&state.browser);
    let listing = blocking(move || browser.list(&path)).await?;
    Ok(Json(listing))
}

/// Geometry, vendor and format label of a slide.
pub async fn slide_info_handler<E: DecodeEngine>(
    State(state): State<AppState<E>>,
    Path(slide_id): Path<String>,
) -> Result<Json<SlideMetadata>, TileError> {
    let service = Arc::clone(&state.tile_service);
    let metadata = blocking(move || service.metadata(&slide_id)).await?;
    Ok(Json(metadata))
}

/// Tile pyramid description for deep-zoom viewers.
pub async fn dzi_handler<E: DecodeEngine>(
    State(state): State<AppState<E>>,
    Path(slide_id): Path<String>,
) -> Result<Json<PyramidMetadata>, TileError> {
    let service = Arc::clone(&state.tile_service);
    let pyramid = blocking(move || service.pyramid(&slide_id)).await?;
    Ok(Json(pyramid))
}

/// Whole-slide overview as JPEG.
///
/// # Response Headers
///
/// - `Content-Type: image/jpeg`
/// - `Cache-Control: public, max-age={cache_max_age}`
pub async fn overview_handler<E: DecodeEngine>(
    State(state): State<AppState<E>>,
    Path(slide_id): Path<String>,
    Query(query): Query<OverviewQueryParams>,
) -> Result<Response, TileError> {
    let max_size = query.max_size.unwrap_or(state.overview_max_size);
    let quality = query.quality.unwrap_or(state.jpeg_quality);

    let service = Arc::clone(&state.tile_service);
    let data = blocking(move || service.overview(&slide_id, max_size, quality)).await?;
    Ok(state.jpeg_response(data))
}

/// Serve one tile.
///
/// # Response
///
/// `200 OK` with the JPEG tile, or `204 No Content` when the tile lies beyond
/// the level.
///
/// # Errors
///
/// - `400 Bad Request`: Invalid level, quality or row
/// - `404 Not Found`: Unknown slide identifier
/// - `500 Internal Server Error`: Decode or encode failure
pub async fn tile_handler<E: DecodeEngine>(
    State(state): State<AppState<E>>,
    Path(params): Path<TilePathParams>,
    Query(query): Query<TileQueryParams>,
) -> Result<Response, TileError> {
    let row = params.row().map_err(|_| TileError::InvalidRequest {
        message: format!("invalid tile row: {}", params.filename),
    })?;
    let address = TileAddress::new(params.level, params.col, row);
    let quality = query.quality.unwrap_or(state.jpeg_quality);

    let service = Arc::clone(&state.tile_service);
    let slide_id = params.slide_id;
    let tile = blocking(move || service.tile(&slide_id, address, quality)).await?;

    Ok(match tile {
        Some(data) => state.jpeg_response(data),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

// =============================================================================
// Tests
// =============================================================================
