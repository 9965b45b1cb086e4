//! Router assembly

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::header,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::api::{
    handle_compress, handle_convert, handle_health, handle_merge, handle_ocr, handle_split,
    handle_unlock,
};
use crate::error::ApiError;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes();
    let index = state.static_dir.join("index.html");

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Front-end
        .route_service("/", ServeFile::new(index))
        .nest_service("/static", ServeDir::new(&state.static_dir))
        // Health check
        .route("/health", get(handle_health))
        // Transformations
        .route("/api/convert", post(handle_convert))
        .route("/api/compress", post(handle_compress))
        .route("/api/ocr", post(handle_ocr))
        .route("/api/unlock", post(handle_unlock))
        .route("/api/split", post(handle_split))
        .route("/api/merge", post(handle_merge))
        // Apply middleware
        .layer(middleware::from_fn_with_state(state.clone(), reject_oversized))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Answer a declared `Content-Length` over the limit with the JSON 413
/// before any of the body is read. Chunked bodies are caught later by
/// `DefaultBodyLimit` inside the multipart reader.
async fn reject_oversized(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    if let Some(len) = declared {
        if len > state.max_upload_bytes() as u64 {
            tracing::debug!(content_length = len, "Rejected oversized request");
            return Err(ApiError::PayloadTooLarge {
                limit_mb: state.max_upload_mb,
            });
        }
    }

    Ok(next.run(request).await)
}
