//! API handlers for the PDF tools server
//!
//! Every transformation follows the same shape: parse the form, persist the
//! upload behind a [`TempFile`] guard, run the adapter on the blocking pool,
//! then stream the artifact back.
//!
//! The guards move into the blocking task and come back with its result, so
//! a client that disconnects mid-adapter cannot delete files the adapter is
//! still writing. After that they ride along inside the response body and
//! drop with it; on any early return they drop with the handler frame.

use std::path::PathBuf;

use axum::{
    body::Body,
    extract::{Multipart, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use pdftools_core::{
    compress_file, merge_files, ocr, pdf_to_docx, split_to_zip, unlock_file, CompressionQuality,
    OcrOutput, SplitMode,
};
use serde::Serialize;
use tokio_util::io::ReaderStream;
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;
use crate::tempfiles::{attachment, client_filename, display_stem, TempFile, TempStore};
use crate::upload::{read_upload, validate_pdf, UploadedPart};

const PDF_MIME: &str = "application/pdf";
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const ZIP_MIME: &str = "application/zip";

const X_ORIGINAL_SIZE: HeaderName = HeaderName::from_static("x-original-size");
const X_COMPRESSED_SIZE: HeaderName = HeaderName::from_static("x-compressed-size");
const X_TOTAL_PAGES: HeaderName = HeaderName::from_static("x-total-pages");
const X_OUTPUT_COUNT: HeaderName = HeaderName::from_static("x-output-count");
const X_FILE_COUNT: HeaderName = HeaderName::from_static("x-file-count");

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "pdftools-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Handler: POST /api/convert
pub async fn handle_convert(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = read_upload(multipart, "file", state.max_upload_mb).await?;
    let (part, _) = form.single_pdf()?;

    let input = save_upload(&state.store, &part).await?;
    let output = state.store.output_for(&part.filename, ".docx");

    let (summary, input, output) = tokio::task::spawn_blocking(move || {
        let summary = pdf_to_docx(input.path(), output.path());
        (summary, input, output)
    })
    .await?;
    let summary = summary.map_err(ApiError::transform("Conversion"))?;

    info!(operation = "convert", filename = %part.filename, pages = summary.pages, "Converted to Word");

    let name = format!("{}.docx", display_stem(&part.filename));
    download(vec![input], output, &name, DOCX_MIME, HeaderMap::new()).await
}

/// Handler: POST /api/compress
pub async fn handle_compress(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = read_upload(multipart, "file", state.max_upload_mb).await?;
    let (part, fields) = form.single_pdf()?;

    let quality: CompressionQuality = match fields.get("quality").map(|q| q.trim()) {
        None | Some("") => CompressionQuality::default(),
        Some(q) => q
            .parse()
            .map_err(|e: pdftools_core::PdfToolsError| ApiError::InvalidRequest(e.to_string()))?,
    };

    let input = save_upload(&state.store, &part).await?;
    let output = state.store.output_for(&part.filename, ".pdf");

    let (summary, input, output) = tokio::task::spawn_blocking(move || {
        let summary = compress_file(input.path(), output.path(), quality);
        (summary, input, output)
    })
    .await?;
    let summary = summary.map_err(ApiError::transform("Compression"))?;

    info!(
        operation = "compress",
        filename = %part.filename,
        %quality,
        original_size = summary.original_size,
        compressed_size = summary.compressed_size,
        "Compressed PDF"
    );

    let mut headers = HeaderMap::new();
    headers.insert(X_ORIGINAL_SIZE, HeaderValue::from(summary.original_size));
    headers.insert(X_COMPRESSED_SIZE, HeaderValue::from(summary.compressed_size));
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static("X-Original-Size, X-Compressed-Size"),
    );

    let name = format!("compressed_{}", client_filename(&part.filename));
    download(vec![input], output, &name, PDF_MIME, headers).await
}

/// Handler: POST /api/ocr
pub async fn handle_ocr(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<OcrOutput>, ApiError> {
    let form = read_upload(multipart, "file", state.max_upload_mb).await?;
    let (part, fields) = form.single_pdf()?;

    let language = match fields.get("language").map(|l| l.trim()) {
        None | Some("") => ocr::DEFAULT_LANGUAGE.to_string(),
        Some(l) => l.to_string(),
    };

    let input = save_upload(&state.store, &part).await?;

    let backend = state.ocr.clone();
    let lang = language.clone();
    let (output, input) = tokio::task::spawn_blocking(move || {
        let output = ocr::extract_text(input.path(), &lang, backend.as_ref());
        (output, input)
    })
    .await?;
    let output = output.map_err(ApiError::transform("OCR"))?;

    info!(
        operation = "ocr",
        filename = %part.filename,
        %language,
        page_count = output.page_count,
        "OCR complete"
    );

    drop(input);
    Ok(Json(output))
}

/// Handler: POST /api/unlock
pub async fn handle_unlock(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = read_upload(multipart, "file", state.max_upload_mb).await?;
    let (part, fields) = form.single_pdf()?;
    let password = fields.get("password").cloned().unwrap_or_default();

    let input = save_upload(&state.store, &part).await?;
    let output = state.store.output_for(&part.filename, ".pdf");

    let (summary, input, output) = tokio::task::spawn_blocking(move || {
        let summary = unlock_file(input.path(), output.path(), &password);
        (summary, input, output)
    })
    .await?;
    let summary = summary.map_err(ApiError::transform("Unlock"))?;

    info!(operation = "unlock", filename = %part.filename, pages = summary.pages, "Unlocked PDF");

    let name = format!("unlocked_{}", client_filename(&part.filename));
    download(vec![input], output, &name, PDF_MIME, HeaderMap::new()).await
}

/// Handler: POST /api/split
pub async fn handle_split(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = read_upload(multipart, "file", state.max_upload_mb).await?;
    let (part, fields) = form.single_pdf()?;

    let mode = SplitMode::from_form(
        fields.get("mode").map(String::as_str),
        fields.get("pages").map(String::as_str),
    );

    let input = save_upload(&state.store, &part).await?;
    let output = state.store.output_for(&part.filename, ".zip");

    let (summary, input, output) = tokio::task::spawn_blocking(move || {
        let summary = split_to_zip(input.path(), output.path(), &mode);
        (summary, input, output)
    })
    .await?;
    let summary = summary.map_err(ApiError::transform("Split"))?;

    info!(
        operation = "split",
        filename = %part.filename,
        total_pages = summary.total_pages,
        output_count = summary.output_count,
        "Split PDF"
    );

    let mut headers = HeaderMap::new();
    headers.insert(X_TOTAL_PAGES, HeaderValue::from(summary.total_pages));
    headers.insert(X_OUTPUT_COUNT, HeaderValue::from(summary.output_count));

    let name = format!("{}_split.zip", display_stem(&part.filename));
    download(vec![input], output, &name, ZIP_MIME, headers).await
}

/// Handler: POST /api/merge
pub async fn handle_merge(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = read_upload(multipart, "files", state.max_upload_mb).await?;

    if form.files.len() < 2 {
        return Err(ApiError::InvalidRequest(
            "Please select at least 2 PDF files to merge".into(),
        ));
    }
    for part in &form.files {
        validate_pdf(part)?;
    }

    let mut inputs = Vec::with_capacity(form.files.len());
    for part in &form.files {
        inputs.push(save_upload(&state.store, part).await?);
    }
    let output = state.store.output_for("merged.pdf", ".pdf");

    let (summary, inputs, output) = tokio::task::spawn_blocking(move || {
        let sources: Vec<PathBuf> = inputs.iter().map(|f| f.path().to_path_buf()).collect();
        let summary = merge_files(&sources, output.path());
        (summary, inputs, output)
    })
    .await?;
    let summary = summary.map_err(ApiError::transform("Merge"))?;

    info!(
        operation = "merge",
        file_count = summary.file_count,
        total_pages = summary.total_pages,
        "Merged PDFs"
    );

    let mut headers = HeaderMap::new();
    headers.insert(X_TOTAL_PAGES, HeaderValue::from(summary.total_pages));
    headers.insert(X_FILE_COUNT, HeaderValue::from(summary.file_count));

    download(inputs, output, "merged.pdf", PDF_MIME, headers).await
}

async fn save_upload(store: &TempStore, part: &UploadedPart) -> Result<TempFile, ApiError> {
    // Guard first, so a partial write is cleaned up too
    let file = store.upload_for(&part.filename);
    let bytes = part.bytes.clone();
    tokio::task::spawn_blocking(move || {
        std::fs::write(file.path(), &bytes)
            .map(|()| file)
            .map_err(|e| ApiError::Internal(format!("Failed to save upload: {}", e)))
    })
    .await?
}

/// Stream `output` back as an attachment. The guards move into the body
/// stream and are dropped with it.
async fn download(
    inputs: Vec<TempFile>,
    output: TempFile,
    filename: &str,
    content_type: &'static str,
    mut headers: HeaderMap,
) -> Result<Response, ApiError> {
    let file = tokio::fs::File::open(output.path())
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to open result: {}", e)))?;
    let len = file
        .metadata()
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to read result: {}", e)))?
        .len();

    let disposition = HeaderValue::from_str(&attachment(filename))
        .map_err(|e| ApiError::Internal(format!("Bad download name: {}", e)))?;

    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));

    let guards = (inputs, output);
    let stream = ReaderStream::new(file).map(move |chunk| {
        let _guards = &guards;
        chunk
    });

    Ok((StatusCode::OK, headers, Body::from_stream(stream)).into_response())
}
