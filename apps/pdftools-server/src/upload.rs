//! Multipart form parsing

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::Multipart;
use axum::http::StatusCode;

use crate::error::ApiError;

/// One file part from the form.
#[derive(Debug)]
pub struct UploadedPart {
    pub filename: String,
    pub bytes: Bytes,
}

/// Everything a transformation form carries.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub files: Vec<UploadedPart>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    /// The single validated PDF a one-file endpoint works on.
    pub fn single_pdf(mut self) -> Result<(UploadedPart, HashMap<String, String>), ApiError> {
        if self.files.is_empty() {
            return Err(ApiError::InvalidRequest("No file uploaded".into()));
        }
        let part = self.files.swap_remove(0);
        validate_pdf(&part)?;
        Ok((part, self.fields))
    }
}

/// Drain the multipart body. Parts named `file_field` become files, the
/// rest become text fields.
pub async fn read_upload(
    mut multipart: Multipart,
    file_field: &str,
    limit_mb: u64,
) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    let map_err = |e: axum::extract::multipart::MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge { limit_mb }
        } else {
            ApiError::InvalidRequest(format!("Invalid form data: {}", e.body_text()))
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(map_err)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == file_field {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(map_err)?;
            form.files.push(UploadedPart { filename, bytes });
        } else {
            let value = field.text().await.map_err(map_err)?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

/// Only `.pdf` uploads are accepted, case-insensitively.
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

pub fn validate_pdf(part: &UploadedPart) -> Result<(), ApiError> {
    if part.filename.is_empty() || !allowed_file(&part.filename) {
        return Err(ApiError::InvalidRequest(
            "Invalid file. Please upload a PDF.".into(),
        ));
    }
    Ok(())
}
