//! Password removal

use std::path::Path;

use lopdf::encryption::DecryptionError;
use lopdf::{Document, Object};
use tracing::debug;

use crate::error::PdfToolsError;
use crate::options::UnlockSummary;

/// Write a decrypted copy of `input` to `output`.
///
/// Unencrypted files are simply re-saved. Only a password the security
/// handler rejects (including an empty password on a protected file) becomes
/// [`PdfToolsError::IncorrectPassword`]; an encryption scheme the PDF library
/// cannot handle, or a damaged encryption dictionary, is an
/// [`PdfToolsError::OperationError`].
pub fn unlock_file(input: &Path, output: &Path, password: &str) -> Result<UnlockSummary, PdfToolsError> {
    let mut doc = Document::load(input).map_err(|e| PdfToolsError::ParseError(e.to_string()))?;

    if doc.is_encrypted() {
        let encrypt_id = doc.trailer.get(b"Encrypt").and_then(Object::as_reference).ok();

        doc.decrypt(password).map_err(|e| match e {
            lopdf::Error::Decryption(DecryptionError::IncorrectPassword) => {
                debug!("Password rejected");
                PdfToolsError::IncorrectPassword
            }
            other => PdfToolsError::OperationError(format!(
                "Unsupported or damaged encryption: {}",
                other
            )),
        })?;

        doc.trailer.remove(b"Encrypt");
        if let Some(id) = encrypt_id {
            doc.objects.remove(&id);
        }
    }

    let pages = doc.get_pages().len() as u32;

    doc.save(output)
        .map_err(|e| PdfToolsError::OperationError(format!("Failed to save unlocked PDF: {}", e)))?;

    Ok(UnlockSummary { pages })
}
