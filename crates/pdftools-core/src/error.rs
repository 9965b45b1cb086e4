use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfToolsError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("Invalid page range: {0}")]
    InvalidRange(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Incorrect password. Please try again.")]
    IncorrectPassword,

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("Word conversion error: {0}")]
    Conversion(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PdfToolsError {
    /// True when the caller can fix the failure by resubmitting with
    /// different input (currently only a wrong unlock password).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PdfToolsError::IncorrectPassword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_incorrect_password_is_recoverable() {
        assert!(PdfToolsError::IncorrectPassword.is_recoverable());
        assert!(!PdfToolsError::ParseError("bad".into()).is_recoverable());
        assert!(!PdfToolsError::OperationError("boom".into()).is_recoverable());
        assert!(!PdfToolsError::Ocr("no tesseract".into()).is_recoverable());
    }

    #[test]
    fn incorrect_password_message_mentions_password() {
        let msg = PdfToolsError::IncorrectPassword.to_string();
        assert!(msg.to_lowercase().contains("password"));
    }
}
