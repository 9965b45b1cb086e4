//! PDF to Word conversion
//!
//! Text-only: every text line lopdf extracts becomes one paragraph, and a
//! page break separates PDF pages. Fonts, images and layout are not carried
//! over.

use std::fs::File;
use std::path::Path;

use docx_rs::{BreakType, Docx, Paragraph, Run};
use lopdf::Document;
use tracing::{debug, warn};

use crate::error::PdfToolsError;
use crate::options::ConversionSummary;

pub fn pdf_to_docx(input: &Path, output: &Path) -> Result<ConversionSummary, PdfToolsError> {
    let doc = Document::load(input).map_err(|e| PdfToolsError::ParseError(e.to_string()))?;
    let page_numbers: Vec<u32> = doc.get_pages().into_keys().collect();

    let mut docx = Docx::new();
    for (index, &page) in page_numbers.iter().enumerate() {
        if index > 0 {
            docx = docx.add_paragraph(
                Paragraph::new().add_run(Run::new().add_break(BreakType::Page)),
            );
        }

        let text = match doc.extract_text(&[page]) {
            Ok(text) => text,
            Err(e) => {
                // Pages with unsupported fonts or encodings come out blank
                warn!(page, error = %e, "No text extracted from page");
                String::new()
            }
        };

        for line in text.lines().map(str::trim_end).filter(|l| !l.trim().is_empty()) {
            docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(line)));
        }
    }

    let file = File::create(output)?;
    docx.build()
        .pack(file)
        .map_err(|e| PdfToolsError::Conversion(e.to_string()))?;

    debug!(pages = page_numbers.len(), "Converted PDF to DOCX");

    Ok(ConversionSummary {
        pages: page_numbers.len() as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::create_test_pdf;
    use std::io::Read;

    fn document_xml(path: &Path) -> String {
        let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    #[test]
    fn test_convert_writes_docx_with_page_text() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        let output = dir.path().join("out.docx");
        std::fs::write(&input, create_test_pdf(2)).unwrap();

        let summary = pdf_to_docx(&input, &output).unwrap();

        assert_eq!(summary.pages, 2);
        let xml = document_xml(&output);
        assert!(xml.contains("Page 1"));
        assert!(xml.contains("Page 2"));
        assert!(xml.contains(r#"w:type="page""#));
    }

    #[test]
    fn test_convert_rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        std::fs::write(&input, b"hello").unwrap();

        let err = pdf_to_docx(&input, &dir.path().join("out.docx")).unwrap_err();
        assert!(matches!(err, PdfToolsError::ParseError(_)));
    }
}
