//! PDF split
//!
//! Extracts pages from a PDF and packs the results into a zip archive. The
//! input is parsed once; every extracted part is cut from a clone of that
//! parsed document.

use std::collections::BTreeSet;
use std::io::{Cursor, Write};
use std::path::Path;

use lopdf::Document;
use tracing::debug;
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

use crate::error::PdfToolsError;
use crate::options::{SplitMode, SplitSummary};

/// Split the PDF at `input` and write a zip of the extracted PDFs to `output`.
///
/// `SplitMode::All` yields one `page_<n>.pdf` entry per page;
/// `SplitMode::Range` yields a single `split_pages.pdf` entry holding the
/// selected pages in ascending order.
pub fn split_to_zip(
    input: &Path,
    output: &Path,
    mode: &SplitMode,
) -> Result<SplitSummary, PdfToolsError> {
    let doc = Document::load(input).map_err(|e| PdfToolsError::ParseError(e.to_string()))?;
    let total_pages = doc.get_pages().len() as u32;

    let entries: Vec<(String, Vec<u8>)> = match mode {
        SplitMode::All => (1..=total_pages)
            .map(|page| {
                let part = extract_pages(&doc, &BTreeSet::from([page]))?;
                Ok((format!("page_{}.pdf", page), part))
            })
            .collect::<Result<_, PdfToolsError>>()?,
        SplitMode::Range(range) => {
            let pages: BTreeSet<u32> = crate::parse_page_range(range, total_pages as usize)?
                .into_iter()
                .map(|index| index as u32 + 1)
                .collect();
            if pages.is_empty() {
                return Err(PdfToolsError::InvalidRange(format!(
                    "'{}' selects no pages (document has {} pages)",
                    range, total_pages
                )));
            }
            vec![("split_pages.pdf".to_string(), extract_pages(&doc, &pages)?)]
        }
    };

    let archive = write_zip(&entries)?;
    std::fs::write(output, archive)?;

    debug!(total_pages, output_count = entries.len(), "Split PDF");

    Ok(SplitSummary {
        total_pages,
        output_count: entries.len(),
    })
}

/// Serialize a copy of `doc` that keeps only the 1-based page numbers in
/// `keep`, in document order.
pub fn extract_pages(doc: &Document, keep: &BTreeSet<u32>) -> Result<Vec<u8>, PdfToolsError> {
    let page_count = doc.get_pages().len() as u32;

    match (keep.first(), keep.last()) {
        (None, _) | (_, None) => {
            return Err(PdfToolsError::InvalidRange("No pages specified".into()));
        }
        (Some(&0), _) => {
            return Err(PdfToolsError::InvalidRange("Page numbers start at 1".into()));
        }
        (_, Some(&last)) if last > page_count => {
            return Err(PdfToolsError::InvalidRange(format!(
                "Page {} does not exist (document has {} pages)",
                last, page_count
            )));
        }
        _ => {}
    }

    // Page numbers are resolved against the tree before any deletion
    let unwanted: Vec<u32> = (1..=page_count).filter(|page| !keep.contains(page)).collect();

    let mut part = doc.clone();
    part.delete_pages(&unwanted);
    part.prune_objects();
    part.compress();

    let mut buffer = Vec::new();
    part.save_to(&mut buffer)
        .map_err(|e| PdfToolsError::OperationError(format!("Failed to write extracted pages: {}", e)))?;

    Ok(buffer)
}

fn write_zip(entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>, PdfToolsError> {
    let zip_err = |e: zip::result::ZipError| PdfToolsError::OperationError(format!("Zip failed: {}", e));

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, data) in entries {
        zip.start_file(name.as_str(), options).map_err(zip_err)?;
        zip.write_all(data)?;
    }

    Ok(zip.finish().map_err(zip_err)?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::create_test_pdf;
    use std::io::Read;

    fn page_count(bytes: &[u8]) -> usize {
        Document::load_mem(bytes).unwrap().get_pages().len()
    }

    fn zip_entries(path: &Path) -> Vec<(String, Vec<u8>)> {
        let file = std::fs::File::open(path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut entry = archive.by_index(i).unwrap();
                let mut data = Vec::new();
                entry.read_to_end(&mut data).unwrap();
                (entry.name().to_string(), data)
            })
            .collect()
    }

    fn parsed(num_pages: u32) -> Document {
        Document::load_mem(&create_test_pdf(num_pages)).unwrap()
    }

    fn page_texts(bytes: &[u8]) -> Vec<String> {
        let doc = Document::load_mem(bytes).unwrap();
        (1..=doc.get_pages().len() as u32)
            .map(|page| doc.extract_text(&[page]).unwrap().trim().to_string())
            .collect()
    }

    #[test]
    fn test_extract_no_pages_fails() {
        assert!(extract_pages(&parsed(5), &BTreeSet::new()).is_err());
    }

    #[test]
    fn test_extract_keeps_selected_pages_in_order() {
        let result = extract_pages(&parsed(5), &BTreeSet::from([5, 1, 3])).unwrap();
        assert_eq!(page_count(&result), 3);
        assert_eq!(page_texts(&result), vec!["Page 1", "Page 3", "Page 5"]);
    }

    #[test]
    fn test_extract_out_of_bounds_fails() {
        let doc = parsed(5);
        assert!(matches!(
            extract_pages(&doc, &BTreeSet::from([10])),
            Err(PdfToolsError::InvalidRange(_))
        ));
        assert!(matches!(
            extract_pages(&doc, &BTreeSet::from([0, 2])),
            Err(PdfToolsError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_extract_leaves_source_document_intact() {
        let doc = parsed(4);
        extract_pages(&doc, &BTreeSet::from([2])).unwrap();
        let again = extract_pages(&doc, &BTreeSet::from([3, 4])).unwrap();

        assert_eq!(doc.get_pages().len(), 4);
        assert_eq!(page_texts(&again), vec!["Page 3", "Page 4"]);
    }

    #[test]
    fn test_split_to_zip_all_pages() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        let output = dir.path().join("out.zip");
        std::fs::write(&input, create_test_pdf(3)).unwrap();

        let summary = split_to_zip(&input, &output, &SplitMode::All).unwrap();

        assert_eq!(summary.total_pages, 3);
        assert_eq!(summary.output_count, 3);

        let entries = zip_entries(&output);
        let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["page_1.pdf", "page_2.pdf", "page_3.pdf"]);
        assert!(entries.iter().all(|(_, data)| page_count(data) == 1));
        assert_eq!(page_texts(&entries[1].1), vec!["Page 2"]);
    }

    #[test]
    fn test_split_to_zip_range() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        let output = dir.path().join("out.zip");
        std::fs::write(&input, create_test_pdf(10)).unwrap();

        let summary =
            split_to_zip(&input, &output, &SplitMode::Range("1-3,5,9-20".into())).unwrap();

        assert_eq!(summary.total_pages, 10);
        assert_eq!(summary.output_count, 1);

        let entries = zip_entries(&output);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "split_pages.pdf");
        assert_eq!(page_count(&entries[0].1), 6);
    }

    #[test]
    fn test_split_to_zip_malformed_range_fails() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        let output = dir.path().join("out.zip");
        std::fs::write(&input, create_test_pdf(3)).unwrap();

        let err = split_to_zip(&input, &output, &SplitMode::Range("1-two".into())).unwrap_err();
        assert!(matches!(err, PdfToolsError::InvalidRange(_)));
        assert!(!output.exists());
    }

    #[test]
    fn test_split_to_zip_range_selecting_nothing_fails() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        let output = dir.path().join("out.zip");
        std::fs::write(&input, create_test_pdf(3)).unwrap();

        let err = split_to_zip(&input, &output, &SplitMode::Range("7,9".into())).unwrap_err();
        assert!(matches!(err, PdfToolsError::InvalidRange(_)));
    }
}
