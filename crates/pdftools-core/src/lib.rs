//! PDF transformation adapters
//!
//! Each adapter takes file paths in and writes one artifact out, delegating
//! the heavy lifting to third-party libraries:
//! - `compress_file`, `merge_files`, `split_to_zip`, `unlock_file`: lopdf
//! - `pdf_to_docx`: lopdf text extraction + docx-rs
//! - `ocr::extract_text`: poppler `pdftoppm` + Tesseract, behind `OcrBackend`
//!
//! Nothing here knows about HTTP or temp-file lifetimes; callers own both.

pub mod compress;
pub mod convert;
pub mod error;
pub mod merge;
pub mod ocr;
pub mod options;
pub mod split;
pub mod unlock;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use compress::compress_file;
pub use convert::pdf_to_docx;
pub use error::PdfToolsError;
pub use merge::{merge_documents, merge_files};
pub use ocr::{CommandLineOcr, OcrBackend, OcrOutput, OcrPage};
pub use options::{
    CompressionQuality, CompressionSummary, ConversionSummary, MergeSummary, SplitMode,
    SplitSummary, UnlockSummary,
};
pub use split::{extract_pages, split_to_zip};
pub use unlock::unlock_file;

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, PdfToolsError> {
    let doc =
        lopdf::Document::load_mem(bytes).map_err(|e| PdfToolsError::ParseError(e.to_string()))?;
    Ok(doc.get_pages().len() as u32)
}

/// Parse a page range string like "1-3, 5, 8-10" into sorted, unique,
/// 0-based page indices.
///
/// Ranges are clamped into `[1, total_pages]` (and may end up empty);
/// single pages outside that window are dropped. A token that is not a
/// number, including an empty one, is an error rather than being skipped.
pub fn parse_page_range(input: &str, total_pages: usize) -> Result<Vec<usize>, PdfToolsError> {
    use std::collections::BTreeSet;

    let total = total_pages as i64;
    let mut pages = BTreeSet::new();

    for part in input.split(',') {
        let part = part.trim();

        if let Some((start, end)) = part.split_once('-') {
            // Range like "1-3"
            let start = parse_page_number(start)?.max(1);
            let end = parse_page_number(end)?.min(total);
            for page in start..=end {
                pages.insert((page - 1) as usize);
            }
        } else {
            // Single page like "5"
            let page = parse_page_number(part)?;
            if (1..=total).contains(&page) {
                pages.insert((page - 1) as usize);
            }
        }
    }

    Ok(pages.into_iter().collect())
}

fn parse_page_number(token: &str) -> Result<i64, PdfToolsError> {
    let token = token.trim();
    token
        .parse()
        .map_err(|_| PdfToolsError::InvalidRange(format!("Invalid page number: '{}'", token)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_page_range_mixed() {
        assert_eq!(parse_page_range("1-3,5", 10).unwrap(), vec![0, 1, 2, 4]);
    }

    #[test]
    fn test_parse_page_range_clamps_ranges() {
        assert_eq!(parse_page_range("8-12", 10).unwrap(), vec![7, 8, 9]);
        assert_eq!(parse_page_range("0-2", 10).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_parse_page_range_drops_out_of_range_singletons() {
        assert!(parse_page_range("0,11", 10).unwrap().is_empty());
    }

    #[test]
    fn test_parse_page_range_deduplicates() {
        assert_eq!(parse_page_range("1,1-2", 10).unwrap(), vec![0, 1]);
        assert_eq!(parse_page_range("1-3, 2-4", 10).unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_parse_page_range_tolerates_whitespace() {
        assert_eq!(parse_page_range(" 2 - 3 , 7 ", 10).unwrap(), vec![1, 2, 6]);
    }

    #[test]
    fn test_parse_page_range_reversed_range_is_empty() {
        assert!(parse_page_range("5-3", 10).unwrap().is_empty());
    }

    #[test]
    fn test_parse_page_range_rejects_garbage() {
        assert!(matches!(
            parse_page_range("1,abc", 10),
            Err(PdfToolsError::InvalidRange(_))
        ));
        assert!(parse_page_range("1-x", 10).is_err());
        assert!(parse_page_range("1,,2", 10).is_err());
        assert!(parse_page_range("", 10).is_err());
    }

    #[test]
    fn test_get_page_count() {
        let pdf = testing::create_test_pdf(4);
        assert_eq!(get_page_count(&pdf).unwrap(), 4);
        assert!(get_page_count(b"not a pdf").is_err());
    }

    proptest! {
        #[test]
        fn parsed_pages_are_sorted_unique_and_in_bounds(
            tokens in prop::collection::vec((1usize..40, 0usize..5), 1..8),
            total in 1usize..30,
        ) {
            let input = tokens
                .iter()
                .map(|(start, span)| if *span == 0 {
                    start.to_string()
                } else {
                    format!("{}-{}", start, start + span)
                })
                .collect::<Vec<_>>()
                .join(",");

            let pages = parse_page_range(&input, total).unwrap();

            prop_assert!(pages.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(pages.iter().all(|&p| p < total));
        }
    }
}
