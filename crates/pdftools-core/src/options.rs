use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::PdfToolsError;

/// How aggressively `compress_file` treats embedded images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionQuality {
    /// Stream compression and object pruning only.
    Low,
    #[default]
    Medium,
    High,
}

impl CompressionQuality {
    /// JPEG quality used when re-encoding DCT images, `None` when images
    /// are left untouched.
    pub fn jpeg_quality(self) -> Option<u8> {
        match self {
            CompressionQuality::Low => None,
            CompressionQuality::Medium => Some(60),
            CompressionQuality::High => Some(40),
        }
    }
}

impl FromStr for CompressionQuality {
    type Err = PdfToolsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(CompressionQuality::Low),
            "medium" => Ok(CompressionQuality::Medium),
            "high" => Ok(CompressionQuality::High),
            other => Err(PdfToolsError::OperationError(format!(
                "Unknown compression quality '{}'. Must be 'low', 'medium', or 'high'",
                other
            ))),
        }
    }
}

impl fmt::Display for CompressionQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompressionQuality::Low => "low",
            CompressionQuality::Medium => "medium",
            CompressionQuality::High => "high",
        };
        f.write_str(s)
    }
}

/// Which pages `split_to_zip` extracts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitMode {
    /// One single-page PDF per page.
    All,
    /// A single PDF with the pages selected by a range string like "1-3,5".
    Range(String),
}

impl SplitMode {
    /// Build a mode from the `mode`/`pages` form values.
    ///
    /// Only `range` with a non-blank page string selects `Range`; any other
    /// mode, including an unknown one, splits every page.
    pub fn from_form(mode: Option<&str>, pages: Option<&str>) -> Self {
        let pages = pages.map(str::trim).unwrap_or_default();
        let is_range = mode.is_some_and(|m| m.trim().eq_ignore_ascii_case("range"));
        if is_range && !pages.is_empty() {
            SplitMode::Range(pages.to_string())
        } else {
            SplitMode::All
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompressionSummary {
    pub original_size: u64,
    pub compressed_size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub total_pages: u32,
    pub file_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SplitSummary {
    pub total_pages: u32,
    pub output_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnlockSummary {
    pub pages: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConversionSummary {
    pub pages: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_parses_case_insensitively() {
        assert_eq!("HIGH".parse::<CompressionQuality>().unwrap(), CompressionQuality::High);
        assert_eq!(" low ".parse::<CompressionQuality>().unwrap(), CompressionQuality::Low);
        assert!("ultra".parse::<CompressionQuality>().is_err());
    }

    #[test]
    fn quality_maps_to_jpeg_levels() {
        assert_eq!(CompressionQuality::Low.jpeg_quality(), None);
        assert_eq!(CompressionQuality::Medium.jpeg_quality(), Some(60));
        assert_eq!(CompressionQuality::High.jpeg_quality(), Some(40));
        assert_eq!(CompressionQuality::default(), CompressionQuality::Medium);
    }

    #[test]
    fn split_mode_defaults_to_all() {
        assert_eq!(SplitMode::from_form(None, None), SplitMode::All);
        assert_eq!(SplitMode::from_form(Some("all"), Some("1-2")), SplitMode::All);
    }

    #[test]
    fn split_mode_range_with_blank_pages_falls_back_to_all() {
        assert_eq!(SplitMode::from_form(Some("range"), Some("  ")), SplitMode::All);
        assert_eq!(SplitMode::from_form(Some("range"), None), SplitMode::All);
    }

    #[test]
    fn split_mode_range_keeps_page_string() {
        assert_eq!(
            SplitMode::from_form(Some("Range"), Some("1-3,5")),
            SplitMode::Range("1-3,5".to_string())
        );
    }

    #[test]
    fn split_mode_unknown_splits_every_page() {
        assert_eq!(SplitMode::from_form(Some("odd"), None), SplitMode::All);
        assert_eq!(SplitMode::from_form(Some("chapters"), Some("1-2")), SplitMode::All);
        assert_eq!(SplitMode::from_form(None, Some("3")), SplitMode::All);
    }
}
