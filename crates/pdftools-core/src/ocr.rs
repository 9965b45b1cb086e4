//! OCR text extraction
//!
//! Pages are rasterized with poppler's `pdftoppm`, cleaned up (grayscale,
//! contrast, sharpen) and fed to Tesseract one page at a time. Both external
//! steps sit behind [`OcrBackend`] so the pipeline can run against a fake.

use std::path::{Path, PathBuf};
use std::process::Command;

use image::{imageops, DynamicImage};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::PdfToolsError;

/// Rasterization resolution handed to the backend.
pub const OCR_DPI: u32 = 300;

/// Language used when the caller does not pick one.
pub const DEFAULT_LANGUAGE: &str = "eng";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OcrPage {
    pub page: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OcrOutput {
    pub text: String,
    pub pages: Vec<OcrPage>,
    pub page_count: usize,
}

/// The two external steps of the OCR pipeline.
pub trait OcrBackend: Send + Sync {
    /// Render every page of `pdf` into `workdir` and return the image paths
    /// in page order.
    fn render_pages(&self, pdf: &Path, dpi: u32, workdir: &Path) -> Result<Vec<PathBuf>, PdfToolsError>;

    /// Recognize the text in one preprocessed page image.
    fn recognize(&self, image: &Path, language: &str) -> Result<String, PdfToolsError>;
}

/// Backend driving the `pdftoppm` and `tesseract` command-line tools.
#[derive(Debug, Clone)]
pub struct CommandLineOcr {
    pub pdftoppm: PathBuf,
    pub tesseract: PathBuf,
}

impl Default for CommandLineOcr {
    fn default() -> Self {
        Self {
            pdftoppm: PathBuf::from("pdftoppm"),
            tesseract: PathBuf::from("tesseract"),
        }
    }
}

impl CommandLineOcr {
    pub fn new(pdftoppm: impl Into<PathBuf>, tesseract: impl Into<PathBuf>) -> Self {
        Self {
            pdftoppm: pdftoppm.into(),
            tesseract: tesseract.into(),
        }
    }
}

impl OcrBackend for CommandLineOcr {
    fn render_pages(&self, pdf: &Path, dpi: u32, workdir: &Path) -> Result<Vec<PathBuf>, PdfToolsError> {
        let prefix = workdir.join("page");
        run(
            Command::new(&self.pdftoppm)
                .arg("-r")
                .arg(dpi.to_string())
                .arg("-png")
                .arg(pdf)
                .arg(&prefix),
            "pdftoppm",
        )?;

        // pdftoppm zero-pads page numbers to the width of the page count,
        // so a lexical sort is page order
        let mut pages: Vec<PathBuf> = std::fs::read_dir(workdir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
            .collect();
        pages.sort();

        if pages.is_empty() {
            return Err(PdfToolsError::Ocr("pdftoppm produced no pages".into()));
        }
        Ok(pages)
    }

    fn recognize(&self, image: &Path, language: &str) -> Result<String, PdfToolsError> {
        let stdout = run(
            Command::new(&self.tesseract)
                .arg(image)
                .arg("stdout")
                .arg("-l")
                .arg(language),
            "tesseract",
        )?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

fn run(command: &mut Command, tool: &str) -> Result<Vec<u8>, PdfToolsError> {
    let output = command
        .output()
        .map_err(|e| PdfToolsError::Ocr(format!("Failed to run {}: {}", tool, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PdfToolsError::Ocr(format!(
            "{} exited with {}: {}",
            tool,
            output.status,
            stderr.trim()
        )));
    }
    Ok(output.stdout)
}

/// Reject language codes that are not plain Tesseract identifiers such as
/// `eng`, `chi_sim` or `eng+deu`.
pub fn validate_language(language: &str) -> Result<(), PdfToolsError> {
    let valid = !language.is_empty()
        && language.len() <= 64
        && language
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '+');

    if valid {
        Ok(())
    } else {
        Err(PdfToolsError::Ocr(format!(
            "Unsupported OCR language '{}'",
            language
        )))
    }
}

/// Grayscale, double the contrast, then sharpen.
pub fn preprocess_image(image: DynamicImage) -> DynamicImage {
    let gray = image.grayscale();
    // `adjust_contrast` scales by ((100 + c) / 100)^2, so c = 41.42 is a 2x stretch
    let contrasted = gray.adjust_contrast(41.42);
    let kernel = [-1.0, -1.0, -1.0, -1.0, 16.0, -1.0, -1.0, -1.0, -1.0].map(|k: f32| k / 8.0);
    DynamicImage::ImageLuma8(imageops::filter3x3(&contrasted.to_luma8(), &kernel))
}

/// Run OCR over every page of the PDF at `input`.
pub fn extract_text(
    input: &Path,
    language: &str,
    backend: &dyn OcrBackend,
) -> Result<OcrOutput, PdfToolsError> {
    validate_language(language)?;

    // Rendered pages live only as long as this call
    let workdir = tempfile::tempdir()?;
    let rendered = backend.render_pages(input, OCR_DPI, workdir.path())?;

    let mut pages = Vec::with_capacity(rendered.len());
    for (index, path) in rendered.iter().enumerate() {
        let image = image::open(path)
            .map_err(|e| PdfToolsError::Ocr(format!("Failed to read page {}: {}", index + 1, e)))?;

        let prepared = workdir.path().join(format!("prepared-{}.png", index + 1));
        preprocess_image(image)
            .save(&prepared)
            .map_err(|e| PdfToolsError::Ocr(format!("Failed to write page {}: {}", index + 1, e)))?;

        let text = backend.recognize(&prepared, language)?;
        debug!(page = index + 1, chars = text.len(), "Recognized page");

        pages.push(OcrPage {
            page: index + 1,
            text: text.trim().to_string(),
        });
    }

    let text = pages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    info!(page_count = pages.len(), language, "OCR finished");

    Ok(OcrOutput {
        text,
        page_count: pages.len(),
        pages,
    })
}
