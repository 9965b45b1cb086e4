//! Application state shared by every handler

use std::path::PathBuf;
use std::sync::Arc;

use pdftools_core::{CommandLineOcr, OcrBackend};

use crate::config::ServiceConfig;
use crate::tempfiles::TempStore;

#[derive(Clone)]
pub struct AppState {
    pub store: TempStore,
    pub static_dir: PathBuf,
    pub max_upload_mb: u64,
    pub ocr: Arc<dyn OcrBackend>,
}

impl AppState {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            store: TempStore::new(&config.data_dir),
            static_dir: config.static_dir.clone(),
            max_upload_mb: config.max_upload_mb,
            ocr: Arc::new(CommandLineOcr::new(&config.pdftoppm, &config.tesseract)),
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        (self.max_upload_mb as usize).saturating_mul(1024 * 1024)
    }
}
