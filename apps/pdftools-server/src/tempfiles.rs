//! Temp-file naming and scoped lifetimes
//!
//! Every upload and every derived artifact lives in one of two directories
//! under the data dir and is owned by a [`TempFile`] guard. Dropping the
//! guard deletes the file, so a request that bails out early, panics, or
//! finishes streaming its response leaves nothing behind. The sweeper only
//! catches what a crashed process failed to drop.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

const MAX_STEM_LEN: usize = 64;
const FALLBACK_STEM: &str = "document";

/// Build `<8 hex chars>_<sanitized stem><ext>` from an uploaded filename.
///
/// `forced_ext` (with its leading dot, e.g. `".docx"`) replaces the
/// original extension; otherwise the original one is kept, lowercased.
pub fn unique_filename(original: &str, forced_ext: Option<&str>) -> String {
    let token = Uuid::new_v4().simple().to_string();
    let (stem, ext) = split_name(original);
    let ext = forced_ext.map(str::to_string).unwrap_or(ext);
    format!("{}_{}{}", &token[..8], stem, ext)
}

/// Sanitized stem of an uploaded filename, used for download names.
pub fn display_stem(original: &str) -> String {
    split_name(original).0
}

fn split_name(original: &str) -> (String, String) {
    // Browsers on Windows may send the full client path
    let base = client_filename(original);

    let (stem, ext) = match base.rfind('.') {
        Some(dot) if dot > 0 => (&base[..dot], base[dot..].to_ascii_lowercase()),
        _ => (base, String::new()),
    };

    let ext: String = ext
        .chars()
        .filter(|c| *c == '.' || c.is_ascii_alphanumeric())
        .collect();

    let mut stem: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_STEM_LEN)
        .collect();

    if stem.trim_matches('_').is_empty() {
        stem = FALLBACK_STEM.to_string();
    }

    (stem, if ext == "." { String::new() } else { ext })
}

/// A file on disk that is deleted when this guard is dropped.
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
    removed: bool,
}

impl TempFile {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            removed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now. Safe to call any number of times; missing files
    /// and permission errors are logged and ignored.
    pub fn remove(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;
        remove_quietly(&self.path);
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        self.remove();
    }
}

pub(crate) fn remove_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed temp file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => debug!(path = %path.display(), error = %e, "Could not remove temp file"),
    }
}

/// The two temp directories every request works in.
#[derive(Debug, Clone)]
pub struct TempStore {
    uploads: PathBuf,
    outputs: PathBuf,
}

impl TempStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            uploads: data_dir.join("uploads"),
            outputs: data_dir.join("outputs"),
        }
    }

    pub fn uploads(&self) -> &Path {
        &self.uploads
    }

    pub fn outputs(&self) -> &Path {
        &self.outputs
    }

    pub fn ensure_dirs(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.uploads)?;
        std::fs::create_dir_all(&self.outputs)
    }

    /// A fresh guarded path in `uploads/` for a file the client sent.
    pub fn upload_for(&self, original: &str) -> TempFile {
        TempFile::new(self.uploads.join(unique_filename(original, None)))
    }

    /// A fresh guarded path in `outputs/` for an artifact derived from
    /// `original`, with its extension forced to `ext`.
    pub fn output_for(&self, original: &str, ext: &str) -> TempFile {
        TempFile::new(self.outputs.join(unique_filename(original, Some(ext))))
    }
}

/// Last path component of a client-supplied filename.
pub fn client_filename(original: &str) -> &str {
    original.rsplit(['/', '\\']).next().unwrap_or(original)
}

/// `Content-Disposition` value for a download. Header values must be
/// visible ASCII, so anything else becomes `_`.
pub fn attachment(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| {
            if c == '"' || c == '\\' || !c.is_ascii() || c.is_ascii_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    format!("attachment; filename=\"{}\"", safe)
}
