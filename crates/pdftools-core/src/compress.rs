//! PDF compression
//!
//! Lossless pass (prune orphans, drop empty streams, Flate every stream)
//! followed, for Medium/High quality, by a lossy JPEG re-encode of embedded
//! 8-bit RGB and grayscale DCT images. The result never grows: when the rewritten file is not
//! smaller, the original bytes are copied to the output instead.

use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::ImageFormat;
use lopdf::{Document, Object, Stream};
use tracing::{debug, warn};

use crate::error::PdfToolsError;
use crate::options::{CompressionQuality, CompressionSummary};

pub fn compress_file(
    input: &Path,
    output: &Path,
    quality: CompressionQuality,
) -> Result<CompressionSummary, PdfToolsError> {
    let mut doc = Document::load(input).map_err(|e| PdfToolsError::ParseError(e.to_string()))?;

    doc.prune_objects();
    doc.delete_zero_length_streams();

    if let Some(jpeg_quality) = quality.jpeg_quality() {
        // The image pass is best-effort as a whole; a failure here must not
        // sink the lossless result.
        match recompress_images(&mut doc, jpeg_quality) {
            Ok(replaced) => debug!(replaced, jpeg_quality, "Re-encoded embedded images"),
            Err(e) => warn!(error = %e, "Skipping image recompression"),
        }
    }

    doc.compress();
    doc.save(output)
        .map_err(|e| PdfToolsError::OperationError(format!("Failed to save compressed PDF: {}", e)))?;

    let original_size = std::fs::metadata(input)?.len();
    let mut compressed_size = std::fs::metadata(output)?.len();

    if compressed_size >= original_size {
        debug!(original_size, compressed_size, "Compression did not help, keeping original");
        std::fs::copy(input, output)?;
        compressed_size = original_size;
    }

    Ok(CompressionSummary {
        original_size,
        compressed_size,
    })
}

/// Re-encode every DCT image XObject at `jpeg_quality`, keeping the new
/// bytes only when they are smaller. Returns how many images were replaced.
fn recompress_images(doc: &mut Document, jpeg_quality: u8) -> Result<usize, PdfToolsError> {
    let mut replaced = 0;

    for object in doc.objects.values_mut() {
        let Object::Stream(stream) = object else {
            continue;
        };
        if !is_dct_image(stream) {
            continue;
        }
        let Some(channels) = reencodable_channels(stream) else {
            continue;
        };

        match reencode_jpeg(&stream.content, jpeg_quality, channels) {
            Ok(data) if data.len() < stream.content.len() => {
                stream.set_content(data);
                replaced += 1;
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "Image left untouched"),
        }
    }

    Ok(replaced)
}

fn is_dct_image(stream: &Stream) -> bool {
    let is_image = stream
        .dict
        .get(b"Subtype")
        .and_then(Object::as_name)
        .map(|name| name == b"Image")
        .unwrap_or(false);

    let is_dct = match stream.dict.get(b"Filter") {
        Ok(Object::Name(name)) => name == b"DCTDecode",
        Ok(Object::Array(filters)) => {
            filters.len() == 1 && matches!(&filters[0], Object::Name(name) if name == b"DCTDecode")
        }
        _ => false,
    };

    is_image && is_dct
}

/// Component count of an image whose dictionary stays valid after a plain
/// RGB or grayscale JPEG round-trip: 8-bit `DeviceRGB` or `DeviceGray` with
/// no `/Decode` array. Every other image is `None`.
fn reencodable_channels(stream: &Stream) -> Option<u8> {
    let dict = &stream.dict;
    if dict.has(b"Decode") {
        return None;
    }
    if dict.get(b"BitsPerComponent").and_then(Object::as_i64).ok()? != 8 {
        return None;
    }
    match dict.get(b"ColorSpace").and_then(Object::as_name).ok()? {
        b"DeviceRGB" => Some(3),
        b"DeviceGray" => Some(1),
        _ => None,
    }
}

/// Decode and re-encode a baseline JPEG. The decoded image must carry
/// `channels` components, otherwise the data disagrees with its dictionary.
fn reencode_jpeg(data: &[u8], quality: u8, channels: u8) -> Result<Vec<u8>, PdfToolsError> {
    let img = image::load_from_memory_with_format(data, ImageFormat::Jpeg)
        .map_err(|e| PdfToolsError::OperationError(format!("Image decode failed: {}", e)))?;

    let decoded = img.color().channel_count();
    if decoded != channels {
        return Err(PdfToolsError::OperationError(format!(
            "Image has {} components, dictionary declares {}",
            decoded, channels
        )));
    }

    let mut out = Cursor::new(Vec::with_capacity(data.len()));
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode_image(&img)
        .map_err(|e| PdfToolsError::OperationError(format!("Image encode failed: {}", e)))?;

    Ok(out.into_inner())
}
