//! PDF merge
//!
//! Combines several PDFs into one by importing every source object under a
//! shifted object id and re-pointing the destination page tree at the
//! imported pages.

use crate::error::PdfToolsError;
use crate::options::MergeSummary;
use lopdf::{Document, Object, ObjectId};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Merge the PDFs at `inputs`, in order, into a single PDF at `output`.
pub fn merge_files(inputs: &[PathBuf], output: &Path) -> Result<MergeSummary, PdfToolsError> {
    let mut documents = Vec::with_capacity(inputs.len());
    for path in inputs {
        documents.push(std::fs::read(path)?);
    }

    let merged = merge_documents(documents)?;
    let total_pages = crate::get_page_count(&merged)?;
    std::fs::write(output, &merged)?;

    debug!(file_count = inputs.len(), total_pages, "Merged PDFs");

    Ok(MergeSummary {
        total_pages,
        file_count: inputs.len(),
    })
}

/// Merge in-memory PDFs, keeping page order.
///
/// The first document is the destination. For every further document:
/// 1. Shift each object id by the destination's current `max_id`
/// 2. Rewrite all references inside the imported objects by the same shift
/// 3. Append the imported page ids to the destination's page list
///
/// The destination `Pages` node then gets the flattened `Kids` list, every
/// page is re-parented onto it, and unreachable objects (the imported
/// catalogs and page-tree nodes) are pruned.
pub fn merge_documents(documents: Vec<Vec<u8>>) -> Result<Vec<u8>, PdfToolsError> {
    let mut sources = documents.into_iter().enumerate().map(|(i, bytes)| {
        Document::load_mem(&bytes).map_err(|e| {
            PdfToolsError::ParseError(format!("Failed to load document {}: {}", i + 1, e))
        })
    });

    let mut dest = match sources.next() {
        Some(doc) => doc?,
        None => return Err(PdfToolsError::OperationError("No documents to merge".into())),
    };
    let mut page_ids: Vec<ObjectId> = dest.get_pages().into_values().collect();

    for source in sources {
        let source = source?;
        let offset = dest.max_id;
        let source_pages: Vec<ObjectId> = source.get_pages().into_values().collect();

        for (id, object) in source.objects {
            dest.objects
                .insert(shift_id(id, offset), shift_references(object, offset));
        }
        page_ids.extend(source_pages.into_iter().map(|id| shift_id(id, offset)));
        dest.max_id = dest.max_id.max(source.max_id + offset);
    }

    rebuild_page_tree(&mut dest, &page_ids)?;
    dest.prune_objects();
    dest.compress();

    let mut buffer = Vec::new();
    dest.save_to(&mut buffer)
        .map_err(|e| PdfToolsError::OperationError(format!("Failed to save merged PDF: {}", e)))?;

    Ok(buffer)
}

fn shift_id(id: ObjectId, offset: u32) -> ObjectId {
    (id.0 + offset, id.1)
}

/// Recursively shift object references
fn shift_references(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference(shift_id(id, offset)),
        Object::Array(items) => Object::Array(
            items
                .into_iter()
                .map(|o| shift_references(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = shift_references(value.clone(), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = shift_references(value.clone(), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

/// Point the destination's root `Pages` node at `page_ids`.
fn rebuild_page_tree(doc: &mut Document, page_ids: &[ObjectId]) -> Result<(), PdfToolsError> {
    let pages_id = doc
        .catalog()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|e| PdfToolsError::OperationError(format!("Missing page tree root: {}", e)))?;

    match doc.objects.get_mut(&pages_id) {
        Some(Object::Dictionary(pages)) => {
            let kids = page_ids.iter().map(|&id| Object::Reference(id)).collect();
            pages.set("Kids", Object::Array(kids));
            pages.set("Count", Object::Integer(page_ids.len() as i64));
        }
        _ => {
            return Err(PdfToolsError::OperationError(
                "Invalid pages dictionary".into(),
            ))
        }
    }

    for &id in page_ids {
        let inherited = inherited_attributes(doc, id);
        if let Some(Object::Dictionary(page)) = doc.objects.get_mut(&id) {
            for (key, value) in inherited {
                page.set(key, value);
            }
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    Ok(())
}

const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Attributes a page inherits from its old ancestors and lacks itself.
/// They must be copied down before the page is re-parented.
fn inherited_attributes(doc: &Document, page_id: ObjectId) -> Vec<(Vec<u8>, Object)> {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return Vec::new();
    };

    let mut found = Vec::new();
    let mut missing: Vec<&[u8]> = INHERITABLE_KEYS
        .into_iter()
        .filter(|key| !page.has(key))
        .collect();

    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    // Bounded walk guards against cyclic Parent chains in broken files
    for _ in 0..32 {
        if missing.is_empty() {
            break;
        }
        let Some(node) = parent.and_then(|id| doc.get_dictionary(id).ok()) else {
            break;
        };
        missing.retain(|key| match node.get(key) {
            Ok(value) => {
                found.push((key.to_vec(), value.clone()));
                false
            }
            Err(_) => true,
        });
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    found
}
