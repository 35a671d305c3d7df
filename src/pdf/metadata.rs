//! PDF page geometry and metadata read-back

use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::{Error, Result};
use crate::layout::Length;

/// Page tree nesting deeper than this is treated as a broken document
const MAX_PARENT_DEPTH: usize = 32;

/// Size of one PDF page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: Length,
    pub height: Length,
}

/// PDF metadata
#[derive(Debug, Clone)]
pub struct PdfMetadata {
    /// Size of every page, in page order
    pub page_sizes: Vec<PageSize>,
    /// Producing application (if present)
    pub producer: Option<String>,
    /// Raw creation date string, e.g. `D:20260101120000` (if present)
    pub creation_date: Option<String>,
}

impl PdfMetadata {
    pub fn page_count(&self) -> usize {
        self.page_sizes.len()
    }
}

/// Extract page sizes and info dictionary fields from a PDF file
pub fn extract_metadata(path: &Path) -> Result<PdfMetadata> {
    let doc = load(path)?;
    let page_sizes = collect_page_sizes(&doc)?;

    if page_sizes.is_empty() {
        return Err(Error::EmptyPdf(path.to_path_buf()));
    }

    let info = doc
        .trailer
        .get(b"Info")
        .and_then(Object::as_reference)
        .and_then(|id| doc.get_dictionary(id))
        .ok();

    Ok(PdfMetadata {
        page_sizes,
        producer: info.and_then(|dict| info_string(dict, b"Producer")),
        creation_date: info.and_then(|dict| info_string(dict, b"CreationDate")),
    })
}

fn load(path: &Path) -> Result<Document> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    Ok(Document::load(path)?)
}

fn collect_page_sizes(doc: &Document) -> Result<Vec<PageSize>> {
    doc.get_pages()
        .values()
        .map(|&page_id| media_box(doc, page_id))
        .collect()
}

/// Find the page's MediaBox, following inheritance through the page tree
fn media_box(doc: &Document, page_id: ObjectId) -> Result<PageSize> {
    let mut node: &Dictionary = doc.get_dictionary(page_id)?;

    for _ in 0..MAX_PARENT_DEPTH {
        if let Ok(media_box) = node.get(b"MediaBox") {
            let values = match media_box {
                Object::Reference(id) => doc.get_object(*id)?.as_array()?,
                other => other.as_array()?,
            };
            return page_size_from_box(values);
        }

        let parent = node
            .get(b"Parent")
            .and_then(Object::as_reference)
            .map_err(|_| Error::General(format!("Page {:?} has no MediaBox", page_id)))?;
        node = doc.get_dictionary(parent)?;
    }

    Err(Error::General(format!("Page tree too deep above {:?}", page_id)))
}

fn page_size_from_box(values: &[Object]) -> Result<PageSize> {
    if values.len() != 4 {
        return Err(Error::General("MediaBox must have 4 entries".to_string()));
    }

    let mut coords = [0.0f32; 4];
    for (slot, value) in coords.iter_mut().zip(values) {
        *slot = value.as_float()?;
    }

    Ok(PageSize {
        width: Length::from_pt((coords[2] - coords[0]).abs()),
        height: Length::from_pt((coords[3] - coords[1]).abs()),
    })
}

fn info_string(dict: &Dictionary, key: &[u8]) -> Option<String> {
    let bytes = dict.get(key).and_then(Object::as_str).ok()?;
    String::from_utf8(bytes.to_vec()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_metadata_nonexistent_file() {
        let result = extract_metadata(Path::new("nonexistent.pdf"));
        assert!(matches!(result.unwrap_err(), Error::FileNotFound(_)));
    }

    #[test]
    fn test_page_size_from_box() {
        let values = vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(612.0),
            Object::Integer(792),
        ];
        let size = page_size_from_box(&values).unwrap();
        assert_eq!(size.width, Length::from_pt(612.0));
        assert_eq!(size.height, Length::from_pt(792.0));

        assert!(page_size_from_box(&values[..3]).is_err());
    }

    // Round trips through written PDFs live in the export tests
}
