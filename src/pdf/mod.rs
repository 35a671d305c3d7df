//! PDF import, export and inspection

pub mod export;
pub mod import;
pub mod metadata;

// Re-export commonly used items
pub use export::PdfWriter;
pub use import::{PdfImporter, ResolutionRequest};
pub use metadata::{extract_metadata, PageSize, PdfMetadata};
