//! kelpmark Library
//!
//! Text watermarking for raster images and PDF pages.
//! This library provides functionality to:
//! - Load images, or rasterize every page of a PDF at a chosen resolution
//! - Draw rotated, semi-transparent text at the image center
//! - Tile the text over the whole image, optionally in staggered rows
//! - Export the results as numbered image files or one multi-page PDF
//!
//! # Example
//!
//! ```no_run
//! use kelpmark::dialogs::ScriptedPrompter;
//! use kelpmark::editor::{Editor, NoPreviews};
//! use kelpmark::export::ExportFormat;
//! use kelpmark::font::FontBook;
//! use kelpmark::style::StyleConfig;
//! use std::path::Path;
//!
//! let style = StyleConfig {
//!     text: "CONFIDENTIAL".to_string(),
//!     angle: -30.0,
//!     tiling: true,
//!     ..Default::default()
//! };
//!
//! let mut editor = Editor::new(style, FontBook::system(), NoPreviews);
//! let mut prompter = ScriptedPrompter::new().with_dpi(150);
//! editor.load_file(Path::new("scan.pdf"), &mut prompter).expect("Failed to load");
//! editor
//!     .export_to(Path::new("marked.pdf"), ExportFormat::Pdf)
//!     .expect("Failed to export");
//! ```

pub mod dialogs;
pub mod document;
pub mod editor;
pub mod error;
pub mod export;
pub mod font;
pub mod layout;
pub mod pdf;
pub mod style;
pub mod watermark;

// Re-export commonly used items
pub use error::{Error, Result};
pub use style::{FontSpec, Rgb, StyleConfig, StyleEdit, Zoom};
