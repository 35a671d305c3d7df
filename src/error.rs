//! Error types for the kelpmark library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the kelpmark library
#[derive(Error, Debug)]
pub enum Error {
    /// PDF writing or reading error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// PDF rasterization error
    #[error("PDF rendering error: {0}")]
    Pdfium(#[from] pdfium_render::prelude::PdfiumError),

    /// Image codec error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Font lookup or parsing error
    #[error("Font error: {0}")]
    Font(String),

    /// Invalid color specification
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    /// A loaded image has no pixels (its decode failed earlier)
    #[error("Image {index} is empty and cannot be exported")]
    EmptyImage { index: usize },

    /// An empty image was about to be written to a file
    #[error("Cannot write an empty image to {}", .0.display())]
    EmptyOutput(PathBuf),

    /// Invalid glob pattern
    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(String),

    /// No files matched pattern
    #[error("No files found matching pattern: {0}")]
    NoFilesMatched(String),

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {}", .0.display())]
    EmptyPdf(PathBuf),

    /// General error
    #[error("{0}")]
    General(String),
}
