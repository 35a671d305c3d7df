//! PDF page rasterization using Pdfium
//!
//! Every page of a document is rendered at a user-chosen resolution and
//! becomes one source image. The resolution is asked for once per document
//! through a [`ResolutionRequest`], which can describe the resulting pixel
//! dimensions of the first page for any candidate DPI.

use std::path::{Path, PathBuf};

use log::{debug, info};
use pdfium_render::prelude::*;

use crate::document::{ImageOrigin, SourceImage};
use crate::error::{Error, Result};
use crate::layout::{scaled_dimensions, Length};

/// Lowest accepted import resolution
pub const MIN_DPI: u32 = 10;
/// Highest accepted import resolution
pub const MAX_DPI: u32 = 600;
/// Resolution offered by default; one pixel per point
pub const DEFAULT_DPI: u32 = 72;

/// Question put to the user before rasterizing a PDF
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionRequest {
    pub file: Option<PathBuf>,
    /// Size of the first page
    pub page_width: Length,
    pub page_height: Length,
}

impl ResolutionRequest {
    pub fn title(&self) -> String {
        match self.file.as_deref().and_then(Path::file_name) {
            Some(name) => format!("{} importing resolution", name.to_string_lossy()),
            None => "PDF importing resolution".to_string(),
        }
    }

    /// Pixel dimensions of the first page at `dpi`
    pub fn dimensions(&self, dpi: u32) -> (u32, u32) {
        scaled_dimensions(self.page_width, self.page_height, dpi)
    }

    /// Live label shown next to the DPI input
    pub fn label(&self, dpi: u32) -> String {
        let (width, height) = self.dimensions(dpi);
        format!("DPI (computed dimensions: {}x{} px)", width, height)
    }

    /// Keep an answer inside the accepted range
    pub fn clamp(dpi: u32) -> u32 {
        dpi.clamp(MIN_DPI, MAX_DPI)
    }
}

/// Rasterizes PDF documents through a bound Pdfium library
pub struct PdfImporter {
    pdfium: Pdfium,
}

impl PdfImporter {
    /// Bind to Pdfium in `library_dir`, else the working directory, else the system library
    pub fn bind(library_dir: Option<&Path>) -> Result<Self> {
        let local = library_dir.unwrap_or_else(|| Path::new("./"));
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(local))
            .or_else(|e| {
                debug!("No Pdfium library in {}: {}", local.display(), e);
                Pdfium::bind_to_system_library()
            })?;

        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }

    /// Rasterize every page of `path`
    ///
    /// `choose_dpi` is asked once with the first page's size; returning
    /// `None` cancels the import and yields `Ok(None)`.
    pub fn import<F>(&self, path: &Path, mut choose_dpi: F) -> Result<Option<Vec<SourceImage>>>
    where
        F: FnMut(&ResolutionRequest) -> Option<u32>,
    {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let document = self.pdfium.load_pdf_from_file(path, None)?;
        let pages = document.pages();
        if pages.is_empty() {
            return Err(Error::EmptyPdf(path.to_path_buf()));
        }

        let first = pages.get(0)?;
        let request = ResolutionRequest {
            file: Some(path.to_path_buf()),
            page_width: Length::from_pt(first.width().value),
            page_height: Length::from_pt(first.height().value),
        };

        let Some(dpi) = choose_dpi(&request).map(ResolutionRequest::clamp) else {
            debug!("Import of {} cancelled", path.display());
            return Ok(None);
        };

        let config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);
        let mut images = Vec::with_capacity(pages.len() as usize);
        for (index, page) in pages.iter().enumerate() {
            let image = page.render_with_config(&config)?.as_image().to_rgba8();
            debug!(
                "Rendered page {} of {} at {} dpi ({}x{})",
                index + 1,
                path.display(),
                dpi,
                image.width(),
                image.height()
            );
            images.push(SourceImage {
                image,
                origin: ImageOrigin::PdfPage {
                    path: path.to_path_buf(),
                    page: index,
                },
            });
        }

        info!("Loaded {} pages from {} at {} dpi", images.len(), path.display(), dpi);
        Ok(Some(images))
    }
}
