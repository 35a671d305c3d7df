//! Saving watermarked images
//!
//! A single image is written straight to the chosen path. Several images
//! are either numbered files next to the chosen path (`out-01.png`,
//! `out-02.png`, ...) or pages of one PDF.

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, RgbaImage};
use log::info;

use crate::error::{Error, Result};
use crate::layout::Length;
use crate::pdf::export::PdfWriter;

/// Extensions the save dialog produces without help
const KNOWN_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "pdf"];

/// Output kind picked in the save dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Raster image files
    #[default]
    Images,
    /// One multi-page PDF
    Pdf,
}

/// Final output path: the filter's extension is appended when the chosen
/// name has none of the known ones
pub fn resolve_target(path: &Path, format: ExportFormat) -> PathBuf {
    let known = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| KNOWN_EXTENSIONS.contains(&ext));
    if known {
        return path.to_path_buf();
    }

    let suffix = match format {
        ExportFormat::Pdf => ".pdf",
        ExportFormat::Images => ".jpg",
    };
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Whether `path` names a PDF output
pub fn is_pdf_target(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("pdf")
}

/// `{stem}-{NN}{suffix}` next to `path`, `number` starting at 1
pub fn numbered_path(path: &Path, number: usize) -> PathBuf {
    let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}-{:02}.{}", stem, number, ext.to_string_lossy()),
        None => format!("{}-{:02}", stem, number),
    };
    path.with_file_name(name)
}

/// Write one image, picking the codec from the extension
pub fn save_image(image: &RgbaImage, path: &Path) -> Result<()> {
    if image.width() == 0 || image.height() == 0 {
        return Err(Error::EmptyOutput(path.to_path_buf()));
    }

    let format = ImageFormat::from_path(path)?;
    let image = DynamicImage::ImageRgba8(image.clone());
    match format {
        // JPEG has no alpha channel
        ImageFormat::Jpeg => image.to_rgb8().save_with_format(path, format)?,
        _ => image.save_with_format(path, format)?,
    }
    Ok(())
}

/// Save images to `path`, numbering the files when there is more than one
///
/// Returns the paths written, in order.
pub fn save_as_images(images: &[RgbaImage], path: &Path) -> Result<Vec<PathBuf>> {
    if let Some(index) = images.iter().position(|i| i.width() == 0 || i.height() == 0) {
        return Err(Error::EmptyImage { index });
    }

    let targets: Vec<PathBuf> = match images.len() {
        0 => return Err(Error::General("Nothing to export".to_string())),
        1 => vec![path.to_path_buf()],
        n => (1..=n).map(|number| numbered_path(path, number)).collect(),
    };

    for (image, target) in images.iter().zip(&targets) {
        save_image(image, target)?;
        info!("Saved {}", target.display());
    }

    Ok(targets)
}

/// Save images as pages of one PDF, each page sized to its image
pub fn save_as_pdf(images: &[RgbaImage], path: &Path) -> Result<()> {
    if images.is_empty() {
        return Err(Error::General("Nothing to export".to_string()));
    }

    let mut writer = PdfWriter::new();

    for (index, image) in images.iter().enumerate() {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::EmptyImage { index });
        }

        writer.set_page_size(Length::from_pt(width as f32), Length::from_pt(height as f32));
        writer.new_page()?;

        // though we set page size, the rect is not the same
        let rect = writer.paint_rect();
        writer.draw_image(rect, image)?;
    }

    writer.finish(path)?;
    info!("Saved {} pages to {}", images.len(), path.display());
    Ok(())
}

/// Save to `path`, as a PDF or as image files depending on its extension
pub fn save(images: &[RgbaImage], path: &Path) -> Result<Vec<PathBuf>> {
    if is_pdf_target(path) {
        save_as_pdf(images, path)?;
        Ok(vec![path.to_path_buf()])
    } else {
        save_as_images(images, path)
    }
}
