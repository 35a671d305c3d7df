//! Loaded source images
//!
//! A [`Document`] is the ordered list of images being watermarked, one per
//! loaded raster file or per rasterized PDF page. Sources are immutable once
//! loaded; rendering always works on copies.

use std::path::{Path, PathBuf};

use image::RgbaImage;
use log::{info, warn};

/// Where a source image came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOrigin {
    /// A raster image file
    File(PathBuf),
    /// A page of a PDF document (zero-based index)
    PdfPage { path: PathBuf, page: usize },
}

impl ImageOrigin {
    pub fn path(&self) -> &Path {
        match self {
            ImageOrigin::File(path) => path,
            ImageOrigin::PdfPage { path, .. } => path,
        }
    }
}

/// One loaded image
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub image: RgbaImage,
    pub origin: ImageOrigin,
}

impl SourceImage {
    /// True when decoding failed and the image holds no pixels
    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }
}

/// Ordered sequence of loaded images
#[derive(Debug, Clone, Default)]
pub struct Document {
    images: Vec<SourceImage>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an image, returning its index
    pub fn push(&mut self, image: SourceImage) -> usize {
        self.images.push(image);
        self.images.len() - 1
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SourceImage> {
        self.images.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceImage> {
        self.images.iter()
    }
}

/// Whether `path` should be imported as a PDF rather than decoded as an image
pub fn is_pdf_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Decode a raster image file
///
/// Decoding failures are not fatal: they are logged and yield an empty
/// image, which renders as a no-op.
pub fn decode_image(path: &Path) -> SourceImage {
    let image = match image::open(path) {
        Ok(decoded) => {
            let rgba = decoded.to_rgba8();
            info!("Loaded {} ({}x{})", path.display(), rgba.width(), rgba.height());
            rgba
        }
        Err(e) => {
            warn!("Unable to decode {}: {}", path.display(), e);
            RgbaImage::new(0, 0)
        }
    };

    SourceImage {
        image,
        origin: ImageOrigin::File(path.to_path_buf()),
    }
}
