//! Multi-page PDF writing using lopdf
//!
//! [`PdfWriter`] behaves like a print device: the page size is set in
//! points, and drawing happens in device units at the writer's resolution.
//! The paintable rectangle therefore has to be asked for after every page
//! size change, since it is not the page size itself.

use std::path::Path;

use chrono::Local;
use image::RgbaImage;
use log::debug;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Error, Result};
use crate::layout::{Length, Rect};

/// Resolution of the drawing device, in dots per inch
pub const DEFAULT_DEVICE_DPI: f32 = 96.0;

const PRODUCER: &str = concat!("kelpmark ", env!("CARGO_PKG_VERSION"));

struct PageInProgress {
    width: Length,
    height: Length,
    operations: Vec<Operation>,
    xobjects: Dictionary,
}

/// A PDF document written one page at a time
pub struct PdfWriter {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    resolution: f32,
    page_size: (Length, Length),
    current: Option<PageInProgress>,
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self::with_resolution(DEFAULT_DEVICE_DPI)
    }

    /// A writer whose device units are `dpi` per inch
    pub fn with_resolution(dpi: f32) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        Self {
            doc,
            pages_id,
            page_ids: Vec::new(),
            resolution: dpi,
            // US Letter until told otherwise
            page_size: (Length::from_pt(612.0), Length::from_pt(792.0)),
            current: None,
        }
    }

    /// Size used by the next page started with [`PdfWriter::new_page`]
    pub fn set_page_size(&mut self, width: Length, height: Length) {
        self.page_size = (width, height);
    }

    /// Close the current page (if any) and start a new one
    pub fn new_page(&mut self) -> Result<()> {
        self.finish_page()?;
        let (width, height) = self.page_size;
        self.current = Some(PageInProgress {
            width,
            height,
            operations: Vec::new(),
            xobjects: Dictionary::new(),
        });
        Ok(())
    }

    /// Paintable area of the current page, in whole device units
    ///
    /// Falls back to the pending page size when no page is open yet.
    pub fn paint_rect(&self) -> Rect {
        let (width, height) = match self.current {
            Some(ref page) => (page.width, page.height),
            None => self.page_size,
        };
        Rect::new(
            0.0,
            0.0,
            width.to_pixels(self.resolution).trunc(),
            height.to_pixels(self.resolution).trunc(),
        )
    }

    /// Draw `image` stretched over `rect` (device units) on the current page
    pub fn draw_image(&mut self, rect: Rect, image: &RgbaImage) -> Result<()> {
        let to_points = 72.0 / self.resolution;
        let image_id = add_image_xobject(&mut self.doc, image)?;

        let page = self
            .current
            .as_mut()
            .ok_or_else(|| Error::General("No page started".to_string()))?;

        let name = format!("Im{}", page.xobjects.len() + 1);
        page.xobjects.set(name.as_bytes(), Object::Reference(image_id));

        let width = rect.width * to_points;
        let height = rect.height * to_points;
        let x = rect.x * to_points;
        // PDF space has its origin at the bottom left
        let y = page.height.pt() - rect.y * to_points - height;

        page.operations.push(Operation::new("q", vec![]));
        page.operations.push(Operation::new(
            "cm",
            vec![width.into(), 0.into(), 0.into(), height.into(), x.into(), y.into()],
        ));
        page.operations.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
        page.operations.push(Operation::new("Q", vec![]));

        Ok(())
    }

    /// Pages written so far, the open page included
    pub fn page_count(&self) -> usize {
        self.page_ids.len() + usize::from(self.current.is_some())
    }

    /// Close the last page and write the document to `path`
    pub fn finish(mut self, path: &Path) -> Result<()> {
        self.finish_page()?;

        if self.page_ids.is_empty() {
            return Err(Error::General("No pages to write".to_string()));
        }

        let kids: Vec<Object> = self.page_ids.iter().map(|&id| Object::Reference(id)).collect();
        let pages = dictionary! {
            "Type" => "Pages",
            "Count" => self.page_ids.len() as i64,
            "Kids" => kids,
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        let info_id = self.doc.add_object(dictionary! {
            "Producer" => Object::string_literal(PRODUCER),
            "CreationDate" => Object::string_literal(
                Local::now().format("D:%Y%m%d%H%M%S").to_string()
            ),
        });

        self.doc.trailer.set("Root", catalog_id);
        self.doc.trailer.set("Info", info_id);

        debug!("Writing {} PDF pages to {}", self.page_ids.len(), path.display());

        self.doc.compress();
        self.doc.save(path)?;

        Ok(())
    }

    fn finish_page(&mut self) -> Result<()> {
        let Some(page) = self.current.take() else {
            return Ok(());
        };

        let content = Content { operations: page.operations }.encode()?;
        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), content));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), number(page.width.pt()), number(page.height.pt())],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => page.xobjects,
            },
        });
        self.page_ids.push(page_id);

        Ok(())
    }
}

/// Integers where possible, to keep page boxes exact
fn number(value: f32) -> Object {
    if value.fract() == 0.0 {
        Object::Integer(value as i64)
    } else {
        Object::Real(value)
    }
}

fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

/// Embed an RGBA image as an RGB image XObject with an optional soft mask
fn add_image_xobject(doc: &mut Document, image: &RgbaImage) -> Result<ObjectId> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::General("Cannot embed an empty image".to_string()));
    }

    let pixels = pixel_count(width, height);
    let mut rgb = Vec::with_capacity(pixels * 3);
    let mut alpha = Vec::with_capacity(pixels);
    for pixel in image.pixels() {
        let [r, g, b, a] = pixel.0;
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };

    if alpha.iter().any(|&a| a != u8::MAX) {
        let mask = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        };
        let mask_id = doc.add_object(Stream::new(mask, alpha));
        dict.set("SMask", mask_id);
    }

    Ok(doc.add_object(Stream::new(dict, rgb)))
}
