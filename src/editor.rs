//! The watermark editor
//!
//! [`Editor`] owns the style, the loaded document and the preview sink.
//! Every style change goes through [`Editor::on_style_changed`], which
//! re-renders each loaded image and hands the zoomed result to the sink,
//! one slot per image in load order.

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::RgbaImage;
use log::{debug, info};

use crate::dialogs::Prompter;
use crate::document::{decode_image, is_pdf_path, Document, SourceImage};
use crate::error::Result;
use crate::export::{self, numbered_path, resolve_target, ExportFormat};
use crate::font::FontBook;
use crate::pdf::import::PdfImporter;
use crate::style::{StyleConfig, StyleEdit};
use crate::watermark::watermarked;

/// Receives rendered previews
pub trait PreviewSink {
    /// A new image was appended at `index`
    fn add_slot(&mut self, index: usize);

    /// The preview for slot `index` changed
    fn show(&mut self, index: usize, preview: &RgbaImage);

    /// Sinks that display nothing can opt out of rendering altogether
    fn wants_previews(&self) -> bool {
        true
    }
}

/// A sink for headless use: previews are never rendered
#[derive(Debug, Default)]
pub struct NoPreviews;

impl PreviewSink for NoPreviews {
    fn add_slot(&mut self, _index: usize) {}

    fn show(&mut self, _index: usize, _preview: &RgbaImage) {}

    fn wants_previews(&self) -> bool {
        false
    }
}

/// Writes each preview to `preview-NN.png` in a directory
#[derive(Debug)]
pub struct DirectoryPreviews {
    dir: PathBuf,
    slots: Vec<Option<PathBuf>>,
}

impl DirectoryPreviews {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            slots: Vec::new(),
        }
    }

    /// Preview files written so far, one entry per slot
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.slots.iter().filter_map(|slot| slot.as_deref())
    }
}

impl PreviewSink for DirectoryPreviews {
    fn add_slot(&mut self, index: usize) {
        self.slots.resize(index + 1, None);
    }

    fn show(&mut self, index: usize, preview: &RgbaImage) {
        let path = numbered_path(&self.dir.join("preview.png"), index + 1);
        let written = std::fs::create_dir_all(&self.dir)
            .map_err(Into::into)
            .and_then(|()| export::save_image(preview, &path));
        match written {
            Ok(()) => {
                debug!("Preview {} written to {}", index + 1, path.display());
                if let Some(slot) = self.slots.get_mut(index) {
                    *slot = Some(path);
                }
            }
            Err(e) => log::warn!("Unable to write preview {}: {}", path.display(), e),
        }
    }
}

/// Style, document and previews of one editing session
pub struct Editor<S: PreviewSink> {
    style: StyleConfig,
    document: Document,
    fonts: FontBook,
    sink: S,
    last_dir: PathBuf,
    pdfium_dir: Option<PathBuf>,
    pdf: Option<PdfImporter>,
}

impl<S: PreviewSink> Editor<S> {
    pub fn new(style: StyleConfig, fonts: FontBook, sink: S) -> Self {
        Self {
            style,
            document: Document::new(),
            fonts,
            sink,
            last_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            pdfium_dir: None,
            pdf: None,
        }
    }

    /// Look for the Pdfium library in `dir` before the system library
    pub fn with_pdfium_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.pdfium_dir = Some(dir.into());
        self
    }

    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Directory the next file dialog starts in
    pub fn last_dir(&self) -> &Path {
        &self.last_dir
    }

    /// Apply a control change; repaints only when the value changed
    pub fn apply(&mut self, edit: StyleEdit) -> Result<bool> {
        debug!("Style edit: {:?}", edit);
        if !edit.apply_to(&mut self.style) {
            return Ok(false);
        }
        self.on_style_changed()?;
        Ok(true)
    }

    /// Ask for a new text color
    pub fn choose_color(&mut self, prompter: &mut dyn Prompter) -> Result<bool> {
        let Some(color) = prompter.pick_color(self.style.color) else {
            debug!("Color picker cancelled");
            return Ok(false);
        };
        self.style.color = color;
        self.on_style_changed()?;
        Ok(true)
    }

    /// Ask for a new font; its size also replaces the current font size
    pub fn choose_font(&mut self, prompter: &mut dyn Prompter) -> Result<bool> {
        let Some(font) = prompter.pick_font(&self.style.font_spec()) else {
            debug!("Font picker cancelled");
            return Ok(false);
        };
        self.style.apply_font(&font);
        self.on_style_changed()?;
        Ok(true)
    }

    pub fn zoom_in(&mut self) -> Result<()> {
        self.style.zoom.zoom_in();
        self.on_style_changed()
    }

    pub fn zoom_out(&mut self) -> Result<()> {
        self.style.zoom.zoom_out();
        self.on_style_changed()
    }

    pub fn zoom_original(&mut self) -> Result<()> {
        self.style.zoom.reset();
        self.on_style_changed()
    }

    /// Re-render every loaded image and push the previews to the sink
    pub fn on_style_changed(&mut self) -> Result<()> {
        for index in 0..self.document.len() {
            self.repaint(index)?;
        }
        Ok(())
    }

    /// Watermarked copy of image `index` at full size
    pub fn render(&mut self, index: usize) -> Result<RgbaImage> {
        let source = match self.document.get(index) {
            Some(source) => source,
            None => return Ok(RgbaImage::new(0, 0)),
        };
        let face = self
            .fonts
            .resolve(&self.style.font_family, self.style.bold, self.style.italic)?;
        watermarked(&source.image, &self.style, &face)
    }

    /// Watermarked copy of image `index`, scaled by the zoom
    pub fn preview(&mut self, index: usize) -> Result<RgbaImage> {
        let marked = self.render(index)?;
        let zoom = self.style.zoom;
        if zoom.is_original() || marked.width() == 0 || marked.height() == 0 {
            return Ok(marked);
        }
        Ok(imageops::resize(
            &marked,
            zoom.scale(marked.width()),
            zoom.scale(marked.height()),
            FilterType::Lanczos3,
        ))
    }

    fn repaint(&mut self, index: usize) -> Result<()> {
        if !self.sink.wants_previews() {
            return Ok(());
        }
        let preview = self.preview(index)?;
        self.sink.show(index, &preview);
        Ok(())
    }

    /// Ask for a file and load it
    ///
    /// Returns the number of images appended; a cancelled dialog appends none.
    pub fn open(&mut self, prompter: &mut dyn Prompter) -> Result<usize> {
        let Some(path) = prompter.open_path(&self.last_dir) else {
            debug!("Open dialog cancelled");
            return Ok(0);
        };
        self.last_dir = parent_dir(&path);
        self.load_file(&path, prompter)
    }

    /// Load a raster image, or every page of a PDF
    ///
    /// Undecodable images are appended empty so that slots stay aligned with
    /// the document; PDF failures are returned as errors and append nothing.
    pub fn load_file(&mut self, path: &Path, prompter: &mut dyn Prompter) -> Result<usize> {
        if !is_pdf_path(path) {
            self.add_image(decode_image(path))?;
            return Ok(1);
        }

        if self.pdf.is_none() {
            self.pdf = Some(PdfImporter::bind(self.pdfium_dir.as_deref())?);
        }
        let images = match self.pdf {
            Some(ref importer) => importer.import(path, |request| prompter.pick_resolution(request))?,
            None => None,
        };

        let Some(images) = images else {
            return Ok(0);
        };
        let count = images.len();
        for image in images {
            self.add_image(image)?;
        }
        Ok(count)
    }

    /// Append an image, give it a preview slot and paint it
    pub fn add_image(&mut self, image: SourceImage) -> Result<()> {
        let index = self.document.push(image);
        self.sink.add_slot(index);
        self.repaint(index)
    }

    /// Ask for a target and export every loaded image
    ///
    /// Nothing loaded or a cancelled dialog is a no-op returning no paths.
    pub fn save(&mut self, prompter: &mut dyn Prompter) -> Result<Vec<PathBuf>> {
        if self.document.is_empty() {
            debug!("Nothing loaded, not saving");
            return Ok(Vec::new());
        }
        let Some((path, format)) = prompter.save_path(&self.last_dir) else {
            debug!("Save dialog cancelled");
            return Ok(Vec::new());
        };
        self.export_to(&path, format)
    }

    /// Export every loaded image to `path` (see [`resolve_target`])
    pub fn export_to(&mut self, path: &Path, format: ExportFormat) -> Result<Vec<PathBuf>> {
        let target = resolve_target(path, format);
        self.last_dir = parent_dir(&target);

        let images = (0..self.document.len())
            .map(|index| self.render(index))
            .collect::<Result<Vec<_>>>()?;

        let written = export::save(&images, &target)?;
        info!("Exported {} images to {}", images.len(), target.display());
        Ok(written)
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
