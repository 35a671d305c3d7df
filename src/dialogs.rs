//! Modal questions asked by the editor
//!
//! Every question can be cancelled, which is reported as `None` and makes
//! the triggering action a no-op.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::export::ExportFormat;
use crate::pdf::import::{ResolutionRequest, DEFAULT_DPI};
use crate::style::{FontSpec, Rgb};

/// The dialogs the editor can open
pub trait Prompter {
    /// File to open, starting in `start_dir`
    fn open_path(&mut self, start_dir: &Path) -> Option<PathBuf>;

    /// File to save to and the chosen output filter
    fn save_path(&mut self, start_dir: &Path) -> Option<(PathBuf, ExportFormat)>;

    fn pick_color(&mut self, current: Rgb) -> Option<Rgb>;

    fn pick_font(&mut self, current: &FontSpec) -> Option<FontSpec>;

    /// Rasterization DPI for a PDF
    fn pick_resolution(&mut self, request: &ResolutionRequest) -> Option<u32>;
}

/// Answers prepared in advance, e.g. from command line flags
///
/// Unset answers behave like a cancelled dialog, except the resolution,
/// which defaults to [`DEFAULT_DPI`] like the dialog's initial value.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompter {
    pub open: VecDeque<PathBuf>,
    pub save: Option<(PathBuf, ExportFormat)>,
    pub color: Option<Rgb>,
    pub font: Option<FontSpec>,
    pub dpi: Option<u32>,
    /// Cancel every resolution question
    pub cancel_resolution: bool,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = Some(dpi);
        self
    }

    pub fn with_save(mut self, path: impl Into<PathBuf>, format: ExportFormat) -> Self {
        self.save = Some((path.into(), format));
        self
    }
}

impl Prompter for ScriptedPrompter {
    fn open_path(&mut self, start_dir: &Path) -> Option<PathBuf> {
        let answer = self.open.pop_front();
        debug!("Open dialog in {} answered with {:?}", start_dir.display(), answer);
        answer
    }

    fn save_path(&mut self, start_dir: &Path) -> Option<(PathBuf, ExportFormat)> {
        debug!("Save dialog in {} answered with {:?}", start_dir.display(), self.save);
        self.save.clone()
    }

    fn pick_color(&mut self, current: Rgb) -> Option<Rgb> {
        debug!("Color picker ({}) answered with {:?}", current, self.color);
        self.color
    }

    fn pick_font(&mut self, current: &FontSpec) -> Option<FontSpec> {
        debug!("Font picker ({:?}) answered with {:?}", current.family, self.font);
        self.font.clone()
    }

    fn pick_resolution(&mut self, request: &ResolutionRequest) -> Option<u32> {
        if self.cancel_resolution {
            return None;
        }
        let dpi = ResolutionRequest::clamp(self.dpi.unwrap_or(DEFAULT_DPI));
        info!("{}: {} {}", request.title(), dpi, request.label(dpi));
        Some(dpi)
    }
}
