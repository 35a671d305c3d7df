//! Font lookup, shaping and outline building
//!
//! Faces are located with `fontdb` (system fonts plus any explicitly added
//! files), shaped and measured with `rustybuzz`, and turned into a single
//! `tiny_skia_path::Path` that the renderer fills once per tile.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use log::{debug, warn};
use rustybuzz::ttf_parser::{GlyphId, OutlineBuilder};
use rustybuzz::UnicodeBuffer;
use tiny_skia_path::PathBuilder;

use crate::error::{Error, Result};
use crate::layout::Rect;

/// Logical resolution of raster targets; point sizes are converted with it
pub const RASTER_DPI: f32 = 96.0;

/// Weight from which a face counts as bold
const BOLD_WEIGHT: u16 = 600;

/// Convert a point size to a pixel size on a raster target
pub fn points_to_pixels(points: f32) -> f32 {
    points * RASTER_DPI / 72.0
}

/// A font face loaded into memory
#[derive(Debug, Clone)]
pub struct FontFace {
    data: Arc<Vec<u8>>,
    index: u32,
    family: String,
    /// Bold was requested but the face is regular; outlines get emboldened
    pub synthetic_bold: bool,
}

impl FontFace {
    /// Load a face from raw font file bytes
    pub fn from_bytes(data: Vec<u8>, index: u32) -> Result<Self> {
        let face = rustybuzz::Face::from_slice(&data, index)
            .ok_or_else(|| Error::Font("Unable to parse font data".to_string()))?;
        let family = face
            .names()
            .into_iter()
            .find(|name| name.name_id == rustybuzz::ttf_parser::name_id::FAMILY && name.is_unicode())
            .and_then(|name| name.to_string())
            .unwrap_or_else(|| "Unknown".to_string());

        Ok(Self {
            data: Arc::new(data),
            index,
            family,
            synthetic_bold: false,
        })
    }

    /// Load a face from a font file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        Self::from_bytes(std::fs::read(path)?, 0)
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    fn face(&self) -> Result<rustybuzz::Face<'_>> {
        rustybuzz::Face::from_slice(&self.data, self.index)
            .ok_or_else(|| Error::Font(format!("Unable to parse font {}", self.family)))
    }

    /// Shape `text` at `pixel_size` and lay it out centered inside `area`
    ///
    /// Lines are separated by `\n`; each line is centered horizontally within
    /// the block, and the block is centered in `area`.
    pub fn layout(&self, text: &str, pixel_size: f32, area: &Rect) -> Result<TextBlock> {
        let face = self.face()?;
        let scale = pixel_size / face.units_per_em() as f32;
        let ascent = f32::from(face.ascender()) * scale;
        let descent = -f32::from(face.descender()) * scale;
        let line_gap = f32::from(face.line_gap()) * scale;
        let line_height = ascent + descent;

        let lines: Vec<ShapedLine> = text
            .split('\n')
            .map(|line| shape_line(&face, line.trim_end_matches('\r'), scale))
            .collect();

        let width = lines.iter().map(|line| line.advance).fold(0.0, f32::max);
        let height = if text.is_empty() {
            0.0
        } else {
            lines.len() as f32 * line_height + (lines.len() - 1) as f32 * line_gap
        };
        let bounds = Rect::centered_in(area, width, height);

        let mut builder = PathBuilder::new();
        for (row, line) in lines.iter().enumerate() {
            let origin_x = bounds.x + (width - line.advance) / 2.0;
            let baseline = bounds.y + row as f32 * (line_height + line_gap) + ascent;

            for glyph in &line.glyphs {
                let mut pen = GlyphPen {
                    builder: &mut builder,
                    origin_x: origin_x + glyph.x,
                    baseline: baseline - glyph.y,
                    scale,
                };
                face.outline_glyph(GlyphId(glyph.id), &mut pen);
            }
        }

        Ok(TextBlock {
            bounds,
            path: builder.finish(),
            space_advance: shape_line(&face, " ", scale).advance,
            line_spacing: line_height + line_gap,
            pixel_size,
            synthetic_bold: self.synthetic_bold,
        })
    }
}

/// Shaped, positioned text ready to paint
#[derive(Debug, Clone)]
pub struct TextBlock {
    /// Tight box around the laid out text, in target pixels
    pub bounds: Rect,
    /// All glyph outlines; `None` when nothing visible was shaped
    pub path: Option<tiny_skia_path::Path>,
    /// Horizontal advance of a space character
    pub space_advance: f32,
    /// Baseline-to-baseline distance
    pub line_spacing: f32,
    pub pixel_size: f32,
    pub synthetic_bold: bool,
}

#[derive(Debug, Clone)]
struct PositionedGlyph {
    id: u16,
    x: f32,
    y: f32,
}

#[derive(Debug, Clone)]
struct ShapedLine {
    glyphs: Vec<PositionedGlyph>,
    advance: f32,
}

fn shape_line(face: &rustybuzz::Face<'_>, line: &str, scale: f32) -> ShapedLine {
    let mut buffer = UnicodeBuffer::new();
    buffer.push_str(line);
    let output = rustybuzz::shape(face, &[], buffer);

    let mut glyphs = Vec::with_capacity(output.len());
    let mut pen_x = 0.0;
    for (info, pos) in output.glyph_infos().iter().zip(output.glyph_positions()) {
        glyphs.push(PositionedGlyph {
            id: info.glyph_id as u16,
            x: pen_x + pos.x_offset as f32 * scale,
            y: pos.y_offset as f32 * scale,
        });
        pen_x += pos.x_advance as f32 * scale;
    }

    ShapedLine { glyphs, advance: pen_x }
}

/// Feeds glyph outlines (font units, y up) into a path in pixels (y down)
struct GlyphPen<'a> {
    builder: &'a mut PathBuilder,
    origin_x: f32,
    baseline: f32,
    scale: f32,
}

impl GlyphPen<'_> {
    fn point(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, self.baseline - y * self.scale)
    }
}

impl OutlineBuilder for GlyphPen<'_> {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x, y) = self.point(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x2, y2) = self.point(x2, y2);
        let (x, y) = self.point(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

/// Font database with a cache of resolved faces
pub struct FontBook {
    db: Database,
    cache: HashMap<(String, bool, bool), FontFace>,
}

impl FontBook {
    /// A book over the fonts installed on this system
    pub fn system() -> Self {
        let mut db = Database::new();
        db.load_system_fonts();
        debug!("Font database holds {} faces", db.len());
        Self { db, cache: HashMap::new() }
    }

    /// A book with no fonts; add some with [`FontBook::add_font_file`]
    pub fn empty() -> Self {
        Self { db: Database::new(), cache: HashMap::new() }
    }

    /// Make the faces of a font file available by family name
    pub fn add_font_file(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        self.db.load_font_file(path)?;
        self.cache.clear();
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    /// Resolve a family name to a face, falling back to any available face
    pub fn resolve(&mut self, family: &str, bold: bool, italic: bool) -> Result<FontFace> {
        let key = (family.to_ascii_lowercase(), bold, italic);
        if let Some(face) = self.cache.get(&key) {
            return Ok(face.clone());
        }

        let face = self.lookup(family, bold, italic)?;
        self.cache.insert(key, face.clone());
        Ok(face)
    }

    fn lookup(&self, family: &str, bold: bool, italic: bool) -> Result<FontFace> {
        let requested = generic_family(family);
        let families = [requested, Family::Serif, Family::SansSerif];
        let query = Query {
            families: &families,
            weight: if bold { Weight::BOLD } else { Weight::NORMAL },
            stretch: Stretch::Normal,
            style: if italic { Style::Italic } else { Style::Normal },
        };

        let id = match self.db.query(&query) {
            Some(id) => id,
            None => {
                let first = self
                    .db
                    .faces()
                    .next()
                    .ok_or_else(|| Error::Font("No fonts available".to_string()))?;
                warn!("Font family {} not found, using {:?}", family, first.families.first());
                first.id
            }
        };

        let info = self
            .db
            .face(id)
            .ok_or_else(|| Error::Font(format!("Font {} disappeared from the database", family)))?;
        let is_bold = info.weight.0 >= BOLD_WEIGHT;

        let (data, index) = self
            .db
            .with_face_data(id, |data, index| (data.to_vec(), index))
            .ok_or_else(|| Error::Font(format!("Unable to read font data for {}", family)))?;

        let mut face = FontFace::from_bytes(data, index)?;
        face.synthetic_bold = bold && !is_bold;
        debug!(
            "Resolved font {} (bold: {}, italic: {}) to {}",
            family,
            bold,
            italic,
            face.family()
        );
        Ok(face)
    }
}

fn generic_family(name: &str) -> Family<'_> {
    match name.to_ascii_lowercase().as_str() {
        "serif" => Family::Serif,
        "sans" | "sans-serif" | "sansserif" => Family::SansSerif,
        "mono" | "monospace" => Family::Monospace,
        "cursive" => Family::Cursive,
        "fantasy" => Family::Fantasy,
        _ => Family::Name(name),
    }
}

/// Shared helper for tests: any installed face, or `None` on font-less hosts
#[cfg(test)]
pub(crate) fn test_face() -> Option<FontFace> {
    let mut book = FontBook::system();
    if book.is_empty() {
        eprintln!("Skipping: no system fonts installed");
        return None;
    }
    book.resolve("Sans", false, false).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_to_pixels() {
        assert!((points_to_pixels(72.0) - 96.0).abs() < 1e-4);
        assert!((points_to_pixels(32.0) - 42.666_668).abs() < 1e-3);
    }

    #[test]
    fn test_generic_family_names() {
        assert_eq!(generic_family("Serif"), Family::Serif);
        assert_eq!(generic_family("sans-serif"), Family::SansSerif);
        assert_eq!(generic_family("Monospace"), Family::Monospace);
        assert_eq!(generic_family("DejaVu Sans"), Family::Name("DejaVu Sans"));
    }

    #[test]
    fn test_empty_book_has_no_faces() {
        let mut book = FontBook::empty();
        assert!(book.is_empty());
        assert!(book.resolve("Serif", false, false).is_err());
    }

    #[test]
    fn test_layout_is_centered() {
        let Some(face) = test_face() else { return };
        let area = Rect::of_image(400, 300);
        let block = face.layout("Watermark", 40.0, &area).unwrap();

        assert!(block.bounds.width > 0.0);
        assert!(block.bounds.height > 0.0);
        let (cx, cy) = block.bounds.center();
        assert!((cx - 200.0).abs() < 0.5);
        assert!((cy - 150.0).abs() < 0.5);
        assert!(block.path.is_some());
        assert!(block.space_advance > 0.0);
        assert!(block.line_spacing >= block.bounds.height * 0.9);
    }

    #[test]
    fn test_layout_multiline_is_taller() {
        let Some(face) = test_face() else { return };
        let area = Rect::of_image(400, 300);
        let one = face.layout("Top", 30.0, &area).unwrap();
        let two = face.layout("Top\nSecret", 30.0, &area).unwrap();

        assert!(two.bounds.height > one.bounds.height * 1.9);
        assert!(two.bounds.width >= one.bounds.width);
    }

    #[test]
    fn test_layout_empty_text() {
        let Some(face) = test_face() else { return };
        let area = Rect::of_image(100, 100);
        let block = face.layout("", 30.0, &area).unwrap();

        assert!(block.bounds.is_empty());
        assert!(block.path.is_none());
        assert_eq!(block.bounds.center(), (50.0, 50.0));
    }
}
