//! Watermark appearance parameters
//!
//! [`StyleConfig`] holds everything the renderer reads: text, font, color,
//! opacity, rotation, zoom and the tiling knobs. It is mutated by
//! [`StyleEdit`]s (one per live control) and by the font/color pickers.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// An opaque RGB color; transparency comes from [`StyleConfig::opacity`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rgb` or `#rrggbb` (the leading `#` is optional)
    pub fn parse_hex(s: &str) -> Result<Self> {
        let hex = s.trim().trim_start_matches('#');
        let channel = |digits: &str| {
            u8::from_str_radix(digits, 16).map_err(|_| Error::InvalidColor(s.to_string()))
        };

        if !hex.is_ascii() {
            return Err(Error::InvalidColor(s.to_string()));
        }

        match hex.len() {
            3 => {
                let expand = |i: usize| channel(&hex[i..=i]).map(|v| v * 17);
                Ok(Self::new(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Ok(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            _ => Err(Error::InvalidColor(s.to_string())),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_hex(s)
    }
}

/// A compact font description, as returned by the font picker
///
/// Textual format: `"[bold] [italic] [size[pt]] [family] [#rrggbb]"`.
/// Underscores in the family name stand for spaces, so
/// `"bold 40pt Liberation_Serif #cc0000"` names the family "Liberation Serif".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FontSpec {
    pub family: Option<String>,
    pub size: Option<f32>,
    pub bold: bool,
    pub italic: bool,
    pub color: Option<Rgb>,
}

impl FontSpec {
    /// Parse a font specification; unknown words become part of the family
    pub fn parse(spec: &str) -> Self {
        let mut parsed = FontSpec::default();
        let mut family_words = Vec::new();

        for word in spec.split_whitespace() {
            let lower = word.to_ascii_lowercase();
            if lower == "bold" {
                parsed.bold = true;
            } else if lower == "italic" {
                parsed.italic = true;
            } else if word.starts_with('#') {
                parsed.color = Rgb::parse_hex(word).ok();
            } else if let Some(size) = parse_size(&lower) {
                parsed.size = Some(size);
            } else {
                family_words.push(word.replace('_', " "));
            }
        }

        if !family_words.is_empty() {
            parsed.family = Some(family_words.join(" "));
        }

        parsed
    }
}

fn parse_size(word: &str) -> Option<f32> {
    let digits = word.strip_suffix("pt").unwrap_or(word);
    digits.parse::<f32>().ok().filter(|size| *size > 0.0)
}

/// Preview zoom, an exact power of 1.5
///
/// The level is stored as the signed number of zoom steps, so any sequence
/// of zoom-in/zoom-out actions that cancels out lands back on exactly 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Zoom {
    steps: i32,
}

impl Zoom {
    const STEP_NUMERATOR: u32 = 3;
    const STEP_DENOMINATOR: u32 = 2;

    pub fn zoom_in(&mut self) {
        self.steps += 1;
    }

    pub fn zoom_out(&mut self) {
        self.steps -= 1;
    }

    pub fn reset(&mut self) {
        self.steps = 0;
    }

    pub fn is_original(&self) -> bool {
        self.steps == 0
    }

    /// The zoom as a floating point factor, `1.5^steps`
    pub fn factor(&self) -> f64 {
        let step = f64::from(Self::STEP_NUMERATOR) / f64::from(Self::STEP_DENOMINATOR);
        step.powi(self.steps)
    }

    /// Scale a pixel dimension, never going below one pixel
    pub fn scale(&self, pixels: u32) -> u32 {
        if self.is_original() {
            return pixels;
        }
        ((f64::from(pixels) * self.factor()).round() as u32).max(1)
    }
}

/// The current watermark appearance
#[derive(Debug, Clone, PartialEq)]
pub struct StyleConfig {
    /// Watermark text; `\n` separates lines
    pub text: String,
    /// Font family name, or one of the generic names `Serif`, `Sans`, `Monospace`
    pub font_family: String,
    /// Font size in points
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub color: Rgb,
    /// Alpha of the text color, 0 (invisible) to 255 (opaque)
    pub opacity: u8,
    /// Clockwise rotation in degrees
    pub angle: f32,
    pub zoom: Zoom,
    /// Extra horizontal gap between tiles, in percent of a space's width
    pub h_spacing: u32,
    /// Extra vertical gap between tiles, in percent of the line spacing
    pub v_spacing: u32,
    pub tiling: bool,
    /// Shift odd tile rows by half a tile
    pub staggered: bool,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_family: "Serif".to_string(),
            font_size: 32.0,
            bold: false,
            italic: false,
            color: Rgb::BLACK,
            opacity: 128,
            angle: 0.0,
            zoom: Zoom::default(),
            h_spacing: 100,
            v_spacing: 100,
            tiling: false,
            staggered: false,
        }
    }
}

impl StyleConfig {
    /// Apply a picked font: family, weight, slant and size
    pub fn apply_font(&mut self, font: &FontSpec) {
        if let Some(ref family) = font.family {
            self.font_family = family.clone();
        }
        if let Some(size) = font.size {
            self.font_size = size;
        }
        self.bold = font.bold;
        self.italic = font.italic;
        if let Some(color) = font.color {
            self.color = color;
        }
    }

    /// The font currently selected, in picker form
    pub fn font_spec(&self) -> FontSpec {
        FontSpec {
            family: Some(self.font_family.clone()),
            size: Some(self.font_size),
            bold: self.bold,
            italic: self.italic,
            color: None,
        }
    }
}

/// A change coming from one of the live style controls
#[derive(Debug, Clone, PartialEq)]
pub enum StyleEdit {
    Text(String),
    Angle(f32),
    Opacity(u8),
    FontSize(f32),
    Bold(bool),
    Tiling(bool),
    Staggered(bool),
    HorizontalSpacing(u32),
    VerticalSpacing(u32),
}

impl StyleEdit {
    /// Apply the edit, returning whether anything actually changed
    pub fn apply_to(self, style: &mut StyleConfig) -> bool {
        fn set<T: PartialEq>(slot: &mut T, value: T) -> bool {
            if *slot == value {
                return false;
            }
            *slot = value;
            true
        }

        match self {
            StyleEdit::Text(text) => set(&mut style.text, text),
            StyleEdit::Angle(angle) => set(&mut style.angle, angle),
            StyleEdit::Opacity(opacity) => set(&mut style.opacity, opacity),
            StyleEdit::FontSize(size) => set(&mut style.font_size, size),
            StyleEdit::Bold(bold) => set(&mut style.bold, bold),
            StyleEdit::Tiling(tiling) => set(&mut style.tiling, tiling),
            StyleEdit::Staggered(staggered) => set(&mut style.staggered, staggered),
            StyleEdit::HorizontalSpacing(spacing) => set(&mut style.h_spacing, spacing),
            StyleEdit::VerticalSpacing(spacing) => set(&mut style.v_spacing, spacing),
        }
    }
}
