//! Watermark rendering
//!
//! The text is drawn once at the image center, rotated about its own
//! center. With tiling enabled, copies are placed on a grid around it,
//! walking square rings outward until a whole ring falls outside the image:
//!
//! ```text
//! xxxxx
//! x...x
//! x.o.x
//! x...x
//! xxxxx
//! ```
//!
//! Placement ([`plan_tiles`]) is pure geometry and independent of the pixels;
//! [`paint_on`] executes a plan with `tiny-skia` on a transparent layer,
//! which is then blended over the image. Pixels the text does not touch are
//! never rewritten.

use image::RgbaImage;
use log::debug;
use tiny_skia::{FillRule, Paint, Pixmap, Stroke, Transform};

use crate::error::Result;
use crate::font::{points_to_pixels, FontFace, TextBlock};
use crate::layout::{ring, Rect};
use crate::style::StyleConfig;

/// Rings walked at most before giving up on reaching the image edges
pub const MAX_RINGS: i32 = 1000;

/// Geometry of one tiled watermark
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileGeometry {
    /// Text box at the image center, before rotation
    pub text_box: Rect,
    /// Horizontal distance between neighbouring tiles
    pub pitch_x: f32,
    /// Vertical distance between neighbouring tile rows
    pub pitch_y: f32,
    /// Rotation in degrees about the text box center
    pub angle: f32,
    /// Shift odd rows by half a pitch
    pub staggered: bool,
}

impl TileGeometry {
    /// Geometry for a laid out text block under `style`
    pub fn new(block: &TextBlock, style: &StyleConfig) -> Self {
        Self {
            text_box: block.bounds,
            pitch_x: block.bounds.width + block.space_advance * style.h_spacing as f32 / 100.0,
            pitch_y: block.bounds.height + block.line_spacing * style.v_spacing as f32 / 100.0,
            angle: style.angle,
            staggered: style.staggered,
        }
    }

    /// Rotation about the text box center
    pub fn rotation(&self) -> Transform {
        let (cx, cy) = self.text_box.center();
        Transform::from_rotate_at(self.angle, cx, cy)
    }

    /// Full transform of the tile at grid offset `(x, y)`
    ///
    /// The grid offset is applied in the unrotated frame, so the whole grid
    /// turns with the text.
    pub fn tile_transform(&self, x: i32, y: i32) -> Transform {
        let stagger = if self.staggered && y.rem_euclid(2) == 1 { 0.5 } else { 0.0 };
        let offset = Transform::from_translate(
            (stagger + x as f32) * self.pitch_x,
            y as f32 * self.pitch_y,
        );
        self.rotation().pre_concat(offset)
    }

    /// Whether the tile at `(x, y)` would touch the device area
    pub fn is_visible(&self, x: i32, y: i32, device: &Rect) -> bool {
        self.text_box.map(&self.tile_transform(x, y)).intersects(device)
    }
}

/// Tiles chosen for painting, in paint order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TilePlan {
    /// Grid offsets of the tiles around the center, center excluded
    pub tiles: Vec<(i32, i32)>,
    /// Rings walked, including the final empty one
    pub rings: i32,
}

/// Choose which tiles to paint around the centered text
///
/// With `tiling` off the plan is empty: only the center copy gets drawn.
/// Otherwise rings of radius 1, 2, ... are walked until the first ring in
/// which no tile touches `device`, or until [`MAX_RINGS`].
pub fn plan_tiles(geometry: &TileGeometry, device: &Rect, tiling: bool) -> TilePlan {
    let mut plan = TilePlan::default();
    if !tiling {
        return plan;
    }

    for radius in 1..=MAX_RINGS {
        plan.rings = radius;
        let before = plan.tiles.len();

        plan.tiles.extend(ring(radius).filter(|&(x, y)| geometry.is_visible(x, y, device)));

        if plan.tiles.len() == before {
            // everything was out of bounds, so will the next radius
            break;
        }
    }

    plan
}

/// Outcome of painting one image
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PaintReport {
    /// Text instances drawn, the center one included
    pub instances: usize,
    pub plan: TilePlan,
}

/// Draw the watermark described by `style` onto `target`
///
/// Empty (zero-sized) images are left untouched.
pub fn paint_on(target: &mut RgbaImage, style: &StyleConfig, face: &FontFace) -> Result<PaintReport> {
    let (width, height) = target.dimensions();
    let Some(mut layer) = Pixmap::new(width, height) else {
        debug!("Skipping watermark on empty image");
        return Ok(PaintReport::default());
    };

    let device = Rect::of_image(width, height);
    let block = face.layout(&style.text, points_to_pixels(style.font_size), &device)?;
    let geometry = TileGeometry::new(&block, style);
    let plan = plan_tiles(&geometry, &device, style.tiling);

    let mut paint = Paint::default();
    paint.set_color_rgba8(style.color.r, style.color.g, style.color.b, style.opacity);
    paint.anti_alias = true;
    let stroke = Stroke {
        width: block.pixel_size / 24.0,
        ..Stroke::default()
    };

    let mut draw = |transform: Transform| {
        if let Some(ref path) = block.path {
            layer.fill_path(path, &paint, FillRule::Winding, transform, None);
            if block.synthetic_bold {
                layer.stroke_path(path, &paint, &stroke, transform, None);
            }
        }
    };

    draw(geometry.rotation());
    for &(x, y) in &plan.tiles {
        draw(geometry.tile_transform(x, y));
    }

    composite_layer(&layer, target);

    debug!(
        "Painted {} text instances over {} rings on {}x{} image",
        plan.tiles.len() + 1,
        plan.rings,
        width,
        height
    );

    Ok(PaintReport {
        instances: plan.tiles.len() + 1,
        plan,
    })
}

/// A watermarked copy of `source`; the source itself is never modified
pub fn watermarked(source: &RgbaImage, style: &StyleConfig, face: &FontFace) -> Result<RgbaImage> {
    let mut target = source.clone();
    paint_on(&mut target, style, face)?;
    Ok(target)
}

/// Blend a premultiplied layer over a straight-alpha image (source-over)
fn composite_layer(layer: &Pixmap, target: &mut RgbaImage) {
    for (dst, src) in target.pixels_mut().zip(layer.pixels()) {
        if src.alpha() == 0 {
            continue;
        }

        let src_alpha = f32::from(src.alpha()) / 255.0;
        let [r, g, b, a] = dst.0;
        // destination coverage left visible under the source
        let below = f32::from(a) / 255.0 * (1.0 - src_alpha);
        let out_alpha = src_alpha + below;

        let blend = |premultiplied: u8, straight: u8| {
            let value = (f32::from(premultiplied) + f32::from(straight) * below) / out_alpha;
            value.round().clamp(0.0, 255.0) as u8
        };

        dst.0 = [
            blend(src.red(), r),
            blend(src.green(), g),
            blend(src.blue(), b),
            (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8,
        ];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::test_face;
    use image::Rgba;
    use tiny_skia::PremultipliedColorU8;

    fn geometry(width: f32, height: f32) -> TileGeometry {
        TileGeometry {
            text_box: Rect::centered_in(&Rect::of_image(100, 100), width, height),
            pitch_x: width + 10.0,
            pitch_y: height + 10.0,
            angle: 0.0,
            staggered: false,
        }
    }

    #[test]
    fn test_no_tiles_without_tiling() {
        let plan = plan_tiles(&geometry(20.0, 10.0), &Rect::of_image(100, 100), false);
        assert!(plan.tiles.is_empty());
        assert_eq!(plan.rings, 0);
    }

    #[test]
    fn test_plan_covers_image_and_terminates() {
        // 30 x 20 pitch over a 100 x 100 image: one column each side of the
        // center, two rows above and below, ring 3 is empty
        let plan = plan_tiles(&geometry(20.0, 10.0), &Rect::of_image(100, 100), true);
        assert_eq!(plan.rings, 3);
        assert!(plan.tiles.iter().all(|&(x, y)| x.abs() <= 1 && y.abs() <= 2));
        assert_eq!(plan.tiles.len(), 8 + 6);
        assert!(plan.tiles.contains(&(0, -1)));
        assert!(plan.tiles.contains(&(0, 2)));
        assert!(!plan.tiles.contains(&(2, 0)));
    }

    #[test]
    fn test_plan_is_deterministic() {
        let mut geo = geometry(24.0, 8.0);
        geo.angle = 30.0;
        geo.staggered = true;
        let device = Rect::of_image(100, 100);

        let first = plan_tiles(&geo, &device, true);
        let second = plan_tiles(&geo, &device, true);
        assert_eq!(first, second);
    }

    #[test]
    fn test_plan_follows_ring_order() {
        let device = Rect::of_image(100, 100);
        let geo = geometry(20.0, 10.0);
        let plan = plan_tiles(&geo, &device, true);

        let expected: Vec<_> = (1..plan.rings)
            .flat_map(ring)
            .filter(|&(x, y)| geo.is_visible(x, y, &device))
            .collect();
        assert_eq!(plan.tiles, expected);
    }

    #[test]
    fn test_terminating_ring_is_first_empty_ring() {
        let device = Rect::of_image(100, 60);
        let mut geo = geometry(18.0, 6.0);
        geo.angle = 45.0;
        let plan = plan_tiles(&geo, &device, true);

        assert!(plan.rings <= MAX_RINGS);
        for radius in 1..plan.rings {
            assert!(ring(radius).any(|(x, y)| geo.is_visible(x, y, &device)));
        }
        assert!(!ring(plan.rings).any(|(x, y)| geo.is_visible(x, y, &device)));
    }

    #[test]
    fn test_empty_box_stops_after_first_ring() {
        let plan = plan_tiles(&geometry(0.0, 0.0), &Rect::of_image(100, 100), true);
        assert!(plan.tiles.is_empty());
        assert_eq!(plan.rings, 1);
    }

    #[test]
    fn test_stagger_shifts_odd_rows_including_negative() {
        let mut geo = geometry(20.0, 10.0);
        geo.staggered = true;
        let base = geo.text_box;

        let shifted = base.map(&geo.tile_transform(0, -1));
        assert!((shifted.x - (base.x + 15.0)).abs() < 1e-4);
        let even = base.map(&geo.tile_transform(0, 2));
        assert!((even.x - base.x).abs() < 1e-4);
        assert!((even.y - (base.y + 40.0)).abs() < 1e-4);
    }

    #[test]
    fn test_rotation_keeps_center_fixed() {
        let mut geo = geometry(40.0, 10.0);
        geo.angle = 90.0;
        let rotated = geo.text_box.map(&geo.tile_transform(0, 0));
        let (cx, cy) = rotated.center();
        assert!((cx - 50.0).abs() < 1e-3 && (cy - 50.0).abs() < 1e-3);
        assert!((rotated.width - 10.0).abs() < 1e-3);
    }

    fn layer_with(pixel: PremultipliedColorU8) -> Pixmap {
        let mut layer = Pixmap::new(2, 1).unwrap();
        layer.pixels_mut()[0] = pixel;
        layer
    }

    #[test]
    fn test_composite_skips_uncovered_pixels() {
        let red = PremultipliedColorU8::from_rgba(255, 0, 0, 255).unwrap();
        let mut image = RgbaImage::from_pixel(2, 1, Rgba([10, 20, 30, 0]));
        composite_layer(&layer_with(red), &mut image);

        assert_eq!(image.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
        // Fully transparent pixels keep their color channels
        assert_eq!(image.get_pixel(1, 0), &Rgba([10, 20, 30, 0]));
    }

    #[test]
    fn test_composite_half_covered_pixel() {
        let half_red = PremultipliedColorU8::from_rgba(128, 0, 0, 128).unwrap();

        let mut opaque = RgbaImage::from_pixel(2, 1, Rgba([255, 255, 255, 255]));
        composite_layer(&layer_with(half_red), &mut opaque);
        assert_eq!(opaque.get_pixel(0, 0), &Rgba([255, 127, 127, 255]));

        let mut clear = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 255, 0]));
        composite_layer(&layer_with(half_red), &mut clear);
        assert_eq!(clear.get_pixel(0, 0), &Rgba([255, 0, 0, 128]));
    }

    #[test]
    fn test_invisible_text_keeps_translucent_pixels() {
        let Some(face) = test_face() else { return };
        let style = StyleConfig {
            text: "X".to_string(),
            opacity: 0,
            tiling: true,
            ..StyleConfig::default()
        };
        let source = RgbaImage::from_pixel(50, 50, Rgba([200, 100, 50, 128]));
        let marked = watermarked(&source, &style, &face).unwrap();
        assert_eq!(marked, source);
    }

    #[test]
    fn test_text_leaves_translucent_background_alone() {
        let Some(face) = test_face() else { return };
        let style = StyleConfig {
            text: "X".to_string(),
            opacity: 255,
            ..StyleConfig::default()
        };
        let source = RgbaImage::from_pixel(200, 200, Rgba([200, 100, 50, 128]));
        let marked = watermarked(&source, &style, &face).unwrap();

        assert_ne!(marked, source);
        assert_eq!(marked.get_pixel(0, 0), source.get_pixel(0, 0));
        assert_eq!(marked.get_pixel(199, 199), source.get_pixel(199, 199));
    }

    #[test]
    fn test_empty_image_is_untouched() {
        let Some(face) = test_face() else { return };
        let mut image = RgbaImage::new(0, 0);
        let report = paint_on(&mut image, &StyleConfig::default(), &face).unwrap();
        assert_eq!(report.instances, 0);
    }

    #[test]
    fn test_single_instance_without_tiling() {
        let Some(face) = test_face() else { return };
        let style = StyleConfig {
            text: "SAMPLE".to_string(),
            opacity: 255,
            angle: 15.0,
            ..StyleConfig::default()
        };
        let source = RgbaImage::from_pixel(300, 200, Rgba([255, 255, 255, 255]));
        let mut target = source.clone();
        let report = paint_on(&mut target, &style, &face).unwrap();

        assert_eq!(report.instances, 1);
        assert_ne!(target, source);
        // Corners stay clear of a single centered instance
        assert_eq!(target.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(target.get_pixel(299, 199), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_tiling_paints_more_instances() {
        let Some(face) = test_face() else { return };
        let style = StyleConfig {
            text: "TILE".to_string(),
            font_size: 10.0,
            opacity: 255,
            tiling: true,
            staggered: true,
            angle: -30.0,
            ..StyleConfig::default()
        };
        let source = RgbaImage::from_pixel(300, 200, Rgba([255, 255, 255, 255]));
        let marked = watermarked(&source, &style, &face).unwrap();
        let report = paint_on(&mut source.clone(), &style, &face).unwrap();

        assert!(report.instances > 4);
        assert_eq!(report.instances, report.plan.tiles.len() + 1);
        assert_eq!(source.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        assert_ne!(marked, source);
    }
}
